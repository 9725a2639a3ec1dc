pub mod board;
pub mod captures;
pub mod config;
pub mod error;
pub mod game;
pub mod lobby;
pub mod moves;
pub mod piece;
pub mod playout;
pub mod protocol;
pub mod server;
pub mod session;
pub mod square;
pub mod validate;
