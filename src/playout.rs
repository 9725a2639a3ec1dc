use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::Board;
use crate::error::RuleViolation;
use crate::game::{GameOver, Match, MoveReport};
use crate::moves::Move;

/// One game of uniformly random legal moves from the opening position.
#[derive(Clone, Debug)]
pub struct Playout {
    pub reports: Vec<MoveReport>,
    /// None when the ply limit was hit first.
    pub result: Option<GameOver>,
    pub board: Board,
}

impl Playout {
    pub fn plies(&self) -> usize {
        self.reports.len()
    }

    pub fn captures(&self) -> usize {
        self.reports.iter().filter(|r| r.captured_at.is_some()).count()
    }

    pub fn promotions(&self) -> usize {
        self.reports.iter().filter(|r| r.promoted).count()
    }
}

/// Play until the game ends or `max_plies` hops have been made. Every hop of
/// a capture chain counts as one ply.
///
/// `observe` sees the match before each move, together with its legal moves.
pub fn play_random<R: Rng>(
    rng: &mut R,
    max_plies: usize,
    observe: impl FnMut(&Match, &[Move]),
) -> Result<Playout, RuleViolation> {
    let mut game = Match::new();
    game.start();
    play_random_from(game, rng, max_plies, observe)
}

/// Continue `game` with random legal moves. Only the moves played here are
/// reported.
pub fn play_random_from<R: Rng>(
    mut game: Match,
    rng: &mut R,
    max_plies: usize,
    mut observe: impl FnMut(&Match, &[Move]),
) -> Result<Playout, RuleViolation> {
    let mut reports = Vec::new();

    while reports.len() < max_plies {
        let moves = game.legal_moves();
        observe(&game, &moves);
        let Some(&mv) = moves.choose(rng) else {
            break;
        };
        let report = game.apply_move(game.to_move(), mv)?;
        let done = report.game_over.is_some();
        reports.push(report);
        if done {
            break;
        }
    }

    Ok(Playout { reports, result: game.result(), board: game.board().clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn same_seed_same_game() {
        let a = play_random(&mut StdRng::seed_from_u64(7), 200, |_, _| {}).unwrap();
        let b = play_random(&mut StdRng::seed_from_u64(7), 200, |_, _| {}).unwrap();
        assert_eq!(a.reports, b.reports);
        assert_eq!(a.board, b.board);
    }

    #[test]
    fn ply_limit_is_respected() {
        let p = play_random(&mut StdRng::seed_from_u64(1), 5, |_, _| {}).unwrap();
        assert_eq!(p.plies(), 5);
        assert!(p.result.is_none());
        assert!(p.board.count(Color::Light) > 0);
    }

    #[test]
    fn continues_from_a_given_position() {
        let mut game = Match::new();
        game.start();
        game.apply_move(Color::Light, Move::from_notation("c3-d4").unwrap()).unwrap();
        let p = play_random_from(game, &mut StdRng::seed_from_u64(3), 1, |g, _| {
            assert_eq!(g.to_move(), Color::Dark);
        })
        .unwrap();
        assert_eq!(p.reports[0].by, Color::Dark);
    }

    #[test]
    fn long_playouts_usually_finish() {
        let mut rng = StdRng::seed_from_u64(42);
        let finished = (0..20)
            .filter(|_| play_random(&mut rng, 2_000, |_, _| {}).unwrap().result.is_some())
            .count();
        assert!(finished > 0);
    }
}
