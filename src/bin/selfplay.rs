use anyhow::{anyhow, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use draughts::game::{EndCause, Match, Outcome};
use draughts::moves::Move;
use draughts::piece::Color;
use draughts::playout::play_random_from;

#[derive(Parser, Debug)]
#[command(about = "Play random legal draughts games and report statistics")]
struct Args {
    #[arg(long, default_value_t = 100)]
    games: usize,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Hops per game before it is abandoned as undecided.
    #[arg(long, default_value_t = 400)]
    max_plies: usize,

    /// Moves played before the random part, e.g. "c3-d4 f6-g5".
    #[arg(long)]
    opening: Option<String>,

    /// Print every game's moves in draughts notation.
    #[arg(long)]
    show_moves: bool,
}

fn opening(line: Option<&str>) -> anyhow::Result<Match> {
    let mut game = Match::new();
    game.start();
    for token in line.unwrap_or_default().split_whitespace() {
        let mv = Move::from_notation(token).ok_or_else(|| anyhow!("bad move notation {token:?}"))?;
        game.apply_move(game.to_move(), mv)
            .with_context(|| format!("opening move {token}"))?;
    }
    Ok(game)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = opening(args.opening.as_deref())?;

    let (mut light, mut dark, mut undecided) = (0u32, 0u32, 0u32);
    let (mut no_pieces, mut no_moves) = (0u32, 0u32);
    let (mut plies, mut captures, mut promotions) = (0usize, 0usize, 0usize);

    for game in 1..=args.games {
        let playout = play_random_from(start.clone(), &mut rng, args.max_plies, |_, _| {})?;
        plies += playout.plies();
        captures += playout.captures();
        promotions += playout.promotions();

        let verdict = match playout.result {
            Some(over) => {
                match over.cause {
                    EndCause::NoPieces => no_pieces += 1,
                    EndCause::NoMoves => no_moves += 1,
                    _ => {}
                }
                match over.outcome {
                    Outcome::Winner(Color::Light) => light += 1,
                    Outcome::Winner(Color::Dark) => dark += 1,
                    Outcome::Draw => undecided += 1,
                }
                format!("{:?} ({:?})", over.outcome, over.cause)
            }
            None => {
                undecided += 1;
                "undecided".to_string()
            }
        };
        eprintln!("Game {game}: {verdict} after {} plies", playout.plies());
        if args.show_moves {
            let line: Vec<String> = playout
                .reports
                .iter()
                .map(|r| r.mv.to_notation(r.captured_at.is_some()))
                .collect();
            eprintln!("  {}", line.join(" "));
        }
    }

    let games = args.games.max(1);
    eprintln!();
    eprintln!("Light {light} / Dark {dark} / undecided {undecided}");
    eprintln!("Wins by capture-out {no_pieces}, by blockade {no_moves}");
    eprintln!(
        "Averages per game: {:.1} plies, {:.1} captures, {:.2} promotions",
        plies as f64 / games as f64,
        captures as f64 / games as f64,
        promotions as f64 / games as f64
    );
    Ok(())
}
