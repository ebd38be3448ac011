use std::{
    io::{self, Read, Write},
    os::fd::AsRawFd,
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use engine_2048::{Board, Direction, FileStore, ScoreStore};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

mod render;

// Arrow key escape sequences, in the same order as the searcher patterns.
const KEY_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Right,
    Direction::Left,
];

#[derive(Parser)]
#[command(about = "2048-style sliding tile puzzle in the terminal")]
struct Args {
    /// Board height
    #[arg(long, default_value_t = 3)]
    height: usize,

    /// Board width
    #[arg(long, default_value_t = 3)]
    width: usize,

    /// Seed for deterministic tile spawns
    #[arg(long)]
    seed: Option<u64>,

    /// Best score file (defaults to a file in the user data directory)
    #[arg(long)]
    best_score_file: Option<PathBuf>,
}

fn play<R: Rng, S: ScoreStore>(
    out: &mut (impl AsRawFd + Write),
    input: &mut impl Read,
    mut board: Board<R, S>,
) -> io::Result<()> {
    let input_searcher =
        aho_corasick::packed::Searcher::new([b"\x1b[A", b"\x1b[B", b"\x1b[C", b"\x1b[D"]).unwrap();

    let mut buf = [0u8; 128];
    let mut buf_len = 0;

    let mut won = false;

    render::draw_board(
        out,
        &board.paint(),
        board.current_score(),
        board.best_score(),
        "",
    )?;

    loop {
        let read = input.read(&mut buf[buf_len..])?;

        if read == 0 {
            break;
        }

        buf_len += read;

        let mut dirty = false;
        let mut quit = false;

        for key in input_searcher
            .find_iter(&buf[..buf_len])
            .map(|m| m.pattern().as_usize())
        {
            board.slide(KEY_DIRECTIONS[key]);
            dirty = true;
        }

        if buf[..buf_len].contains(&b'r') {
            board.restart();
            won = false;
            dirty = true;
        }

        if buf[..buf_len].contains(&b'q') {
            quit = true;
        }

        // Keep a trailing partial escape sequence for the next read.
        buf_len = match &buf[..buf_len] {
            [.., 0x1b, b'['] => {
                buf[0] = 0x1b;
                buf[1] = b'[';
                2
            }
            [.., 0x1b] => {
                buf[0] = 0x1b;
                1
            }
            _ => 0,
        };

        if dirty {
            won |= board.check_win();

            let status = if !board.can_move() {
                "Game over - r to restart, q to quit"
            } else if won {
                "You made 2048!"
            } else {
                ""
            };

            render::redraw_board(
                out,
                &board.paint(),
                board.current_score(),
                board.best_score(),
                status,
            )?;
        }

        if quit {
            break;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    anyhow::ensure!(
        args.height > 0 && args.width > 0,
        "board dimensions must be at least 1x1"
    );

    let rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let store_path = args
        .best_score_file
        .or_else(|| dirs::data_dir().map(|dir| dir.join("play-2048/best_score")))
        .context("no data directory available; pass --best-score-file")?;

    let board = Board::with_size(args.height, args.width, rng, FileStore::new(store_path));

    let mut stdout = io::stdout().lock();
    let mut stdin = io::stdin().lock();

    let original_termios = render::setup_terminal(&stdout)?;
    let result = play(&mut stdout, &mut stdin, board);
    render::restore_terminal(&stdout, &original_termios)?;

    result.context("terminal playback failed")
}
