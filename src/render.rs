use std::{
    io::{self, Write},
    mem::MaybeUninit,
    os::fd::AsRawFd,
};

const CELL_WIDTH: usize = 7;
const COLOUR_TABLE: [u8; 7] = [90, 33, 31, 32, 33, 36, 35];

/// Lines occupied by one frame: score line, borders, cell rows, separators
/// and the status line.
pub fn frame_lines(height: usize) -> usize {
    2 * height + 3
}

fn draw_border(
    out: &mut impl Write,
    width: usize,
    left: &str,
    mid: &str,
    right: &str,
) -> io::Result<()> {
    write!(out, "{left}")?;

    for x in 0..width {
        if x != 0 {
            write!(out, "{mid}")?;
        }

        write!(out, "{}", "━".repeat(CELL_WIDTH))?;
    }

    writeln!(out, "{right}")
}

fn draw_cells(out: &mut impl Write, row: &[u32]) -> io::Result<()> {
    for &cell in row {
        let maybe_colour = (cell != 0).then(|| {
            let exponent = cell.trailing_zeros() as usize;

            COLOUR_TABLE[(exponent - 1) % COLOUR_TABLE.len()]
        });

        if let Some(colour) = maybe_colour {
            write!(
                out,
                "┃\x1b[7m\x1b[{colour}m{cell:^width$}\x1b[m",
                width = CELL_WIDTH
            )?;
        } else {
            write!(out, "┃{:width$}", "", width = CELL_WIDTH)?;
        }
    }

    writeln!(out, "┃")
}

pub fn draw_board(
    out: &mut impl Write,
    grid: &[Vec<u32>],
    score: u32,
    best_score: u32,
    status: &str,
) -> io::Result<()> {
    let width = grid.first().map_or(0, Vec::len);

    writeln!(out, "Score: {score}  Best: {best_score}")?;
    draw_border(out, width, "┏", "┳", "┓")?;

    for (y, row) in grid.iter().enumerate() {
        if y != 0 {
            draw_border(out, width, "┣", "╋", "┫")?;
        }

        draw_cells(out, row)?;
    }

    draw_border(out, width, "┗", "┻", "┛")?;
    writeln!(out, "{status}\x1b[K")?;

    out.flush()
}

/// Moves the cursor back to the top of the previous frame and draws over
/// it. The frame height is fixed for the lifetime of a game, so a full
/// repaint keeps the cursor bookkeeping trivial for any board size.
pub fn redraw_board(
    out: &mut impl Write,
    grid: &[Vec<u32>],
    score: u32,
    best_score: u32,
    status: &str,
) -> io::Result<()> {
    write!(out, "\x1b[{}F", frame_lines(grid.len()))?;

    draw_board(out, grid, score, best_score, status)
}

pub fn setup_terminal(fd: &impl AsRawFd) -> io::Result<libc::termios> {
    let fd = fd.as_raw_fd();
    let mut termios = MaybeUninit::uninit();

    let original = unsafe {
        if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }

        termios.assume_init()
    };

    let mut raw = original;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON);

    unsafe {
        if libc::tcsetattr(fd, libc::TCSADRAIN, &raw) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(original)
}

pub fn restore_terminal(fd: &impl AsRawFd, original: &libc::termios) -> io::Result<()> {
    unsafe {
        if libc::tcsetattr(fd.as_raw_fd(), libc::TCSADRAIN, original) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}
