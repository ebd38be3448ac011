use std::{iter, mem};

use rand::Rng;
use tracing::{debug, warn};

use crate::{direction::Direction, store::ScoreStore};

const SPAWN_TILE: u32 = 2;
const WIN_TILE: u32 = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePos {
    pub row: usize,
    pub col: usize,
}

/// The board engine: grid, score, merge bookkeeping and the win latch.
///
/// Rightward movement is the canonical primitive; the other directions
/// rotate the grid into the rightward frame, move, and rotate back. Merge
/// coordinates are rotated in lockstep with the grid so they are always
/// reported in the caller's orientation.
pub struct Board<R, S> {
    grid: Vec<Vec<u32>>,
    height: usize,
    width: usize,
    score: u32,
    best_score: u32,
    merged_tiles: Vec<TilePos>,
    has_2048: bool,
    rng: R,
    store: S,
}

impl<R: Rng, S: ScoreStore> Board<R, S> {
    pub fn new(rng: R, store: S) -> Self {
        Self::with_size(3, 3, rng, store)
    }

    /// Creates an engine with one tile already spawned, so the game starts
    /// non-empty. The best score is loaded from the store up front.
    pub fn with_size(height: usize, width: usize, rng: R, mut store: S) -> Self {
        let best_score = store.load();

        let mut board = Self {
            grid: vec![vec![0; width]; height],
            height,
            width,
            score: 0,
            best_score,
            merged_tiles: Vec::new(),
            has_2048: false,
            rng,
            store,
        };

        board.spawn();
        board
    }

    /// Clears the grid and score, then spawns the first tile. The best
    /// score and the win latch carry over.
    pub fn restart(&mut self) {
        self.grid = vec![vec![0; self.width]; self.height];
        self.score = 0;
        self.merged_tiles.clear();
        self.spawn();
    }

    pub fn move_right(&mut self) {
        self.apply_move(0);
    }

    pub fn move_up(&mut self) {
        self.apply_move(1);
    }

    pub fn move_left(&mut self) {
        self.apply_move(2);
    }

    pub fn move_down(&mut self) {
        self.apply_move(3);
    }

    pub fn slide(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.move_up(),
            Direction::Down => self.move_down(),
            Direction::Right => self.move_right(),
            Direction::Left => self.move_left(),
        }
    }

    fn apply_move(&mut self, rotations: usize) {
        self.merged_tiles.clear();

        for _ in 0..rotations {
            self.rotate();
        }

        self.compact_rows_right();

        for _ in 0..(4 - rotations) % 4 {
            self.rotate();
        }

        if self.score > self.best_score {
            self.best_score = self.score;
            debug!(best_score = self.best_score, "new best score");

            if let Err(err) = self.store.save(self.best_score) {
                warn!("failed to persist best score: {err}");
            }
        }

        self.spawn();
    }

    /// Pushes every row against the right edge, merging adjacent equal
    /// tiles into their doubled sum.
    ///
    /// The scan walks each compacted row from the right edge inward; a
    /// merge removes the consumed cell and the scan continues past the
    /// merged result, so a row like `[4, 2, 2]` cascades into `[0, 0, 8]`.
    /// Recorded merge coordinates already account for the zero padding
    /// added afterwards: later merges shift the tile left by one but also
    /// widen the padding by one, so `width - len + i` at merge time is the
    /// tile's final column.
    fn compact_rows_right(&mut self) {
        for y in 0..self.height {
            let mut row: Vec<u32> = self.grid[y]
                .iter()
                .copied()
                .filter(|&cell| cell != 0)
                .collect();

            let mut i = row.len().saturating_sub(1);

            while i > 0 {
                if row[i] == row[i - 1] {
                    row[i] *= 2;
                    self.score += row[i];
                    self.merged_tiles.push(TilePos {
                        row: y,
                        col: self.width - row.len() + i,
                    });
                    row.remove(i - 1);
                }

                i -= 1;
            }

            self.grid[y] = iter::repeat(0)
                .take(self.width - row.len())
                .chain(row)
                .collect();
        }
    }

    /// Rotates the grid one quarter turn, remapping the pending merge
    /// coordinates by the same transform and swapping the dimensions.
    fn rotate(&mut self) {
        let grid: Vec<Vec<u32>> = (0..self.width)
            .map(|x| (0..self.height).rev().map(|y| self.grid[y][x]).collect())
            .collect();

        for tile in &mut self.merged_tiles {
            *tile = TilePos {
                row: tile.col,
                col: self.height - 1 - tile.row,
            };
        }

        self.grid = grid;
        mem::swap(&mut self.height, &mut self.width);
    }

    /// Places a 2 in a uniformly random empty cell. No-op on a full grid.
    fn spawn(&mut self) {
        let empty: Vec<(usize, usize)> = self
            .grid
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|&(_, &cell)| cell == 0)
                    .map(move |(col, _)| (row, col))
            })
            .collect();

        if !empty.is_empty() {
            let (row, col) = empty[self.rng.gen_range(0..empty.len())];
            self.grid[row][col] = SPAWN_TILE;
        }
    }

    pub fn paint(&self) -> Vec<Vec<u32>> {
        self.grid.clone()
    }

    pub fn is_board_full(&self) -> bool {
        self.grid
            .iter()
            .all(|row| row.iter().all(|&cell| cell != 0))
    }

    /// False only when the board is full and no two orthogonal neighbours
    /// hold equal values.
    pub fn can_move(&self) -> bool {
        if !self.is_board_full() {
            return true;
        }

        let in_rows = self
            .grid
            .iter()
            .any(|row| row.windows(2).any(|pair| pair[0] == pair[1]));

        let in_columns = self.grid.windows(2).any(|rows| {
            rows[0]
                .iter()
                .zip(&rows[1])
                .any(|(upper, lower)| upper == lower)
        });

        in_rows || in_columns
    }

    /// True exactly once, the first time a 2048 tile is observed. The
    /// latch never clears, so subsequent calls return false even if the
    /// tile is still on the board.
    pub fn check_win(&mut self) -> bool {
        if self.has_2048 {
            return false;
        }

        let won = self.grid.iter().flatten().any(|&cell| cell == WIN_TILE);

        if won {
            self.has_2048 = true;
            debug!("win tile reached");
        }

        won
    }

    pub fn current_score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn merged_tiles(&self) -> &[TilePos] {
        &self.merged_tiles
    }

    pub fn has_2048(&self) -> bool {
        self.has_2048
    }

    /// Test hook: replaces the grid, re-deriving the dimensions.
    pub fn set_board(&mut self, grid: Vec<Vec<u32>>) {
        self.height = grid.len();
        self.width = grid.first().map_or(0, Vec::len);
        self.grid = grid;
    }

    /// Test hook.
    pub fn set_current_score(&mut self, score: u32) {
        self.score = score;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::store::MemoryStore;

    use super::*;

    fn board() -> Board<ChaCha8Rng, MemoryStore> {
        Board::new(ChaCha8Rng::seed_from_u64(0), MemoryStore::default())
    }

    #[test]
    fn rows_compact_against_the_right_edge() {
        let mut board = board();
        board.set_board(vec![
            vec![2, 0, 2, 4],
            vec![0, 0, 0, 0],
            vec![2, 2, 2, 2],
            vec![4, 2, 2, 0],
        ]);

        board.compact_rows_right();

        assert_eq!(
            board.paint(),
            vec![
                vec![0, 0, 4, 4],
                vec![0, 0, 0, 0],
                vec![0, 0, 4, 4],
                vec![0, 0, 0, 8],
            ]
        );
        assert_eq!(board.current_score(), 24);
    }

    #[test]
    fn descending_scan_cascades_merges() {
        let mut board = board();
        board.set_board(vec![vec![4, 2, 2], vec![0, 0, 0], vec![0, 0, 0]]);

        board.compact_rows_right();

        assert_eq!(board.paint()[0], vec![0, 0, 8]);
        assert_eq!(board.current_score(), 12);
    }

    #[test]
    fn merge_coordinates_account_for_padding() {
        let mut board = board();
        board.set_board(vec![
            vec![2, 2, 4, 4],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);

        board.compact_rows_right();

        assert_eq!(
            board.merged_tiles(),
            [TilePos { row: 0, col: 3 }, TilePos { row: 0, col: 2 }]
        );
        assert_eq!(board.paint()[0], vec![0, 0, 4, 8]);
    }

    #[test]
    fn four_rotations_restore_the_grid() {
        let mut board = board();
        let grid = vec![vec![2, 4, 8], vec![16, 32, 64]];
        board.set_board(grid.clone());

        board.rotate();
        assert_eq!(board.paint(), vec![vec![16, 2], vec![32, 4], vec![64, 8]]);

        board.rotate();
        board.rotate();
        board.rotate();
        assert_eq!(board.paint(), grid);
    }

    #[test]
    fn rotation_remaps_merge_coordinates() {
        let mut board = board();
        board.set_board(vec![vec![2, 0, 0], vec![2, 0, 0], vec![0, 0, 0]]);

        board.move_up();

        assert_eq!(board.merged_tiles(), [TilePos { row: 0, col: 0 }]);
        assert_eq!(board.paint()[0][0], 4);
    }

    #[test]
    fn move_down_merges_at_the_bottom() {
        let mut board = board();
        board.set_board(vec![vec![2, 0, 0], vec![2, 0, 0], vec![0, 0, 0]]);

        board.move_down();

        assert_eq!(board.merged_tiles(), [TilePos { row: 2, col: 0 }]);
        assert_eq!(board.paint()[2][0], 4);
    }

    #[test]
    fn moves_preserve_non_square_dimensions() {
        let mut board = board();
        board.set_board(vec![vec![2, 0, 4], vec![0, 2, 0]]);

        board.move_up();

        let grid = board.paint();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].len(), 3);
    }

    #[test]
    fn move_on_full_immovable_board_changes_nothing() {
        let grid = vec![
            vec![2, 4, 8],
            vec![16, 32, 64],
            vec![128, 256, 512],
        ];

        let mut board = board();
        board.set_board(grid.clone());

        board.move_right();

        assert_eq!(board.paint(), grid);
        assert_eq!(board.current_score(), 0);
        assert!(board.merged_tiles().is_empty());
    }

    #[test]
    fn spawn_fills_the_only_empty_cell() {
        let mut board = board();
        board.set_board(vec![
            vec![2, 2, 4],
            vec![8, 16, 32],
            vec![64, 128, 256],
        ]);

        board.move_right();

        // The merge frees exactly one cell at the left edge, so the spawn
        // location is forced.
        assert_eq!(
            board.paint(),
            vec![
                vec![2, 4, 4],
                vec![8, 16, 32],
                vec![64, 128, 256],
            ]
        );
        assert_eq!(board.current_score(), 4);
        assert_eq!(board.merged_tiles(), [TilePos { row: 0, col: 1 }]);
    }

    #[test]
    fn set_board_rederives_dimensions() {
        let mut board = board();

        board.set_board(vec![vec![0; 5], vec![0; 5]]);
        board.move_left();

        let grid = board.paint();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].len(), 5);
    }
}
