pub mod board;
pub mod direction;
pub mod store;

pub use board::{Board, TilePos};
pub use direction::Direction;
pub use store::{FileStore, MemoryStore, ScoreStore, StoreError};
