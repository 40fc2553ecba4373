pub mod board;
pub mod game;
pub mod harmony;
pub mod paths;
pub mod relation;
pub mod zobrist;

pub use board::*;
pub use game::*;
pub use harmony::*;
pub use paths::*;
pub use relation::*;
pub use zobrist::*;
