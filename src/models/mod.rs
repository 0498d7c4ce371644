pub mod game;
pub mod series;
pub mod settlement;
pub mod ticket;

pub use game::*;
pub use series::*;
pub use settlement::*;
pub use ticket::*;
