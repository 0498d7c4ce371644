pub mod game_service;
pub mod series_service;
pub mod settlement_service;
pub mod ticket_service;

pub use game_service::*;
pub use series_service::*;
pub use settlement_service::*;
pub use ticket_service::*;
