pub mod draws;
pub mod games;
pub mod matches;
pub mod series;
pub mod tickets;

pub use draws as draw_entity;
pub use games as game_entity;
pub use matches as match_entity;
pub use series as series_entity;
pub use tickets as ticket_entity;

pub use games::{GameKind, NumberingMode, UnclaimedPolicy};
pub use matches::MatchResult;
pub use series::SeriesStatus;
pub use tickets::TicketStatus;
