pub mod draw_window;
pub mod number_pick;
pub mod payout;

pub use draw_window::resolve_next_draw;
pub use number_pick::{format_ticket_code, pick_unique_numbers};
pub use payout::{DigitTier, compute_digit_prize, compute_pool_settlement, count_hits};
