//! State the game machine owns besides the board: history, clocks, the
//! lifecycle phase and the promotion chooser.

pub mod game_over;
pub mod history;
pub mod promotion;
pub mod timer;

pub use game_over::{GameOutcome, GamePhase};
pub use history::{MoveHistory, MoveRecord, PositionSnapshot};
pub use promotion::{is_promotion_move, AutoQueen, FixedPromotion, PromotionChooser};
pub use timer::{format_clock, GameClock, TimeControl};
