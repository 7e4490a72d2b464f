// Market data domain
pub mod price_point;
pub mod timeframe;

pub use price_point::{History, PricePoint, closes, validate_history};
pub use timeframe::Timeframe;
