use crate::domain::market::{PricePoint, Timeframe};
use rust_decimal::Decimal;

/// Quote/history collaborator. Everything it hands over is already fetched;
/// the consensus core never waits on I/O through this trait.
pub trait QuoteSource: Send + Sync {
    /// Latest price for `symbol`, if the feed has one.
    fn current_price(&self, symbol: &str) -> Option<Decimal>;

    /// Bars for `symbol` at `timeframe`, oldest first. May be empty.
    fn history(&self, symbol: &str, timeframe: Timeframe) -> Vec<PricePoint>;
}
