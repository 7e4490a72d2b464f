use crate::domain::market::{PricePoint, Timeframe, validate_history};
use crate::domain::ports::QuoteSource;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// One CSV row: `timestamp,open,high,low,close[,volume]`
#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl CsvBar {
    fn into_price_point(self) -> Result<PricePoint> {
        let parse = |field: &str, raw: &str| {
            Decimal::from_str(raw.trim()).with_context(|| {
                format!(
                    "Invalid {} '{}' at timestamp {}",
                    field, raw, self.timestamp
                )
            })
        };
        let volume = match self.volume.as_deref().map(str::trim) {
            None | Some("") => Decimal::ZERO,
            Some(raw) => parse("volume", raw)?,
        };
        Ok(PricePoint::new(
            self.timestamp,
            parse("open", &self.open)?,
            parse("high", &self.high)?,
            parse("low", &self.low)?,
            parse("close", &self.close)?,
            volume,
        ))
    }
}

/// In-memory quote source fed from CSV files.
///
/// The current price of a pair is its explicit override if one was set,
/// otherwise the last close of its finest loaded timeframe.
#[derive(Debug, Default, Clone)]
pub struct CsvQuoteSource {
    histories: HashMap<String, BTreeMap<Timeframe, Vec<PricePoint>>>,
    prices: HashMap<String, Decimal>,
}

impl CsvQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads bars for `pair` at `timeframe`, replacing any earlier load.
    /// Returns the number of bars read.
    pub fn load_reader<R: Read>(
        &mut self,
        pair: &str,
        timeframe: Timeframe,
        reader: R,
    ) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvBar>().enumerate() {
            let row = result.with_context(|| format!("{}: bad CSV row {}", pair, line + 1))?;
            bars.push(row.into_price_point()?);
        }
        validate_history(&bars).with_context(|| format!("{}: invalid history", pair))?;

        let count = bars.len();
        self.histories
            .entry(pair.to_uppercase())
            .or_default()
            .insert(timeframe, bars);
        Ok(count)
    }

    pub fn load_file(
        &mut self,
        pair: &str,
        timeframe: Timeframe,
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let count = self.load_reader(pair, timeframe, BufReader::new(file))?;
        info!(
            "Loaded {} {} bars for {} from {}",
            count,
            timeframe,
            pair,
            path.display()
        );
        Ok(count)
    }

    /// Overrides the current price of `pair`.
    pub fn set_price(&mut self, pair: &str, price: Decimal) {
        self.prices.insert(pair.to_uppercase(), price);
    }

    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }
}

impl QuoteSource for CsvQuoteSource {
    fn current_price(&self, symbol: &str) -> Option<Decimal> {
        let symbol = symbol.to_uppercase();
        if let Some(price) = self.prices.get(&symbol) {
            return Some(*price);
        }
        self.histories
            .get(&symbol)?
            .values()
            .find_map(|bars| bars.last())
            .map(|bar| bar.close)
    }

    fn history(&self, symbol: &str, timeframe: Timeframe) -> Vec<PricePoint> {
        self.histories
            .get(&symbol.to_uppercase())
            .and_then(|by_tf| by_tf.get(&timeframe))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BARS: &str = "\
timestamp,open,high,low,close,volume
1700000000,1.1000,1.1010,1.0995,1.1005,1200
1700000060,1.1005,1.1012,1.1001,1.1010,
1700000120,1.1010,1.1020,1.1008,1.1018,900
";

    #[test]
    fn test_load_and_read_back() {
        let mut source = CsvQuoteSource::new();
        let count = source
            .load_reader("eurusd", Timeframe::M1, BARS.as_bytes())
            .unwrap();
        assert_eq!(count, 3);

        let history = source.history("EURUSD", Timeframe::M1);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].open, dec!(1.1000));
        assert_eq!(history[1].volume, Decimal::ZERO);
        assert_eq!(history[2].volume, dec!(900));
    }

    #[test]
    fn test_current_price_is_last_close_unless_overridden() {
        let mut source = CsvQuoteSource::new();
        source
            .load_reader("EURUSD", Timeframe::M1, BARS.as_bytes())
            .unwrap();
        assert_eq!(source.current_price("EURUSD"), Some(dec!(1.1018)));

        source.set_price("eurusd", dec!(1.1021));
        assert_eq!(source.current_price("EURUSD"), Some(dec!(1.1021)));
    }

    #[test]
    fn test_unknown_pair_is_empty() {
        let source = CsvQuoteSource::new();
        assert!(source.history("USDJPY", Timeframe::M1).is_empty());
        assert_eq!(source.current_price("USDJPY"), None);
    }

    #[test]
    fn test_rejects_out_of_order_rows() {
        let csv = "\
timestamp,open,high,low,close
1700000060,1.1,1.1,1.1,1.1
1700000000,1.1,1.1,1.1,1.1
";
        let mut source = CsvQuoteSource::new();
        let err = source
            .load_reader("EURUSD", Timeframe::M1, csv.as_bytes())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("not after"));
    }

    #[test]
    fn test_rejects_bad_number() {
        let csv = "timestamp,open,high,low,close\n1700000000,1.1,abc,1.1,1.1\n";
        let mut source = CsvQuoteSource::new();
        let err = source
            .load_reader("EURUSD", Timeframe::M1, csv.as_bytes())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("high"));
    }
}
