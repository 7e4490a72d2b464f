use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar granularity an agent is registered for.
///
/// Ordered from finest to coarsest so coordinator keys sort naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Granularity code used by forex quote feeds ("M1", "H4", "D").
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D",
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m1" | "1m" | "1min" => Ok(Timeframe::M1),
            "m5" | "5m" | "5min" => Ok(Timeframe::M5),
            "m15" | "15m" | "15min" => Ok(Timeframe::M15),
            "h1" | "1h" | "1hour" => Ok(Timeframe::H1),
            "h4" | "4h" | "4hour" => Ok(Timeframe::H4),
            "d" | "d1" | "1d" | "1day" => Ok(Timeframe::D1),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: M1, M5, M15, H1, H4, D",
                s
            )),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("M1").unwrap(), Timeframe::M1);
        assert_eq!(Timeframe::from_str("5min").unwrap(), Timeframe::M5);
        assert_eq!(Timeframe::from_str(" h1 ").unwrap(), Timeframe::H1);
        assert_eq!(Timeframe::from_str("D").unwrap(), Timeframe::D1);
        assert!(Timeframe::from_str("W1").is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ] {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_ordering_is_finest_first() {
        let mut tfs = vec![Timeframe::D1, Timeframe::M1, Timeframe::H1];
        tfs.sort();
        assert_eq!(tfs, vec![Timeframe::M1, Timeframe::H1, Timeframe::D1]);
    }
}
