//! Stock decision: detection count vs. threshold

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Lowest value the threshold slider offers
pub const SLIDER_MIN: u32 = 1;
/// Highest value the threshold slider offers
pub const SLIDER_MAX: u32 = 20;
/// Threshold used when nothing else is configured
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Minimum number of products a shelf should hold. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Threshold(u32);

impl Threshold {
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidThreshold(
                "threshold must be a positive integer".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Clamp an operator-supplied value into the slider range
    pub fn from_slider(value: i64) -> Self {
        Self(value.clamp(SLIDER_MIN as i64, SLIDER_MAX as i64) as u32)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<u32> for Threshold {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Threshold> for u32 {
    fn from(t: Threshold) -> u32 {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shelf state derived from (count, threshold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockTier {
    Understocked,
    AtThreshold,
    Sufficient,
}

impl StockTier {
    /// Banner class used by the web page
    pub fn css_class(&self) -> &'static str {
        match self {
            StockTier::Understocked => "alert-danger",
            StockTier::AtThreshold => "alert-warning",
            StockTier::Sufficient => "alert-success",
        }
    }

    pub fn needs_restock(&self) -> bool {
        matches!(self, StockTier::Understocked)
    }
}

impl fmt::Display for StockTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StockTier::Understocked => "UNDERSTOCKED",
            StockTier::AtThreshold => "AT_THRESHOLD",
            StockTier::Sufficient => "SUFFICIENT",
        };
        f.write_str(s)
    }
}

/// Classify a shelf. Every detection counts; there is no smoothing or hysteresis.
pub fn classify(count: usize, threshold: Threshold) -> StockTier {
    let t = threshold.get() as usize;
    match count.cmp(&t) {
        std::cmp::Ordering::Less => StockTier::Understocked,
        std::cmp::Ordering::Equal => StockTier::AtThreshold,
        std::cmp::Ordering::Greater => StockTier::Sufficient,
    }
}

/// Outcome of one stock check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    pub count: usize,
    pub threshold: Threshold,
    pub tier: StockTier,
}

impl StockReport {
    pub fn new(count: usize, threshold: Threshold) -> Self {
        Self {
            count,
            threshold,
            tier: classify(count, threshold),
        }
    }

    /// Operator-facing alert text
    pub fn message(&self) -> String {
        match self.tier {
            StockTier::Understocked => format!(
                "ALERT: Only {} products detected. Restock needed!",
                self.count
            ),
            StockTier::AtThreshold => format!(
                "Warning: Product stock is exactly at threshold ({}).",
                self.threshold
            ),
            StockTier::Sufficient => format!(
                "Stock level is sufficient: {} products detected.",
                self.count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(v: u32) -> Threshold {
        Threshold::new(v).unwrap()
    }

    #[test]
    fn test_classify_reference_points() {
        assert_eq!(classify(0, t(5)), StockTier::Understocked);
        assert_eq!(classify(5, t(5)), StockTier::AtThreshold);
        assert_eq!(classify(6, t(5)), StockTier::Sufficient);
    }

    #[test]
    fn test_classify_threshold_one() {
        assert_eq!(classify(0, t(1)), StockTier::Understocked);
        assert_eq!(classify(1, t(1)), StockTier::AtThreshold);
        assert_eq!(classify(2, t(1)), StockTier::Sufficient);
    }

    #[test]
    fn test_classify_small_grid() {
        for threshold in 1..=20u32 {
            for count in 0..=40usize {
                let tier = classify(count, t(threshold));
                let expected = if count < threshold as usize {
                    StockTier::Understocked
                } else if count == threshold as usize {
                    StockTier::AtThreshold
                } else {
                    StockTier::Sufficient
                };
                assert_eq!(tier, expected, "count={} threshold={}", count, threshold);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_classify_is_three_way_compare(count in 0usize..1_000_000, threshold in 1u32..1_000_000) {
            let tier = classify(count, t(threshold));
            let th = threshold as usize;
            prop_assert_eq!(tier == StockTier::Understocked, count < th);
            prop_assert_eq!(tier == StockTier::AtThreshold, count == th);
            prop_assert_eq!(tier == StockTier::Sufficient, count > th);
        }
    }

    #[test]
    fn test_threshold_rejects_zero() {
        assert!(Threshold::new(0).is_err());
        assert_eq!(Threshold::new(1).unwrap().get(), 1);
    }

    #[test]
    fn test_threshold_slider_bounds() {
        assert_eq!(Threshold::from_slider(1).get(), 1);
        assert_eq!(Threshold::from_slider(20).get(), 20);
        assert_eq!(Threshold::from_slider(0).get(), 1);
        assert_eq!(Threshold::from_slider(-3).get(), 1);
        assert_eq!(Threshold::from_slider(21).get(), 20);
        assert_eq!(Threshold::from_slider(i64::MAX).get(), 20);
    }

    #[test]
    fn test_threshold_default() {
        assert_eq!(Threshold::default().get(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_threshold_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Threshold>("0").is_err());
        assert_eq!(serde_json::from_str::<Threshold>("7").unwrap().get(), 7);
    }

    #[test]
    fn test_report_messages() {
        let low = StockReport::new(2, t(5));
        assert_eq!(low.message(), "ALERT: Only 2 products detected. Restock needed!");
        assert!(low.tier.needs_restock());

        let at = StockReport::new(5, t(5));
        assert_eq!(at.message(), "Warning: Product stock is exactly at threshold (5).");

        let ok = StockReport::new(9, t(5));
        assert_eq!(ok.message(), "Stock level is sufficient: 9 products detected.");
        assert_eq!(ok.tier.css_class(), "alert-success");
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(StockTier::AtThreshold.to_string(), "AT_THRESHOLD");
    }
}
