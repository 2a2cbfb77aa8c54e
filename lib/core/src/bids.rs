//! Bid scale and the additive bid adjustment.

use crate::corpus::{AffinityScore, Bid};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_BID_VALUES: [&str; 6] = ["Very High", "High", "Neutral", "Low", "Very Low", "No Bid"];
pub const DEFAULT_POSITIVE_BID_VALUES: [&str; 2] = ["Very High", "High"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidPolarity {
    Positive,
    Negative,
}

/// Ordered bid scale split into positive and negative values
#[derive(Debug, Clone, PartialEq)]
pub struct BidScale {
    values: Vec<String>,
    positive: Vec<String>,
}

impl BidScale {
    /// Every positive value must appear in `values`.
    pub fn new(values: Vec<String>, positive: Vec<String>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidConfig("bid_values must not be empty".to_string()));
        }
        if let Some(unknown) = positive.iter().find(|p| !values.contains(p)) {
            return Err(Error::InvalidConfig(format!(
                "positive bid value '{}' is not in bid_values",
                unknown
            )));
        }
        Ok(Self { values, positive })
    }

    #[inline]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `None` when the value is not on the scale
    pub fn polarity(&self, value: &str) -> Option<BidPolarity> {
        if self.positive.iter().any(|p| p == value) {
            Some(BidPolarity::Positive)
        } else if self.values.iter().any(|v| v == value) {
            Some(BidPolarity::Negative)
        } else {
            None
        }
    }
}

impl Default for BidScale {
    fn default() -> Self {
        Self {
            values: DEFAULT_BID_VALUES.iter().map(|v| v.to_string()).collect(),
            positive: DEFAULT_POSITIVE_BID_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Adds `positive_bonus` to scores with a positive bid and subtracts
/// `negative_penalty` from scores with a negative bid.
#[derive(Debug, Clone, PartialEq)]
pub struct BidAdjuster {
    pub scale: BidScale,
    pub positive_bonus: f32,
    pub negative_penalty: f32,
}

impl BidAdjuster {
    pub fn new(scale: BidScale, positive_bonus: f32, negative_penalty: f32) -> Result<Self> {
        if !(positive_bonus >= 0.0 && negative_penalty >= 0.0) {
            return Err(Error::InvalidConfig(
                "positive_bid_bonus and negative_bid_penalty must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            scale,
            positive_bonus,
            negative_penalty,
        })
    }

    #[inline]
    pub fn adjust_one(&self, raw: f32, polarity: Option<BidPolarity>) -> f32 {
        match polarity {
            Some(BidPolarity::Positive) => raw + self.positive_bonus,
            Some(BidPolarity::Negative) => raw - self.negative_penalty,
            None => raw,
        }
    }

    /// Adjust every score that has a matching bid. Every bid is checked
    /// against the scale, even bids on pairs that have no score.
    pub fn adjust(&self, scores: Vec<AffinityScore>, bids: &[Bid]) -> Result<Vec<AffinityScore>> {
        let mut polarities: HashMap<(&str, &str), BidPolarity> = HashMap::with_capacity(bids.len());
        for bid in bids {
            let polarity = self.scale.polarity(&bid.value).ok_or_else(|| Error::InvalidBid {
                submission: bid.submission_id.clone(),
                reviewer: bid.reviewer_id.clone(),
                value: bid.value.clone(),
            })?;
            // Later bids on the same pair win
            polarities.insert((bid.submission_id.as_str(), bid.reviewer_id.as_str()), polarity);
        }

        let mut adjusted = 0usize;
        let scores = scores
            .into_iter()
            .map(|mut score| {
                let polarity = polarities
                    .get(&(score.submission_id.as_str(), score.reviewer_id.as_str()))
                    .copied();
                if polarity.is_some() {
                    adjusted += 1;
                }
                score.score = self.adjust_one(score.score, polarity);
                score
            })
            .collect();

        debug!("Applied {} bids to scores", adjusted);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(sub: &str, rev: &str, value: &str) -> Bid {
        Bid {
            submission_id: sub.to_string(),
            reviewer_id: rev.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_default_scale_partition() {
        let scale = BidScale::default();
        assert_eq!(scale.polarity("Very High"), Some(BidPolarity::Positive));
        assert_eq!(scale.polarity("High"), Some(BidPolarity::Positive));
        assert_eq!(scale.polarity("Neutral"), Some(BidPolarity::Negative));
        assert_eq!(scale.polarity("No Bid"), Some(BidPolarity::Negative));
        assert_eq!(scale.polarity("Maybe"), None);
    }

    #[test]
    fn test_positive_values_must_be_on_scale() {
        let result = BidScale::new(vec!["Yes".to_string(), "No".to_string()], vec!["Sure".to_string()]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_additive_adjustment() {
        let adjuster = BidAdjuster::new(BidScale::default(), 0.5, 0.25).unwrap();
        let scores = vec![
            AffinityScore::new("s1", "~A1", 0.5),
            AffinityScore::new("s1", "~B1", 0.5),
            AffinityScore::new("s1", "~C1", 0.5),
        ];
        let bids = vec![bid("s1", "~A1", "High"), bid("s1", "~B1", "Low")];
        let out = adjuster.adjust(scores, &bids).unwrap();
        assert_eq!(out[0].score, 1.0);
        assert_eq!(out[1].score, 0.25);
        assert_eq!(out[2].score, 0.5);
    }

    #[test]
    fn test_monotonic_for_fixed_polarity() {
        let adjuster = BidAdjuster::new(BidScale::default(), 0.3, 0.1).unwrap();
        for polarity in [Some(BidPolarity::Positive), Some(BidPolarity::Negative), None] {
            let low = adjuster.adjust_one(0.2, polarity);
            let high = adjuster.adjust_one(0.7, polarity);
            assert!(high > low);
            assert_eq!(adjuster.adjust_one(0.2, polarity).to_bits(), low.to_bits());
        }
    }

    #[test]
    fn test_unknown_bid_aborts() {
        let adjuster = BidAdjuster::new(BidScale::default(), 0.1, 0.1).unwrap();
        let scores = vec![AffinityScore::new("s1", "~A1", 0.5)];
        let err = adjuster.adjust(scores, &[bid("s9", "~Z1", "Definitely")]).unwrap_err();
        assert!(matches!(err, Error::InvalidBid { .. }));
    }

    #[test]
    fn test_negative_bonus_rejected() {
        assert!(BidAdjuster::new(BidScale::default(), -0.1, 0.0).is_err());
    }
}
