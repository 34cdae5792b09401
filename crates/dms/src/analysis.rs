//! Detection results

use serde::{Deserialize, Serialize};
use crate::DmsError;

/// Drowsiness verdict and score for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Whether the driver is judged drowsy
    pub is_drowsy: bool,

    /// Continuous score reported by the detector
    pub score: f32,
}

impl Detection {
    pub fn new(is_drowsy: bool, score: f32) -> Self {
        Self { is_drowsy, score }
    }

    /// Derive the verdict from a raw score and threshold.
    ///
    /// Rejects NaN and infinities: they cannot be logged or returned as JSON.
    pub fn from_score(score: f32, threshold: f32) -> Result<Self, DmsError> {
        if !score.is_finite() {
            return Err(DmsError::InvalidScore(score));
        }
        Ok(Self {
            is_drowsy: score >= threshold,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(Detection::from_score(0.5, 0.5).unwrap().is_drowsy);
        assert!(!Detection::from_score(0.49, 0.5).unwrap().is_drowsy);
    }

    #[test]
    fn test_non_finite_score_rejected() {
        assert!(matches!(
            Detection::from_score(f32::NAN, 0.5),
            Err(DmsError::InvalidScore(_))
        ));
        assert!(Detection::from_score(f32::INFINITY, 0.5).is_err());
    }
}
