//! Comment sentiment bucketing.

use crate::error::AnalysisError;
use crate::models::SurveyComment;
use serde::{Deserialize, Serialize};

/// Rating cut-offs for sentiment buckets.
///
/// Default: `<= 2` negative, `3` neutral, `>= 4` positive. Ratings between
/// the two cut-offs are neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentPolicy {
    #[serde(default = "default_negative_max")]
    pub negative_max: u8,
    #[serde(default = "default_positive_min")]
    pub positive_min: u8,
}

impl Default for SentimentPolicy {
    fn default() -> Self {
        Self {
            negative_max: default_negative_max(),
            positive_min: default_positive_min(),
        }
    }
}

fn default_negative_max() -> u8 {
    2
}

fn default_positive_min() -> u8 {
    4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl SentimentPolicy {
    /// Cut-offs must leave negative strictly below positive.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.negative_max >= self.positive_min {
            return Err(AnalysisError::InvalidMetric(format!(
                "sentiment negative_max ({}) must be below positive_min ({})",
                self.negative_max, self.positive_min
            )));
        }
        Ok(())
    }

    pub fn classify(&self, rating: u8) -> Sentiment {
        if rating <= self.negative_max {
            Sentiment::Negative
        } else if rating >= self.positive_min {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    }
}

/// Comments split by sentiment, in their original order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentBreakdown<'a> {
    pub total: usize,
    pub positive: Vec<&'a SurveyComment>,
    pub neutral: Vec<&'a SurveyComment>,
    pub negative: Vec<&'a SurveyComment>,
}

impl SentimentBreakdown<'_> {
    pub fn positive_pct(&self) -> f64 {
        self.share(self.positive.len())
    }

    pub fn neutral_pct(&self) -> f64 {
        self.share(self.neutral.len())
    }

    pub fn negative_pct(&self) -> f64 {
        self.share(self.negative.len())
    }

    fn share(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

pub fn bucket_comments<'a>(
    comments: &'a [SurveyComment],
    policy: &SentimentPolicy,
) -> SentimentBreakdown<'a> {
    let mut breakdown = SentimentBreakdown {
        total: comments.len(),
        ..Default::default()
    };

    for comment in comments {
        match policy.classify(comment.rating) {
            Sentiment::Positive => breakdown.positive.push(comment),
            Sentiment::Neutral => breakdown.neutral.push(comment),
            Sentiment::Negative => breakdown.negative.push(comment),
        }
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(rating: u8) -> SurveyComment {
        SurveyComment::new(rating, format!("rated {}", rating), "2025-03-01").unwrap()
    }

    #[test]
    fn test_default_policy_thresholds() {
        let policy = SentimentPolicy::default();
        assert_eq!(policy.classify(1), Sentiment::Negative);
        assert_eq!(policy.classify(2), Sentiment::Negative);
        assert_eq!(policy.classify(3), Sentiment::Neutral);
        assert_eq!(policy.classify(4), Sentiment::Positive);
        assert_eq!(policy.classify(5), Sentiment::Positive);
    }

    #[test]
    fn test_policy_validation() {
        assert!(SentimentPolicy::default().validate().is_ok());
        let overlapping = SentimentPolicy {
            negative_max: 4,
            positive_min: 4,
        };
        assert!(overlapping.validate().is_err());
    }

    #[test]
    fn test_bucket_comments_ratios() {
        let comments: Vec<_> = [5, 4, 3, 5, 2].into_iter().map(comment).collect();
        let breakdown = bucket_comments(&comments, &SentimentPolicy::default());
        assert_eq!(breakdown.positive.len(), 3);
        assert_eq!(breakdown.neutral.len(), 1);
        assert_eq!(breakdown.negative.len(), 1);
        assert!((breakdown.positive_pct() - 60.0).abs() < 1e-9);
        assert!((breakdown.negative_pct() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_comments_gives_zero_ratios() {
        let breakdown = bucket_comments(&[], &SentimentPolicy::default());
        assert_eq!(breakdown.total, 0);
        assert_eq!(breakdown.positive_pct(), 0.0);
    }
}
