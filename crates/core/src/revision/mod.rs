//! Revision tracking and aging.
//!
//! Items a reviewer sends back carry a revision state until the author
//! answers and someone resolves them. Aging counts days since the last
//! activity and buckets them for the summary view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Revision state of a budget item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionState {
    /// Never flagged for revision.
    None,
    /// Sent back, waiting for the author.
    Pending,
    /// The author answered.
    Answered,
    /// Closed out.
    Resolved,
}

impl RevisionState {
    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Resolved => "resolved",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "pending" => Some(Self::Pending),
            "answered" => Some(Self::Answered),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

}

impl fmt::Display for RevisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by revision transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevisionError {
    /// Answering an item that was never flagged.
    #[error("Item {0} is not under revision")]
    NotUnderRevision(i64),

    /// Answer text is required but not provided.
    #[error("Answer text is required")]
    AnswerRequired,
}

impl RevisionError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }
}

/// Aging buckets for the summary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgingBucket {
    /// 0-1 days.
    UpToOne,
    /// 2-3 days.
    TwoToThree,
    /// 4-7 days.
    FourToSeven,
    /// More than 7 days.
    OverSeven,
}

impl AgingBucket {
    /// All buckets, youngest first.
    pub const ALL: [Self; 4] = [
        Self::UpToOne,
        Self::TwoToThree,
        Self::FourToSeven,
        Self::OverSeven,
    ];

    /// Returns the display label of the bucket.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UpToOne => "0-1",
            Self::TwoToThree => "2-3",
            Self::FourToSeven => "4-7",
            Self::OverSeven => ">7",
        }
    }

    /// Buckets an item by its aging in days.
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=1 => Self::UpToOne,
            2..=3 => Self::TwoToThree,
            4..=7 => Self::FourToSeven,
            _ => Self::OverSeven,
        }
    }
}

/// Days since the item's last revision activity: the answer if one exists,
/// otherwise the send-back itself.
#[must_use]
pub fn aging_days(
    now: DateTime<Utc>,
    revised_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
) -> i64 {
    (now - answered_at.unwrap_or(revised_at)).num_days()
}

/// Per-bucket counts for the summary view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgingSummary {
    /// Items aged 0-1 days.
    pub up_to_one: usize,
    /// Items aged 2-3 days.
    pub two_to_three: usize,
    /// Items aged 4-7 days.
    pub four_to_seven: usize,
    /// Items aged more than 7 days.
    pub over_seven: usize,
}

impl AgingSummary {
    /// Buckets a set of aging values.
    #[must_use]
    pub fn from_days<I: IntoIterator<Item = i64>>(days: I) -> Self {
        let mut summary = Self::default();
        for d in days {
            match AgingBucket::from_days(d) {
                AgingBucket::UpToOne => summary.up_to_one += 1,
                AgingBucket::TwoToThree => summary.two_to_three += 1,
                AgingBucket::FourToSeven => summary.four_to_seven += 1,
                AgingBucket::OverSeven => summary.over_seven += 1,
            }
        }
        summary
    }
}

/// The author answers a pending or already-answered revision.
///
/// # Errors
///
/// Returns `AnswerRequired` on empty text and `NotUnderRevision` when the
/// item was never sent back (or is already resolved).
pub fn answer(
    item_id: i64,
    state: RevisionState,
    answer_text: &str,
) -> Result<RevisionState, RevisionError> {
    if answer_text.trim().is_empty() {
        return Err(RevisionError::AnswerRequired);
    }
    match state {
        RevisionState::Pending | RevisionState::Answered => Ok(RevisionState::Answered),
        RevisionState::None | RevisionState::Resolved => {
            Err(RevisionError::NotUnderRevision(item_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    #[test]
    fn test_state_round_trip() {
        for state in [
            RevisionState::None,
            RevisionState::Pending,
            RevisionState::Answered,
            RevisionState::Resolved,
        ] {
            assert_eq!(RevisionState::parse(state.as_str()), Some(state));
        }
    }

    #[rstest]
    #[case(0, AgingBucket::UpToOne)]
    #[case(1, AgingBucket::UpToOne)]
    #[case(2, AgingBucket::TwoToThree)]
    #[case(3, AgingBucket::TwoToThree)]
    #[case(4, AgingBucket::FourToSeven)]
    #[case(7, AgingBucket::FourToSeven)]
    #[case(8, AgingBucket::OverSeven)]
    #[case(30, AgingBucket::OverSeven)]
    fn test_bucketing(#[case] days: i64, #[case] expected: AgingBucket) {
        assert_eq!(AgingBucket::from_days(days), expected);
    }

    #[test]
    fn test_aging_uses_answer_when_present() {
        let now = Utc::now();
        let revised = now - Duration::days(10);
        let answered = now - Duration::days(2);

        assert_eq!(aging_days(now, revised, None), 10);
        assert_eq!(aging_days(now, revised, Some(answered)), 2);
    }

    #[test]
    fn test_summary_counts() {
        let summary = AgingSummary::from_days([0, 1, 2, 5, 9, 40]);
        assert_eq!(summary.up_to_one, 2);
        assert_eq!(summary.two_to_three, 1);
        assert_eq!(summary.four_to_seven, 1);
        assert_eq!(summary.over_seven, 2);
    }

    #[test]
    fn test_answer_transitions() {
        assert_eq!(
            answer(1, RevisionState::Pending, "adjusted the quantity").unwrap(),
            RevisionState::Answered
        );
        assert_eq!(
            answer(1, RevisionState::Answered, "second answer").unwrap(),
            RevisionState::Answered
        );
        assert_eq!(
            answer(1, RevisionState::None, "text"),
            Err(RevisionError::NotUnderRevision(1))
        );
        assert_eq!(
            answer(1, RevisionState::Pending, "  "),
            Err(RevisionError::AnswerRequired)
        );
    }
}
