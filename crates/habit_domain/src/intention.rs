use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::day_diff;

/// User-declared time horizon for pursuing a habit. Absent means unbounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentionDuration {
    SingleDay,
    FewDays,
    Week,
    Month,
}

impl IntentionDuration {
    /// Whole days that must elapse before the intention is considered served.
    pub fn threshold_days(self) -> i64 {
        match self {
            Self::SingleDay => 1,
            Self::FewDays => 3,
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "single_day" => Some(Self::SingleDay),
            "few_days" => Some(Self::FewDays),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentionStatus {
    /// No bounded duration declared; never completes.
    Unbounded,
    /// Still inside the declared window.
    Active { days_remaining: i64 },
    /// Window elapsed and the user has not yet responded.
    NeedsAcknowledgment,
    /// Window elapsed and the user already resolved it; do not re-flag.
    Acknowledged,
}

/// The three resolutions offered once an intention has run its course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentionResolution {
    /// Convert to unbounded and keep going.
    ContinueIndefinitely,
    /// Keep the habit and its history, acknowledged but dormant.
    Pause,
    /// Remove from the active set, retain history.
    Archive,
}

pub fn evaluate(
    duration: Option<IntentionDuration>,
    start_date: Option<NaiveDate>,
    acknowledged: bool,
    today: NaiveDate,
) -> IntentionStatus {
    let (Some(duration), Some(start)) = (duration, start_date) else {
        return IntentionStatus::Unbounded;
    };
    if acknowledged {
        return IntentionStatus::Acknowledged;
    }
    let elapsed = day_diff(start, today);
    let remaining = duration.threshold_days() - elapsed;
    if remaining <= 0 {
        IntentionStatus::NeedsAcknowledgment
    } else {
        IntentionStatus::Active {
            days_remaining: remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_intention_completes_after_seven_days() {
        let start = date(2025, 10, 15);
        assert_eq!(
            evaluate(Some(IntentionDuration::Week), Some(start), false, date(2025, 10, 21)),
            IntentionStatus::Active { days_remaining: 1 }
        );
        assert_eq!(
            evaluate(Some(IntentionDuration::Week), Some(start), false, date(2025, 10, 22)),
            IntentionStatus::NeedsAcknowledgment
        );
        // Eight days in, still flagged until acknowledged.
        assert_eq!(
            evaluate(Some(IntentionDuration::Week), Some(start), false, date(2025, 10, 23)),
            IntentionStatus::NeedsAcknowledgment
        );
    }

    #[test]
    fn acknowledged_intentions_are_not_reflagged() {
        let start = date(2025, 10, 1);
        assert_eq!(
            evaluate(Some(IntentionDuration::SingleDay), Some(start), true, date(2025, 10, 20)),
            IntentionStatus::Acknowledged
        );
    }

    #[test]
    fn unbounded_never_completes() {
        assert_eq!(
            evaluate(None, None, false, date(2025, 10, 20)),
            IntentionStatus::Unbounded
        );
        // A start date without a duration is still unbounded.
        assert_eq!(
            evaluate(None, Some(date(2020, 1, 1)), false, date(2025, 10, 20)),
            IntentionStatus::Unbounded
        );
    }

    #[test]
    fn duration_tags_round_trip() {
        for (tag, duration) in [
            ("single_day", IntentionDuration::SingleDay),
            ("few_days", IntentionDuration::FewDays),
            ("week", IntentionDuration::Week),
            ("month", IntentionDuration::Month),
        ] {
            assert_eq!(IntentionDuration::from_tag(tag), Some(duration));
            assert_eq!(
                serde_json::to_value(duration).unwrap(),
                serde_json::Value::String(tag.to_string())
            );
        }
        assert_eq!(IntentionDuration::from_tag("forever"), None);
    }
}
