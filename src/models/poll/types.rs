use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One answer option with its running tally. Options are ordered; the
/// option's position is the index voters submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub label: String,
    pub votes: i64,
}

/// A poll with its ordered options and lifecycle fields.
///
/// Lifecycle: created invisible -> published via the visible flag ->
/// accepts votes until `until` passes or an admin ends it -> `ended_at`
/// set, visible forced off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub question: String,
    pub options: Vec<PollOption>,
    pub visible: bool,
    pub until: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPoll {
    pub question: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn answers(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    pub fn votes(&self) -> Vec<i64> {
        self.options.iter().map(|o| o.votes).collect()
    }

    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Per-option percentages rounded to one decimal. All zeros when the
    /// poll has no votes — never NaN.
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total_votes();
        if total == 0 {
            return vec![0.0; self.options.len()];
        }
        self.options
            .iter()
            .map(|o| (o.votes as f64 * 1000.0 / total as f64).round() / 10.0)
            .collect()
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Whether the deadline has passed (regardless of ended_at). The
    /// transition to ended happens lazily at the next vote attempt.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.until {
            Some(until) => match DateTime::parse_from_rfc3339(until) {
                Ok(deadline) => now > deadline.with_timezone(&Utc),
                Err(_) => false,
            },
            None => false,
        }
    }
}

/// Current UTC time in the storage format (RFC 3339, whole seconds).
pub fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn poll_with_votes(votes: &[i64]) -> Poll {
        Poll {
            id: 1,
            question: "Q".to_string(),
            options: votes
                .iter()
                .enumerate()
                .map(|(i, &v)| PollOption { label: format!("Option {i}"), votes: v })
                .collect(),
            visible: true,
            until: None,
            ended_at: None,
            created_at: now_string(),
            updated_at: now_string(),
        }
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let poll = poll_with_votes(&[3, 1]);
        assert_eq!(poll.percentages(), vec![75.0, 25.0]);

        let poll = poll_with_votes(&[1, 2]);
        assert_eq!(poll.percentages(), vec![33.3, 66.7]);
    }

    #[test]
    fn percentages_of_empty_poll_are_zero_not_nan() {
        let poll = poll_with_votes(&[0, 0]);
        let pct = poll.percentages();
        assert_eq!(pct, vec![0.0, 0.0]);
        assert!(pct.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn expiry_follows_until() {
        let now = Utc::now();
        let mut poll = poll_with_votes(&[0, 0]);
        assert!(!poll.is_expired(now));

        poll.until = Some(format_timestamp(now - Duration::hours(1)));
        assert!(poll.is_expired(now));

        poll.until = Some(format_timestamp(now + Duration::hours(1)));
        assert!(!poll.is_expired(now));
    }
}
