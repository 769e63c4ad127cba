//! Fire-and-forget Discord webhook notifications for poll lifecycle events.
//!
//! Sends happen on a spawned task after the database work has committed, so
//! a slow or dead webhook endpoint can never fail or delay a vote. Failures
//! are logged and dropped.

use serde::Serialize;

use crate::models::poll::Poll;

const COLOR_CREATED: u32 = 0x00ff00;
const COLOR_VOTE: u32 = 0x3498db;
const COLOR_ENDED: u32 = 0xffd700;
const COLOR_DELETED: u32 = 0xff0000;

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Clone)]
pub struct Webhook {
    url: Option<String>,
    client: reqwest::Client,
}

fn plural(count: i64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn created_embed(poll: &Poll) -> Embed {
    Embed {
        title: "🆕 New Poll Created".to_string(),
        description: poll.question.clone(),
        color: COLOR_CREATED,
        fields: poll
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| EmbedField {
                name: format!("Option {}", i + 1),
                value: o.label.clone(),
                inline: true,
            })
            .collect(),
        footer: poll.until.as_ref().map(|until| EmbedFooter {
            text: format!("Ends at: {until}"),
        }),
        timestamp: timestamp(),
    }
}

pub fn vote_embed(poll: &Poll, voted_option: usize) -> Embed {
    let percentages = poll.percentages();
    Embed {
        title: "🗳️ New Vote Received".to_string(),
        description: poll.question.clone(),
        color: COLOR_VOTE,
        fields: poll
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| EmbedField {
                name: if i == voted_option {
                    format!("{} ✨", o.label)
                } else {
                    o.label.clone()
                },
                value: format!("{} vote{} ({:.1}%)", o.votes, plural(o.votes), percentages[i]),
                inline: true,
            })
            .collect(),
        footer: Some(EmbedFooter {
            text: format!("Total votes: {}", poll.total_votes()),
        }),
        timestamp: timestamp(),
    }
}

pub fn ended_embed(poll: &Poll) -> Embed {
    let percentages = poll.percentages();
    Embed {
        title: "🏁 Poll Ended".to_string(),
        description: poll.question.clone(),
        color: COLOR_ENDED,
        fields: poll
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| {
                // Percentage omitted for zero-vote options.
                let value = if o.votes > 0 {
                    format!("{}\n{} vote{} ({:.1}%)", o.label, o.votes, plural(o.votes), percentages[i])
                } else {
                    format!("{}\n{} votes", o.label, o.votes)
                };
                EmbedField {
                    name: format!("Option {}", i + 1),
                    value,
                    inline: true,
                }
            })
            .collect(),
        footer: None,
        timestamp: timestamp(),
    }
}

pub fn deleted_embed(poll: &Poll) -> Embed {
    Embed {
        title: "❌ Poll Deleted".to_string(),
        description: poll.question.clone(),
        color: COLOR_DELETED,
        fields: poll
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| EmbedField {
                name: format!("Option {}", i + 1),
                value: format!("{} ({} vote{})", o.label, o.votes, plural(o.votes)),
                inline: true,
            })
            .collect(),
        footer: None,
        timestamp: timestamp(),
    }
}

impl Webhook {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the WEBHOOK_URL env var. Without it, notifications are
    /// skipped (logged at debug level) — the engine works fine unobserved.
    pub fn from_env() -> Self {
        let url = std::env::var("WEBHOOK_URL").ok().filter(|u| !u.is_empty());
        if url.is_none() {
            log::warn!("No WEBHOOK_URL set — lifecycle notifications disabled");
        }
        Self::new(url)
    }

    pub fn poll_created(&self, poll: &Poll) {
        self.send(created_embed(poll));
    }

    pub fn vote_received(&self, poll: &Poll, voted_option: usize) {
        self.send(vote_embed(poll, voted_option));
    }

    pub fn poll_ended(&self, poll: &Poll) {
        self.send(ended_embed(poll));
    }

    pub fn poll_deleted(&self, poll: &Poll) {
        self.send(deleted_embed(poll));
    }

    fn send(&self, embed: Embed) {
        let Some(url) = self.url.clone() else {
            log::debug!("Webhook disabled, dropping notification: {}", embed.title);
            return;
        };
        let client = self.client.clone();
        let payload = WebhookPayload { embeds: vec![embed] };

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    log::warn!("Webhook returned status {}", resp.status());
                }
                Err(e) => {
                    log::warn!("Webhook delivery failed: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::poll::{now_string, PollOption};

    fn poll(votes: &[i64], until: Option<&str>) -> Poll {
        Poll {
            id: 7,
            question: "Next modpack?".to_string(),
            options: votes
                .iter()
                .enumerate()
                .map(|(i, &v)| PollOption { label: format!("Pack {}", i + 1), votes: v })
                .collect(),
            visible: true,
            until: until.map(String::from),
            ended_at: None,
            created_at: now_string(),
            updated_at: now_string(),
        }
    }

    #[test]
    fn created_embed_lists_each_option_and_deadline() {
        let embed = created_embed(&poll(&[0, 0], Some("2026-09-01T18:00:00Z")));
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "Option 1");
        assert_eq!(embed.fields[0].value, "Pack 1");
        assert_eq!(embed.footer.unwrap().text, "Ends at: 2026-09-01T18:00:00Z");
    }

    #[test]
    fn vote_embed_marks_voted_option_and_totals() {
        let embed = vote_embed(&poll(&[3, 1], None), 0);
        assert_eq!(embed.fields[0].name, "Pack 1 ✨");
        assert_eq!(embed.fields[0].value, "3 votes (75.0%)");
        assert_eq!(embed.fields[1].value, "1 vote (25.0%)");
        assert_eq!(embed.footer.unwrap().text, "Total votes: 4");
    }

    #[test]
    fn ended_embed_omits_percentage_for_zero_votes() {
        let embed = ended_embed(&poll(&[2, 0], None));
        assert!(embed.fields[0].value.contains("(100.0%)"));
        assert!(!embed.fields[1].value.contains('%'));
    }

    #[test]
    fn deleted_embed_reports_final_tallies() {
        let embed = deleted_embed(&poll(&[1, 4], None));
        assert_eq!(embed.fields[1].value, "Pack 2 (4 votes)");
    }
}
