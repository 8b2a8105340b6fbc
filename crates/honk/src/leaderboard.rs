//! Leaderboard collaborator: the HTTP client the rooms report sounds to,
//! and the in-memory store behind this server's own `/leaderboard`.

use std::collections::HashMap;
use std::time::Duration;

use honk_room::{Leaderboard, LeaderboardError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Body of a leaderboard increment: `{"name": "quack"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequest {
    pub name: String,
}

/// One counter on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    pub count: u64,
}

/// `{"sortedReactions": [...]}`, highest count first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedReactions {
    #[serde(rename = "sortedReactions")]
    pub sorted_reactions: Vec<Reaction>,
}

/// Reports sounds to a leaderboard collaborator over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLeaderboard {
    /// HTTP client with the configured timeout.
    client: Client,

    /// Full URL of the increment endpoint.
    url: String,
}

impl HttpLeaderboard {
    /// Create a client posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Unavailable` if the HTTP client cannot be
    /// built.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LeaderboardError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build leaderboard client");
                LeaderboardError::Unavailable(e.to_string())
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Leaderboard for HttpLeaderboard {
    async fn record(&self, sound: &str) -> Result<(), LeaderboardError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RecordRequest {
                name: sound.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, url = %self.url, "leaderboard request failed");
                LeaderboardError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(sound, "leaderboard recorded");
            Ok(())
        } else {
            Err(LeaderboardError::Rejected(status.as_u16()))
        }
    }
}

/// In-memory sound counters. Names are case-sensitive and never expire.
#[derive(Debug, Default)]
pub struct LeaderboardStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl LeaderboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to `name` and returns the new count.
    pub async fn increment(&self, name: &str) -> u64 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// All counters, highest first; equal counts sort by name.
    pub async fn sorted(&self) -> SortedReactions {
        let counts = self.counts.lock().await;
        let mut sorted_reactions: Vec<Reaction> = counts
            .iter()
            .map(|(name, count)| Reaction {
                name: name.clone(),
                count: *count,
            })
            .collect();
        sorted_reactions
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        SortedReactions { sorted_reactions }
    }
}
