//! Multi-machine campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::machine::MachineConfig;

/// Builds the campaign key for a user and Unix timestamp.
///
/// Characters outside `[A-Za-z0-9_-]` in the user id become `_` so the key is
/// always a single path component.
pub fn campaign_id(user_id: &str, timestamp: i64) -> String {
    let user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("campaign_{user}_{timestamp}")
}

/// A batch of machines generated for one user in one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// `campaign_<user>_<unix timestamp>`; see [`campaign_id`].
    pub campaign_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub difficulty: u8,
    /// Number of machines asked for; `machines` may be shorter.
    pub requested: usize,
    pub machines: Vec<MachineConfig>,
}

impl Campaign {
    pub(crate) fn new(user_id: &str, created_at: DateTime<Utc>, difficulty: u8, requested: usize) -> Self {
        Self {
            campaign_id: campaign_id(user_id, created_at.timestamp()),
            user_id: user_id.to_string(),
            created_at,
            difficulty,
            requested,
            machines: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// True when some requested units were skipped or unavailable.
    pub fn is_partial(&self) -> bool {
        self.machines.len() < self.requested
    }

    pub fn machine_ids(&self) -> Vec<&str> {
        self.machines.iter().map(|m| m.machine_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_id_is_per_user() {
        assert_eq!(campaign_id("alice", 1_700_000_000), "campaign_alice_1700000000");
        assert_ne!(campaign_id("alice", 1), campaign_id("bob", 1));
        assert_eq!(campaign_id("../etc/x y", 7), "campaign____etc_x_y_7");
    }
}
