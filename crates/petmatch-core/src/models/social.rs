use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pet;

/// A swipe right. `matched` is present when the like was mutual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Like {
    pub id: i64,
    pub from_pet: i64,
    pub to_pet: i64,
    #[serde(default)]
    pub from_pet_name: String,
    #[serde(default)]
    pub to_pet_name: String,
    #[serde(default)]
    pub is_match: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<Match>,
}

/// A swipe left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Pass {
    pub id: i64,
    pub from_pet: i64,
    pub to_pet: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LastMessage {
    pub content: String,
    pub sender_pet_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Two pets that liked each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Match {
    pub id: i64,
    pub pet1: i64,
    pub pet2: i64,
    pub pet1_details: Pet,
    pub pet2_details: Pet,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// The side of the match owned by the viewer
    pub fn own_pet(&self, own_pet_ids: &[i64]) -> Option<&Pet> {
        if own_pet_ids.contains(&self.pet1) {
            Some(&self.pet1_details)
        } else if own_pet_ids.contains(&self.pet2) {
            Some(&self.pet2_details)
        } else {
            None
        }
    }

    /// The other side of the match
    pub fn partner(&self, own_pet_ids: &[i64]) -> Option<&Pet> {
        if own_pet_ids.contains(&self.pet1) {
            Some(&self.pet2_details)
        } else if own_pet_ids.contains(&self.pet2) {
            Some(&self.pet1_details)
        } else {
            None
        }
    }

    /// True when the latest message came from the partner and is unread
    pub fn has_unread(&self, own_pet_ids: &[i64]) -> bool {
        self.last_message
            .as_ref()
            .map(|m| !m.is_read && !own_pet_ids.contains(&m.sender_pet_id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Message {
    pub id: i64,
    #[serde(rename = "match")]
    pub match_id: i64,
    pub sender_pet: i64,
    #[serde(default)]
    pub sender_pet_name: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
