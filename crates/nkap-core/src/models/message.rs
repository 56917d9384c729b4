//! Private conversations between members.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom: String,
    pub prenom: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub contenu: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lu: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub participant: Participant,
    #[serde(default)]
    pub dernier_message: Option<LastMessage>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub non_lus: Option<u32>,
}

impl Conversation {
    pub fn unread(&self) -> u32 {
        self.non_lus.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    #[serde(deserialize_with = "de::number")]
    pub conversation_id: i64,
    #[serde(deserialize_with = "de::number")]
    pub expediteur_id: i64,
    pub contenu: String,
    #[serde(default)]
    pub lu: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Messages per page as served by the conversation endpoint.
pub const MESSAGES_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct NewConversation {
    #[serde(deserialize_with = "de::number")]
    pub conversation_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCount {
    #[serde(deserialize_with = "de::number")]
    pub count: u32,
}
