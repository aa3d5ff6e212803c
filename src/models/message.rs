// File: message.rs

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::project::UserIndex;

/// A direct message when `recipient` is set, a broadcast otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub sender: ObjectId,
    pub recipient: Option<ObjectId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: ObjectId, recipient: Option<ObjectId>, message: String) -> Self {
        Self {
            id: ObjectId::new(),
            sender,
            recipient,
            message,
            created_at: Utc::now(),
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient.is_none()
    }

    /// True when the message travels between `a` and `b` in either direction.
    pub fn is_between(&self, a: &ObjectId, b: &ObjectId) -> bool {
        match self.recipient {
            Some(recipient) => {
                (&self.sender == a && &recipient == b) || (&self.sender == b && &recipient == a)
            }
            None => false,
        }
    }
}

/// Flattened message shape consumed by the message panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub sender_id: Option<String>,
    pub sender_name: String,
    pub sender_role: String,
    pub recipient: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn build(message: &Message, users: &UserIndex) -> Self {
        let sender = users.get(&message.sender);
        Self {
            id: message.id.to_hex(),
            sender_id: sender.map(|u| u.id.to_hex()),
            sender_name: sender
                .map(|u| u.fullname.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            sender_role: sender
                .map(|u| u.role.as_str().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            recipient: message.recipient.map(|r| r.to_hex()),
            message: message.message.clone(),
            created_at: message.created_at,
        }
    }
}
