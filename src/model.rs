use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Image reference: a filesystem path or `file://` URI. Empty means no avatar.
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub subtext: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: String::new(),
            subtext: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    pub fn with_subtext(mut self, subtext: impl Into<String>) -> Self {
        self.subtext = Some(subtext.into());
        self
    }

    /// Subtext if it holds anything besides whitespace.
    pub fn subtext_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.subtext
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(fallback)
    }

    pub fn default_sender() -> Self {
        Self::new("Alex")
    }

    pub fn default_receiver() -> Self {
        Self::new("Jordan").with_subtext("Online")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tinder,
    WhatsApp,
    IMessage,
    Instagram,
    Messenger,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Tinder,
        Platform::WhatsApp,
        Platform::IMessage,
        Platform::Instagram,
        Platform::Messenger,
    ];

    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tinder" => Ok(Self::Tinder),
            "whatsapp" => Ok(Self::WhatsApp),
            "imessage" => Ok(Self::IMessage),
            "instagram" => Ok(Self::Instagram),
            "messenger" => Ok(Self::Messenger),
            _ => Err(anyhow!(CodedError::usage(
                "INVALID_PLATFORM",
                format!("invalid platform '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": ["tinder", "whatsapp", "imessage", "instagram", "messenger"]
            })))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Tinder => "tinder",
            Self::WhatsApp => "whatsapp",
            Self::IMessage => "imessage",
            Self::Instagram => "instagram",
            Self::Messenger => "messenger",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Tinder => "Tinder",
            Self::WhatsApp => "WhatsApp",
            Self::IMessage => "iMessage",
            Self::Instagram => "Instagram",
            Self::Messenger => "Messenger",
        }
    }
}

/// Delivery progression. The derived ordering is `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 3] = [
        MessageStatus::Sent,
        MessageStatus::Delivered,
        MessageStatus::Read,
    ];

    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            _ => Err(anyhow!(CodedError::usage(
                "INVALID_STATUS",
                format!("invalid message status '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": ["sent", "delivered", "read"]
            })))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Role,
    pub timestamp: String,
    /// Only sender-authored messages carry a status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    pub fn is_sender(&self) -> bool {
        self.sender == Role::Sender
    }
}

/// Everything the render engine reads for one pass.
#[derive(Debug, Clone, Copy)]
pub struct ConversationView<'a> {
    pub sender: &'a Profile,
    pub receiver: &'a Profile,
    pub platform: Platform,
    pub messages: &'a [Message],
    pub is_typing: bool,
}

#[cfg(test)]
mod tests {
    use super::{MessageStatus, Platform, Profile};
    use crate::error_codes::find_coded_error;

    #[test]
    fn status_progression_is_totally_ordered() {
        assert!(MessageStatus::Sent < MessageStatus::Delivered);
        assert!(MessageStatus::Delivered < MessageStatus::Read);
    }

    #[test]
    fn platform_keywords_are_case_insensitive() {
        assert_eq!(
            Platform::from_keyword(" WhatsApp ").expect("whatsapp should parse"),
            Platform::WhatsApp
        );
        assert_eq!(
            Platform::from_keyword("iMessage").expect("imessage should parse"),
            Platform::IMessage
        );
        for platform in Platform::ALL {
            assert_eq!(
                Platform::from_keyword(platform.keyword()).expect("keyword round trip"),
                platform
            );
        }
    }

    #[test]
    fn unknown_platform_is_a_coded_usage_error() {
        let error = Platform::from_keyword("myspace").expect_err("myspace is not supported");
        let coded = find_coded_error(&error).expect("error should carry a code");
        assert_eq!(coded.code, "INVALID_PLATFORM");
    }

    #[test]
    fn unknown_status_is_a_coded_usage_error() {
        let error = MessageStatus::from_keyword("seen").expect_err("seen is not a status");
        let coded = find_coded_error(&error).expect("error should carry a code");
        assert_eq!(coded.code, "INVALID_STATUS");
    }

    #[test]
    fn blank_subtext_falls_back() {
        let profile = Profile::new("Sam").with_subtext("   ");
        assert_eq!(profile.subtext_or("online"), "online");
        assert_eq!(
            Profile::default_receiver().subtext_or("online"),
            "Online"
        );
    }
}
