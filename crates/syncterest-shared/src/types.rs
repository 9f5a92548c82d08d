use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{AWAY_AFTER_MIN, OFFLINE_AFTER_MIN};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// First eight hex chars, for log lines.
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identity issued by the backend auth service.
    UserId
);
uuid_id!(
    /// A direct or group conversation.
    ConversationId
);
uuid_id!(
    /// A public channel.
    ChannelId
);
uuid_id!(MessageId);
uuid_id!(EventId);
uuid_id!(GroupId);
uuid_id!(NotificationId);

/// The kind of content a feed item carries.
///
/// The backing rows are tagged; matching on this enum is the single place
/// where per-kind behaviour branches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    Post { body: String },
    Event { event_id: EventId, title: String },
    Reel { video_url: String, caption: Option<String> },
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Post { .. } => "post",
            ContentKind::Event { .. } => "event",
            ContentKind::Reel { .. } => "reel",
        }
    }

    /// One-line summary used by list renderers.
    pub fn describe(&self) -> String {
        match self {
            ContentKind::Post { body } => body.chars().take(80).collect(),
            ContentKind::Event { title, .. } => format!("Event: {title}"),
            ContentKind::Reel { caption, .. } => {
                caption.clone().unwrap_or_else(|| "Reel".to_string())
            }
        }
    }
}

/// Coarse liveness classification derived from a last-active timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Online,
    Away,
    Offline,
}

impl Availability {
    /// Classify against the fixed minute thresholds.
    pub fn from_last_active(last_active: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let idle = now.signed_duration_since(last_active);
        if idle < Duration::minutes(AWAY_AFTER_MIN) {
            Availability::Online
        } else if idle < Duration::minutes(OFFLINE_AFTER_MIN) {
            Availability::Away
        } else {
            Availability::Offline
        }
    }
}

/// A geographic position handed to the nearby-user search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}
