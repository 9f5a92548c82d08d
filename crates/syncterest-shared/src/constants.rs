/// Minimum gap between two outbound typing broadcasts, per conversation.
pub const TYPING_THROTTLE_MS: i64 = 2000;

/// How long an inbound typing indicator stays alive without a refresh.
pub const TYPING_EXPIRY_MS: i64 = 3000;

/// Presence heartbeat interval.
pub const PRESENCE_HEARTBEAT_SECS: u64 = 30;

/// Hard timeout for a geolocation fix; no cached position is reused.
pub const GEOLOCATION_TIMEOUT_SECS: u64 = 10;

/// Minutes of inactivity before a user is shown as away.
pub const AWAY_AFTER_MIN: i64 = 5;

/// Minutes of inactivity before a user is shown as offline.
pub const OFFLINE_AFTER_MIN: i64 = 30;

/// Maximum attachment upload size in bytes (25 MiB).
pub const MAX_ATTACHMENT_SIZE: usize = 25 * 1024 * 1024;

/// Maximum message body length in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Maximum profile bio length in characters.
pub const MAX_BIO_CHARS: usize = 500;

/// Object storage bucket names.
pub const BUCKET_CHANNEL_ATTACHMENTS: &str = "channel_attachments";
pub const BUCKET_CHAT_ATTACHMENTS: &str = "chat_attachments";
pub const BUCKET_STORIES: &str = "stories";
pub const BUCKET_EVENT_IMAGES: &str = "event-images";
