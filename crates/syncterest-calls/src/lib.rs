//! Call-signaling state machine.
//!
//! Covers offer/answer/ICE exchange and call lifecycle only; media
//! capture and transport are the embedder's concern, reached through the
//! [`MediaGateway`] trait.

pub mod call;
pub mod signaling;

mod error;

pub use call::{CallManager, LocalMedia, MediaGateway, PeerConnectionState};
pub use error::CallError;
pub use signaling::{CallState, SignalingAction, SignalingSession};
