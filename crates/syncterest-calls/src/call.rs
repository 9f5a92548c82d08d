//! Call lifecycle on top of [`SignalingSession`].
//!
//! The manager owns at most one active session plus the local media it
//! acquired for it. Media capture itself sits behind [`MediaGateway`] so
//! the embedder decides what a "track" is.

use std::sync::Arc;

use tracing::{info, warn};

use syncterest_shared::protocol::{
    CallAnswerPayload, CallOfferPayload, HangupPayload, IceCandidatePayload,
};
use syncterest_shared::types::{ConversationId, UserId};

use crate::error::{CallError, Result};
use crate::signaling::{CallState, SignalingAction, SignalingSession};

/// Connection state as reported by the embedder's peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Acquired local capture. Dropped tracks stay live until stopped.
pub trait LocalMedia: Send {
    fn stop_tracks(&mut self);
    fn set_audio_enabled(&mut self, enabled: bool);
    fn set_video_enabled(&mut self, enabled: bool);
}

/// Source of local audio/video capture.
pub trait MediaGateway: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn LocalMedia>>;
}

pub struct CallManager {
    local_user: UserId,
    media: Arc<dyn MediaGateway>,
    session: Option<SignalingSession>,
    local_media: Option<Box<dyn LocalMedia>>,
    muted: bool,
    video_enabled: bool,
}

impl CallManager {
    pub fn new(local_user: UserId, media: Arc<dyn MediaGateway>) -> Self {
        Self {
            local_user,
            media,
            session: None,
            local_media: None,
            muted: false,
            video_enabled: true,
        }
    }

    pub fn state(&self) -> CallState {
        self.session
            .as_ref()
            .map(SignalingSession::state)
            .unwrap_or(CallState::Idle)
    }

    pub fn is_in_call(&self) -> bool {
        !matches!(self.state(), CallState::Idle | CallState::Ended)
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn remote_user(&self) -> Option<UserId> {
        self.session.as_ref().map(SignalingSession::remote_user)
    }

    /// Start an outbound call: acquire media, open a session, produce the
    /// offer to broadcast on the conversation topic.
    pub fn start_call(
        &mut self,
        remote_user: UserId,
        conversation_id: ConversationId,
        sdp: String,
    ) -> Result<CallOfferPayload> {
        if self.is_in_call() {
            return Err(CallError::AlreadyInCall);
        }
        let local_media = self.media.acquire()?;
        self.local_media = Some(local_media);
        self.muted = false;
        self.video_enabled = true;

        let mut session = SignalingSession::new(self.local_user, remote_user, conversation_id);
        let offer = session.create_offer(sdp)?;
        info!(remote = %remote_user.short(), "Starting call");
        self.session = Some(session);
        Ok(offer)
    }

    /// Handle an inbound offer addressed to us. Media is acquired up
    /// front so the answer can carry our tracks.
    pub fn receive_offer(&mut self, offer: &CallOfferPayload) -> Result<SignalingAction> {
        if offer.target != self.local_user {
            warn!(target = %offer.target.short(), "Ignoring offer for another user");
            return Err(CallError::UnexpectedSignal {
                state: self.state().name(),
                signal: "call-offer",
            });
        }
        if self.is_in_call() {
            return Err(CallError::AlreadyInCall);
        }
        let local_media = self.media.acquire()?;
        self.local_media = Some(local_media);
        self.muted = false;
        self.video_enabled = true;

        let mut session =
            SignalingSession::new(self.local_user, offer.sender, offer.conversation_id);
        let action = session.receive_offer(offer)?;
        self.session = Some(session);
        Ok(action)
    }

    pub fn create_answer(&mut self, sdp: String) -> Result<CallAnswerPayload> {
        self.session_mut()?.create_answer(sdp)
    }

    pub fn receive_answer(&mut self, answer: &CallAnswerPayload) -> Result<SignalingAction> {
        self.session_mut()?.receive_answer(answer)
    }

    pub fn create_ice_candidate(&mut self, candidate: String) -> Result<IceCandidatePayload> {
        Ok(self.session_mut()?.create_ice_candidate(candidate))
    }

    pub fn receive_ice_candidate(
        &mut self,
        payload: &IceCandidatePayload,
    ) -> Result<SignalingAction> {
        Ok(self.session_mut()?.receive_ice_candidate(payload))
    }

    /// React to the peer connection's own state changes. Connected marks
    /// the session connected; failure or disconnect tears the call down.
    pub fn on_connection_state_change(&mut self, state: PeerConnectionState) {
        match state {
            PeerConnectionState::Connected => {
                if let Some(session) = self.session.as_mut() {
                    info!("Call connected");
                    session.mark_connected();
                }
            }
            PeerConnectionState::Failed | PeerConnectionState::Disconnected => {
                if self.is_in_call() {
                    warn!(?state, "Peer connection lost, ending call");
                    self.teardown();
                }
            }
            _ => {}
        }
    }

    pub fn toggle_mute(&mut self) -> Result<bool> {
        let media = self
            .local_media
            .as_mut()
            .ok_or(CallError::NoActiveCall)?;
        self.muted = !self.muted;
        media.set_audio_enabled(!self.muted);
        Ok(self.muted)
    }

    pub fn toggle_video(&mut self) -> Result<bool> {
        let media = self
            .local_media
            .as_mut()
            .ok_or(CallError::NoActiveCall)?;
        self.video_enabled = !self.video_enabled;
        media.set_video_enabled(self.video_enabled);
        Ok(self.video_enabled)
    }

    /// Local hangup: stop tracks, end the session, return the payload to
    /// broadcast.
    pub fn hang_up(&mut self) -> Result<HangupPayload> {
        let payload = self.session_mut()?.hangup();
        self.teardown();
        Ok(payload)
    }

    /// Remote hangup: stop tracks and reset without broadcasting.
    pub fn receive_hangup(&mut self, payload: &HangupPayload) -> Result<SignalingAction> {
        let action = self.session_mut()?.receive_hangup(payload);
        self.teardown();
        Ok(action)
    }

    fn session_mut(&mut self) -> Result<&mut SignalingSession> {
        self.session.as_mut().ok_or(CallError::NoActiveCall)
    }

    fn teardown(&mut self) {
        if let Some(mut media) = self.local_media.take() {
            media.stop_tracks();
        }
        self.session = None;
        self.muted = false;
        self.video_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeGateway {
        acquired: AtomicUsize,
        stopped: Arc<AtomicBool>,
        fail: bool,
    }

    struct FakeMedia {
        stopped: Arc<AtomicBool>,
        audio: bool,
        video: bool,
    }

    impl LocalMedia for FakeMedia {
        fn stop_tracks(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn set_audio_enabled(&mut self, enabled: bool) {
            self.audio = enabled;
        }

        fn set_video_enabled(&mut self, enabled: bool) {
            self.video = enabled;
        }
    }

    impl MediaGateway for FakeGateway {
        fn acquire(&self) -> Result<Box<dyn LocalMedia>> {
            if self.fail {
                return Err(CallError::MediaUnavailable("no camera".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeMedia {
                stopped: self.stopped.clone(),
                audio: true,
                video: true,
            }))
        }
    }

    fn manager() -> (CallManager, Arc<FakeGateway>) {
        let gateway = Arc::new(FakeGateway::default());
        (CallManager::new(UserId::new(), gateway.clone()), gateway)
    }

    fn offer_for(target: UserId) -> CallOfferPayload {
        CallOfferPayload {
            sender: UserId::new(),
            target,
            conversation_id: ConversationId::new(),
            sdp: "v=0 offer".into(),
        }
    }

    #[test]
    fn start_call_acquires_media_and_dials() {
        let (mut manager, gateway) = manager();

        let offer = manager
            .start_call(UserId::new(), ConversationId::new(), "v=0".into())
            .unwrap();
        assert_eq!(manager.state(), CallState::Dialing);
        assert_eq!(gateway.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(offer.sdp, "v=0");

        assert!(matches!(
            manager.start_call(UserId::new(), ConversationId::new(), "v=0".into()),
            Err(CallError::AlreadyInCall)
        ));
    }

    #[test]
    fn media_failure_leaves_manager_idle() {
        let gateway = Arc::new(FakeGateway {
            fail: true,
            ..FakeGateway::default()
        });
        let mut manager = CallManager::new(UserId::new(), gateway);

        assert!(matches!(
            manager.start_call(UserId::new(), ConversationId::new(), "v=0".into()),
            Err(CallError::MediaUnavailable(_))
        ));
        assert_eq!(manager.state(), CallState::Idle);
        assert!(!manager.is_in_call());
    }

    #[test]
    fn offer_for_someone_else_is_ignored() {
        let (mut manager, gateway) = manager();

        let stray = offer_for(UserId::new());
        assert!(manager.receive_offer(&stray).is_err());
        assert_eq!(gateway.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(manager.state(), CallState::Idle);
    }

    #[test]
    fn inbound_offer_then_answer() {
        let local = UserId::new();
        let gateway = Arc::new(FakeGateway::default());
        let mut manager = CallManager::new(local, gateway);

        let offer = offer_for(local);
        let action = manager.receive_offer(&offer).unwrap();
        assert_eq!(action, SignalingAction::CreateAnswer);
        assert_eq!(manager.state(), CallState::ReceivingOffer);

        let answer = manager.create_answer("v=0 answer".into()).unwrap();
        assert_eq!(answer.sender, local);
        assert_eq!(answer.target, offer.sender);
    }

    #[test]
    fn connection_failure_tears_down_and_stops_tracks() {
        let (mut manager, gateway) = manager();
        manager
            .start_call(UserId::new(), ConversationId::new(), "v=0".into())
            .unwrap();

        manager.on_connection_state_change(PeerConnectionState::Connecting);
        assert!(manager.is_in_call());

        manager.on_connection_state_change(PeerConnectionState::Failed);
        assert!(!manager.is_in_call());
        assert!(gateway.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn hang_up_resets_state_for_next_call() {
        let (mut manager, gateway) = manager();
        manager
            .start_call(UserId::new(), ConversationId::new(), "v=0".into())
            .unwrap();
        manager.toggle_mute().unwrap();
        assert!(manager.is_muted());

        manager.hang_up().unwrap();
        assert!(gateway.stopped.load(Ordering::SeqCst));
        assert_eq!(manager.state(), CallState::Idle);
        assert!(!manager.is_muted());

        // A new call can start after teardown.
        assert!(manager
            .start_call(UserId::new(), ConversationId::new(), "v=0".into())
            .is_ok());
    }

    #[test]
    fn mute_without_call_is_an_error() {
        let (mut manager, _) = manager();
        assert!(matches!(manager.toggle_mute(), Err(CallError::NoActiveCall)));
    }
}
