//! One signaling session per peer call.
//!
//! State only moves to [`CallState::Connected`] when the underlying peer
//! connection reports it, never on SDP exchange alone. Answers require
//! the received offer to have been applied as the remote description
//! first.

use tracing::debug;

use syncterest_shared::protocol::{
    CallAnswerPayload, CallOfferPayload, HangupPayload, IceCandidatePayload,
};
use syncterest_shared::types::{ConversationId, UserId};

use crate::error::{CallError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    /// Offer sent, waiting for an answer.
    Dialing,
    /// Inbound offer observed, waiting for the local side to answer.
    ReceivingOffer,
    Connected,
    Ended,
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Dialing => "dialing",
            CallState::ReceivingOffer => "receiving-offer",
            CallState::Connected => "connected",
            CallState::Ended => "ended",
        }
    }
}

/// What the embedder must do with its peer connection after a signal.
#[derive(Debug, PartialEq, Eq)]
pub enum SignalingAction {
    /// Apply the stored remote offer, then create and send an answer.
    CreateAnswer,
    /// Apply the received answer as the remote description.
    SetRemoteDescription,
    /// Feed the candidate to the peer connection.
    AddIceCandidate(String),
    /// Tear the call down.
    Close,
}

pub struct SignalingSession {
    local_user: UserId,
    remote_user: UserId,
    conversation_id: ConversationId,
    state: CallState,
    local_sdp: Option<String>,
    remote_sdp: Option<String>,
    ice_candidates: Vec<String>,
}

impl SignalingSession {
    pub fn new(local_user: UserId, remote_user: UserId, conversation_id: ConversationId) -> Self {
        Self {
            local_user,
            remote_user,
            conversation_id,
            state: CallState::Idle,
            local_sdp: None,
            remote_sdp: None,
            ice_candidates: Vec::new(),
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn remote_user(&self) -> UserId {
        self.remote_user
    }

    pub fn remote_sdp(&self) -> Option<&str> {
        self.remote_sdp.as_deref()
    }

    /// Build the outbound offer. Sender is always the real local user.
    pub fn create_offer(&mut self, sdp: String) -> Result<CallOfferPayload> {
        if self.state != CallState::Idle {
            return Err(CallError::UnexpectedSignal {
                state: self.state.name(),
                signal: "create-offer",
            });
        }
        self.local_sdp = Some(sdp.clone());
        self.state = CallState::Dialing;
        debug!(remote = %self.remote_user.short(), "Creating SDP offer");

        Ok(CallOfferPayload {
            sender: self.local_user,
            target: self.remote_user,
            conversation_id: self.conversation_id,
            sdp,
        })
    }

    /// Record an inbound offer. The SDP is stored as the remote
    /// description so a later answer has something to answer.
    pub fn receive_offer(&mut self, offer: &CallOfferPayload) -> Result<SignalingAction> {
        if self.state != CallState::Idle {
            return Err(CallError::UnexpectedSignal {
                state: self.state.name(),
                signal: "call-offer",
            });
        }
        self.remote_sdp = Some(offer.sdp.clone());
        self.state = CallState::ReceivingOffer;
        debug!(from = %offer.sender.short(), "Received SDP offer");
        Ok(SignalingAction::CreateAnswer)
    }

    /// Build the outbound answer. Fails unless a received offer has been
    /// applied first.
    pub fn create_answer(&mut self, sdp: String) -> Result<CallAnswerPayload> {
        if self.state != CallState::ReceivingOffer || self.remote_sdp.is_none() {
            return Err(CallError::NoPendingOffer);
        }
        self.local_sdp = Some(sdp.clone());
        debug!(remote = %self.remote_user.short(), "Creating SDP answer");

        Ok(CallAnswerPayload {
            sender: self.local_user,
            target: self.remote_user,
            conversation_id: self.conversation_id,
            sdp,
        })
    }

    /// Record an inbound answer to our offer. The state stays `Dialing`
    /// until the peer connection itself reports connected.
    pub fn receive_answer(&mut self, answer: &CallAnswerPayload) -> Result<SignalingAction> {
        if self.state != CallState::Dialing {
            return Err(CallError::UnexpectedSignal {
                state: self.state.name(),
                signal: "call-answer",
            });
        }
        self.remote_sdp = Some(answer.sdp.clone());
        debug!(from = %answer.sender.short(), "Received SDP answer");
        Ok(SignalingAction::SetRemoteDescription)
    }

    pub fn create_ice_candidate(&mut self, candidate: String) -> IceCandidatePayload {
        self.ice_candidates.push(candidate.clone());
        IceCandidatePayload {
            sender: self.local_user,
            target: self.remote_user,
            conversation_id: self.conversation_id,
            candidate,
        }
    }

    pub fn receive_ice_candidate(&mut self, payload: &IceCandidatePayload) -> SignalingAction {
        debug!(from = %payload.sender.short(), "Received ICE candidate");
        SignalingAction::AddIceCandidate(payload.candidate.clone())
    }

    /// Mark the session connected. Driven by the peer connection's own
    /// connection-state-change, not by signaling.
    pub fn mark_connected(&mut self) {
        self.state = CallState::Connected;
    }

    pub fn receive_hangup(&mut self, payload: &HangupPayload) -> SignalingAction {
        debug!(from = %payload.sender.short(), "Received hangup");
        self.state = CallState::Ended;
        SignalingAction::Close
    }

    pub fn hangup(&mut self) -> HangupPayload {
        self.state = CallState::Ended;
        HangupPayload {
            sender: self.local_user,
            conversation_id: self.conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SignalingSession {
        SignalingSession::new(UserId::new(), UserId::new(), ConversationId::new())
    }

    fn offer_from(sender: UserId, target: UserId) -> CallOfferPayload {
        CallOfferPayload {
            sender,
            target,
            conversation_id: ConversationId::new(),
            sdp: "v=0 offer".into(),
        }
    }

    #[test]
    fn caller_flow_reaches_connected_via_connection_state() {
        let mut session = session();

        let offer = session.create_offer("v=0 offer".into()).unwrap();
        assert_eq!(session.state(), CallState::Dialing);
        // The payload carries the real local identity.
        assert_ne!(offer.sender, offer.target);

        let answer = CallAnswerPayload {
            sender: session.remote_user(),
            target: offer.sender,
            conversation_id: offer.conversation_id,
            sdp: "v=0 answer".into(),
        };
        let action = session.receive_answer(&answer).unwrap();
        assert_eq!(action, SignalingAction::SetRemoteDescription);
        // Receiving an answer alone does not connect the call.
        assert_eq!(session.state(), CallState::Dialing);

        session.mark_connected();
        assert_eq!(session.state(), CallState::Connected);
    }

    #[test]
    fn answer_without_offer_is_rejected() {
        let mut session = session();
        assert!(matches!(
            session.create_answer("v=0 answer".into()),
            Err(CallError::NoPendingOffer)
        ));
    }

    #[test]
    fn callee_flow_applies_offer_before_answering() {
        let mut session = session();
        let remote = session.remote_user();

        let offer = offer_from(remote, UserId::new());
        let action = session.receive_offer(&offer).unwrap();
        assert_eq!(action, SignalingAction::CreateAnswer);
        assert_eq!(session.state(), CallState::ReceivingOffer);
        assert_eq!(session.remote_sdp(), Some("v=0 offer"));

        let answer = session.create_answer("v=0 answer".into()).unwrap();
        assert_eq!(answer.target, remote);
    }

    #[test]
    fn hangup_ends_the_session() {
        let local = UserId::new();
        let mut session = SignalingSession::new(local, UserId::new(), ConversationId::new());
        session.create_offer("v=0 offer".into()).unwrap();

        let payload = session.hangup();
        assert_eq!(session.state(), CallState::Ended);
        assert_eq!(payload.sender, local);
    }

    #[test]
    fn second_offer_in_flight_is_rejected() {
        let mut session = session();
        session.create_offer("v=0 offer".into()).unwrap();
        assert!(session.create_offer("v=0 again".into()).is_err());
    }
}
