//! Call signaling glue: drives the call state machine and carries its
//! payloads over conversation-topic broadcasts.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use syncterest_calls::{CallManager, MediaGateway, PeerConnectionState, SignalingAction};
use syncterest_realtime::SocketCommand;
use syncterest_shared::protocol::{
    CallAnswerPayload, CallOfferPayload, HangupPayload, IceCandidatePayload, EVENT_CALL_ANSWER,
    EVENT_CALL_OFFER, EVENT_HANG_UP, EVENT_ICE_CANDIDATE,
};
use syncterest_shared::topics;
use syncterest_shared::types::{ConversationId, UserId};

use crate::error::Result;
use crate::events::ClientEvent;
use crate::services::ServiceContext;
use crate::state::Session;

pub struct CallsService {
    ctx: ServiceContext,
    manager: Mutex<CallManager>,
}

impl CallsService {
    pub fn new(ctx: ServiceContext, session: &Session, media: Arc<dyn MediaGateway>) -> Self {
        let manager = Mutex::new(CallManager::new(session.user.id, media));
        Self { ctx, manager }
    }

    /// Dial a peer: acquire media, create the offer and broadcast it on
    /// the conversation topic.
    pub async fn start_call(
        &self,
        remote_user: UserId,
        conversation_id: ConversationId,
        sdp: String,
    ) -> Result<()> {
        let offer = {
            let mut manager = self.manager.lock()?;
            let result = manager
                .start_call(remote_user, conversation_id, sdp)
                .map_err(Into::into);
            self.ctx.surface(result)?
        };

        self.broadcast(conversation_id, EVENT_CALL_OFFER, &offer)
            .await?;
        self.emit_state();
        Ok(())
    }

    /// Answer the pending inbound offer.
    pub async fn answer(&self, conversation_id: ConversationId, sdp: String) -> Result<()> {
        let answer = {
            let mut manager = self.manager.lock()?;
            let result = manager.create_answer(sdp).map_err(Into::into);
            self.ctx.surface(result)?
        };

        self.broadcast(conversation_id, EVENT_CALL_ANSWER, &answer)
            .await?;
        self.emit_state();
        Ok(())
    }

    pub async fn send_ice_candidate(
        &self,
        conversation_id: ConversationId,
        candidate: String,
    ) -> Result<()> {
        let payload = {
            let mut manager = self.manager.lock()?;
            manager.create_ice_candidate(candidate)?
        };
        self.broadcast(conversation_id, EVENT_ICE_CANDIDATE, &payload)
            .await
    }

    pub async fn hang_up(&self, conversation_id: ConversationId) -> Result<()> {
        let payload = {
            let mut manager = self.manager.lock()?;
            manager.hang_up()?
        };
        self.broadcast(conversation_id, EVENT_HANG_UP, &payload)
            .await?;
        self.emit_state();
        Ok(())
    }

    pub fn toggle_mute(&self) -> Result<bool> {
        let muted = self.manager.lock()?.toggle_mute()?;
        self.emit_state();
        Ok(muted)
    }

    pub fn toggle_video(&self) -> Result<bool> {
        let enabled = self.manager.lock()?.toggle_video()?;
        self.emit_state();
        Ok(enabled)
    }

    /// Feed the peer connection's state changes through to the manager.
    pub fn on_connection_state_change(&self, state: PeerConnectionState) -> Result<()> {
        self.manager.lock()?.on_connection_state_change(state);
        self.emit_state();
        Ok(())
    }

    /// Dispatch an inbound call-signaling broadcast. Returns the action
    /// the embedder must apply to its peer connection, if any.
    pub fn handle_broadcast(&self, event: &str, payload: &Value) -> Result<Option<SignalingAction>> {
        let mut manager = self.manager.lock()?;

        let action = match event {
            EVENT_CALL_OFFER => {
                let offer: CallOfferPayload = serde_json::from_value(payload.clone())?;
                match manager.receive_offer(&offer) {
                    Ok(action) => Some(action),
                    Err(e) => {
                        debug!(error = %e, "Offer not applicable");
                        None
                    }
                }
            }
            EVENT_CALL_ANSWER => {
                let answer: CallAnswerPayload = serde_json::from_value(payload.clone())?;
                Some(manager.receive_answer(&answer)?)
            }
            EVENT_ICE_CANDIDATE => {
                let candidate: IceCandidatePayload = serde_json::from_value(payload.clone())?;
                Some(manager.receive_ice_candidate(&candidate)?)
            }
            EVENT_HANG_UP => {
                let hangup: HangupPayload = serde_json::from_value(payload.clone())?;
                Some(manager.receive_hangup(&hangup)?)
            }
            other => {
                warn!(event = other, "Unknown call event");
                None
            }
        };

        drop(manager);
        self.emit_state();
        Ok(action)
    }

    async fn broadcast<P: serde::Serialize>(
        &self,
        conversation_id: ConversationId,
        event: &str,
        payload: &P,
    ) -> Result<()> {
        self.ctx
            .cmd_tx
            .send(SocketCommand::Broadcast {
                topic: topics::chat(conversation_id),
                event: event.to_string(),
                payload: serde_json::to_value(payload)?,
            })
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;
        Ok(())
    }

    fn emit_state(&self) {
        if let Ok(manager) = self.manager.lock() {
            self.ctx.bus.emit(ClientEvent::CallStateChanged {
                in_call: manager.is_in_call(),
                is_muted: manager.is_muted(),
                is_video_enabled: manager.is_video_enabled(),
            });
        }
    }
}
