//! Community events: creation, listing, attendance, image upload.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use syncterest_shared::constants::BUCKET_EVENT_IMAGES;
use syncterest_shared::types::{EventId, UserId};
use syncterest_shared::validation::EventForm;
use syncterest_store::EventRecord;

use crate::api::rest::{eq, tables};
use crate::error::{ClientError, Result};
use crate::services::ServiceContext;
use crate::state::Session;

#[derive(Debug, Serialize)]
struct NewEventRow<'a> {
    id: EventId,
    title: &'a str,
    description: Option<&'a str>,
    starts_at: chrono::DateTime<chrono::Utc>,
    location_name: Option<&'a str>,
    image_url: Option<&'a str>,
    created_by: UserId,
}

#[derive(Debug, Serialize)]
struct AttendeeRow {
    event_id: EventId,
    user_id: UserId,
}

pub struct EventsService {
    ctx: ServiceContext,
}

impl EventsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an event from a validated form, uploading its image first
    /// when one is attached.
    pub async fn create(
        &self,
        session: &Session,
        form: &EventForm,
        image: Option<(Vec<u8>, String)>,
    ) -> Result<EventRecord> {
        form.validate(self.ctx.time.now())
            .map_err(ClientError::Validation)?;

        let image_url = match (form.image_path.as_deref(), image) {
            (Some(_), Some((bytes, content_type))) => {
                let path = format!("{}/{}", session.user.id, Uuid::new_v4());
                let result = self
                    .ctx
                    .api
                    .upload(BUCKET_EVENT_IMAGES, &path, bytes, &content_type)
                    .await;
                Some(self.ctx.surface(result)?)
            }
            _ => None,
        };

        let row = NewEventRow {
            id: EventId::new(),
            title: form.title.trim(),
            description: form.description.as_deref(),
            starts_at: form.starts_at,
            location_name: form.location_name.as_deref(),
            image_url: image_url.as_deref(),
            created_by: session.user.id,
        };
        let result = self
            .ctx
            .api
            .insert::<_, EventRecord>(tables::EVENTS, &row)
            .await;
        let stored = self.ctx.surface(result)?;

        self.ctx.db.lock()?.upsert_event(&stored)?;
        info!(event = %stored.id.short(), "Event created");
        Ok(stored)
    }

    pub async fn get(&self, id: EventId) -> Result<EventRecord> {
        match self
            .ctx
            .api
            .select_one::<EventRecord>(tables::EVENTS, &[("id", eq(id))])
            .await
        {
            Ok(Some(event)) => {
                self.ctx.db.lock()?.upsert_event(&event)?;
                Ok(event)
            }
            Ok(None) => Err(ClientError::Api {
                status: 404,
                code: None,
                message: "Event not found".into(),
            }),
            Err(e) => {
                let cached = self.ctx.db.lock()?.get_event(id);
                cached.map_err(|_| e)
            }
        }
    }

    pub async fn upcoming(&self) -> Result<Vec<EventRecord>> {
        let now = self.ctx.time.now();
        let result = self
            .ctx
            .api
            .select::<EventRecord>(
                tables::EVENTS,
                &[
                    ("starts_at", format!("gte.{}", now.to_rfc3339())),
                    ("order", "starts_at.asc".to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await;
        let events = self.ctx.surface(result)?;

        let db = self.ctx.db.lock()?;
        for event in &events {
            db.upsert_event(event)?;
        }
        Ok(events)
    }

    /// Attend an event; already attending counts as success.
    pub async fn attend(&self, session: &Session, event_id: EventId) -> Result<()> {
        let row = AttendeeRow {
            event_id,
            user_id: session.user.id,
        };
        match self.ctx.api.insert_only(tables::EVENT_ATTENDEES, &row).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unique_violation() => {
                info!(event = %event_id.short(), "Already attending");
                Ok(())
            }
            Err(e) => self.ctx.surface(Err(e)),
        }
    }

    pub async fn unattend(&self, session: &Session, event_id: EventId) -> Result<()> {
        let result = self
            .ctx
            .api
            .delete(
                tables::EVENT_ATTENDEES,
                &[
                    ("event_id", eq(event_id)),
                    ("user_id", eq(session.user.id)),
                ],
            )
            .await;
        self.ctx.surface(result)
    }

    /// Delete an event we created.
    pub async fn delete(&self, event_id: EventId) -> Result<()> {
        let result = self
            .ctx
            .api
            .delete(tables::EVENTS, &[("id", eq(event_id))])
            .await;
        self.ctx.surface(result)?;

        self.ctx.db.lock()?.delete_event(event_id)?;
        Ok(())
    }
}
