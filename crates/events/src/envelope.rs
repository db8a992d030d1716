use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockledger_core::Actor;

use crate::event::Event;

/// Envelope for a published event: delivery metadata around a typed payload.
///
/// The envelope is the unit handed to an [`EventBus`](crate::EventBus). It is
/// self-describing (`event_type`, `event_version`) so subscribers can decode
/// payloads without knowing the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,
    event_version: u32,
    subject: String,
    occurred_at: DateTime<Utc>,
    actor: Actor,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, assigning a fresh time-ordered event id.
    pub fn wrap(payload: E, actor: Actor) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            subject: payload.subject(),
            occurred_at: payload.occurred_at(),
            actor,
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn actor(&self) -> Actor {
        self.actor
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
