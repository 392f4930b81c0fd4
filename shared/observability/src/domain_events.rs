//! Domain event logging for the Tally users service.
//!
//! Events are structured `tracing` records under the `domain_event` target.
//! They never carry secrets or raw tokens; see [`crate::token_debug`] for a
//! safe way to reference a token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a domain operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Success,
    Failure,
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Categories of domain events for filtering and routing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Auth,
    Session,
    Profile,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Session => write!(f, "session"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// A structured domain event for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    /// Specific event type (e.g. "user_registered", "refresh_rotated")
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub result: OperationResult,
    /// Error slug if failed
    pub error: Option<String>,
    pub user_id: Option<Uuid>,
    /// Service that emitted the event
    pub service: String,
    pub metadata: Option<serde_json::Value>,
}

impl DomainEvent {
    /// Create a new domain event builder
    pub fn new(service: impl Into<String>, category: EventCategory, event_type: impl Into<String>) -> DomainEventBuilder {
        DomainEventBuilder {
            service: service.into(),
            category,
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            result: OperationResult::Success,
            error: None,
            user_id: None,
            metadata: None,
        }
    }
}

/// Builder for constructing domain events
pub struct DomainEventBuilder {
    service: String,
    category: EventCategory,
    event_type: String,
    entity_type: Option<String>,
    entity_id: Option<String>,
    result: OperationResult,
    error: Option<String>,
    user_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
}

impl DomainEventBuilder {
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn success(mut self) -> Self {
        self.result = OperationResult::Success;
        self
    }

    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.result = OperationResult::Failure;
        self.error = Some(error.into());
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build and emit the event as a log
    pub fn emit(self) {
        let event = self.build();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

        match event.result {
            OperationResult::Success => tracing::info!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "success",
                "DomainEvent: {}", json
            ),
            OperationResult::Failure => tracing::warn!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "failure",
                error = ?event.error,
                "DomainEvent: {}", json
            ),
        }
    }

    /// Build the event without emitting
    pub fn build(self) -> DomainEvent {
        DomainEvent {
            timestamp: Utc::now(),
            category: self.category,
            event_type: self.event_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            result: self.result,
            error: self.error,
            user_id: self.user_id,
            service: self.service,
            metadata: self.metadata,
        }
    }
}

// ============================================================================
// Auth and session events
// ============================================================================

fn user_event(service: &str, category: EventCategory, event_type: &str, user_id: Uuid) -> DomainEventBuilder {
    DomainEvent::new(service, category, event_type)
        .entity("user", user_id.to_string())
        .user(user_id)
}

/// A password account was created
pub fn log_user_registered(service: &str, user_id: Uuid) {
    user_event(service, EventCategory::Auth, "user_registered", user_id)
        .success()
        .emit();
}

/// A token pair was issued and its refresh row persisted
pub fn log_session_issued(service: &str, user_id: Uuid, sessions_before: usize) {
    user_event(service, EventCategory::Session, "session_issued", user_id)
        .metadata(serde_json::json!({ "sessions_before": sessions_before }))
        .success()
        .emit();
}

/// Every session of a user was dropped because the cap was exceeded
pub fn log_sessions_revoked(service: &str, user_id: Uuid, revoked: usize, max_sessions: usize) {
    user_event(service, EventCategory::Session, "sessions_revoked", user_id)
        .metadata(serde_json::json!({ "revoked": revoked, "max_sessions": max_sessions }))
        .success()
        .emit();
}

/// A refresh token was consumed; `token_fingerprint` comes from
/// [`crate::token_debug::fingerprint`]
pub fn log_refresh_rotated(service: &str, user_id: Uuid, token_fingerprint: &str) {
    user_event(service, EventCategory::Session, "refresh_rotated", user_id)
        .metadata(serde_json::json!({ "consumed": token_fingerprint }))
        .success()
        .emit();
}

/// A Google identity was reconciled to a local account
pub fn log_federated_sign_in(service: &str, user_id: Uuid, account_created: bool) {
    user_event(service, EventCategory::Auth, "federated_sign_in", user_id)
        .metadata(serde_json::json!({ "provider": "google", "account_created": account_created }))
        .success()
        .emit();
}

pub fn log_settings_updated(service: &str, user_id: Uuid) {
    user_event(service, EventCategory::Profile, "settings_updated", user_id)
        .success()
        .emit();
}

/// Log a rejected auth operation. Only the slug is recorded so the event does
/// not reveal which check failed.
pub fn log_auth_failure(service: &str, event_type: &str, slug: &str, user_id: Option<Uuid>) {
    let mut builder = DomainEvent::new(service, EventCategory::Auth, event_type);

    if let Some(uid) = user_id {
        builder = builder.entity("user", uid.to_string()).user(uid);
    }

    builder.failure(slug).emit();
}
