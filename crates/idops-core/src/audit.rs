//! Audit sink contract
//!
//! Every mutation emits one structured [`AuditEvent`]. The transport (syslog,
//! SIEM export, database) is the host program's concern; the libraries only
//! see the [`AuditSink`] trait. [`TracingAuditSink`] is the default and turns
//! events into structured tracing records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The operation completed.
    Success,
    /// The operation was refused or failed.
    Failure,
}

/// One structured audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Operation name, e.g. `create_user` or `table_sync`.
    pub action: String,
    /// The object acted on (DN, sAMAccountName, table name).
    pub target: String,
    /// Principal the session is bound as.
    pub actor: String,
    /// Outcome of the operation.
    pub outcome: AuditOutcome,
    /// Free-form detail (counters, error text).
    pub detail: Option<String>,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Build a success event.
    pub fn success(
        action: impl Into<String>,
        target: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            actor: actor.into(),
            outcome: AuditOutcome::Success,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a failure event.
    pub fn failure(
        action: impl Into<String>,
        target: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            actor: actor.into(),
            outcome: AuditOutcome::Failure,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach free-form detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Record one event. Implementations must not fail the calling operation.
    fn record(&self, event: AuditEvent);
}

/// Default sink: emits each event as a structured tracing record.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            action = %event.action,
            target = %event.target,
            actor = %event.actor,
            outcome = ?event.outcome,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let event = AuditEvent::success("create_user", "cn=jdoe,dc=mst,dc=edu", "svc-adm")
            .with_detail("uac=0x10200");
        assert_eq!(event.outcome, AuditOutcome::Success);
        assert_eq!(event.detail.as_deref(), Some("uac=0x10200"));
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::failure("delete_user", "jdoe", "svc-adm");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"failure\""));
        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.action, "delete_user");
    }

    #[test]
    fn test_tracing_sink_accepts_events() {
        let sink = TracingAuditSink;
        sink.record(AuditEvent::success("enable", "jdoe", "svc-adm"));
    }
}
