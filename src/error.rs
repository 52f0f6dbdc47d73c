//! Error taxonomy for reconciliation runs.
//!
//! Matching ambiguity is never an error: matchers return explicit outcome
//! values. These variants cover collaborator failures and per-entity problems
//! that end up in the run report.

use thiserror::Error;

use crate::types::EntityType;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Entity absent from the store; expected, triggers the creation path
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: EntityType, id: String },

    /// Strict-match name that failed nickname resolution
    #[error("ambiguous match for '{name}': only an explicit nickname mapping may resolve it")]
    AmbiguousMatch { name: String },

    #[error("provider {provider} unavailable{}: {message}", status_label(.status))]
    ProviderUnavailable {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// A cross-reference write moved an existing triple to a different internal id.
    /// `remaining` holds the `provider:provider_id` keys still mapped to `existing`.
    #[error(
        "cross-reference {provider}:{entity_type}:{provider_id} moved from {existing} to {attempted}{}",
        remaining_label(.remaining)
    )]
    MappingConflict {
        provider: String,
        provider_id: String,
        entity_type: EntityType,
        existing: String,
        attempted: String,
        remaining: Vec<String>,
    },

    /// Missing or unusable required field on an incoming record
    #[error("{entity_type} '{name}' rejected: {reason}")]
    ValidationGap {
        entity_type: EntityType,
        name: String,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

fn remaining_label(remaining: &[String]) -> String {
    if remaining.is_empty() {
        " (no other mappings left on the previous id)".to_string()
    } else {
        format!(" (still mapped there: {})", remaining.join(", "))
    }
}

impl ReconcileError {
    pub fn validation(entity_type: EntityType, name: &str, reason: &str) -> Self {
        ReconcileError::ValidationGap {
            entity_type,
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(entity_type: EntityType, id: &str) -> Self {
        ReconcileError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Whole-run failures: the provider cannot be reached or the store cannot be read.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::ProviderUnavailable { .. } | ReconcileError::Storage(_)
        )
    }

    /// Transient provider failures: network errors and 408/425/429/5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::ProviderUnavailable { status, .. } => match status {
                Some(code) => matches!(code, 408 | 425 | 429 | 500..=599),
                None => true,
            },
            _ => false,
        }
    }

    /// Stable label used in the run report
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::NotFound { .. } => "not_found",
            ReconcileError::AmbiguousMatch { .. } => "ambiguous_match",
            ReconcileError::ProviderUnavailable { .. } => "provider_unavailable",
            ReconcileError::MappingConflict { .. } => "mapping_conflict",
            ReconcileError::ValidationGap { .. } => "validation_gap",
            ReconcileError::Storage(_) => "storage",
            ReconcileError::Serde(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable(status: Option<u16>) -> ReconcileError {
        ReconcileError::ProviderUnavailable {
            provider: "api_sports".to_string(),
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(unavailable(None).is_retryable());
        assert!(unavailable(Some(429)).is_retryable());
        assert!(unavailable(Some(503)).is_retryable());
        assert!(unavailable(Some(408)).is_retryable());
        assert!(!unavailable(Some(404)).is_retryable());
        assert!(!unavailable(Some(401)).is_retryable());
    }

    #[test]
    fn test_only_collaborator_failures_are_fatal() {
        assert!(unavailable(Some(500)).is_fatal());
        assert!(ReconcileError::Storage("disk full".into()).is_fatal());
        assert!(!ReconcileError::validation(EntityType::Team, "Cardiff", "no country").is_fatal());
        assert!(!ReconcileError::AmbiguousMatch {
            name: "Cardiff".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_conflict_message_lists_remaining_mappings() {
        let conflict = ReconcileError::MappingConflict {
            provider: "rugbydb".to_string(),
            provider_id: "14".to_string(),
            entity_type: EntityType::Team,
            existing: "ENG-BATH".to_string(),
            attempted: "ENG-BATH-RUGBY".to_string(),
            remaining: vec!["api_sports:99".to_string()],
        };
        assert_eq!(
            conflict.to_string(),
            "cross-reference rugbydb:team:14 moved from ENG-BATH to ENG-BATH-RUGBY \
             (still mapped there: api_sports:99)"
        );
    }

    #[test]
    fn test_display_includes_status() {
        let msg = unavailable(Some(503)).to_string();
        assert!(msg.contains("HTTP 503"), "{}", msg);
        let msg = unavailable(None).to_string();
        assert!(!msg.contains("HTTP"), "{}", msg);
    }
}
