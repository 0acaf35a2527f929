//! The at-rest report envelope.
//!
//! An envelope is immutable once stored. A new session produces a new
//! envelope and a new content identifier, never an update in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use habitstake_core::{AccountId, BookingHandle};

use crate::crypto::CipherText;
use crate::error::{EnvelopeError, Result};

/// The only envelope kind this build produces or accepts.
pub const ENVELOPE_KIND: &str = "therapy_session";

/// Current envelope schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// An encrypted report plus the metadata needed to route and verify it.
///
/// Serialized with camelCase keys:
///
/// ```json
/// {
///   "cipherText": "...",
///   "patientId": "0x...",
///   "providerId": "0x...",
///   "sessionHandle": 3,
///   "createdAt": "2024-05-01T12:00:00Z",
///   "kind": "therapy_session",
///   "schemaVersion": "1.0"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvelope {
    pub cipher_text: CipherText,
    /// Set once at encryption time; retrieval is refused unless it matches.
    pub patient_id: AccountId,
    pub provider_id: AccountId,
    pub session_handle: BookingHandle,
    pub created_at: DateTime<Utc>,
    pub kind: String,
    pub schema_version: String,
}

impl ReportEnvelope {
    /// The non-sensitive part of the envelope.
    pub fn metadata(&self) -> ReportMetadata {
        ReportMetadata {
            patient_id: self.patient_id.clone(),
            provider_id: self.provider_id.clone(),
            session_handle: self.session_handle,
            created_at: self.created_at,
        }
    }

    /// Serialize for a content store.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))
    }
}

/// Envelope fields that may be shown or logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub patient_id: AccountId,
    pub provider_id: AccountId,
    pub session_handle: BookingHandle,
    pub created_at: DateTime<Utc>,
}

/// Wrap a ciphertext in a new envelope stamped with the current time.
pub fn build_envelope(
    cipher_text: CipherText,
    patient_id: AccountId,
    provider_id: AccountId,
    session_handle: BookingHandle,
) -> ReportEnvelope {
    build_envelope_at(cipher_text, patient_id, provider_id, session_handle, Utc::now())
}

/// [`build_envelope`] with an explicit creation time.
pub fn build_envelope_at(
    cipher_text: CipherText,
    patient_id: AccountId,
    provider_id: AccountId,
    session_handle: BookingHandle,
    created_at: DateTime<Utc>,
) -> ReportEnvelope {
    ReportEnvelope {
        cipher_text,
        patient_id,
        provider_id,
        session_handle,
        created_at,
        kind: ENVELOPE_KIND.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

/// Parse and check a stored object.
///
/// Fails with [`EnvelopeError::MalformedEnvelope`] when a required field is
/// missing or empty, or when the kind or schema version is not one this
/// build understands.
pub fn parse_envelope(blob: &serde_json::Value) -> Result<ReportEnvelope> {
    let envelope = ReportEnvelope::deserialize(blob)
        .map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;
    check(envelope)
}

/// [`parse_envelope`] over raw JSON bytes.
pub fn parse_envelope_bytes(bytes: &[u8]) -> Result<ReportEnvelope> {
    let envelope: ReportEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;
    check(envelope)
}

fn check(envelope: ReportEnvelope) -> Result<ReportEnvelope> {
    if envelope.kind != ENVELOPE_KIND {
        return Err(EnvelopeError::MalformedEnvelope(format!(
            "unexpected kind {:?}",
            envelope.kind
        )));
    }
    if envelope.schema_version != SCHEMA_VERSION {
        return Err(EnvelopeError::MalformedEnvelope(format!(
            "unsupported schema version {:?}",
            envelope.schema_version
        )));
    }
    if envelope.cipher_text.is_empty() {
        return Err(EnvelopeError::MalformedEnvelope("empty cipherText".into()));
    }
    if envelope.patient_id.as_str().is_empty() {
        return Err(EnvelopeError::MalformedEnvelope("empty patientId".into()));
    }
    Ok(envelope)
}
