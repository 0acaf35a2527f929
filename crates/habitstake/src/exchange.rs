//! # Report Exchange
//!
//! Upload and retrieval of encrypted therapy reports.
//!
//! ## Upload
//!
//! ```text
//! refresh mirror -> eligibility gate -> encrypt -> envelope -> store.put -> submit pointer -> refresh
//! ```
//!
//! The store write and the pointer submission are two external systems with
//! no shared transaction. Once the store has returned a content identifier,
//! the envelope is kept as a pending upload for the booking until the
//! pointer is confirmed. A retried upload reuses it and only repeats the
//! submission, so one booking never gets two divergent envelopes.
//!
//! ## Retrieval
//!
//! The envelope's patient identifier is compared against the caller's
//! before any decryption is attempted. A mismatch is `Unauthorized`; a
//! decryption failure after a match is reported as `Decryption` and logged
//! as an integrity alarm.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use habitstake_core::{AccountId, BookingHandle, BookingStatus, ContentId, TxReceipt};
use habitstake_envelope::{
    build_envelope, decrypt, encrypt, parse_envelope, ReportEnvelope, ReportMetadata,
    ENVELOPE_KIND,
};
use habitstake_ledger::LedgerClient;
use habitstake_store::{gateway_reference, ContentStore, PutMetadata};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ExchangeConfig;
use crate::error::{Error, Result};
use crate::mirror::LedgerMirror;

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub content_id: ContentId,
    /// Human-followable link through the configured gateway.
    pub retrieval_reference: String,
    /// `None` when a retry found that an earlier, ambiguous pointer
    /// submission had already landed.
    pub transaction: Option<TxReceipt>,
}

/// A decrypted report and its non-sensitive metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct RetrievedReport {
    pub plaintext: String,
    pub metadata: ReportMetadata,
}

impl fmt::Debug for RetrievedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievedReport")
            .field("plaintext", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A report recorded on the ledger for one of the patient's bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
    pub handle: BookingHandle,
    pub content_id: ContentId,
    pub retrieval_reference: String,
}

/// An envelope that reached the store but whose pointer is not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub content_id: ContentId,
    pub envelope: ReportEnvelope,
}

/// Orchestrates envelopes between the content store and the ledger.
pub struct ReportExchange<L: LedgerClient, S: ContentStore> {
    mirror: Arc<LedgerMirror<L>>,
    store: Arc<S>,
    config: ExchangeConfig,
    /// Held for the whole of an upload, so uploads are serialized.
    pending: Mutex<HashMap<BookingHandle, PendingUpload>>,
}

impl<L: LedgerClient, S: ContentStore> ReportExchange<L, S> {
    pub fn new(mirror: Arc<LedgerMirror<L>>, store: Arc<S>, config: ExchangeConfig) -> Self {
        Self {
            mirror,
            store,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn mirror(&self) -> &Arc<LedgerMirror<L>> {
        &self.mirror
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Link to `content_id` through the configured gateway, or the store's
    /// own when none is configured.
    pub fn retrieval_reference(&self, content_id: &ContentId) -> String {
        match &self.config.gateway_base {
            Some(base) => gateway_reference(base, content_id),
            None => self.store.retrieval_reference(content_id),
        }
    }

    /// The pending upload for `handle`, if a previous attempt stopped after
    /// the store write.
    pub async fn pending_upload(&self, handle: BookingHandle) -> Option<PendingUpload> {
        self.pending.lock().await.get(&handle).cloned()
    }

    /// Forget a pending upload so the next attempt encrypts afresh.
    ///
    /// Only safe once the caller has established that the earlier pointer
    /// submission did not land.
    pub async fn discard_pending(&self, handle: BookingHandle) -> Option<PendingUpload> {
        let discarded = self.pending.lock().await.remove(&handle);
        if let Some(p) = &discarded {
            info!(%handle, content_id = %p.content_id, "pending report upload discarded");
        }
        discarded
    }

    /// Encrypt `plaintext` for `patient`, store it and point the booking at it.
    ///
    /// If an earlier attempt for the same booking already stored an envelope,
    /// that envelope is reused and `plaintext` is ignored.
    pub async fn upload(
        &self,
        handle: BookingHandle,
        plaintext: &str,
        patient: &AccountId,
        provider: &AccountId,
    ) -> Result<UploadReceipt> {
        let mut pending = self.pending.lock().await;

        // Eligibility is decided on a fresh read, never on a cached view.
        let snapshot = self.mirror.refresh().await?;
        let view = snapshot.booking(handle).ok_or_else(|| Error::NotEligible {
            handle,
            reason: "no such booking for this account".to_string(),
        })?;

        if !view.record.patient.matches(patient) || !view.record.provider.matches(provider) {
            warn!(%handle, %patient, %provider, "report upload refused: not the booking's parties");
            return Err(Error::Unauthorized(format!(
                "{patient} and {provider} are not the parties to booking {handle}"
            )));
        }

        if !view.report_upload_eligible {
            if let Some(p) = pending.remove(&handle) {
                let landed = view.status == BookingStatus::Completed
                    && view.record.report_pointer.as_ref() == Some(&p.content_id);
                if landed {
                    info!(%handle, content_id = %p.content_id, "earlier report pointer submission had landed");
                    return Ok(UploadReceipt {
                        retrieval_reference: self.retrieval_reference(&p.content_id),
                        content_id: p.content_id,
                        transaction: None,
                    });
                }
                if view.status.is_terminal() {
                    info!(
                        %handle,
                        content_id = %p.content_id,
                        status = view.status.as_str(),
                        "booking closed without this report, pending upload dropped"
                    );
                } else {
                    pending.insert(handle, p);
                }
            }
            return Err(Error::NotEligible {
                handle,
                reason: format!("booking is {}", view.status.as_str()),
            });
        }

        let content_id = match pending.get(&handle) {
            Some(existing) => {
                debug!(%handle, content_id = %existing.content_id, "reusing stored report envelope");
                existing.content_id.clone()
            }
            None => {
                let cipher_text = encrypt(plaintext, patient).map_err(Error::envelope)?;
                let envelope = build_envelope(cipher_text, patient.clone(), provider.clone(), handle);
                let object = envelope.to_json().map_err(Error::envelope)?;
                let metadata = PutMetadata::named(format!("therapy-report-{}", handle.index()))
                    .with("sessionHandle", handle.index().to_string())
                    .with("kind", ENVELOPE_KIND);

                debug!(%handle, "storing report envelope");
                let content_id = self
                    .timed_store("put", self.store.put_with_metadata(&object, &metadata))
                    .await?;
                pending.insert(
                    handle,
                    PendingUpload {
                        content_id: content_id.clone(),
                        envelope,
                    },
                );
                content_id
            }
        };

        // On failure the pending entry stays, so a retry starts here.
        let receipt = self.mirror.submit_report_pointer(handle, &content_id).await?;
        pending.remove(&handle);

        info!(%handle, %content_id, tx = %receipt, "report uploaded");
        Ok(UploadReceipt {
            retrieval_reference: self.retrieval_reference(&content_id),
            content_id,
            transaction: Some(receipt),
        })
    }

    /// Fetch, authorize and decrypt a report.
    pub async fn retrieve(
        &self,
        content_id: &ContentId,
        patient: &AccountId,
    ) -> Result<RetrievedReport> {
        debug!(%content_id, "fetching report envelope");
        let object = self.timed_store("get", self.store.get(content_id)).await?;
        let envelope = parse_envelope(&object).map_err(Error::envelope)?;

        if !envelope.patient_id.matches(patient) {
            warn!(%content_id, requested_by = %patient, "report access refused: patient mismatch");
            return Err(Error::Unauthorized(format!(
                "report {content_id} does not belong to {patient}"
            )));
        }

        let plaintext = decrypt(&envelope.cipher_text, patient).map_err(|e| {
            error!(%content_id, %patient, error = %e, "report failed to decrypt for its own patient");
            Error::envelope(e)
        })?;

        info!(%content_id, handle = %envelope.session_handle, "report retrieved");
        Ok(RetrievedReport {
            plaintext,
            metadata: envelope.metadata(),
        })
    }

    /// Reports recorded for `patient`'s bookings, from the mirror snapshot.
    pub async fn reports_for(&self, patient: &AccountId) -> Result<Vec<ReportRef>> {
        let snapshot = match self.mirror.snapshot() {
            Some(snapshot) => snapshot,
            None => self.mirror.refresh().await?,
        };

        Ok(snapshot
            .patient_bookings
            .iter()
            .filter(|view| view.record.patient.matches(patient))
            .filter_map(|view| {
                view.record.report_pointer.as_ref().map(|content_id| ReportRef {
                    handle: view.handle(),
                    content_id: content_id.clone(),
                    retrieval_reference: self.retrieval_reference(content_id),
                })
            })
            .collect())
    }

    async fn timed_store<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = habitstake_store::Result<T>>,
    {
        match timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(|e| Error::store(operation, e)),
            Err(_) => Err(Error::StoreUnavailable {
                operation,
                detail: format!("no answer within {:?}", self.config.store_timeout),
            }),
        }
    }
}
