//! Booking records and the booking reconciler.
//!
//! The ledger owns the booking lifecycle. This module only reads raw records
//! and projects them into views; it never changes a status.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::CoreError;
use crate::types::{AccountId, BookingHandle, ContentId};

/// The ledger's raw booking states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BookingStatus {
    Pending = 0,
    Completed = 1,
    Cancelled = 2,
}

impl BookingStatus {
    /// Parse the ledger's numeric status code.
    ///
    /// Unknown codes are an error. Coercing them would hide a status added on
    /// the ledger side.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Completed),
            2 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The label shown to users.
    pub const fn display(self) -> DisplayStatus {
        match self {
            Self::Pending => DisplayStatus::Confirmed,
            Self::Completed => DisplayStatus::Completed,
            Self::Cancelled => DisplayStatus::Cancelled,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the ledger will accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// User-facing booking label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStatus {
    Confirmed,
    Completed,
    Cancelled,
}

impl DisplayStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Which side of a booking an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingRole {
    Patient,
    Provider,
}

/// A booking exactly as the ledger reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    /// Positional index in the ledger's booking table.
    pub handle: BookingHandle,
    pub patient: AccountId,
    pub provider: AccountId,
    /// Ledger block time, Unix seconds.
    pub created_at: i64,
    pub session_fee: Amount,
    pub report_pointer: Option<ContentId>,
    /// Raw status code; see [`BookingStatus::from_code`].
    pub status: u8,
}

/// A booking as the application sees it.
///
/// Recomputed from its [`BookingRecord`] on every refresh and never cached
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub record: BookingRecord,
    #[serde(rename = "rawStatus")]
    pub status: BookingStatus,
    pub display_status: DisplayStatus,
    pub report_upload_eligible: bool,
}

impl BookingView {
    pub fn handle(&self) -> BookingHandle {
        self.record.handle
    }
}

/// Project a raw booking into its view.
///
/// `display_status` and `report_upload_eligible` are derived separately from
/// the raw status. They coincide today, but one is a label and the other a
/// gate, and neither may be inferred from the other.
pub fn reconcile(raw: &BookingRecord) -> Result<BookingView, CoreError> {
    let status = BookingStatus::from_code(raw.status).ok_or_else(|| CoreError::MalformedRecord {
        handle: raw.handle,
        detail: format!("unknown booking status code {}", raw.status),
    })?;

    Ok(BookingView {
        record: raw.clone(),
        status,
        display_status: status.display(),
        report_upload_eligible: status == BookingStatus::Pending,
    })
}

/// Reconcile a whole list, failing on the first malformed record.
pub fn reconcile_all<'a>(
    raws: impl IntoIterator<Item = &'a BookingRecord>,
) -> Result<Vec<BookingView>, CoreError> {
    raws.into_iter().map(reconcile).collect()
}

/// Per-status booking counts for a dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl BookingSummary {
    /// Count by raw status, not by display label.
    pub fn from_views<'a>(views: impl IntoIterator<Item = &'a BookingView>) -> Self {
        views.into_iter().fold(Self::default(), |mut acc, view| {
            acc.total += 1;
            match view.status {
                BookingStatus::Pending => acc.pending += 1,
                BookingStatus::Completed => acc.completed += 1,
                BookingStatus::Cancelled => acc.cancelled += 1,
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(status: u8) -> BookingRecord {
        BookingRecord {
            handle: BookingHandle::new(3),
            patient: AccountId::new("0x1111111111111111111111111111111111111111"),
            provider: AccountId::new("0x2222222222222222222222222222222222222222"),
            created_at: 1_700_000_000,
            session_fee: Amount::tokens(5),
            report_pointer: None,
            status,
        }
    }

    #[test]
    fn test_pending_is_confirmed_and_eligible() {
        let view = reconcile(&raw(0)).unwrap();
        assert_eq!(view.status, BookingStatus::Pending);
        assert_eq!(view.display_status, DisplayStatus::Confirmed);
        assert!(view.report_upload_eligible);
    }

    #[test]
    fn test_completed_and_cancelled_close_uploads() {
        let completed = reconcile(&raw(1)).unwrap();
        assert_eq!(completed.display_status, DisplayStatus::Completed);
        assert!(!completed.report_upload_eligible);

        let cancelled = reconcile(&raw(2)).unwrap();
        assert_eq!(cancelled.display_status, DisplayStatus::Cancelled);
        assert!(!cancelled.report_upload_eligible);
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let err = reconcile(&raw(3)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRecord { handle, .. } if handle == BookingHandle::new(3)
        ));
    }

    #[test]
    fn test_reconcile_copies_raw_fields() {
        let mut record = raw(1);
        record.report_pointer = Some(ContentId::new("bafy-report"));
        let view = reconcile(&record).unwrap();
        assert_eq!(view.record, record);
    }

    #[test]
    fn test_reconcile_all_propagates_first_error() {
        let records = vec![raw(0), raw(9), raw(1)];
        assert!(reconcile_all(&records).is_err());
        assert_eq!(reconcile_all(&records[..1]).unwrap().len(), 1);
    }

    #[test]
    fn test_summary_counts_raw_status() {
        let views = reconcile_all(&[raw(0), raw(0), raw(1), raw(2)]).unwrap();
        let summary = BookingSummary::from_views(&views);
        assert_eq!(
            summary,
            BookingSummary {
                total: 4,
                pending: 2,
                completed: 1,
                cancelled: 1
            }
        );
    }

    proptest! {
        #[test]
        fn test_reconcile_is_total_over_known_codes(code in 0u8..=2) {
            let view = reconcile(&raw(code)).unwrap();
            prop_assert_eq!(view.report_upload_eligible, code == 0);
            prop_assert_eq!(view.display_status, view.status.display());
            prop_assert_eq!(view.status.code(), code);
        }

        #[test]
        fn test_reconcile_rejects_unknown_codes(code in 3u8..) {
            prop_assert!(reconcile(&raw(code)).is_err());
        }
    }
}
