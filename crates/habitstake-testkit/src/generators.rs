//! Proptest generators for property-based testing.

use proptest::prelude::*;

use habitstake_core::{
    AccountId, ActivityCompleted, ActivityKind, Amount, BookingHandle, BookingRecord, ContentId,
};

/// An address-like account identifier in mixed case.
pub fn address() -> impl Strategy<Value = AccountId> {
    "0x[0-9a-fA-F]{40}".prop_map(AccountId::new)
}

/// Any amount from zero to `max_tokens` whole tokens, at full precision.
pub fn amount_up_to(max_tokens: u64) -> impl Strategy<Value = Amount> {
    (0..=Amount::tokens(max_tokens).units()).prop_map(Amount::from_units)
}

pub fn activity_kind() -> impl Strategy<Value = ActivityKind> {
    prop::sample::select(ActivityKind::ALL.to_vec())
}

/// A completed activity lasting up to a day.
pub fn activity() -> impl Strategy<Value = ActivityCompleted> {
    ("[a-z0-9-]{1,24}", activity_kind(), 0u64..=86_400)
        .prop_map(|(id, kind, secs)| ActivityCompleted::new(id, kind, secs))
}

/// Report text, including non-ASCII.
pub fn report_text() -> impl Strategy<Value = String> {
    "\\PC{0,512}".prop_map(String::from)
}

/// A raw status code; only 0..=2 are known.
pub fn status_code() -> impl Strategy<Value = u8> {
    prop_oneof![4 => 0u8..=2, 1 => 3u8..=u8::MAX]
}

/// A raw booking record as the ledger would return it.
pub fn booking_record() -> impl Strategy<Value = BookingRecord> {
    (
        any::<u32>(),
        address(),
        address(),
        amount_up_to(1000),
        proptest::option::of("b3[0-9a-f]{64}"),
        status_code(),
    )
        .prop_map(|(index, patient, provider, fee, pointer, status)| BookingRecord {
            handle: BookingHandle::new(u64::from(index)),
            patient,
            provider,
            created_at: 1_700_000_000 + i64::from(index),
            session_fee: fee,
            report_pointer: pointer.map(ContentId::new),
            status,
        })
}
