//! End-to-end report upload and retrieval.

use habitstake::core::{Amount, BookingHandle, BookingStatus, ContentId};
use habitstake::envelope::{build_envelope, encrypt};
use habitstake::store::ContentStore;
use habitstake::{Error, ExchangeConfig};
use habitstake_testkit::generators::report_text;
use habitstake_testkit::TestFixture;
use proptest::prelude::*;

const NOTES: &str = "Session 3. Patient reports better sleep; continue breathing exercises.";

async fn booked(fixture: &TestFixture) -> anyhow::Result<BookingHandle> {
    Ok(fixture
        .booked_session(Amount::tokens(50), Amount::tokens(5))
        .await?)
}

#[tokio::test]
async fn test_upload_then_retrieve() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();

    let receipt = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;
    assert!(receipt.transaction.is_some());
    assert_eq!(
        receipt.retrieval_reference,
        format!("https://gateway.pinata.cloud/ipfs/{}", receipt.content_id)
    );

    // The pointer landed and the mirror re-read it.
    let snapshot = provider.mirror().snapshot().unwrap();
    let view = snapshot.booking(handle).unwrap();
    assert_eq!(view.status, BookingStatus::Completed);
    assert_eq!(view.record.report_pointer.as_ref(), Some(&receipt.content_id));
    assert_eq!(snapshot.provider.session_count, 1);
    assert_eq!(snapshot.provider.total_earnings, Amount::tokens(5));

    let patient = fixture.patient_session();
    let report = patient
        .exchange()
        .retrieve(&receipt.content_id, &fixture.patient)
        .await?;
    assert_eq!(report.plaintext, NOTES);
    assert_eq!(report.metadata.session_handle, handle);
    assert!(report.metadata.provider_id.matches(&fixture.provider));
    assert!(!format!("{report:?}").contains("breathing"));

    let err = patient
        .exchange()
        .retrieve(&receipt.content_id, &fixture.stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn test_patient_id_matches_case_insensitively() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let receipt = fixture
        .provider_session()
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;

    let lower = habitstake::AccountId::new(fixture.patient.as_str().to_ascii_lowercase());
    let report = fixture
        .patient_session()
        .exchange()
        .retrieve(&receipt.content_id, &lower)
        .await?;
    assert_eq!(report.plaintext, NOTES);
    Ok(())
}

#[tokio::test]
async fn test_stored_object_hides_plaintext_and_patient() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let receipt = fixture
        .provider_session()
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;

    let stored = fixture.store.get(&receipt.content_id).await?;
    assert!(!stored.to_string().contains("breathing"));
    assert_eq!(stored["kind"], "therapy_session");

    let metadata = fixture.store.metadata(&receipt.content_id).unwrap();
    assert_eq!(metadata.name.as_deref(), Some(&*format!("therapy-report-{}", handle.index())));
    assert!(metadata
        .key_values
        .values()
        .all(|v| !fixture.patient.matches(&habitstake::AccountId::new(v.clone()))));
    Ok(())
}

#[tokio::test]
async fn test_completed_booking_is_not_eligible() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    fixture
        .ledger
        .set_booking_status(handle, BookingStatus::Completed.code());

    let err = fixture
        .provider_session()
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotEligible { .. }));
    assert_eq!(fixture.store.put_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_and_unknown_bookings_are_not_eligible() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let patient = fixture.patient_session();
    patient.mirror().cancel(handle).await?;

    let err = patient
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotEligible { .. }));

    let err = patient
        .exchange()
        .upload(BookingHandle::new(99), NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotEligible { .. }));
    assert_eq!(fixture.store.put_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_eligibility_is_read_fresh() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();

    let snapshot = provider.mirror().refresh().await?;
    assert!(snapshot.booking(handle).unwrap().report_upload_eligible);

    // Cancelled after the caller last looked.
    fixture
        .ledger
        .set_booking_status(handle, BookingStatus::Cancelled.code());
    let err = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotEligible { .. }));
    assert_eq!(fixture.store.put_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_requires_the_booking_parties() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;

    let err = fixture
        .provider_session()
        .exchange()
        .upload(handle, NOTES, &fixture.stranger, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(fixture.store.put_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_foreign_envelope_is_unauthorized_not_undecryptable() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let envelope = build_envelope(
        encrypt(NOTES, &fixture.stranger)?,
        fixture.stranger.clone(),
        fixture.provider.clone(),
        BookingHandle::new(4),
    );
    let id = ContentId::new("bafkforeign");
    fixture.store.insert_raw(id.clone(), envelope.to_json()?);

    let err = fixture
        .patient_session()
        .exchange()
        .retrieve(&id, &fixture.patient)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn test_tampered_ciphertext_is_decryption_error() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    // Claims the patient but was sealed under another key.
    let envelope = build_envelope(
        encrypt(NOTES, &fixture.stranger)?,
        fixture.patient.clone(),
        fixture.provider.clone(),
        BookingHandle::new(4),
    );
    let id = ContentId::new("bafktampered");
    fixture.store.insert_raw(id.clone(), envelope.to_json()?);

    let err = fixture
        .patient_session()
        .exchange()
        .retrieve(&id, &fixture.patient)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decryption(_)));
    Ok(())
}

#[tokio::test]
async fn test_retrieve_missing_and_malformed() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let exchange = fixture.patient_session();

    let missing = ContentId::new("bafkmissing");
    let err = exchange
        .exchange()
        .retrieve(&missing, &fixture.patient)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(id) if id == missing));

    let junk = ContentId::new("bafkjunk");
    fixture
        .store
        .insert_raw(junk.clone(), serde_json::json!({ "hello": "world" }));
    let err = exchange
        .exchange()
        .retrieve(&junk, &fixture.patient)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedEnvelope(_)));
    Ok(())
}

#[tokio::test]
async fn test_store_outage_writes_nothing_to_ledger() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();
    let submissions = fixture.ledger.submission_count();

    fixture.store.set_unavailable(true);
    let err = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { operation: "put", .. }));
    assert!(err.is_retryable());
    assert_eq!(fixture.ledger.submission_count(), submissions);
    assert!(provider.exchange().pending_upload(handle).await.is_none());

    fixture.store.set_unavailable(false);
    provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_retry_after_ambiguous_pointer_reuses_content() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();

    fixture.ledger.time_out_next_submission(false);
    let err = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SubmissionAmbiguous { operation: "report_pointer", .. }));
    assert!(!err.is_retryable());
    assert_eq!(fixture.store.put_count(), 1);
    let pending = provider.exchange().pending_upload(handle).await.unwrap();

    let receipt = provider
        .exchange()
        .upload(handle, "different text on retry", &fixture.patient, &fixture.provider)
        .await?;
    assert_eq!(fixture.store.put_count(), 1);
    assert_eq!(receipt.content_id, pending.content_id);
    assert!(receipt.transaction.is_some());
    assert!(provider.exchange().pending_upload(handle).await.is_none());

    let report = provider
        .exchange()
        .retrieve(&receipt.content_id, &fixture.patient)
        .await?;
    assert_eq!(report.plaintext, NOTES);
    Ok(())
}

#[tokio::test]
async fn test_retry_after_landed_pointer_reports_success() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();

    fixture.ledger.time_out_next_submission(true);
    assert!(provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .is_err());
    let submissions = fixture.ledger.submission_count();

    let receipt = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;
    assert!(receipt.transaction.is_none());
    assert_eq!(fixture.store.put_count(), 1);
    assert_eq!(fixture.ledger.submission_count(), submissions);
    assert_eq!(
        fixture.ledger.booking(handle).unwrap().report_pointer,
        Some(receipt.content_id)
    );
    Ok(())
}

#[tokio::test]
async fn test_pending_upload_dropped_when_booking_closes() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let cancelled = booked(&fixture).await?;
    let completed = booked(&fixture).await?;
    let provider = fixture.provider_session();

    for handle in [cancelled, completed] {
        fixture.ledger.time_out_next_submission(false);
        assert!(provider
            .exchange()
            .upload(handle, NOTES, &fixture.patient, &fixture.provider)
            .await
            .is_err());
        assert!(provider.exchange().pending_upload(handle).await.is_some());
    }

    fixture
        .ledger
        .set_booking_status(cancelled, BookingStatus::Cancelled.code());
    // Completed elsewhere, with no pointer to our envelope.
    fixture
        .ledger
        .set_booking_status(completed, BookingStatus::Completed.code());

    for handle in [cancelled, completed] {
        let err = provider
            .exchange()
            .upload(handle, NOTES, &fixture.patient, &fixture.provider)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotEligible { .. }));
        assert!(provider.exchange().pending_upload(handle).await.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_rejected_pointer_keeps_pending_until_discarded() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let handle = booked(&fixture).await?;
    let provider = fixture.provider_session();

    fixture.ledger.reject_next_submission("contract paused");
    let err = provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LedgerRejected { .. }));
    let first = provider.exchange().pending_upload(handle).await.unwrap();

    let discarded = provider.exchange().discard_pending(handle).await.unwrap();
    assert_eq!(discarded.content_id, first.content_id);

    provider
        .exchange()
        .upload(handle, NOTES, &fixture.patient, &fixture.provider)
        .await?;
    assert_eq!(fixture.store.put_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_reports_for_patient() -> anyhow::Result<()> {
    let fixture = TestFixture::with_config(habitstake::Config {
        exchange: ExchangeConfig {
            gateway_base: Some("ipfs.example.org".to_string()),
            ..Default::default()
        },
        ..Default::default()
    });
    let first = booked(&fixture).await?;
    let _second = booked(&fixture).await?;

    let receipt = fixture
        .provider_session()
        .exchange()
        .upload(first, NOTES, &fixture.patient, &fixture.provider)
        .await?;
    assert_eq!(
        receipt.retrieval_reference,
        format!("https://ipfs.example.org/ipfs/{}", receipt.content_id)
    );

    let patient = fixture.patient_session();
    let reports = patient.exchange().reports_for(&fixture.patient).await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].handle, first);
    assert_eq!(reports[0].content_id, receipt.content_id);
    assert_eq!(reports[0].retrieval_reference, receipt.retrieval_reference);

    assert!(patient
        .exchange()
        .reports_for(&fixture.stranger)
        .await?
        .is_empty());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_report_text_survives_exchange(text in report_text()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let fixture = TestFixture::new();
            let handle = booked(&fixture).await.unwrap();
            let receipt = fixture
                .provider_session()
                .exchange()
                .upload(handle, &text, &fixture.patient, &fixture.provider)
                .await
                .unwrap();
            let report = fixture
                .patient_session()
                .exchange()
                .retrieve(&receipt.content_id, &fixture.patient)
                .await
                .unwrap();
            assert_eq!(report.plaintext, text);
        });
    }
}
