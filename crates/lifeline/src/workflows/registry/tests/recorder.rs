use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};

use crate::workflows::fixtures::{clock, date, donor, today};
use crate::workflows::outreach::ManualClock;
use crate::workflows::registry::domain::{BloodGroup, DonorId, DonorRecord};
use crate::workflows::registry::memory::InMemoryDonorRepository;
use crate::workflows::registry::recorder::{
    ConfirmationError, ConfirmationOutcome, DonationConfirmation, DonationRecorder,
};
use crate::workflows::registry::repository::{DonorRepository, RepositoryError};
use crate::workflows::validation::ValidationError;

fn store() -> Arc<InMemoryDonorRepository> {
    Arc::new(InMemoryDonorRepository::new(vec![
        donor("301", BloodGroup::APositive, 0.0),
        donor("302", BloodGroup::BPositive, 0.0),
    ]))
}

fn confirmation(id: &str, volume: u32, key: Option<&str>) -> DonationConfirmation {
    DonationConfirmation {
        donor_id: DonorId(id.to_string()),
        volume,
        confirmation_id: key.map(str::to_string),
    }
}

fn fetch(store: &InMemoryDonorRepository, id: &str) -> DonorRecord {
    store
        .fetch(&DonorId(id.to_string()))
        .expect("fetch")
        .expect("donor exists")
}

#[test]
fn confirmation_updates_history_and_persists() {
    let store = store();
    let recorder = DonationRecorder::new(store.clone(), clock());

    let outcome = recorder
        .confirm(confirmation("301", 2, None))
        .expect("recorded");

    let ConfirmationOutcome::Recorded(record) = outcome else {
        panic!("expected recorded outcome");
    };
    assert_eq!(record.donation_count, 5);
    assert_eq!(record.volume_donated, 6);
    assert_eq!(record.last_donation, Some(today()));
    assert_eq!(fetch(&store, "301"), record);
    assert_eq!(fetch(&store, "302").donation_count, 4, "other donors untouched");
}

#[test]
fn unknown_donor_is_not_found_and_store_unchanged() {
    let store = store();
    let before = store.all().expect("all");
    let recorder = DonationRecorder::new(store.clone(), clock());

    let outcome = recorder
        .confirm(confirmation("999", 1, None))
        .expect("not found is an outcome");

    assert_eq!(outcome, ConfirmationOutcome::NotFound(DonorId("999".to_string())));
    assert_eq!(store.all().expect("all"), before);
}

#[test]
fn per_donor_locks_are_dropped_after_each_confirmation() {
    let recorder = DonationRecorder::new(store(), clock());

    for index in 0..50 {
        let outcome = recorder
            .confirm(confirmation(&format!("ghost-{index}"), 1, None))
            .expect("not found is an outcome");
        assert!(matches!(outcome, ConfirmationOutcome::NotFound(_)));
    }
    assert_eq!(recorder.tracked_locks(), 0, "unknown ids leave no lock entry");

    recorder.confirm(confirmation("301", 1, None)).expect("recorded");
    assert_eq!(recorder.tracked_locks(), 0);
}

#[test]
fn oldest_confirmation_ids_are_forgotten_past_capacity() {
    let store = store();
    let recorder = DonationRecorder::new(store.clone(), clock()).with_applied_capacity(2);

    for key in ["visit-1", "visit-2", "visit-3"] {
        recorder
            .confirm(confirmation("301", 1, Some(key)))
            .expect("recorded");
    }
    assert_eq!(fetch(&store, "301").donation_count, 7);

    let recent = recorder
        .confirm(confirmation("301", 1, Some("visit-3")))
        .expect("repeat");
    assert!(matches!(recent, ConfirmationOutcome::AlreadyApplied(_)));

    let evicted = recorder
        .confirm(confirmation("301", 1, Some("visit-1")))
        .expect("evicted key applies again");
    assert!(matches!(evicted, ConfirmationOutcome::Recorded(_)));
    assert_eq!(fetch(&store, "301").donation_count, 8);
}

#[test]
fn repeated_confirmation_id_is_applied_once() {
    let store = store();
    let recorder = DonationRecorder::new(store.clone(), clock());

    recorder
        .confirm(confirmation("301", 1, Some("visit-17")))
        .expect("first");
    let repeat = recorder
        .confirm(confirmation("301", 1, Some("visit-17")))
        .expect("repeat");

    assert!(matches!(repeat, ConfirmationOutcome::AlreadyApplied(_)));
    assert_eq!(fetch(&store, "301").donation_count, 5);

    recorder
        .confirm(confirmation("301", 1, Some("visit-18")))
        .expect("new key");
    assert_eq!(fetch(&store, "301").donation_count, 6);
}

#[test]
fn confirmations_without_id_always_apply() {
    let store = store();
    let recorder = DonationRecorder::new(store.clone(), clock());

    recorder.confirm(confirmation("302", 1, None)).expect("first");
    recorder.confirm(confirmation("302", 1, None)).expect("second");

    let record = fetch(&store, "302");
    assert_eq!(record.donation_count, 6);
    assert_eq!(record.volume_donated, 6);
}

#[test]
fn earlier_confirmation_date_does_not_move_last_donation_back() {
    let store = store();
    let clock = Arc::new(ManualClock::new(Utc.from_utc_datetime(
        &date(2023, 12, 1).and_hms_opt(10, 0, 0).expect("valid time"),
    )));
    let recorder = DonationRecorder::new(store.clone(), clock);

    recorder.confirm(confirmation("301", 1, None)).expect("recorded");

    let record = fetch(&store, "301");
    assert_eq!(record.last_donation, Some(date(2024, 1, 10)));
    assert_eq!(record.donation_count, 5);
}

#[test]
fn invalid_confirmations_are_rejected_before_lookup() {
    let recorder = DonationRecorder::new(store(), clock());

    let err = recorder
        .confirm(confirmation("301", 0, None))
        .expect_err("zero volume");
    assert!(matches!(
        err,
        ConfirmationError::Validation(ValidationError::InvalidValue { field: "volume", .. })
    ));

    let err = recorder
        .confirm(confirmation("  ", 1, None))
        .expect_err("blank id");
    assert!(matches!(
        err,
        ConfirmationError::Validation(ValidationError::MissingField("donor_id"))
    ));
}

struct ReadOnlyRepository(InMemoryDonorRepository);

impl DonorRepository for ReadOnlyRepository {
    fn all(&self) -> Result<Vec<DonorRecord>, RepositoryError> {
        self.0.all()
    }

    fn fetch(&self, id: &DonorId) -> Result<Option<DonorRecord>, RepositoryError> {
        self.0.fetch(id)
    }

    fn update(&self, _record: DonorRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

#[test]
fn persistence_failure_is_an_error_not_a_missing_donor() {
    let recorder = DonationRecorder::new(
        Arc::new(ReadOnlyRepository(InMemoryDonorRepository::new(vec![donor(
            "301",
            BloodGroup::APositive,
            0.0,
        )]))),
        clock(),
    );

    let err = recorder
        .confirm(confirmation("301", 1, Some("k")))
        .expect_err("write fails");
    assert!(matches!(err, ConfirmationError::Repository(RepositoryError::Unavailable(_))));
}

#[test]
fn concurrent_confirmations_for_one_donor_are_serialized() {
    let store = store();
    let recorder = Arc::new(DonationRecorder::new(store.clone(), clock()));

    let handles = (0..8)
        .map(|_| {
            let recorder = Arc::clone(&recorder);
            thread::spawn(move || {
                recorder
                    .confirm(confirmation("301", 1, None))
                    .expect("recorded")
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("thread joins");
    }

    let record = fetch(&store, "301");
    assert_eq!(record.donation_count, 12);
    assert_eq!(record.volume_donated, 12);
    assert_eq!(recorder.tracked_locks(), 0);
}
