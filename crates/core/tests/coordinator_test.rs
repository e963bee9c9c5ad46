use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name, phone_number::en::PhoneNumber},
    Fake,
};
use fieldbook_core::{
    config::{PricePolicy, ReservationConfig},
    coordinator::ReservationCoordinator,
    directory::StaticFieldDirectory,
    errors::{BookingError, BookingResult},
    ledger::{BookingStore, InMemoryBookingStore},
    models::{
        booking::{Booking, BookingFilter, BookingStatus, CreateBookingRequest, NewBooking},
        field::{Field, Sport},
    },
};
use mockall::mock;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

const DATE: &str = "2025-12-15";

fn directory() -> StaticFieldDirectory {
    StaticFieldDirectory::new()
        .with_sport(Sport {
            id: 1,
            sport_name: "Futsal".to_string(),
            sport_type: "Indoor".to_string(),
            is_available: true,
        })
        .with_sport(Sport {
            id: 2,
            sport_name: "Padel".to_string(),
            sport_type: "Outdoor".to_string(),
            is_available: false,
        })
        .with_field(field(1, 1, "100", true))
        .with_field(field(2, 1, "150", true))
        .with_field(field(3, 1, "100", false))
        .with_field(field(4, 2, "120", true))
}

fn field(id: i64, sport_id: i64, price: &str, is_available: bool) -> Field {
    Field {
        id,
        field_name: format!("Court {id}"),
        field_code: format!("FC-{id}"),
        sport_id,
        price_per_hour: price.parse().unwrap(),
        is_available,
    }
}

fn coordinator_with(store: Arc<dyn BookingStore>, config: ReservationConfig) -> ReservationCoordinator {
    ReservationCoordinator::new(Arc::new(directory()), store, config)
}

fn coordinator() -> ReservationCoordinator {
    coordinator_with(Arc::new(InMemoryBookingStore::new()), ReservationConfig::default())
}

fn request(field_id: i64, slots: &[&str]) -> CreateBookingRequest {
    CreateBookingRequest {
        field_id: Some(json!(field_id)),
        field_name: Some(format!("Court {field_id}")),
        booking_date: Some(DATE.to_string()),
        time_slots: Some(slots.iter().map(ToString::to_string).collect()),
        total_price: None,
        customer_name: Some(Name().fake()),
        customer_phone: Some(PhoneNumber().fake()),
        customer_email: Some(SafeEmail().fake()),
    }
}

fn rendered(booking: &Booking) -> Vec<String> {
    booking.time_slots.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_booking_scenario_adjacent_and_conflicting() {
    let coordinator = coordinator();

    let first = coordinator
        .create_booking(request(1, &["10:00-11:00", "09:00-10:00"]))
        .await
        .unwrap();
    assert_eq!(rendered(&first), vec!["09:00-10:00", "10:00-11:00"]);
    assert_eq!(first.total_price, Decimal::from(200));
    assert_eq!(first.status, BookingStatus::Confirmed);
    assert_eq!(first.field_name, "Court 1");

    let repeat = coordinator
        .create_booking(request(1, &["09:00-10:00", "10:00-11:00"]))
        .await;
    assert!(matches!(repeat, Err(BookingError::SlotConflict { .. })));

    let adjacent = coordinator.create_booking(request(1, &["11:00-12:00"])).await.unwrap();
    assert_eq!(adjacent.total_price, Decimal::from(100));

    let booked: Vec<String> = coordinator
        .booked_slots(1, NaiveDate::from_ymd_opt(2025, 12, 15).unwrap())
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(booked, vec!["09:00-10:00", "10:00-11:00", "11:00-12:00"]);
}

#[tokio::test]
async fn test_partial_overlap_conflicts_and_creates_nothing() {
    let coordinator = coordinator();
    coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();

    let err = coordinator
        .create_booking(request(1, &["09:30-10:30"]))
        .await
        .unwrap_err();
    match err {
        BookingError::SlotConflict { conflicting } => {
            assert_eq!(conflicting.len(), 1);
            assert_eq!(conflicting[0].to_string(), "09:00-10:00");
        }
        other => panic!("expected conflict, got {other}"),
    }

    let all = coordinator.list_bookings(&BookingFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_same_slots_on_other_field_or_date_are_free() {
    let coordinator = coordinator();
    coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();

    assert!(coordinator.create_booking(request(2, &["09:00-10:00"])).await.is_ok());

    let mut next_day = request(1, &["09:00-10:00"]);
    next_day.booking_date = Some("2025-12-16".to_string());
    assert!(coordinator.create_booking(next_day).await.is_ok());
}

#[tokio::test]
async fn test_client_price_is_recomputed_by_default() {
    let coordinator = coordinator();
    let mut payload = request(2, &["10:00-11:00"]);
    payload.total_price = Some(Decimal::from(1));

    let booking = coordinator.create_booking(payload).await.unwrap();

    assert_eq!(booking.total_price, Decimal::from(150));
}

#[tokio::test]
async fn test_strict_price_policy_rejects_before_reserving() {
    let config = ReservationConfig {
        price_policy: PricePolicy::Strict,
        ..Default::default()
    };
    let coordinator = coordinator_with(Arc::new(InMemoryBookingStore::new()), config);
    let mut payload = request(2, &["10:00-11:00"]);
    payload.total_price = Some(Decimal::from(100));

    let err = coordinator.create_booking(payload).await.unwrap_err();

    assert!(matches!(err, BookingError::Validation(_)));
    let booked = coordinator
        .booked_slots(2, NaiveDate::from_ymd_opt(2025, 12, 15).unwrap())
        .await
        .unwrap();
    assert!(booked.is_empty());
}

#[tokio::test]
async fn test_missing_fields_fail_validation() {
    let coordinator = coordinator();

    let mut no_field = request(1, &["09:00-10:00"]);
    no_field.field_id = None;
    let mut blank_name = request(1, &["09:00-10:00"]);
    blank_name.customer_name = Some("   ".to_string());
    let no_slots = request(1, &[]);

    for payload in [no_field, blank_name, no_slots, CreateBookingRequest::default()] {
        let err = coordinator.create_booking(payload).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)), "got {err}");
    }
}

#[tokio::test]
async fn test_unknown_and_unavailable_fields() {
    let coordinator = coordinator();

    assert!(matches!(
        coordinator.create_booking(request(99, &["09:00-10:00"])).await,
        Err(BookingError::FieldNotFound(99))
    ));
    assert!(matches!(
        coordinator.create_booking(request(3, &["09:00-10:00"])).await,
        Err(BookingError::FieldUnavailable(3))
    ));
    // Field 4 belongs to a sport that is switched off.
    assert!(matches!(
        coordinator.create_booking(request(4, &["09:00-10:00"])).await,
        Err(BookingError::FieldUnavailable(4))
    ));
}

#[tokio::test]
async fn test_slot_errors_are_distinguished() {
    let coordinator = coordinator();

    assert!(matches!(
        coordinator.create_booking(request(1, &["10:00-09:00"])).await,
        Err(BookingError::MalformedSlot(_))
    ));
    assert!(matches!(
        coordinator
            .create_booking(request(1, &["09:00-10:00", "09:30-10:30"]))
            .await,
        Err(BookingError::OverlappingSlotsInRequest { .. })
    ));
}

#[tokio::test]
async fn test_operating_hours_limit_slots() {
    let config = ReservationConfig {
        operating_hours: Some("08:00-22:00".parse().unwrap()),
        ..Default::default()
    };
    let coordinator = coordinator_with(Arc::new(InMemoryBookingStore::new()), config);

    assert!(matches!(
        coordinator.create_booking(request(1, &["21:00-23:00"])).await,
        Err(BookingError::MalformedSlot(_))
    ));
    assert!(coordinator.create_booking(request(1, &["21:00-22:00"])).await.is_ok());
}

#[tokio::test]
async fn test_cancel_frees_slots_for_rebooking() {
    let coordinator = coordinator();
    let booking = coordinator
        .create_booking(request(1, &["09:00-10:00", "10:00-11:00"]))
        .await
        .unwrap();

    let cancelled = coordinator.cancel_booking(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let rebooked = coordinator
        .create_booking(request(1, &["09:00-10:00", "10:00-11:00"]))
        .await
        .unwrap();
    assert_ne!(rebooked.id, booking.id);
}

#[tokio::test]
async fn test_double_cancel_does_not_release_new_owner() {
    let coordinator = coordinator();
    let booking = coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();
    coordinator.cancel_booking(booking.id).await.unwrap();

    let new_owner = coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();

    assert!(matches!(
        coordinator.cancel_booking(booking.id).await,
        Err(BookingError::AlreadyCancelled(id)) if id == booking.id
    ));
    assert!(matches!(
        coordinator.create_booking(request(1, &["09:00-10:00"])).await,
        Err(BookingError::SlotConflict { .. })
    ));
    assert_eq!(
        coordinator.get_booking(new_owner.id).await.unwrap().status,
        BookingStatus::Confirmed
    );
}

#[tokio::test]
async fn test_cancel_unknown_booking_is_not_found() {
    let coordinator = coordinator();

    assert!(matches!(
        coordinator.cancel_booking(12345).await,
        Err(BookingError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_conflicting_requests_confirm_exactly_one() {
    let coordinator = Arc::new(coordinator());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            let slots: &[&str] = if i % 2 == 0 { &["09:00-10:00"] } else { &["09:30-10:30"] };
            tokio::spawn(async move { coordinator.create_booking(request(1, slots)).await })
        })
        .collect();

    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(BookingError::SlotConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(confirmed, 1);
    let stored = coordinator.list_bookings(&BookingFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_disjoint_requests_all_confirm() {
    let coordinator = Arc::new(coordinator());

    let handles: Vec<_> = (0..10u32)
        .map(|hour| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                let slot = format!("{:02}:00-{:02}:00", hour + 8, hour + 9);
                coordinator.create_booking(request(1, &[slot.as_str()])).await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let stored = coordinator
        .list_bookings(&BookingFilter {
            field_id: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 10);
    for (i, a) in stored.iter().enumerate() {
        for b in &stored[i + 1..] {
            assert!(a.time_slots.iter().all(|x| b.time_slots.iter().all(|y| !x.overlaps(y))));
        }
    }
}

#[tokio::test]
async fn test_hydrate_restores_occupancy_from_store() {
    let store: Arc<dyn BookingStore> = Arc::new(InMemoryBookingStore::new());

    let before_restart = coordinator_with(store.clone(), ReservationConfig::default());
    let kept = before_restart.create_booking(request(1, &["09:00-10:00"])).await.unwrap();
    let dropped = before_restart.create_booking(request(1, &["12:00-13:00"])).await.unwrap();
    before_restart.cancel_booking(dropped.id).await.unwrap();

    let after_restart = coordinator_with(store, ReservationConfig::default());
    assert_eq!(after_restart.hydrate().await.unwrap(), 1);

    assert!(matches!(
        after_restart.create_booking(request(1, &["09:00-10:00"])).await,
        Err(BookingError::SlotConflict { .. })
    ));
    assert!(after_restart.create_booking(request(1, &["12:00-13:00"])).await.is_ok());

    // The restored reservation is still owned by the original booking.
    after_restart.cancel_booking(kept.id).await.unwrap();
    assert!(after_restart.create_booking(request(1, &["09:00-10:00"])).await.is_ok());
}

mock! {
    pub Store {}

    #[async_trait]
    impl BookingStore for Store {
        async fn insert(&self, booking: NewBooking) -> BookingResult<Booking>;
        async fn get(&self, id: i64) -> BookingResult<Option<Booking>>;
        async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>>;
        async fn mark_cancelled(&self, id: i64, at: DateTime<Utc>) -> BookingResult<Booking>;
    }
}

#[test_log::test(tokio::test)]
async fn test_storage_failure_rolls_back_reservation() {
    let mut store = MockStore::new();
    let mut attempts = 0;
    store.expect_insert().times(2).returning(move |booking| {
        attempts += 1;
        if attempts == 1 {
            return Err(BookingError::Storage(eyre::eyre!("connection reset by peer")));
        }
        Ok(Booking {
            id: 1,
            field_id: booking.field_id,
            field_name: booking.field_name,
            booking_date: booking.booking_date,
            time_slots: booking.time_slots,
            total_price: booking.total_price,
            customer_name: booking.customer.name,
            customer_phone: booking.customer.phone,
            customer_email: booking.customer.email,
            status: BookingStatus::Confirmed,
            reservation_token: booking.reservation_token,
            created_at: Utc::now(),
            cancelled_at: None,
        })
    });
    let coordinator = coordinator_with(Arc::new(store), ReservationConfig::default());

    let failed = coordinator.create_booking(request(1, &["09:00-10:00"])).await;
    assert!(matches!(failed, Err(BookingError::Storage(_))));

    let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    assert!(coordinator.booked_slots(1, date).await.unwrap().is_empty());

    // No phantom hold: the same slots can be booked once storage recovers.
    let booking = coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();
    assert_eq!(booking.id, 1);
    assert_eq!(coordinator.booked_slots(1, date).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lock_timeout_is_retryable_not_conflict() {
    let config = ReservationConfig {
        lock_timeout: Duration::from_millis(25),
        ..Default::default()
    };
    let mut store = MockStore::new();
    store.expect_insert().returning(|_| {
        // Hold the field/date lock long enough for the second request to give up.
        std::thread::sleep(Duration::from_millis(200));
        Err(BookingError::Storage(eyre::eyre!("slow disk")))
    });
    let coordinator = Arc::new(coordinator_with(Arc::new(store), config));

    let slow = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.create_booking(request(1, &["09:00-10:00"])).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let waiting = coordinator.create_booking(request(1, &["15:00-16:00"])).await;
    assert!(matches!(waiting, Err(BookingError::StorageTimeout { field_id: 1 })));

    assert!(matches!(slow.await.unwrap(), Err(BookingError::Storage(_))));
}

/// In-memory store whose writes take a while, so callers can give up mid-write.
struct SlowStore {
    inner: InMemoryBookingStore,
    insert_delay: Duration,
    cancel_delay: Duration,
    fail_inserts: AtomicBool,
}

impl SlowStore {
    fn new(insert_delay: Duration, cancel_delay: Duration) -> Self {
        Self {
            inner: InMemoryBookingStore::new(),
            insert_delay,
            cancel_delay,
            fail_inserts: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BookingStore for SlowStore {
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking> {
        tokio::time::sleep(self.insert_delay).await;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(BookingError::Storage(eyre::eyre!("connection reset by peer")));
        }
        self.inner.insert(booking).await
    }

    async fn get(&self, id: i64) -> BookingResult<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        self.inner.list(filter).await
    }

    async fn mark_cancelled(&self, id: i64, at: DateTime<Utc>) -> BookingResult<Booking> {
        tokio::time::sleep(self.cancel_delay).await;
        self.inner.mark_cancelled(id, at).await
    }
}

fn booked(slots: Vec<fieldbook_core::slot::Slot>) -> Vec<String> {
    slots.iter().map(ToString::to_string).collect()
}

#[test_log::test(tokio::test)]
async fn test_abandoned_create_rolls_back_when_insert_fails() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(300), Duration::ZERO));
    store.fail_inserts.store(true, Ordering::SeqCst);
    let coordinator = coordinator_with(store.clone(), ReservationConfig::default());
    let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.create_booking(request(1, &["09:00-10:00"])),
    )
    .await;
    assert!(abandoned.is_err());

    // Takes the key lock, so this waits for the detached insert to finish.
    assert!(coordinator.booked_slots(1, date).await.unwrap().is_empty());
    assert!(coordinator.list_bookings(&BookingFilter::default()).await.unwrap().is_empty());

    store.fail_inserts.store(false, Ordering::SeqCst);
    let retry = coordinator.create_booking(request(1, &["09:00-10:00"])).await.unwrap();
    assert_eq!(rendered(&retry), vec!["09:00-10:00"]);
}

#[tokio::test]
async fn test_abandoned_create_settles_to_a_stored_booking() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(300), Duration::ZERO));
    let coordinator = coordinator_with(store, ReservationConfig::default());
    let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.create_booking(request(1, &["09:00-10:00"])),
    )
    .await;
    assert!(abandoned.is_err());

    let held = booked(coordinator.booked_slots(1, date).await.unwrap());
    let stored = coordinator.list_bookings(&BookingFilter::default()).await.unwrap();

    // Every held slot belongs to a stored booking.
    assert_eq!(stored.len(), 1);
    assert_eq!(held, rendered(&stored[0]));
    assert!(matches!(
        coordinator.create_booking(request(1, &["09:00-10:00"])).await,
        Err(BookingError::SlotConflict { .. })
    ));
}

#[tokio::test]
async fn test_abandoned_cancel_still_frees_slots() {
    let store = Arc::new(SlowStore::new(Duration::ZERO, Duration::from_millis(300)));
    let coordinator = coordinator_with(store, ReservationConfig::default());
    let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    let booking = coordinator.create_booking(request(1, &["18:00-19:00"])).await.unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), coordinator.cancel_booking(booking.id)).await;
    assert!(abandoned.is_err());

    assert!(coordinator.booked_slots(1, date).await.unwrap().is_empty());
    assert_eq!(
        coordinator.get_booking(booking.id).await.unwrap().status,
        BookingStatus::Cancelled
    );
    assert!(coordinator.create_booking(request(1, &["18:00-19:00"])).await.is_ok());
}
