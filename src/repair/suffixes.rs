// src/repair/suffixes.rs
//
// Visit-type noise in booking names: "방문시타"-style suffixes and
// after-sales ("AS") markers.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::customers::{sync_customer, CustomerIndex, CustomerSync, SyncOutcome};
use super::{Change, Job, RepairReport, RunMode, Table};
use crate::models::{Booking, BookingPatch};
use crate::normalize::{append_note, normalize_phone, remove_as_marker, remove_visit_suffix};
use crate::store::{load_all_bookings, load_all_customers, Store};

const AS_NOTE: &str = "AS 방문";

fn has_visit_suffix(name: &str) -> bool {
    remove_visit_suffix(name).1.is_some()
}

/// Strip visit suffixes from booking names and rename the matching
/// customer when its name is the same raw text or carries a suffix too.
pub async fn fix_visit_suffixes<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::Suffixes, mode);
    let bookings = load_all_bookings(store, page_size).await?;
    let mut customers = CustomerIndex::build(load_all_customers(store, page_size).await?);
    report.scanned = bookings.len();

    for booking in &bookings {
        let Some(name) = booking.name.as_deref() else {
            continue;
        };
        let (base, Some(suffix)) = remove_visit_suffix(name) else {
            continue;
        };
        if base.is_empty() || base == name {
            continue;
        }

        if let Err(e) =
            strip_suffix(store, &mut customers, mode, &mut report, booking, &base, suffix).await
        {
            report.fail(Table::Bookings, booking.id, Some(name), &e);
        }
    }

    info!(fixed = report.changes.len(), "visit suffixes processed");
    Ok(report)
}

async fn strip_suffix<S: Store>(
    store: &S,
    customers: &mut CustomerIndex,
    mode: RunMode,
    report: &mut RepairReport,
    booking: &Booking,
    base: &str,
    suffix: &str,
) -> Result<()> {
    let patch = BookingPatch {
        name: Some(base.to_string()),
        ..Default::default()
    };
    if let Some(phone) = normalize_phone(booking.phone.as_deref()) {
        let sync = CustomerSync {
            phone: &phone,
            name: base,
            raw_name: booking.name.as_deref(),
            email: None,
            visit_count: None,
            create_missing: false,
            name_is_dirty: has_visit_suffix,
        };
        if sync_customer(store, customers, mode, report, &sync).await? == SyncOutcome::Missing {
            debug!(id = booking.id, phone = %phone, "no customer for booking");
        }
    }

    if mode.is_apply() {
        store
            .update_booking(booking.id, &patch)
            .await
            .with_context(|| format!("updating booking {}", booking.id))?;
    }
    report.change(
        Change::update(
            Table::Bookings,
            booking.id,
            "name",
            booking.name.as_deref(),
            Some(base),
        )
        .with_detail(suffix.trim()),
    );
    Ok(())
}

/// Strip AS markers from booking names, flag the booking as an AS visit,
/// and note it once.
pub async fn fix_as_visits<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::AsVisits, mode);
    let bookings = load_all_bookings(store, page_size).await?;
    report.scanned = bookings.len();

    let mut flagged = 0usize;
    for booking in &bookings {
        let Some(patch) = as_visit_patch(booking) else {
            continue;
        };
        flagged += 1;

        if mode.is_apply() {
            if let Err(e) = store
                .update_booking(booking.id, &patch)
                .await
                .with_context(|| format!("updating booking {}", booking.id))
            {
                report.fail(Table::Bookings, booking.id, booking.name.as_deref(), &e);
                continue;
            }
        }

        if let Some(name) = &patch.name {
            report.change(Change::update(
                Table::Bookings,
                booking.id,
                "name",
                booking.name.as_deref(),
                Some(name),
            ));
        }
        if patch.is_as_visit.is_some() {
            report.change(Change::update(
                Table::Bookings,
                booking.id,
                "is_as_visit",
                booking.is_as_visit.map(|f| f.to_string()).as_deref(),
                Some("true"),
            ));
        }
        if let Some(notes) = &patch.notes {
            report.change(Change::update(
                Table::Bookings,
                booking.id,
                "notes",
                booking.notes.as_deref(),
                Some(notes),
            ));
        }
    }

    info!(flagged, "AS visits processed");
    Ok(report)
}

/// `None` when the name has no AS marker or the row is already clean.
fn as_visit_patch(booking: &Booking) -> Option<BookingPatch> {
    let name = booking.name.as_deref()?;
    let cleaned = remove_as_marker(name);
    if !cleaned.has_as {
        return None;
    }

    let notes = append_note(booking.notes.as_deref(), AS_NOTE);
    let patch = BookingPatch {
        name: (!cleaned.base_name.is_empty() && cleaned.base_name != name)
            .then_some(cleaned.base_name),
        notes: (booking.notes.as_deref() != Some(notes.as_str())).then_some(notes),
        is_as_visit: (booking.is_as_visit != Some(true)).then_some(true),
        ..Default::default()
    };
    (patch != BookingPatch::default()).then_some(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use crate::repair::{init_test_logging, SkipReason};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn strips_suffixes_and_renames_customer() {
        init_test_logging();
        let store = MemoryStore::new(
            vec![
                Booking::new(1, "김철수 방문시타", "010-1111-2222"),
                Booking::new(2, "이영희 방문", "01033334444"),
                Booking::new(3, "박지훈", "01055556666"),
            ],
            vec![
                Customer {
                    id: 1,
                    name: Some("김철수 방문시타".into()),
                    phone: Some("01011112222".into()),
                    email: None,
                    visit_count: Some(3),
                },
                Customer {
                    id: 2,
                    name: Some("이영희님".into()),
                    phone: Some("01033334444".into()),
                    email: None,
                    visit_count: Some(1),
                },
            ],
        );

        let report = fix_visit_suffixes(&store, RunMode::Apply, 1000)
            .await
            .unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(store.booking(1).unwrap().name.as_deref(), Some("김철수"));
        assert_eq!(store.booking(2).unwrap().name.as_deref(), Some("이영희"));
        assert_eq!(store.booking(3).unwrap().name.as_deref(), Some("박지훈"));

        let customers = store.customers();
        assert_eq!(customers[0].name.as_deref(), Some("김철수"));
        assert_eq!(customers[0].visit_count, Some(3));
        // different, clean name: left alone
        assert_eq!(customers[1].name.as_deref(), Some("이영희님"));
        assert_eq!(report.skipped_for(SkipReason::NoCustomer), 0);

        let rerun = fix_visit_suffixes(&store, RunMode::Apply, 1000)
            .await
            .unwrap();
        assert!(rerun.changes.is_empty());
    }

    #[tokio::test]
    async fn customer_failure_keeps_the_suffix_for_a_retry() {
        let store = MemoryStore::new(
            vec![Booking::new(1, "김철수 방문시타", "01011112222")],
            vec![Customer {
                id: 1,
                name: Some("김철수 방문시타".into()),
                phone: Some("01011112222".into()),
                email: None,
                visit_count: Some(3),
            }],
        );
        store.fail_next_customer_writes(1);

        let first = fix_visit_suffixes(&store, RunMode::Apply, 1000)
            .await
            .unwrap();
        assert_eq!(first.errors.len(), 1);
        assert_eq!(store.booking(1).unwrap().name.as_deref(), Some("김철수 방문시타"));

        let second = fix_visit_suffixes(&store, RunMode::Apply, 1000)
            .await
            .unwrap();
        assert!(second.errors.is_empty());
        assert_eq!(store.booking(1).unwrap().name.as_deref(), Some("김철수"));
        assert_eq!(store.customers()[0].name.as_deref(), Some("김철수"));
    }

    #[tokio::test]
    async fn flags_as_visits_once() {
        init_test_logging();
        let mut noted = Booking::new(2, "AS김용율", "01022223333");
        noted.notes = Some("드라이버 점검".into());
        let store = MemoryStore::new(
            vec![
                Booking::new(1, "김인섭AS", "01011112222"),
                noted,
                Booking::new(3, "이태성 AS 찾으러옴", "01044445555"),
                Booking::new(4, "박지훈", "01055556666"),
            ],
            Vec::new(),
        );

        let dry = fix_as_visits(&store, RunMode::DryRun, 1000).await.unwrap();
        assert_eq!(store.writes(), 0);
        assert_eq!(dry.changes.len(), 9);

        let report = fix_as_visits(&store, RunMode::Apply, 1000).await.unwrap();
        assert!(report.errors.is_empty());

        let b1 = store.booking(1).unwrap();
        assert_eq!(b1.name.as_deref(), Some("김인섭"));
        assert_eq!(b1.is_as_visit, Some(true));
        assert_eq!(b1.notes.as_deref(), Some("[AS 방문]"));

        let b2 = store.booking(2).unwrap();
        assert_eq!(b2.name.as_deref(), Some("김용율"));
        assert_eq!(b2.notes.as_deref(), Some("드라이버 점검\n[AS 방문]"));

        assert_eq!(store.booking(3).unwrap().name.as_deref(), Some("이태성"));
        assert_eq!(store.booking(4).unwrap().is_as_visit, None);

        let writes = store.writes();
        let rerun = fix_as_visits(&store, RunMode::Apply, 1000).await.unwrap();
        assert!(rerun.changes.is_empty());
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn already_flagged_row_needs_nothing() {
        let mut b = Booking::new(1, "김인섭", "01011112222");
        b.is_as_visit = Some(true);
        b.notes = Some("[AS 방문]".into());
        assert_eq!(as_visit_patch(&b), None);

        b.name = Some("김인섭 A/S".into());
        let patch = as_visit_patch(&b).unwrap();
        assert_eq!(patch.name.as_deref(), Some("김인섭"));
        assert_eq!(patch.notes, None);
        assert_eq!(patch.is_as_visit, None);
    }
}
