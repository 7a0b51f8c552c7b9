// src/repair/link.rs

use anyhow::{Context, Result};
use tracing::info;

use super::{Change, CustomerIndex, Job, RepairReport, RunMode, SkipReason, Table};
use crate::models::{Booking, BookingPatch};
use crate::normalize::normalize_phone;
use crate::store::{load_all_bookings, load_all_customers, Store};

const PROGRESS_EVERY: usize = 500;

/// Point bookings without a customer at the customer sharing their phone.
pub async fn link_bookings<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::Link, mode);
    let bookings = load_all_bookings(store, page_size).await?;
    let customers = CustomerIndex::build(load_all_customers(store, page_size).await?);

    let orphans: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.customer_profile_id.is_none())
        .collect();
    report.scanned = orphans.len();
    info!(
        bookings = bookings.len(),
        unlinked = orphans.len(),
        "bookings without a customer"
    );

    let mut linked = 0usize;
    for booking in orphans {
        let Some(phone) = normalize_phone(booking.phone.as_deref()) else {
            report.skip(
                Table::Bookings,
                booking.id,
                booking.name.as_deref(),
                booking.phone.as_deref(),
                SkipReason::for_phone(booking.phone.as_deref()),
            );
            continue;
        };
        let Some(customer) = customers.get(&phone) else {
            report.skip(
                Table::Bookings,
                booking.id,
                booking.name.as_deref(),
                booking.phone.as_deref(),
                SkipReason::NoCustomer,
            );
            continue;
        };

        let patch = BookingPatch {
            customer_profile_id: Some(customer.id),
            ..Default::default()
        };
        if mode.is_apply() {
            if let Err(e) = store
                .update_booking(booking.id, &patch)
                .await
                .with_context(|| format!("linking booking {} to customer {}", booking.id, customer.id))
            {
                report.fail(Table::Bookings, booking.id, booking.name.as_deref(), &e);
                continue;
            }
        }
        report.change(
            Change::update(
                Table::Bookings,
                booking.id,
                "customer_profile_id",
                None,
                Some(&customer.id.to_string()),
            )
            .with_detail(customer.name.clone().unwrap_or_default()),
        );

        linked += 1;
        if linked % PROGRESS_EVERY == 0 {
            info!(linked, "linking progress");
        }
    }

    info!(
        linked,
        no_phone = report.skipped_for(SkipReason::NoPhone),
        invalid_phone = report.skipped_for(SkipReason::InvalidPhone),
        no_customer = report.skipped_for(SkipReason::NoCustomer),
        failed = report.errors.len(),
        "linking finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use crate::repair::init_test_logging;
    use crate::store::MemoryStore;

    fn fixture() -> MemoryStore {
        let mut already = Booking::new(1, "김민수", "01012345678");
        already.customer_profile_id = Some(99);
        let mut no_phone = Booking::new(3, "박지훈", "");
        no_phone.phone = None;
        MemoryStore::new(
            vec![
                already,
                Booking::new(2, "김민수", "010-1234-5678"),
                no_phone,
                Booking::new(4, "최", "12345"),
                Booking::new(5, "이영희", "01033334444"),
                Booking::new(6, "조영택", "+82 10 4245 0013"),
            ],
            vec![
                Customer {
                    id: 10,
                    name: Some("김민수".into()),
                    phone: Some("01012345678".into()),
                    email: None,
                    visit_count: Some(2),
                },
                Customer {
                    id: 11,
                    name: Some("조영택".into()),
                    phone: Some("010-4245-0013".into()),
                    email: None,
                    visit_count: Some(1),
                },
            ],
        )
    }

    #[tokio::test]
    async fn classifies_and_previews_by_default() {
        init_test_logging();
        let store = fixture();

        let report = link_bookings(&store, Job::Link.default_mode(), 1000)
            .await
            .unwrap();

        assert_eq!(report.mode, RunMode::DryRun);
        assert_eq!(report.scanned, 5);
        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.skipped_for(SkipReason::NoPhone), 1);
        assert_eq!(report.skipped_for(SkipReason::InvalidPhone), 1);
        assert_eq!(report.skipped_for(SkipReason::NoCustomer), 1);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn apply_sets_customer_ids() {
        let store = fixture();
        store.fail_writes_for_booking(6);

        let report = link_bookings(&store, RunMode::Apply, 2).await.unwrap();

        assert_eq!(store.booking(1).unwrap().customer_profile_id, Some(99));
        assert_eq!(store.booking(2).unwrap().customer_profile_id, Some(10));
        assert_eq!(store.booking(5).unwrap().customer_profile_id, None);
        assert_eq!(store.booking(6).unwrap().customer_profile_id, None);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.changes.len(), 1);
    }
}
