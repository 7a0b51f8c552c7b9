// src/repair/names.rs

use anyhow::{Context, Result};
use tracing::info;

use super::{Change, CustomerIndex, Job, RepairReport, RunMode, Table};
use crate::models::BookingPatch;
use crate::normalize::normalize_phone;
use crate::store::{load_all_bookings, load_all_customers, Store};

/// Give every booking the name of the customer that shares its phone.
/// Customers without a name are ignored.
pub async fn sync_booking_names<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::SyncNames, mode);
    let bookings = load_all_bookings(store, page_size).await?;
    let customers = CustomerIndex::build(load_all_customers(store, page_size).await?);
    report.scanned = bookings.len();

    for booking in &bookings {
        let Some(customer) =
            normalize_phone(booking.phone.as_deref()).and_then(|p| customers.get(&p))
        else {
            continue;
        };
        let Some(name) = customer
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };
        if booking.name.as_deref() == Some(name) {
            continue;
        }

        let patch = BookingPatch {
            name: Some(name.to_string()),
            ..Default::default()
        };
        if mode.is_apply() {
            if let Err(e) = store
                .update_booking(booking.id, &patch)
                .await
                .with_context(|| format!("renaming booking {}", booking.id))
            {
                report.fail(Table::Bookings, booking.id, booking.name.as_deref(), &e);
                continue;
            }
        }
        report.change(
            Change::update(
                Table::Bookings,
                booking.id,
                "name",
                booking.name.as_deref(),
                Some(name),
            )
            .with_detail(format!("customer {}", customer.id)),
        );
    }

    info!(renamed = report.changes.len(), "booking names synced");
    Ok(report)
}
