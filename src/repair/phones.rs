// src/repair/phones.rs

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{Action, Change, Job, RepairReport, RunMode, SkipReason, Table};
use crate::models::{Booking, BookingPatch, CustomerPatch};
use crate::normalize::{normalize_phone, strip_phone_formatting};
use crate::store::{load_all_bookings, load_all_customers, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PhoneCheck {
    Missing,
    /// Canonicalizes, and is stored in a shape that is left as typed.
    Usable,
    /// Country-code or dropped-zero shape; stored value should become this.
    Rewrite(String),
    Invalid,
}

fn check_phone(raw: Option<&str>) -> PhoneCheck {
    let Some(raw) = raw.filter(|p| !p.trim().is_empty()) else {
        return PhoneCheck::Missing;
    };
    let stripped = strip_phone_formatting(raw);
    let mangled =
        stripped.starts_with("82") || (stripped.len() == 10 && stripped.starts_with("10"));

    match normalize_phone(Some(raw)) {
        Some(canonical) if mangled && canonical != raw => PhoneCheck::Rewrite(canonical),
        Some(_) => PhoneCheck::Usable,
        None => PhoneCheck::Invalid,
    }
}

/// Rewrite mangled phone numbers on both tables, then drop bookings that
/// repeat the same phone, date and time.
pub async fn fix_phones<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::Phones, mode);
    let mut bookings = load_all_bookings(store, page_size).await?;
    let mut customers = load_all_customers(store, page_size).await?;
    report.scanned = bookings.len() + customers.len();

    for booking in bookings.iter_mut() {
        let canonical = match check_phone(booking.phone.as_deref()) {
            PhoneCheck::Usable => continue,
            PhoneCheck::Rewrite(canonical) => canonical,
            PhoneCheck::Missing | PhoneCheck::Invalid => {
                report.skip(
                    Table::Bookings,
                    booking.id,
                    booking.name.as_deref(),
                    booking.phone.as_deref(),
                    SkipReason::for_phone(booking.phone.as_deref()),
                );
                continue;
            }
        };

        let patch = BookingPatch {
            phone: Some(canonical.clone()),
            ..Default::default()
        };
        if mode.is_apply() {
            if let Err(e) = store
                .update_booking(booking.id, &patch)
                .await
                .with_context(|| format!("updating booking {} phone", booking.id))
            {
                report.fail(Table::Bookings, booking.id, booking.name.as_deref(), &e);
                continue;
            }
        }
        report.change(Change::update(
            Table::Bookings,
            booking.id,
            "phone",
            booking.phone.as_deref(),
            Some(&canonical),
        ));
        booking.apply(&patch);
    }

    for customer in customers.iter_mut() {
        let canonical = match check_phone(customer.phone.as_deref()) {
            PhoneCheck::Usable => continue,
            PhoneCheck::Rewrite(canonical) => canonical,
            PhoneCheck::Missing | PhoneCheck::Invalid => {
                report.skip(
                    Table::Customers,
                    customer.id,
                    customer.name.as_deref(),
                    customer.phone.as_deref(),
                    SkipReason::for_phone(customer.phone.as_deref()),
                );
                continue;
            }
        };

        let patch = CustomerPatch {
            phone: Some(canonical.clone()),
            ..Default::default()
        };
        if mode.is_apply() {
            if let Err(e) = store
                .update_customer(customer.id, &patch)
                .await
                .with_context(|| format!("updating customer {} phone", customer.id))
            {
                report.fail(Table::Customers, customer.id, customer.name.as_deref(), &e);
                continue;
            }
        }
        report.change(Change::update(
            Table::Customers,
            customer.id,
            "phone",
            customer.phone.as_deref(),
            Some(&canonical),
        ));
        customer.apply(&patch);
    }

    info!(
        rewritten = report.changes.len(),
        no_phone = report.skipped_for(SkipReason::NoPhone),
        invalid = report.skipped_for(SkipReason::InvalidPhone),
        "phone formats checked"
    );

    remove_duplicates(store, mode, &bookings, &mut report).await;
    Ok(report)
}

/// `HH:MM`, whether the row stored seconds or not.
fn slot_time(time: &str) -> &str {
    let time = time.trim();
    time.get(..5).unwrap_or(time)
}

/// Bookings sharing a canonical phone, date and time slot, in key order.
/// Rows missing any of the three are never grouped.
fn duplicate_groups(bookings: &[Booking]) -> Vec<Vec<&Booking>> {
    let mut groups: BTreeMap<(String, chrono::NaiveDate, String), Vec<&Booking>> = BTreeMap::new();
    for booking in bookings {
        let (Some(phone), Some(date), Some(time)) = (
            normalize_phone(booking.phone.as_deref()),
            booking.date,
            booking.time.as_deref(),
        ) else {
            continue;
        };
        groups
            .entry((phone, date, slot_time(time).to_string()))
            .or_default()
            .push(booking);
    }
    groups.into_values().filter(|g| g.len() > 1).collect()
}

/// Keep the most recently created row of each group (higher id on a tie)
/// and delete the others.
async fn remove_duplicates<S: Store>(
    store: &S,
    mode: RunMode,
    bookings: &[Booking],
    report: &mut RepairReport,
) {
    let groups = duplicate_groups(bookings);
    info!(groups = groups.len(), "duplicate booking groups");

    for mut group in groups {
        group.sort_by_key(|b| (b.created_at, b.id));
        let Some(keep) = group.pop() else {
            continue;
        };
        debug!(keep = keep.id, drop = group.len(), "duplicate group");

        for dup in group {
            if mode.is_apply() {
                if let Err(e) = store
                    .delete_booking(dup.id)
                    .await
                    .with_context(|| format!("deleting duplicate booking {}", dup.id))
                {
                    report.fail(Table::Bookings, dup.id, dup.name.as_deref(), &e);
                    continue;
                }
            }
            report.change(Change {
                table: Table::Bookings,
                id: Some(dup.id),
                action: Action::Delete,
                field: "row",
                before: Some(format!(
                    "{} {} {} {}",
                    dup.name.as_deref().unwrap_or(""),
                    dup.phone.as_deref().unwrap_or(""),
                    dup.date.map(|d| d.to_string()).unwrap_or_default(),
                    dup.time.as_deref().unwrap_or("")
                )),
                after: None,
                detail: Some(format!("duplicate of {}", keep.id)),
            });
        }
    }
}
