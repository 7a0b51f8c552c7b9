// src/repair/companions.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use super::customers::{sync_customer, visit_counts, CustomerIndex, CustomerSync};
use super::{Change, Job, RepairReport, RunMode, SkipReason, Table};
use crate::models::{Booking, BookingPatch};
use crate::normalize::{format_companion_note, normalize_phone, parse_companion_annotation, ParsedName};
use crate::store::{load_all_bookings, load_all_customers, Store};

fn is_annotated(name: &str) -> bool {
    parse_companion_annotation(Some(name)).companion.is_some()
}

/// Move companion annotations out of booking names into notes, and keep
/// the matching customer row (name, visit count) in step.
pub async fn fix_companions<S: Store>(
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    let mut report = RepairReport::new(Job::Companions, mode);
    let bookings = load_all_bookings(store, page_size).await?;
    let mut customers = CustomerIndex::build(load_all_customers(store, page_size).await?);
    let visits = visit_counts(&bookings);
    report.scanned = bookings.len();

    let annotated: Vec<(&Booking, ParsedName)> = bookings
        .iter()
        .filter_map(|b| {
            let parsed = parse_companion_annotation(b.name.as_deref());
            parsed.companion.is_some().then_some((b, parsed))
        })
        .collect();
    info!(
        bookings = bookings.len(),
        annotated = annotated.len(),
        "bookings with companion annotations"
    );

    for (booking, parsed) in annotated {
        if let Err(e) = fix_booking(
            store,
            &mut customers,
            &visits,
            mode,
            &mut report,
            booking,
            &parsed,
        )
        .await
        {
            report.fail(Table::Bookings, booking.id, booking.name.as_deref(), &e);
        }
    }

    Ok(report)
}

async fn fix_booking<S: Store>(
    store: &S,
    customers: &mut CustomerIndex,
    visits: &HashMap<String, i64>,
    mode: RunMode,
    report: &mut RepairReport,
    booking: &Booking,
    parsed: &ParsedName,
) -> Result<()> {
    let (Some(base), Some(companion)) = (parsed.base_name.as_deref(), parsed.companion.as_ref())
    else {
        return Ok(());
    };
    if base.is_empty() {
        debug!(id = booking.id, name = ?booking.name, "annotation with no name in front");
        return Ok(());
    }

    let notes = format_companion_note(companion, booking.notes.as_deref());
    let patch = BookingPatch {
        name: Some(base.to_string()),
        notes: (booking.notes.as_deref() != Some(notes.as_str())).then(|| notes.clone()),
        ..Default::default()
    };
    debug!(id = booking.id, from = ?booking.name, to = base, companion = %companion.info(), "companion annotation");

    // customer first: once the booking name is clean a rerun no longer finds it
    match normalize_phone(booking.phone.as_deref()) {
        Some(phone) => {
            let sync = CustomerSync {
                phone: &phone,
                name: base,
                raw_name: booking.name.as_deref(),
                email: booking.email.as_deref(),
                visit_count: Some(visits.get(&phone).copied().unwrap_or(1)),
                create_missing: true,
                name_is_dirty: is_annotated,
            };
            sync_customer(store, customers, mode, report, &sync).await?;
        }
        None => report.skip(
            Table::Bookings,
            booking.id,
            Some(base),
            booking.phone.as_deref(),
            SkipReason::for_phone(booking.phone.as_deref()),
        ),
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
        .with_detail(companion.info()),
    );
    if let Some(notes) = &patch.notes {
        report.change(Change::update(
            Table::Bookings,
            booking.id,
            "notes",
            booking.notes.as_deref(),
            Some(notes),
        ));
    }
    Ok(())
}
