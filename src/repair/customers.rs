// src/repair/customers.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{Action, Change, RepairReport, RunMode, Table};
use crate::models::{Booking, Customer, CustomerPatch, NewCustomer};
use crate::normalize::normalize_phone;
use crate::store::Store;

/// Id given to customers a dry run would have inserted.
const PENDING_ID: i64 = 0;

fn stored_id(id: i64) -> Option<i64> {
    (id != PENDING_ID).then_some(id)
}

/// Customers keyed by canonical phone. The first customer seen for a phone
/// wins; rows whose phone does not canonicalize are not indexed.
#[derive(Debug, Default)]
pub struct CustomerIndex {
    by_phone: HashMap<String, Customer>,
}

impl CustomerIndex {
    pub fn build(customers: Vec<Customer>) -> Self {
        let total = customers.len();
        let mut by_phone: HashMap<String, Customer> = HashMap::with_capacity(total);
        let mut shadowed = 0usize;

        for customer in customers {
            let Some(phone) = normalize_phone(customer.phone.as_deref()) else {
                continue;
            };
            if let Some(first) = by_phone.get(&phone) {
                debug!(phone = %phone, kept = first.id, shadowed = customer.id, "duplicate customer phone");
                shadowed += 1;
                continue;
            }
            by_phone.insert(phone, customer);
        }

        info!(
            customers = total,
            indexed = by_phone.len(),
            shadowed,
            "customer index built"
        );
        Self { by_phone }
    }

    pub fn get(&self, phone: &str) -> Option<&Customer> {
        self.by_phone.get(phone)
    }

    pub fn get_mut(&mut self, phone: &str) -> Option<&mut Customer> {
        self.by_phone.get_mut(phone)
    }

    pub fn insert(&mut self, phone: String, customer: Customer) {
        self.by_phone.insert(phone, customer);
    }

    pub fn len(&self) -> usize {
        self.by_phone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_phone.is_empty()
    }
}

/// Bookings per canonical phone.
pub fn visit_counts(bookings: &[Booking]) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for phone in bookings
        .iter()
        .filter_map(|b| normalize_phone(b.phone.as_deref()))
    {
        *counts.entry(phone).or_insert(0) += 1;
    }
    counts
}

/// What a booking-driven job wants its customer row to look like.
pub struct CustomerSync<'a> {
    /// Canonical phone.
    pub phone: &'a str,
    /// Cleaned name taken from the booking.
    pub name: &'a str,
    /// Booking name before cleaning.
    pub raw_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub visit_count: Option<i64>,
    pub create_missing: bool,
    /// Whether a customer's current name carries the same kind of noise.
    pub name_is_dirty: fn(&str) -> bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Updated,
    Inserted,
    Missing,
}

/// Bring the customer for `sync.phone` in line with a cleaned booking.
///
/// An existing customer is renamed only when its name is missing, or differs
/// and is either the raw booking name or dirty itself. The index is updated
/// in dry runs too, so later bookings for the same phone see the plan.
pub async fn sync_customer<S: Store>(
    store: &S,
    index: &mut CustomerIndex,
    mode: RunMode,
    report: &mut RepairReport,
    sync: &CustomerSync<'_>,
) -> Result<SyncOutcome> {
    if let Some(customer) = index.get_mut(sync.phone) {
        let rename = match customer.name.as_deref() {
            None => true,
            Some(current) => {
                current != sync.name
                    && (Some(current) == sync.raw_name || (sync.name_is_dirty)(current))
            }
        };
        let patch = CustomerPatch {
            name: rename.then(|| sync.name.to_string()),
            phone: None,
            visit_count: sync
                .visit_count
                .filter(|n| customer.visit_count != Some(*n)),
        };
        if patch == CustomerPatch::default() {
            return Ok(SyncOutcome::Unchanged);
        }

        if mode.is_apply() {
            if let Some(id) = stored_id(customer.id) {
                store
                    .update_customer(id, &patch)
                    .await
                    .with_context(|| format!("updating customer {}", id))?;
            }
        }

        if let Some(name) = &patch.name {
            let mut change = Change::update(
                Table::Customers,
                customer.id,
                "name",
                customer.name.as_deref(),
                Some(name),
            );
            change.id = stored_id(customer.id);
            report.change(change);
        }
        if let Some(count) = patch.visit_count {
            let mut change = Change::update(
                Table::Customers,
                customer.id,
                "visit_count",
                customer.visit_count.map(|n| n.to_string()).as_deref(),
                Some(&count.to_string()),
            );
            change.id = stored_id(customer.id);
            report.change(change);
        }
        customer.apply(&patch);
        return Ok(SyncOutcome::Updated);
    }

    if !sync.create_missing {
        return Ok(SyncOutcome::Missing);
    }

    let new = NewCustomer {
        name: sync.name.to_string(),
        phone: sync.phone.to_string(),
        email: sync.email.map(str::to_string),
        visit_count: sync.visit_count.unwrap_or(1),
    };
    let row = if mode.is_apply() {
        store
            .insert_customer(&new)
            .await
            .with_context(|| format!("inserting customer {}", new.phone))?
    } else {
        Customer {
            id: PENDING_ID,
            name: Some(new.name.clone()),
            phone: Some(new.phone.clone()),
            email: new.email.clone(),
            visit_count: Some(new.visit_count),
        }
    };

    report.change(Change {
        table: Table::Customers,
        id: stored_id(row.id),
        action: Action::Insert,
        field: "row",
        before: None,
        after: Some(format!("{} {}", new.name, new.phone)),
        detail: Some(format!("visit_count {}", new.visit_count)),
    });
    index.insert(new.phone, row);
    Ok(SyncOutcome::Inserted)
}
