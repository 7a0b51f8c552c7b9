use anyhow::{anyhow, bail, Result};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use super::Store;
use crate::models::{Booking, BookingPatch, Customer, CustomerPatch, NewCustomer};

/// In-process stand-in for the hosted tables.
///
/// Counts page reads and writes so callers can assert on what a run did,
/// and can be told to reject updates for specific booking ids or the next
/// few customer writes.
#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<Vec<Booking>>,
    customers: Mutex<Vec<Customer>>,
    failing_bookings: Mutex<HashSet<i64>>,
    failing_customer_writes: AtomicUsize,
    page_requests: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(bookings: Vec<Booking>, customers: Vec<Customer>) -> Self {
        Self {
            bookings: Mutex::new(bookings),
            customers: Mutex::new(customers),
            ..Default::default()
        }
    }

    /// Make every later write to booking `id` fail.
    pub fn fail_writes_for_booking(&self, id: i64) {
        self.failing_bookings.lock().unwrap().insert(id);
    }

    /// Make the next `n` customer updates or inserts fail.
    pub fn fail_next_customer_writes(&self, n: usize) {
        self.failing_customer_writes.store(n, Ordering::SeqCst);
    }

    pub fn bookings(&self) -> Vec<Booking> {
        let mut rows = self.bookings.lock().unwrap().clone();
        rows.sort_by_key(|b| b.id);
        rows
    }

    pub fn customers(&self) -> Vec<Customer> {
        let mut rows = self.customers.lock().unwrap().clone();
        rows.sort_by_key(|c| c.id);
        rows
    }

    pub fn booking(&self, id: i64) -> Option<Booking> {
        self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    pub fn customer_by_phone(&self, phone: &str) -> Option<Customer> {
        self.customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.phone.as_deref() == Some(phone))
            .cloned()
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn page<T: Clone>(
        &self,
        rows: &Mutex<Vec<T>>,
        key: fn(&T) -> i64,
        offset: usize,
        limit: usize,
    ) -> Vec<T> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let mut rows = rows.lock().unwrap().clone();
        rows.sort_by_key(key);
        rows.into_iter().skip(offset).take(limit).collect()
    }

    fn check_booking_writable(&self, id: i64) -> Result<()> {
        if self.failing_bookings.lock().unwrap().contains(&id) {
            bail!("booking {} rejected the write", id);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_customer_writable(&self) -> Result<()> {
        let rejected = self
            .failing_customer_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            bail!("customers rejected the write");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn bookings_page(&self, offset: usize, limit: usize) -> Result<Vec<Booking>> {
        Ok(self.page(&self.bookings, |b| b.id, offset, limit))
    }

    async fn customers_page(&self, offset: usize, limit: usize) -> Result<Vec<Customer>> {
        Ok(self.page(&self.customers, |c| c.id, offset, limit))
    }

    async fn update_booking(&self, id: i64, patch: &BookingPatch) -> Result<()> {
        self.check_booking_writable(id)?;
        let mut rows = self.bookings.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| anyhow!("no booking with id {}", id))?;
        row.apply(patch);
        Ok(())
    }

    async fn delete_booking(&self, id: i64) -> Result<()> {
        self.check_booking_writable(id)?;
        let mut rows = self.bookings.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.id != id);
        if rows.len() == before {
            bail!("no booking with id {}", id);
        }
        Ok(())
    }

    async fn update_customer(&self, id: i64, patch: &CustomerPatch) -> Result<()> {
        self.check_customer_writable()?;
        let mut rows = self.customers.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("no customer with id {}", id))?;
        row.apply(patch);
        Ok(())
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        self.check_customer_writable()?;
        let mut rows = self.customers.lock().unwrap();
        let id = rows.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let row = Customer {
            id,
            name: Some(customer.name.clone()),
            phone: Some(customer.phone.clone()),
            email: customer.email.clone(),
            visit_count: Some(customer.visit_count),
        };
        rows.push(row.clone());
        Ok(row)
    }
}
