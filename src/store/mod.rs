// src/store/mod.rs

use anyhow::{Context, Result};
use std::future::Future;
use tracing::{debug, info};

use crate::models::{Booking, BookingPatch, Customer, CustomerPatch, NewCustomer};

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Rows fetched per request when scanning a whole table.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Persistence handle for the two tables the repair jobs touch.
///
/// Jobs take `&S where S: Store` so tests can hand in a [`MemoryStore`].
/// Page reads are ordered by `id`.
pub trait Store {
    fn bookings_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Booking>>> + Send;

    fn customers_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Customer>>> + Send;

    fn update_booking(
        &self,
        id: i64,
        patch: &BookingPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_booking(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    fn update_customer(
        &self,
        id: i64,
        patch: &CustomerPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Insert and return the stored row (with its assigned id).
    fn insert_customer(
        &self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<Customer>> + Send;
}

/// Keep requesting pages until one comes back short.
async fn paginate<T, F, Fut>(table: &str, page_size: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch(offset, page_size)
            .await
            .with_context(|| format!("loading {} rows {}..{}", table, offset, offset + page_size))?;
        let len = page.len();
        debug!(table, offset, rows = len, "page loaded");
        all.extend(page);
        if len < page_size {
            break;
        }
        offset += page_size;
    }

    info!(table, rows = all.len(), "table loaded");
    Ok(all)
}

pub async fn load_all_bookings<S: Store>(store: &S, page_size: usize) -> Result<Vec<Booking>> {
    paginate("bookings", page_size, |offset, limit| {
        store.bookings_page(offset, limit)
    })
    .await
}

pub async fn load_all_customers<S: Store>(store: &S, page_size: usize) -> Result<Vec<Customer>> {
    paginate("customers", page_size, |offset, limit| {
        store.customers_page(offset, limit)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_across_pages() {
        let bookings = (1..=7)
            .map(|id| Booking::new(id, format!("고객{}", id), "01000000000"))
            .collect();
        let store = MemoryStore::new(bookings, Vec::new());

        let all = load_all_bookings(&store, 3).await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all.first().map(|b| b.id), Some(1));
        assert_eq!(all.last().map(|b| b.id), Some(7));
        // 3 + 3 + 1
        assert_eq!(store.page_requests(), 3);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let bookings = (1..=6)
            .map(|id| Booking::new(id, "고객", "01000000000"))
            .collect();
        let store = MemoryStore::new(bookings, Vec::new());

        let all = load_all_bookings(&store, 3).await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(store.page_requests(), 3);
    }

    #[tokio::test]
    async fn empty_table() {
        let store = MemoryStore::default();
        assert!(load_all_customers(&store, DEFAULT_PAGE_SIZE)
            .await
            .unwrap()
            .is_empty());
    }
}
