// src/store/supabase.rs

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use super::Store;
use crate::config::Config;
use crate::models::{Booking, BookingPatch, Customer, CustomerPatch, NewCustomer};

const BOOKINGS: &str = "bookings";
const CUSTOMERS: &str = "customers";

const MAX_RETRIES: u32 = 3;
const BACKOFF_MS: u64 = 500;

/// [`Store`] backed by the project's PostgREST endpoint (`/rest/v1`).
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_base: Url,
    key: String,
}

impl SupabaseStore {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &Config) -> Result<Self> {
        let rest_base = config
            .supabase_url
            .join("rest/v1/")
            .with_context(|| format!("joining rest path onto {}", config.supabase_url))?;
        Ok(Self {
            client,
            rest_base,
            key: config.service_role_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.rest_base
            .join(table)
            .with_context(|| format!("building URL for table {}", table))
    }

    /// `<table>?select=*&order=id.asc&offset=..&limit=..`
    fn page_url(&self, table: &str, offset: usize, limit: usize) -> Result<Url> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "id.asc")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    /// `<table>?id=eq.<id>`
    fn row_url(&self, table: &str, id: i64) -> Result<Url> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.key))
    }

    async fn get_json_core<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .authorized(self.client.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        checked(resp)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding JSON from {}", url))
    }

    async fn get_json_with_retry<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let mut attempts = 0;
        loop {
            match self.get_json_core(url).await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    let backoff = BACKOFF_MS * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "Exhausted retries");
                    return Err(e);
                }
            }
        }
    }

    async fn patch_row<P: Serialize + ?Sized>(&self, table: &str, id: i64, patch: &P) -> Result<()> {
        let url = self.row_url(table, id)?;
        let resp = self
            .authorized(self.client.patch(url.clone()))
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .with_context(|| format!("PATCH {} failed", url))?;
        checked(resp).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into an error that carries PostgREST's message.
async fn checked(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().clone();
    let body = resp.text().await.unwrap_or_default();
    bail!("{} returned {}: {}", url, status, body.trim())
}

impl Store for SupabaseStore {
    async fn bookings_page(&self, offset: usize, limit: usize) -> Result<Vec<Booking>> {
        let url = self.page_url(BOOKINGS, offset, limit)?;
        self.get_json_with_retry(&url).await
    }

    async fn customers_page(&self, offset: usize, limit: usize) -> Result<Vec<Customer>> {
        let url = self.page_url(CUSTOMERS, offset, limit)?;
        self.get_json_with_retry(&url).await
    }

    async fn update_booking(&self, id: i64, patch: &BookingPatch) -> Result<()> {
        self.patch_row(BOOKINGS, id, patch).await
    }

    async fn delete_booking(&self, id: i64) -> Result<()> {
        let url = self.row_url(BOOKINGS, id)?;
        let resp = self
            .authorized(self.client.delete(url.clone()))
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;
        checked(resp).await?;
        Ok(())
    }

    async fn update_customer(&self, id: i64, patch: &CustomerPatch) -> Result<()> {
        self.patch_row(CUSTOMERS, id, patch).await
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let url = self.table_url(CUSTOMERS)?;
        let resp = self
            .authorized(self.client.post(url.clone()))
            .header("Prefer", "return=representation")
            .json(customer)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        let mut rows: Vec<Customer> = checked(resp)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding inserted customer from {}", url))?;
        rows.pop()
            .ok_or_else(|| anyhow!("POST {} returned no row", url))
    }
}
