use std::time::Duration;

use anyhow::Context;

use chrono::{DateTime, Utc};

use reqwest::{Client, StatusCode};

use secrecy::Secret;

use serde::{Deserialize, Serialize};

use thiserror::Error;

use url::Url;

const USER_AGENT: &str = concat!("member-card/", env!("CARGO_PKG_VERSION"));

/// Orders come back at most 20 to a page, alongside an opaque continuation
/// cursor
pub const PAGE_SIZE: usize = 20;

/// Failure taxonomy for the commerce orders API
#[derive(Debug, Error)]
pub enum CommerceError {
    /// The store is having problems; the caller may retry later
    #[error("commerce API unavailable ({0}), try again later")]
    Transient(StatusCode),

    /// The configured API key was rejected; requires operator intervention
    #[error("commerce API rejected the configured API key")]
    Authentication,

    /// The request itself is bogus; a code or configuration bug
    #[error("commerce API rejected the request ({0})")]
    BadRequest(StatusCode),

    /// A success shape we are not prepared for (204 already means "empty")
    #[error("unexpected commerce API success response ({0})")]
    ProtocolViolation(StatusCode),

    #[error("failed to call commerce API")]
    Http(#[from] reqwest::Error),
}

/// Filters applied to the first page of an orders listing.
/// The API forbids combining these with a continuation cursor.
#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub modified_after: Option<DateTime<Utc>>,
}

/// One page of orders plus the cursor for the next, if any
#[derive(Debug)]
pub struct OrdersPage {
    pub orders: Vec<Order>,
    pub next_cursor: Option<String>,
}

/// An order as the store reports it. Never persisted verbatim; a JSON
/// snapshot rides along on the derived ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub modified_on: DateTime<Utc>,
    pub customer_email: String,
    #[serde(default)]
    pub billing_address: Option<BillingAddress>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    /// Billing name, used as the member's display name on the ledger row
    pub fn full_name(&self) -> String {
        match &self.billing_address {
            Some(addr) => format!("{} {}", addr.first_name, addr.last_name)
                .trim()
                .to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    #[serde(default)]
    result: Vec<Order>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    next_page_cursor: Option<String>,
}

/// Client for the store's commerce orders API
#[derive(Debug)]
pub struct CommerceClient {
    client: Client,
    api_orders_url: Url,
    api_key: Secret<String>,
}

impl CommerceClient {
    pub fn new(
        api_base_url: Url,
        api_key: Secret<String>,
        api_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build http client")?;

        let api_orders_url = api_base_url
            .join("1.0/commerce/orders")
            .context("Failed to create orders endpoint URL")?;

        Ok(Self {
            client,
            api_orders_url,
            api_key,
        })
    }

    /// Fetch a single page of orders, by modification date.
    /// Pass the cursor from the previous page to continue a listing.
    #[tracing::instrument(name = "Fetch orders page", skip(self, filters))]
    pub async fn fetch_orders(
        &self,
        cursor: Option<&str>,
        filters: &OrderFilters,
    ) -> Result<OrdersPage, CommerceError> {
        use secrecy::ExposeSecret;

        let mut req = self
            .client
            .get(self.api_orders_url.clone())
            .bearer_auth(self.api_key.expose_secret());

        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        } else if let Some(after) = filters.modified_after {
            req = req.query(&[("modifiedAfter", after.to_rfc3339())]);
        }

        let res = req.send().await?;

        match res.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let envelope: OrdersEnvelope = res.json().await?;
                Ok(OrdersPage {
                    orders: envelope.result,
                    next_cursor: envelope.pagination.next_page_cursor,
                })
            }
            StatusCode::NO_CONTENT => Ok(OrdersPage {
                orders: Vec::new(),
                next_cursor: None,
            }),
            StatusCode::UNAUTHORIZED => Err(CommerceError::Authentication),
            status if status.is_success() => Err(CommerceError::ProtocolViolation(status)),
            status if status.is_server_error() => Err(CommerceError::Transient(status)),
            status => Err(CommerceError::BadRequest(status)),
        }
    }

    /// Page through every order matching `filters`, one page in memory at a
    /// time. Each call starts a fresh listing.
    pub fn orders(&self, filters: OrderFilters) -> OrderPager<'_> {
        OrderPager {
            client: self,
            filters,
            cursor: None,
            exhausted: false,
        }
    }
}

/// Explicit pager over the orders listing
pub struct OrderPager<'a> {
    client: &'a CommerceClient,
    filters: OrderFilters,
    cursor: Option<String>,
    exhausted: bool,
}

impl OrderPager<'_> {
    pub fn has_next(&self) -> bool {
        !self.exhausted
    }

    /// The next page of orders, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<Order>>, CommerceError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .client
            .fetch_orders(self.cursor.as_deref(), &self.filters)
            .await?;

        self.cursor = page.next_cursor;
        if self.cursor.is_none() {
            self.exhausted = true;
        }

        Ok(Some(page.orders))
    }
}
