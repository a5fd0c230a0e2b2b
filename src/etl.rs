use serde::Serialize;

use thiserror::Error;

use crate::client::{CommerceClient, CommerceError, LineItem, Order, OrderFilters};
use crate::model::NewAnnualMembership;
use crate::repo::{Ledger, RecordOutcome};

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Counters for one sync run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EtlReport {
    /// Orders seen
    pub processed: usize,
    /// Ledger rows created
    pub created: usize,
    /// Orders with no qualifying line item
    pub skipped: usize,
}

/// Reconcile store orders into the membership ledger.
///
/// Incremental runs resume from the ledger high-water mark; `load_all`
/// re-reads the whole order history. Both are safe to repeat: inserts are
/// conflict-checked on `source_order_id`, so a replayed order is a no-op,
/// and the checkpoint is the committed ledger max, so a failed run never
/// advances it past durable rows.
#[tracing::instrument(name = "Sync membership orders", skip(commerce, ledger))]
pub async fn sync(
    commerce: &CommerceClient,
    ledger: &impl Ledger,
    membership_sku: &str,
    load_all: bool,
) -> Result<EtlReport, EtlError> {
    let modified_after = if load_all {
        None
    } else {
        ledger.last_ingested_at().await?
    };

    let mut report = EtlReport::default();
    let mut pager = commerce.orders(OrderFilters { modified_after });

    while let Some(orders) = pager.next_page().await? {
        for order in &orders {
            report.processed += 1;

            let qualifying: Vec<&LineItem> = order
                .line_items
                .iter()
                .filter(|item| item.sku.as_deref() == Some(membership_sku))
                .collect();

            if qualifying.is_empty() {
                report.skipped += 1;
                continue;
            }

            for item in qualifying {
                let record = normalize(order, item);
                if ledger.record_membership(&record).await? == RecordOutcome::Created {
                    report.created += 1;
                }
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        created = report.created,
        skipped = report.skipped,
        "membership order sync finished"
    );

    Ok(report)
}

/// Normalize one qualifying line item into a ledger record.
/// The customer email is a join key, stored as given apart from case and
/// whitespace; a malformed address still gets a row.
fn normalize(order: &Order, item: &LineItem) -> NewAnnualMembership {
    NewAnnualMembership {
        customer_email: order.customer_email.trim().to_lowercase(),
        full_name: order.full_name(),
        created_on: order.modified_on,
        sku: item.sku.clone().unwrap_or_default(),
        source_order_id: order.id.clone(),
        order_number: order.order_number.clone(),
        payload: serde_json::to_value(order).unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use secrecy::Secret;

    use url::Url;

    use wiremock::matchers::*;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::repo::memory::MemoryLedger;

    use super::*;

    const SKU: &str = "SKU1";

    fn order_json(
        id: &str,
        order_number: &str,
        modified_on: &str,
        email: &str,
        sku: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "orderNumber": order_number,
            "modifiedOn": modified_on,
            "customerEmail": email,
            "billingAddress": {"firstName": "Test", "lastName": "Member"},
            "lineItems": [{"sku": sku, "quantity": 1, "productName": "Annual Membership"}],
        })
    }

    fn page_json(orders: Vec<serde_json::Value>, cursor: Option<&str>) -> serde_json::Value {
        let pagination = match cursor {
            Some(cursor) => serde_json::json!({ "nextPageCursor": cursor }),
            None => serde_json::json!({}),
        };
        serde_json::json!({ "result": orders, "pagination": pagination })
    }

    fn commerce_client(server_uri: &str) -> CommerceClient {
        CommerceClient::new(
            Url::parse(server_uri).unwrap(),
            Secret::new("test-api-key".into()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    async fn mount_single_page(server: &MockServer, orders: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/1.0/commerce/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(orders, None)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn qualifying_order_creates_one_ledger_row() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        mount_single_page(
            &server,
            vec![order_json(
                "order-1",
                "1001",
                "2023-01-01T00:00:00Z",
                "a@x.com",
                SKU,
            )],
        )
        .await;

        let report = sync(&commerce, &ledger, SKU, false).await.unwrap();

        assert_eq!(
            EtlReport {
                processed: 1,
                created: 1,
                skipped: 0
            },
            report
        );
        assert_eq!(1, ledger.membership_count());
    }

    #[tokio::test]
    async fn reingesting_the_same_order_is_a_no_op() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        mount_single_page(
            &server,
            vec![order_json(
                "order-1",
                "1001",
                "2023-01-01T00:00:00Z",
                "a@x.com",
                SKU,
            )],
        )
        .await;

        sync(&commerce, &ledger, SKU, false).await.unwrap();
        let second = sync(&commerce, &ledger, SKU, true).await.unwrap();

        assert_eq!(1, second.processed);
        assert_eq!(0, second.created);
        assert_eq!(1, ledger.membership_count());
    }

    #[tokio::test]
    async fn orders_without_the_membership_sku_are_skipped() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        mount_single_page(
            &server,
            vec![
                order_json("order-1", "1001", "2023-01-01T00:00:00Z", "a@x.com", SKU),
                order_json(
                    "order-2",
                    "1002",
                    "2023-01-02T00:00:00Z",
                    "b@x.com",
                    "SOME-SHIRT",
                ),
            ],
        )
        .await;

        let report = sync(&commerce, &ledger, SKU, false).await.unwrap();

        assert_eq!(
            EtlReport {
                processed: 2,
                created: 1,
                skipped: 1
            },
            report
        );
    }

    #[tokio::test]
    async fn malformed_email_still_gets_a_row() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        mount_single_page(
            &server,
            vec![order_json(
                "order-1",
                "1001",
                "2023-01-01T00:00:00Z",
                "not-an-email",
                SKU,
            )],
        )
        .await;

        let report = sync(&commerce, &ledger, SKU, false).await.unwrap();

        assert_eq!(1, report.created);
        assert_eq!(1, ledger.membership_count());
    }

    #[tokio::test]
    async fn checkpoint_is_the_max_seen_even_out_of_order() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        // Later page carries an older order; the checkpoint must not regress
        Mock::given(method("GET"))
            .and(path("/1.0/commerce/orders"))
            .and(query_param("cursor", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
                vec![order_json(
                    "order-old",
                    "1001",
                    "2023-01-01T00:00:00Z",
                    "a@x.com",
                    SKU,
                )],
                None,
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/1.0/commerce/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
                vec![order_json(
                    "order-new",
                    "1002",
                    "2023-03-01T00:00:00Z",
                    "a@x.com",
                    SKU,
                )],
                Some("page-2"),
            )))
            .mount(&server)
            .await;

        sync(&commerce, &ledger, SKU, false).await.unwrap();

        let expected: DateTime<Utc> = "2023-03-01T00:00:00Z".parse().unwrap();
        assert_eq!(Some(expected), ledger.last_ingested_at().await.unwrap());
    }

    #[tokio::test]
    async fn empty_listing_leaves_checkpoint_unchanged() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        Mock::given(any())
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let report = sync(&commerce, &ledger, SKU, false).await.unwrap();

        assert_eq!(EtlReport::default(), report);
        assert_eq!(None, ledger.last_ingested_at().await.unwrap());
    }

    #[tokio::test]
    async fn incremental_run_resumes_from_the_checkpoint() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        mount_single_page(
            &server,
            vec![order_json(
                "order-1",
                "1001",
                "2023-01-01T00:00:00Z",
                "a@x.com",
                SKU,
            )],
        )
        .await;

        sync(&commerce, &ledger, SKU, false).await.unwrap();

        // The second, incremental run must filter on the ingested max
        server.reset().await;
        let checkpoint: DateTime<Utc> = "2023-01-01T00:00:00Z".parse().unwrap();
        Mock::given(method("GET"))
            .and(path("/1.0/commerce/orders"))
            .and(query_param("modifiedAfter", checkpoint.to_rfc3339()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let report = sync(&commerce, &ledger, SKU, false).await.unwrap();
        assert_eq!(0, report.processed);
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_without_advancing_the_checkpoint() {
        let server = MockServer::start().await;
        let commerce = commerce_client(&server.uri());
        let ledger = MemoryLedger::new();

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = sync(&commerce, &ledger, SKU, false).await.unwrap_err();

        assert!(matches!(err, EtlError::Commerce(CommerceError::Transient(_))));
        assert_eq!(None, ledger.last_ingested_at().await.unwrap());
    }
}
