//! PostgreSQL-backed stores.
//!
//! Documents are stored whole as JSONB next to the columns they are looked
//! up by. Guarded writes load the row with `SELECT ... FOR UPDATE`, apply the
//! shared guard, and write the document back in the same transaction, which
//! makes every single-document write atomic without cross-table transactions.

use async_trait::async_trait;
use common::{OrderId, ProductId, StoreId, UserId};
use domain::{ItemStatus, Order, Payment, PaymentConfirmation, SalesReport, SellerOrder};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    Result, StoreError, guard,
    store::{OrderStore, PaymentStore, SalesReportStore, SellerOrderStore, WriteOutcome},
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn decode<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(doc)?)
}

fn encode<T: Serialize>(doc: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(doc)?)
}

fn map_insert_error(e: sqlx::Error, entity: &'static str, key: String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Duplicate { entity, key };
    }
    StoreError::Database(e)
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn mutate(
        &self,
        order_id: OrderId,
        f: impl FnOnce(&mut Order) -> WriteOutcome + Send,
    ) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM orders WHERE order_id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Ok(WriteOutcome::Missing);
        };

        let mut order: Order = decode(doc)?;
        let outcome = f(&mut order);
        if outcome == WriteOutcome::Applied {
            sqlx::query("UPDATE orders SET doc = $2 WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .bind(encode(&order)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, buyer, order_date, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.buyer.as_str())
        .bind(order.order_date)
        .bind(encode(order)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "order", order.order_id.to_string()))?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM orders WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        doc.map(decode).transpose()
    }

    async fn list_by_buyer(&self, buyer: &UserId) -> Result<Vec<Order>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM orders WHERE buyer = $1 ORDER BY order_date DESC",
        )
        .bind(buyer.as_str())
        .fetch_all(&self.pool)
        .await?;
        docs.into_iter().map(decode).collect()
    }

    async fn list_ids(&self) -> Result<Vec<OrderId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT order_id FROM orders ORDER BY order_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_item_status(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, |o| {
            guard::order_item_status(o, product_id, expected, target)
        })
        .await
    }

    async fn promote_items(
        &self,
        order_id: OrderId,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, |o| guard::order_promote(o, from, to))
            .await
    }

    async fn remove_item(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, |o| {
            guard::order_remove_item(o, product_id, expected)
        })
        .await
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, |o| guard::order_confirm_payment(o, confirmation))
            .await
    }
}

/// PostgreSQL seller order store.
#[derive(Clone)]
pub struct PostgresSellerOrderStore {
    pool: PgPool,
}

impl PostgresSellerOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn mutate(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        f: impl FnOnce(&mut SellerOrder) -> WriteOutcome + Send,
    ) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM seller_orders WHERE order_id = $1 AND store_id = $2 FOR UPDATE",
        )
        .bind(order_id.as_uuid())
        .bind(store_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(doc) = doc else {
            return Ok(WriteOutcome::Missing);
        };

        let mut order: SellerOrder = decode(doc)?;
        let outcome = f(&mut order);
        if outcome == WriteOutcome::Applied {
            sqlx::query("UPDATE seller_orders SET doc = $3 WHERE order_id = $1 AND store_id = $2")
                .bind(order_id.as_uuid())
                .bind(store_id.as_str())
                .bind(encode(&order)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl SellerOrderStore for PostgresSellerOrderStore {
    async fn insert(&self, order: &SellerOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seller_orders (order_id, store_id, seller, order_date, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.store_id.as_str())
        .bind(order.seller.as_str())
        .bind(order.order_date)
        .bind(encode(order)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                "seller order",
                format!("{}/{}", order.order_id, order.store_id),
            )
        })?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId, store_id: &StoreId) -> Result<Option<SellerOrder>> {
        let doc: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM seller_orders WHERE order_id = $1 AND store_id = $2",
        )
        .bind(order_id.as_uuid())
        .bind(store_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        doc.map(decode).transpose()
    }

    async fn list_by_order(&self, order_id: OrderId) -> Result<Vec<SellerOrder>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM seller_orders WHERE order_id = $1 ORDER BY store_id",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        docs.into_iter().map(decode).collect()
    }

    async fn list_by_seller(&self, seller: &UserId) -> Result<Vec<SellerOrder>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM seller_orders WHERE seller = $1 ORDER BY order_date DESC, store_id",
        )
        .bind(seller.as_str())
        .fetch_all(&self.pool)
        .await?;
        docs.into_iter().map(decode).collect()
    }

    async fn delete(&self, order_id: OrderId, store_id: &StoreId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM seller_orders WHERE order_id = $1 AND store_id = $2")
            .bind(order_id.as_uuid())
            .bind(store_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_item_status(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, |o| {
            guard::seller_item_status(o, product_id, expected, target)
        })
        .await
    }

    async fn remove_item(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, |o| {
            guard::seller_remove_item(o, product_id, expected)
        })
        .await
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, guard::seller_confirm_payment)
            .await
    }
}

/// PostgreSQL payment store.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query("INSERT INTO payments (order_id, doc) VALUES ($1, $2)")
            .bind(payment.order_id.as_uuid())
            .bind(encode(payment)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "payment", payment.order_id.to_string()))?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        doc.map(decode).transpose()
    }

    async fn confirm(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE order_id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Ok(WriteOutcome::Missing);
        };

        let mut payment: Payment = decode(doc)?;
        let outcome = guard::payment_confirm(&mut payment, confirmation);
        if outcome == WriteOutcome::Applied {
            sqlx::query("UPDATE payments SET doc = $2 WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .bind(encode(&payment)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn mark_buyer_notified(&self, order_id: OrderId) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE order_id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Ok(WriteOutcome::Missing);
        };

        let mut payment: Payment = decode(doc)?;
        let outcome = guard::payment_mark_notified(&mut payment);
        if outcome == WriteOutcome::Applied {
            sqlx::query("UPDATE payments SET doc = $2 WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .bind(encode(&payment)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

/// PostgreSQL sales report store.
#[derive(Clone)]
pub struct PostgresSalesReportStore {
    pool: PgPool,
}

impl PostgresSalesReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesReportStore for PostgresSalesReportStore {
    async fn insert(&self, report: &SalesReport) -> Result<()> {
        sqlx::query("INSERT INTO sales_reports (store_id, doc) VALUES ($1, $2)")
            .bind(report.store_id.as_str())
            .bind(encode(report)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "sales report", report.store_id.to_string()))?;
        Ok(())
    }

    async fn get(&self, store_id: &StoreId) -> Result<Option<SalesReport>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM sales_reports WHERE store_id = $1")
                .bind(store_id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        doc.map(decode).transpose()
    }

    async fn replace(&self, report: &SalesReport) -> Result<WriteOutcome> {
        let result = sqlx::query(
            "UPDATE sales_reports SET doc = $2, updated_at = NOW() WHERE store_id = $1",
        )
        .bind(report.store_id.as_str())
        .bind(encode(report)?)
        .execute(&self.pool)
        .await?;
        Ok(if result.rows_affected() > 0 {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Missing
        })
    }
}
