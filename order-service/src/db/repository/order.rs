//! Order Repository
//!
//! The aggregate spans four tables (orders, deliveries, payments,
//! order_items). Writes go through one transaction; reads go through one
//! read transaction so the four rows come from the same snapshot.

use super::{OrderStore, RepoError, RepoResult, UpsertOutcome};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use shared::models::{Delivery, Item, Order, Payment};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of stored orders
    pub async fn count(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn fetch_by_uid(&self, order_uid: &str) -> RepoResult<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT o.order_uid, o.track_number, o.entry, o.locale, o.internal_signature, o.customer_id, o.delivery_service, o.shardkey, o.sm_id, o.date_created, o.oof_shard, \
             d.name AS d_name, d.phone AS d_phone, d.zip AS d_zip, d.city AS d_city, d.address AS d_address, d.region AS d_region, d.email AS d_email, \
             p.\"transaction\" AS p_transaction, p.request_id AS p_request_id, p.currency AS p_currency, p.provider AS p_provider, p.amount AS p_amount, p.payment_dt AS p_payment_dt, p.bank AS p_bank, p.delivery_cost AS p_delivery_cost, p.goods_total AS p_goods_total, p.custom_fee AS p_custom_fee \
             FROM orders o \
             JOIN deliveries d ON d.order_uid = o.order_uid \
             JOIN payments p ON p.order_uid = o.order_uid \
             WHERE o.order_uid = ?",
        )
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT chrt_id, track_number, price, rid, name, sale, size, total_price, nm_id, brand, status FROM order_items WHERE order_uid = ? ORDER BY id",
        )
        .bind(order_uid)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_order(items.into_iter().map(Item::from).collect())
            .map(Some)
    }

    async fn upsert(&self, order: &Order) -> RepoResult<UpsertOutcome> {
        if let Some(existing) = self.fetch_by_uid(&order.order_uid).await?
            && existing.same_content(order)
        {
            tracing::debug!(order_uid = %order.order_uid, "Order unchanged, skipping write");
            return Ok(UpsertOutcome::Unchanged(existing));
        }

        // Dropping the transaction on any error below rolls it back
        let mut tx = self.pool.begin().await?;
        upsert_order_row(&mut tx, order).await?;
        upsert_delivery(&mut tx, &order.order_uid, &order.delivery).await?;
        upsert_payment(&mut tx, &order.order_uid, &order.payment).await?;
        for item in &order.items {
            upsert_item(&mut tx, &order.order_uid, item).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            order_uid = %order.order_uid,
            items = order.items.len(),
            "Order committed"
        );

        let stored = self.fetch_by_uid(&order.order_uid).await?.ok_or_else(|| {
            RepoError::Database(format!("order {} missing after commit", order.order_uid))
        })?;
        Ok(UpsertOutcome::Written(stored))
    }
}

// ── Write helpers (run inside the caller's transaction) ─────────────

async fn upsert_order_row(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature, customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(order_uid) DO UPDATE SET \
         track_number = excluded.track_number, entry = excluded.entry, locale = excluded.locale, \
         internal_signature = excluded.internal_signature, customer_id = excluded.customer_id, \
         delivery_service = excluded.delivery_service, shardkey = excluded.shardkey, sm_id = excluded.sm_id, \
         date_created = excluded.date_created, oof_shard = excluded.oof_shard",
    )
    .bind(&order.order_uid)
    .bind(&order.track_number)
    .bind(&order.entry)
    .bind(&order.locale)
    .bind(&order.internal_signature)
    .bind(&order.customer_id)
    .bind(&order.delivery_service)
    .bind(&order.shardkey)
    .bind(order.sm_id)
    .bind(encode_timestamp(&order.date_created))
    .bind(&order.oof_shard)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_delivery(
    conn: &mut SqliteConnection,
    order_uid: &str,
    delivery: &Delivery,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(order_uid) DO UPDATE SET \
         name = excluded.name, phone = excluded.phone, zip = excluded.zip, city = excluded.city, \
         address = excluded.address, region = excluded.region, email = excluded.email",
    )
    .bind(order_uid)
    .bind(&delivery.name)
    .bind(&delivery.phone)
    .bind(&delivery.zip)
    .bind(&delivery.city)
    .bind(&delivery.address)
    .bind(&delivery.region)
    .bind(&delivery.email)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_payment(
    conn: &mut SqliteConnection,
    order_uid: &str,
    payment: &Payment,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO payments (order_uid, \"transaction\", request_id, currency, provider, amount, payment_dt, bank, delivery_cost, goods_total, custom_fee) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(order_uid) DO UPDATE SET \
         \"transaction\" = excluded.\"transaction\", request_id = excluded.request_id, currency = excluded.currency, \
         provider = excluded.provider, amount = excluded.amount, payment_dt = excluded.payment_dt, bank = excluded.bank, \
         delivery_cost = excluded.delivery_cost, goods_total = excluded.goods_total, custom_fee = excluded.custom_fee",
    )
    .bind(order_uid)
    .bind(&payment.transaction)
    .bind(&payment.request_id)
    .bind(&payment.currency)
    .bind(&payment.provider)
    .bind(payment.amount)
    .bind(payment.payment_dt)
    .bind(&payment.bank)
    .bind(payment.delivery_cost)
    .bind(payment.goods_total)
    .bind(payment.custom_fee)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_item(conn: &mut SqliteConnection, order_uid: &str, item: &Item) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_items (order_uid, rid, chrt_id, track_number, price, name, sale, size, total_price, nm_id, brand, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(order_uid, rid) DO UPDATE SET \
         chrt_id = excluded.chrt_id, track_number = excluded.track_number, price = excluded.price, \
         name = excluded.name, sale = excluded.sale, size = excluded.size, total_price = excluded.total_price, \
         nm_id = excluded.nm_id, brand = excluded.brand, status = excluded.status",
    )
    .bind(order_uid)
    .bind(&item.rid)
    .bind(item.chrt_id)
    .bind(&item.track_number)
    .bind(item.price)
    .bind(&item.name)
    .bind(item.sale)
    .bind(&item.size)
    .bind(item.total_price)
    .bind(item.nm_id)
    .bind(&item.brand)
    .bind(item.status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// RFC 3339 in UTC with just enough fractional digits to be lossless
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_timestamp(raw: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepoError::Corrupt(format!("date_created {raw:?}: {e}")))
}

// ── Row mapping ─────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: String,
    oof_shard: String,
    d_name: String,
    d_phone: String,
    d_zip: String,
    d_city: String,
    d_address: String,
    d_region: String,
    d_email: String,
    p_transaction: String,
    p_request_id: String,
    p_currency: String,
    p_provider: String,
    p_amount: i64,
    p_payment_dt: i64,
    p_bank: String,
    p_delivery_cost: i64,
    p_goods_total: i64,
    p_custom_fee: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<Item>) -> RepoResult<Order> {
        let date_created = decode_timestamp(&self.date_created)?;
        Ok(Order {
            order_uid: self.order_uid,
            track_number: self.track_number,
            entry: self.entry,
            delivery: Delivery {
                name: self.d_name,
                phone: self.d_phone,
                zip: self.d_zip,
                city: self.d_city,
                address: self.d_address,
                region: self.d_region,
                email: self.d_email,
            },
            payment: Payment {
                transaction: self.p_transaction,
                request_id: self.p_request_id,
                currency: self.p_currency,
                provider: self.p_provider,
                amount: self.p_amount,
                payment_dt: self.p_payment_dt,
                bank: self.p_bank,
                delivery_cost: self.p_delivery_cost,
                goods_total: self.p_goods_total,
                custom_fee: self.p_custom_fee,
            },
            items,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shardkey: self.shardkey,
            sm_id: self.sm_id,
            date_created,
            oof_shard: self.oof_shard,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i64,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i64,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            chrt_id: row.chrt_id,
            track_number: row.track_number,
            price: row.price,
            rid: row.rid,
            name: row.name,
            sale: row.sale,
            size: row.size,
            total_price: row.total_price,
            nm_id: row.nm_id,
            brand: row.brand,
            status: row.status,
        }
    }
}
