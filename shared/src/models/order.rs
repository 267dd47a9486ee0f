//! Order Aggregate Model
//!
//! Wire shape of the order feed and of the lookup API. One [`Order`] owns
//! exactly one [`Delivery`], exactly one [`Payment`] and a set of [`Item`]s
//! keyed by `rid`.
//!
//! Missing fields decode to their zero value; rejecting them is left to
//! validation so one incomplete order does not sink its whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order aggregate root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    /// Opaque, may be empty
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// Delivery details (one per order)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details (one per order)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// Order line item, unique within its order by `rid`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

impl Order {
    /// Structural equality of two aggregates.
    ///
    /// Scalars, delivery and payment must match exactly; items are compared
    /// as a set keyed by `rid`, so their order does not matter.
    pub fn same_content(&self, other: &Order) -> bool {
        if self.order_uid != other.order_uid
            || self.track_number != other.track_number
            || self.entry != other.entry
            || self.locale != other.locale
            || self.internal_signature != other.internal_signature
            || self.customer_id != other.customer_id
            || self.delivery_service != other.delivery_service
            || self.shardkey != other.shardkey
            || self.sm_id != other.sm_id
            || self.date_created != other.date_created
            || self.oof_shard != other.oof_shard
            || self.delivery != other.delivery
            || self.payment != other.payment
            || self.items.len() != other.items.len()
        {
            return false;
        }

        let mut ours: Vec<&Item> = self.items.iter().collect();
        let mut theirs: Vec<&Item> = other.items.iter().collect();
        ours.sort_by(|a, b| a.rid.cmp(&b.rid));
        theirs.sort_by(|a, b| a.rid.cmp(&b.rid));
        ours == theirs
    }

    /// Find an item by its `rid`
    pub fn item(&self, rid: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.rid == rid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": "b563feb7b2b84b6test",
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [
            {
                "chrt_id": 9934930,
                "track_number": "WBILMTESTTRACK",
                "price": 453,
                "rid": "ab4219087a764ae0btest",
                "name": "Mascaras",
                "sale": 30,
                "size": "0",
                "total_price": 317,
                "nm_id": 2389212,
                "brand": "Vivienne Sabo",
                "status": 202
            }
        ],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    fn sample() -> Order {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_decode_sample_order() {
        let order = sample();
        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.payment.amount, 1817);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.date_created.timestamp(), 1637907739);
    }

    #[test]
    fn test_json_keeps_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["delivery"]["phone"], "+9720000000");
        assert_eq!(value["items"][0]["chrt_id"], 9934930);
        assert_eq!(value["shardkey"], "9");
    }

    #[test]
    fn test_missing_fields_decode_to_zero_values() {
        let order: Order = serde_json::from_str(r#"{"order_uid": "partial"}"#).unwrap();
        assert_eq!(order.order_uid, "partial");
        assert!(order.entry.is_empty());
        assert_eq!(order.payment.amount, 0);
        assert!(order.items.is_empty());
        assert_eq!(order.date_created, DateTime::<Utc>::default());
    }

    #[test]
    fn test_same_content_ignores_item_order() {
        let mut a = sample();
        let mut second = a.items[0].clone();
        second.rid = "zz4219087a764ae0btest".into();
        a.items.push(second);

        let mut b = a.clone();
        b.items.reverse();

        assert_ne!(a, b);
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_same_content_detects_item_change() {
        let a = sample();
        let mut b = a.clone();
        b.items[0].price += 1;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_same_content_detects_payment_change() {
        let a = sample();
        let mut b = a.clone();
        b.payment.bank = "sber".into();
        assert!(!a.same_content(&b));
    }
}
