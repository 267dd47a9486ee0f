//! Fixtures shared by the integration tests

#![allow(dead_code)]

use order_service::cache::{CacheError, MemoryOrderCache, OrderCache};
use shared::Order;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A valid order in feed wire format
pub fn order_json(order_uid: &str) -> serde_json::Value {
    serde_json::json!({
        "order_uid": order_uid,
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
            "transaction": order_uid,
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
        "items": [{
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
        }],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    })
}

pub fn order(order_uid: &str) -> Order {
    serde_json::from_value(order_json(order_uid)).unwrap()
}

/// Memory cache that counts mutations
pub struct RecordingCache {
    inner: MemoryOrderCache,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl RecordingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: MemoryOrderCache::new(capacity).unwrap(),
            sets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl OrderCache for RecordingCache {
    fn get(&self, order_uid: &str) -> Result<Option<Order>, CacheError> {
        self.inner.get(order_uid)
    }

    fn set(&self, order_uid: &str, order: Order) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(order_uid, order)
    }

    fn delete(&self, order_uid: &str) -> Result<bool, CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(order_uid)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys()
    }
}
