//! Order validation
//!
//! Field constraints for the order aggregate. Validation is fail-closed: every
//! rule is checked and all violations are reported together, and any
//! violation rejects the whole order.

use chrono::{DateTime, Utc};
use shared::models::{Delivery, Item, Order, Payment};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use validator::ValidateEmail;

// ── Length limits ───────────────────────────────────────────────────

/// Generic text columns
pub const MAX_TEXT_LEN: usize = 255;

/// Short codes: entry, delivery_service, provider, bank
pub const MAX_CODE_LEN: usize = 50;

pub const MAX_CUSTOMER_ID_LEN: usize = 64;

pub const MAX_ITEM_TRACK_LEN: usize = 32;

pub const MIN_RID_LEN: usize = 5;
pub const MAX_RID_LEN: usize = 64;

pub const MIN_DELIVERY_NAME_LEN: usize = 2;

pub const MIN_ZIP_LEN: usize = 4;
pub const MAX_ZIP_LEN: usize = 12;

/// E.164: `+` then 9 to 15 digits
pub const MIN_PHONE_DIGITS: usize = 9;
pub const MAX_PHONE_DIGITS: usize = 15;

pub const SUPPORTED_LOCALES: [&str; 2] = ["ru", "en"];

pub const MAX_SALE_PERCENT: i64 = 100;

// ── Errors ──────────────────────────────────────────────────────────

/// One broken rule on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path, e.g. `payment.amount` or `items[2].rid`
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Error)]
#[error("order {order_uid:?} failed validation: {}", summary(.violations))]
pub struct ValidationError {
    pub order_uid: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Whether any violation concerns `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn summary(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Entry point ─────────────────────────────────────────────────────

/// Check every constraint of the aggregate
pub fn validate_order(order: &Order) -> Result<(), ValidationError> {
    let mut v = Violations::default();

    v.required_max("order_uid", &order.order_uid, MAX_TEXT_LEN);
    // 查询按去空白后的 UID 查找
    if order.order_uid.trim() != order.order_uid {
        v.push("order_uid", "must not have leading or trailing whitespace");
    }
    v.alphanumeric("track_number", &order.track_number, 1, MAX_TEXT_LEN);
    v.alphanumeric("entry", &order.entry, 1, MAX_CODE_LEN);
    if !SUPPORTED_LOCALES.contains(&order.locale.as_str()) {
        v.push("locale", format!("must be one of {SUPPORTED_LOCALES:?}"));
    }
    v.alphanumeric("customer_id", &order.customer_id, 1, MAX_CUSTOMER_ID_LEN);
    v.ascii("delivery_service", &order.delivery_service, MAX_CODE_LEN);
    v.digits("shardkey", &order.shardkey);
    if order.sm_id <= 0 {
        v.push("sm_id", "must be greater than 0");
    }
    v.digits("oof_shard", &order.oof_shard);
    if order.date_created == DateTime::<Utc>::default() {
        v.push("date_created", "must be set");
    }

    validate_delivery(&mut v, &order.delivery);
    validate_payment(&mut v, &order.payment);

    let mut seen = HashSet::new();
    for (idx, item) in order.items.iter().enumerate() {
        validate_item(&mut v, idx, item);
        if !seen.insert(item.rid.as_str()) {
            v.push(format!("items[{idx}].rid"), "duplicate rid within order");
        }
    }

    if v.0.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            order_uid: order.order_uid.clone(),
            violations: v.0,
        })
    }
}

fn validate_delivery(v: &mut Violations, delivery: &Delivery) {
    let name_len = delivery.name.chars().count();
    if !(MIN_DELIVERY_NAME_LEN..=MAX_TEXT_LEN).contains(&name_len) {
        v.push(
            "delivery.name",
            format!("length must be {MIN_DELIVERY_NAME_LEN}..={MAX_TEXT_LEN}, got {name_len}"),
        );
    }
    if !is_e164(&delivery.phone) {
        v.push("delivery.phone", "must be + followed by 9 to 15 digits");
    }
    let zip_len = delivery.zip.chars().count();
    if !(MIN_ZIP_LEN..=MAX_ZIP_LEN).contains(&zip_len) {
        v.push(
            "delivery.zip",
            format!("length must be {MIN_ZIP_LEN}..={MAX_ZIP_LEN}, got {zip_len}"),
        );
    }
    v.ascii("delivery.city", &delivery.city, MAX_TEXT_LEN);
    v.required_max("delivery.address", &delivery.address, MAX_TEXT_LEN);
    v.required_max("delivery.region", &delivery.region, MAX_TEXT_LEN);
    if !delivery.email.validate_email() {
        v.push("delivery.email", "must be a valid email address");
    }
}

fn validate_payment(v: &mut Violations, payment: &Payment) {
    v.required("payment.transaction", &payment.transaction);
    v.required("payment.currency", &payment.currency);
    v.ascii("payment.provider", &payment.provider, MAX_CODE_LEN);
    v.positive("payment.amount", payment.amount);
    v.positive("payment.payment_dt", payment.payment_dt);
    v.required_max("payment.bank", &payment.bank, MAX_CODE_LEN);
    v.non_negative("payment.delivery_cost", payment.delivery_cost);
    v.non_negative("payment.goods_total", payment.goods_total);
    v.non_negative("payment.custom_fee", payment.custom_fee);
}

fn validate_item(v: &mut Violations, idx: usize, item: &Item) {
    let field = |name: &str| format!("items[{idx}].{name}");

    v.alphanumeric(field("rid"), &item.rid, MIN_RID_LEN, MAX_RID_LEN);
    v.non_negative(field("chrt_id"), item.chrt_id);
    v.alphanumeric(field("track_number"), &item.track_number, 1, MAX_ITEM_TRACK_LEN);
    v.positive(field("price"), item.price);
    v.ascii(field("name"), &item.name, MAX_TEXT_LEN);
    if !(0..=MAX_SALE_PERCENT).contains(&item.sale) {
        v.push(field("sale"), format!("must be within 0..={MAX_SALE_PERCENT}"));
    }
    v.positive(field("total_price"), item.total_price);
    v.positive(field("nm_id"), item.nm_id);
    v.required_max(field("brand"), &item.brand, MAX_TEXT_LEN);
    v.non_negative(field("status"), item.status);
}

/// `+` followed by 9 to 15 ASCII digits
pub fn is_e164(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
}

// ── Collector ───────────────────────────────────────────────────────

#[derive(Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn required(&mut self, field: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        }
    }

    fn required_max(&mut self, field: impl Into<String>, value: &str, max_len: usize) {
        let field = field.into();
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        } else if value.chars().count() > max_len {
            self.push(field, format!("is too long (max {max_len})"));
        }
    }

    /// Unicode letters and digits only, length within `min..=max`
    fn alphanumeric(&mut self, field: impl Into<String>, value: &str, min: usize, max: usize) {
        let field = field.into();
        let len = value.chars().count();
        if len == 0 {
            self.push(field, "must not be empty");
        } else if !(min..=max).contains(&len) {
            self.push(field, format!("length must be {min}..={max}, got {len}"));
        } else if !value.chars().all(char::is_alphanumeric) {
            self.push(field, "must contain only letters and digits");
        }
    }

    fn ascii(&mut self, field: impl Into<String>, value: &str, max_len: usize) {
        let field = field.into();
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        } else if !value.is_ascii() {
            self.push(field, "must be ASCII");
        } else if value.len() > max_len {
            self.push(field, format!("is too long (max {max_len})"));
        }
    }

    fn digits(&mut self, field: impl Into<String>, value: &str) {
        let field = field.into();
        if value.is_empty() {
            self.push(field, "must not be empty");
        } else if !value.bytes().all(|b| b.is_ascii_digit()) {
            self.push(field, "must contain only digits");
        }
    }

    fn positive(&mut self, field: impl Into<String>, value: i64) {
        if value <= 0 {
            self.push(field, "must be greater than 0");
        }
    }

    fn non_negative(&mut self, field: impl Into<String>, value: i64) {
        if value < 0 {
            self.push(field, "must not be negative");
        }
    }
}
