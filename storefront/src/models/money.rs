// storefront/src/models/money.rs

//! Conversions between minor units (paisa) and the major-unit numbers the API
//! and the gateway speak.

use serde::Serializer;

/// Orders above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 5_000;
pub const FLAT_SHIPPING_CENTS: i64 = 500;

/// Smallest charge the eSewa sandbox accepts.
const SANDBOX_MIN_CENTS: i64 = 10_000;

/// Largest single payment accepted for initiation (NPR 10,000,000).
pub const MAX_PAYMENT_CENTS: i64 = 1_000_000_000;

/// `None` for NaN, infinities and negative amounts.
pub fn cents_from_major(amount: f64) -> Option<i64> {
  if !amount.is_finite() || amount < 0.0 {
    return None;
  }
  let cents = (amount * 100.0).round();
  if cents >= i64::MAX as f64 {
    return None;
  }
  Some(cents as i64)
}

pub fn major_from_cents(cents: i64) -> f64 {
  cents as f64 / 100.0
}

/// Two-decimal string, e.g. `1500.00`.
pub fn format_major(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub fn shipping_for_subtotal(subtotal_cents: i64) -> i64 {
  if subtotal_cents > FREE_SHIPPING_THRESHOLD_CENTS {
    0
  } else {
    FLAT_SHIPPING_CENTS
  }
}

/// Charged amount in the sandbox: nearest hundred (half rounds up), never below 100.
/// `None` when the rounding would overflow.
pub fn sandbox_amount(cents: i64) -> Option<i64> {
  let hundreds = cents.checked_add(5_000)?.div_euclid(10_000);
  Some(hundreds.checked_mul(10_000)?.max(SANDBOX_MIN_CENTS))
}

pub fn serialize_major<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(major_from_cents(*cents))
}
