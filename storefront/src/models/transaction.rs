// storefront/src/models/transaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_gateway", rename_all = "snake_case")]
pub enum PaymentGateway {
  Esewa,
  CreditCard,
  Paypal,
  CashOnDelivery,
}

impl PaymentGateway {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentGateway::Esewa => "esewa",
      PaymentGateway::CreditCard => "credit_card",
      PaymentGateway::Paypal => "paypal",
      PaymentGateway::CashOnDelivery => "cash_on_delivery",
    }
  }

  /// Only eSewa has a hosted payment page wired up.
  pub fn supports_initiation(self) -> bool {
    matches!(self, PaymentGateway::Esewa)
  }
}

impl FromStr for PaymentGateway {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "esewa" => Ok(PaymentGateway::Esewa),
      "credit_card" => Ok(PaymentGateway::CreditCard),
      "paypal" => Ok(PaymentGateway::Paypal),
      "cash_on_delivery" | "cod" => Ok(PaymentGateway::CashOnDelivery),
      other => Err(other.to_string()),
    }
  }
}

impl fmt::Display for PaymentGateway {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
pub enum TransactionStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

impl TransactionStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      TransactionStatus::Pending => "PENDING",
      TransactionStatus::Completed => "COMPLETED",
      TransactionStatus::Failed => "FAILED",
      TransactionStatus::Refunded => "REFUNDED",
    }
  }

  pub fn is_terminal(self) -> bool {
    !matches!(self, TransactionStatus::Pending)
  }

  /// Only PENDING moves, and only to COMPLETED or FAILED.
  pub fn can_transition_to(self, next: TransactionStatus) -> bool {
    self == TransactionStatus::Pending && matches!(next, TransactionStatus::Completed | TransactionStatus::Failed)
  }
}

impl fmt::Display for TransactionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One payment attempt. `product_id` is the client's correlation id.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  pub id: Uuid,
  pub product_id: String,
  pub product_name: String,
  /// Amount charged at the gateway.
  #[serde(rename = "amount", serialize_with = "crate::models::money::serialize_major")]
  pub amount_cents: i64,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
  pub customer_phone: Option<String>,
  pub gateway: PaymentGateway,
  pub status: TransactionStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_pending_transitions() {
    use TransactionStatus::*;
    assert!(Pending.can_transition_to(Completed));
    assert!(Pending.can_transition_to(Failed));
    assert!(!Pending.can_transition_to(Refunded));
    assert!(!Completed.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Completed));
  }

  #[test]
  fn parses_gateways() {
    assert_eq!("eSewa".parse::<PaymentGateway>(), Ok(PaymentGateway::Esewa));
    assert_eq!("cod".parse::<PaymentGateway>(), Ok(PaymentGateway::CashOnDelivery));
    assert!("bitcoin".parse::<PaymentGateway>().is_err());
  }
}
