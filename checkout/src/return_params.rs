// checkout/src/return_params.rs

//! Query string the gateway appends when it sends the shopper back.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde::{Deserialize, Deserializer};

/// Fields eSewa packs into the base64 `data` parameter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EsewaReturnData {
  #[serde(default)]
  pub transaction_code: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub total_amount: Option<String>,
  #[serde(default)]
  pub transaction_uuid: Option<String>,
  #[serde(default)]
  pub product_code: Option<String>,
  #[serde(default)]
  pub signed_field_names: Option<String>,
  #[serde(default)]
  pub signature: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(serde_json::Value::String(s)) => Some(s),
    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

/// Outcome of decoding the `data` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnPayload {
  Decoded(EsewaReturnData),
  /// Present but not base64 JSON. Carries the decode error.
  Malformed(String),
  Absent,
}

impl ReturnPayload {
  pub fn decode(token: &str) -> Self {
    let token = token.trim();
    let bytes = match STANDARD.decode(token).or_else(|_| URL_SAFE.decode(token)) {
      Ok(bytes) => bytes,
      Err(e) => return ReturnPayload::Malformed(format!("invalid base64: {}", e)),
    };
    match serde_json::from_slice::<EsewaReturnData>(&bytes) {
      Ok(data) => ReturnPayload::Decoded(data),
      Err(e) => ReturnPayload::Malformed(format!("invalid JSON: {}", e)),
    }
  }

  pub fn data(&self) -> Option<&EsewaReturnData> {
    match self {
      ReturnPayload::Decoded(data) => Some(data),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnParams {
  pub payload: ReturnPayload,
  pub purchase_order_id: Option<String>,
  pub pidx: Option<String>,
  pub total_amount: Option<String>,
}

impl ReturnParams {
  /// Parses a query string, with or without the leading `?`.
  pub fn from_query(query: &str) -> Self {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut payload = ReturnPayload::Absent;
    let mut purchase_order_id = None;
    let mut pidx = None;
    let mut total_amount = None;
    let mut amount = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
      let value = value.trim().to_string();
      if value.is_empty() {
        continue;
      }
      match key.as_ref() {
        "data" => payload = ReturnPayload::decode(&value),
        "purchase_order_id" => purchase_order_id = Some(value),
        "pidx" => pidx = Some(value),
        "total_amount" => total_amount = Some(value),
        "amount" => amount = Some(value),
        _ => {}
      }
    }

    Self {
      payload,
      purchase_order_id,
      pidx,
      total_amount: total_amount.or(amount),
    }
  }

  /// The decoded `transaction_uuid`, else `purchase_order_id`.
  pub fn correlation_id(&self) -> Option<&str> {
    self
      .payload
      .data()
      .and_then(|data| data.transaction_uuid.as_deref())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .or(self.purchase_order_id.as_deref())
  }

  pub fn amount(&self) -> Option<&str> {
    self
      .payload
      .data()
      .and_then(|data| data.total_amount.as_deref())
      .or(self.total_amount.as_deref())
  }

  /// What to quote to support when verification could not finish.
  pub fn support_reference(&self) -> String {
    self
      .correlation_id()
      .or(self.pidx.as_deref())
      .unwrap_or("Unknown")
      .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode(json: &str) -> String {
    url::form_urlencoded::byte_serialize(STANDARD.encode(json).as_bytes()).collect()
  }

  #[test]
  fn decodes_esewa_data_bundle() {
    let data = encode(
      r#"{"transaction_code":"000AWEO","status":"COMPLETE","total_amount":1500.0,"transaction_uuid":"ORDER_1700000000000","product_code":"EPAYTEST"}"#,
    );
    let params = ReturnParams::from_query(&format!("?data={}", data));
    assert_eq!(params.correlation_id(), Some("ORDER_1700000000000"));
    assert_eq!(params.amount(), Some("1500.0"));
    let decoded = params.payload.data().unwrap();
    assert_eq!(decoded.status.as_deref(), Some("COMPLETE"));
  }

  #[test]
  fn falls_back_to_purchase_order_id() {
    let params = ReturnParams::from_query("purchase_order_id=ORDER_42&pidx=abc&amount=75");
    assert_eq!(params.payload, ReturnPayload::Absent);
    assert_eq!(params.correlation_id(), Some("ORDER_42"));
    assert_eq!(params.pidx.as_deref(), Some("abc"));
    assert_eq!(params.amount(), Some("75"));
  }

  #[test]
  fn malformed_bundle_is_tagged_not_fatal() {
    let params = ReturnParams::from_query("data=%25%25%25&purchase_order_id=ORDER_7");
    assert!(matches!(params.payload, ReturnPayload::Malformed(_)));
    assert_eq!(params.correlation_id(), Some("ORDER_7"));

    let not_json = encode("hello");
    let params = ReturnParams::from_query(&format!("data={}", not_json));
    assert!(matches!(params.payload, ReturnPayload::Malformed(ref e) if e.starts_with("invalid JSON")));
    assert_eq!(params.correlation_id(), None);
    assert_eq!(params.support_reference(), "Unknown");
  }
}
