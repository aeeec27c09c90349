// storefront/src/services/signature.rs

//! HMAC-SHA256 signatures over ordered `name=value` field lists, base64 encoded.

use crate::errors::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Fields eSewa verifies, in signing order.
pub const ESEWA_SIGNED_FIELDS: [&str; 3] = ["total_amount", "transaction_uuid", "product_code"];

/// `a=1,b=2` for the given pairs, order preserved.
pub fn signing_message(fields: &[(&str, &str)]) -> String {
  fields
    .iter()
    .map(|(name, value)| format!("{}={}", name, value))
    .collect::<Vec<_>>()
    .join(",")
}

/// Comma list of the field names, for the `signed_field_names` form field.
pub fn signed_field_names(fields: &[(&str, &str)]) -> String {
  fields.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(",")
}

pub fn sign_message(secret: &str, message: &str) -> Result<String> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
  mac.update(message.as_bytes());
  Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn sign_fields(secret: &str, fields: &[(&str, &str)]) -> Result<String> {
  sign_message(secret, &signing_message(fields))
}
