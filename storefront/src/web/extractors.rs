// storefront/src/web/extractors.rs

use crate::errors::AppError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Customer,
  Admin,
}

/// Caller identity taken from `X-User-ID` / `X-User-Role`.
///
/// Token issuance lives in front of this service; whatever terminates auth
/// forwards these headers.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: Role,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(AppError::Forbidden("Admin access required".to_string()))
    }
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    let Some(user_id) = user_id else {
      warn!("AuthenticatedUser extractor: missing or invalid {} header.", USER_ID_HEADER);
      return ready(Err(AppError::Auth("Authentication required".to_string())));
    };

    let role = match req.headers().get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
      Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
      _ => Role::Customer,
    };
    ready(Ok(AuthenticatedUser { user_id, role }))
  }
}
