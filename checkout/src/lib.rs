// checkout/src/lib.rs

//! Browser side of the Musicaa checkout.
//!
//! [`CheckoutOrchestrator`] turns the shipping form into either a cash-on-delivery
//! order or a staged [`PendingOrder`] plus a gateway redirect.
//! [`ReturnPageFinalizer`] runs when the gateway sends the shopper back: it
//! confirms the payment with the storefront and turns the staged order into a
//! real one at most once. [`FailurePage`] reports abandoned or failed payments.

pub mod api;
pub mod dto;
pub mod error;
pub mod failure;
pub mod finalizer;
pub mod latch;
pub mod orchestrator;
pub mod pending;
pub mod return_params;
pub mod session;

pub use api::{HttpStorefrontApi, StorefrontApi};
pub use error::{ApiError, CheckoutError};
pub use failure::{FailureAction, FailurePage, FailureReport};
pub use finalizer::{FinalizeOutcome, ReturnPageFinalizer};
pub use latch::{LatchGuard, OrderLatch};
pub use orchestrator::{CheckoutMethod, CheckoutOrchestrator, CheckoutOutcome, CheckoutState, Customer, GatewayRedirect, ShippingForm};
pub use pending::{PendingOrder, PendingOrderSlot};
pub use return_params::{EsewaReturnData, ReturnParams, ReturnPayload};
pub use session::{MemorySessionStore, SessionStore};
