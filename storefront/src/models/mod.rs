// storefront/src/models/mod.rs

//! Persisted entities. Money fields hold minor units and serialize as major units.

pub mod cart_item;
pub mod money;
pub mod order;
pub mod order_item;
pub mod product;
pub mod transaction;

pub use cart_item::{CartItem, CartLine};
pub use order::{NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus};
pub use order_item::OrderItem;
pub use product::Product;
pub use transaction::{PaymentGateway, Transaction, TransactionStatus};
