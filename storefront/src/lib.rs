// storefront/src/lib.rs

//! Musicaa storefront server: payments, orders, cart and products over actix-web.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
