//! Pocket Mall Storefront library.
//!
//! A single-page shop rendered on the server: the product list with filters
//! and infinite scroll, the product detail page, and a persistent cart.
//! The binary in `main.rs` only wires configuration, telemetry and the
//! listener around [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod pages;
pub mod router;
pub mod routes;
pub mod scroll;
pub mod shop;
pub mod state;
pub mod storage;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
