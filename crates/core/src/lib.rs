//! Pocket Mall Core - Shared types library.
//!
//! This crate provides the domain types used by the storefront and its tests:
//! - `storefront` - The single-page shop (list, detail, cart)
//! - `integration-tests` - End-to-end tests against a fake product API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product ids, prices, products, pagination and list filters
//! - [`query`] - The codec between list state and the address-bar query string

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod query;
pub mod types;

pub use query::ListQuery;
pub use types::*;
