//! Shopdesk admin library.
//!
//! Catalog and order administration: brands, categories, products,
//! customers and orders, served as a JSON API under `/api` and as
//! server-rendered pages. The binary in `main.rs` wires configuration,
//! logging and Sentry around [`routes::app`]; the CLI and the integration
//! tests reuse the same pieces.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod resources;
pub mod routes;
pub mod services;
pub mod state;
