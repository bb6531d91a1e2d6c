//! Core types for Shopdesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use self::slug::{Slug, SlugError};
pub use status::*;
