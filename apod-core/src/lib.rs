//! Core library for the `apod` CLI.
//!
//! This crate defines:
//! - A rate-limited client for NASA's Astronomy Picture of the Day API
//! - The query builder and response mapping behind it
//! - Configuration & credentials handling
//!
//! It is used by `apod-cli`, but can also be reused by other binaries or services.

pub mod apod;
pub mod client;
pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod query;
pub mod rate_limit;
pub mod transport;

pub use apod::Apod;
pub use client::NasaClient;
pub use config::Config;
pub use error::{ApodError, Result};
pub use model::{PictureOfDay, RawRecord};
pub use query::ApodQuery;
pub use rate_limit::{Clock, ManualClock, RateLimitOptions, SlidingWindowLimiter, SystemClock};
pub use transport::{ReqwestTransport, Transport};
