//! Page fetching: HTTP client with anti-bot measures and the retry wrapper.

pub mod client;
pub mod retry;

pub use client::{FetchClient, PageFetcher};
pub use retry::with_retry;
