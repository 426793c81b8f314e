//! Client side of the rental platform REST API (`/api/v1`).

pub mod client;
pub mod demo;
pub mod error;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use demo::DemoBackend;
pub use error::ApiError;
