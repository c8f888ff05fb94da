//! # Cytomine HTTP
//!
//! HTTP transport for the Cytomine client engine, built on `reqwest`.
//!
//! ```rust,ignore
//! use cytomine_http::{HttpConfig, HttpTransport};
//! use cytomine_core::Session;
//!
//! let config = HttpConfig::new("https://demo.cytomine.com")
//!     .with_header("authorization", token);
//! let session = Session::new(HttpTransport::new(config)?);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod config;
mod error;

pub use client::HttpTransport;
pub use config::HttpConfig;
pub use error::{HttpError, HttpResult};
