//! # gatekey - link-gate key resolver
//!
//! Recovers an access key that sits behind a chain of link-shortener gates.
//!
//! ## Flow
//!
//! - Decode the API base URL smuggled through the landing page's response headers
//! - Request a fresh `keyUrl` from that API
//! - Route the `keyUrl` to the nanolinks, arolinks or lksfy resolver
//! - Chase redirects, scrape pages or replay an encrypted form until the key appears
//!
//! ## Example
//!
//! ```rust,no_run
//! use gatekey::Pipeline;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = Pipeline::new().with_timeout(Duration::from_secs(20));
//!
//!     match pipeline.run().await.key() {
//!         Some(key) => println!("Key: {}", key),
//!         None => eprintln!("No key"),
//!     }
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{
    Cooldown, Pipeline, ResolutionOutcome, ResolutionReport, ResolveRequest, Resolved,
};
pub use error::GateKeyError;
pub use platform::{Endpoints, HttpClientConfig, Provider};

/// Result type alias for gatekey operations
pub type Result<T> = std::result::Result<T, GateKeyError>;
