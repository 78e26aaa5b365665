#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_docs)]

//! # `magento-async`
//!
//! An async client for the Magento REST and streaming APIs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use magento_async::{Client, MagentoConfig, Params};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_config(
//!     MagentoConfig::new()
//!         .with_consumer("consumer-key", "consumer-secret")
//!         .with_access_token("token", "token-secret"),
//! )?;
//!
//! let timeline = client
//!     .get("statuses/home_timeline", Params::new().with("count", 20u64))
//!     .await?;
//! println!("{}", timeline.data);
//! # Ok(())
//! # }
//! ```
//!
//! ## Authentication
//!
//! Either an application-only bearer token or OAuth1 user credentials. A
//! configured bearer token always wins. See [`MagentoConfig`] and
//! [`AuthMode`].
//!
//! ## Endpoints
//!
//! Paths are resolved against one of five bases, see [`endpoint::resolve`].
//! Pass a `base` parameter to pick one; paths starting with `media` always go
//! to the upload host.
//!
//! ## Streams
//!
//! ```no_run
//! use magento_async::{Client, Params, StreamEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let mut stream = client.stream("statuses/filter", Params::new().with("track", "rust"))?;
//! while let Some(event) = stream.recv().await {
//!     match event {
//!         StreamEvent::Message(msg) => println!("{msg}"),
//!         StreamEvent::Error(e) => return Err(e.into()),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Authentication mode selection
pub mod auth;
/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
pub mod endpoint;
/// Error types
pub mod error;
pub mod oauth;
pub mod stream;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Request and response types
pub mod types;

pub use crate::auth::{AuthMode, OAuth1Credentials};
pub use crate::client::Client;
pub use crate::config::{Config, MagentoConfig};
pub use crate::endpoint::{Base, Bases};
pub use crate::error::MagentoError;
pub use crate::stream::{
    CloseReason, MessageKind, StreamEvent, StreamOptions, StreamReceiver, StreamState,
};
pub use crate::types::{ApiResponse, FilePart, Method, ParamValue, Params, RateLimitInfo};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::{
        AuthMode, Base, Client, Config, MagentoConfig, MagentoError, StreamEvent, StreamOptions,
        StreamReceiver,
    };
}
