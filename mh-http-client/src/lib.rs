//! MouseHunt HTTP Client Library
//!
//! This library talks to the MouseHunt AJAX and `/api` endpoints on behalf of a
//! hunter, using the hunter's session token and unique hash.
//!
//! # Features
//!
//! - Transparent session refresh: an expired session is revived once and the
//!   call retried
//! - Path queries over deeply nested page documents
//! - Typed records with lenient coercion of stringly-typed fields
//! - Achievement rules (star, crown, checkmark, egg) and crown tier summaries
//! - Secure TLS using rustls (no OpenSSL dependencies)
//! - Async API on tokio
//! - Well-typed errors using thiserror
//!
//! # Example
//!
//! ```no_run
//! use mh_http_client::{Achievement, AchievementService, Credentials, MhClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MhClient::new()?;
//! let credentials = Credentials::new("hg_token", "unique_hash");
//!
//! let snuid = client.resolve_snuid(&credentials, 1234567).await?;
//!
//! // Latest corkboard message
//! let messages = client.fetch_corkboard_messages(&credentials, &snuid, 1).await?;
//! if let Some(message) = messages.first() {
//!     println!("{}", message.body);
//! }
//!
//! // Achievement check
//! let service = AchievementService::new(&client, &credentials);
//! if service.evaluate(Achievement::Crown, &snuid).await? {
//!     println!("Crowned!");
//! }
//! # Ok(())
//! # }
//! ```

pub mod achievements;
mod client;
mod error;
pub mod gateway;
mod journal;
pub mod path;
pub mod records;
pub mod schema;

pub use achievements::{Achievement, AchievementService, CrownSummary, CrownTier};
pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, MhClient, MhClientBuilder};
pub use error::{ExtractError, MhError, SchemaError};
pub use gateway::{ChallengePolicy, Credentials, EndpointRequest, GatewaySettings};
pub use path::{JsonPath, Rows};
