//! Kith Client - Typed HTTP client for the Kith REST API
//!
//! One async method per route, typed with the `kith-core` request and
//! response shapes. List methods take a [`ListParams`] builder that emits the
//! same query keys the server parses.
//!
//! ```no_run
//! # async fn demo() -> kith_client::ClientResult<()> {
//! use kith_client::{FriendParams, KithClient, KithClientConfig};
//!
//! let client = KithClient::new(KithClientConfig::new("http://localhost:3000").with_token("jwt"))?;
//! let favorites = client.list_friends(&FriendParams::new().favorite(true)).await?;
//! println!("{} favorite friends", favorites.total);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod params;

pub use client::{KithClient, KithClientConfig, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult, ErrorBody};
pub use params::{CollectiveParams, ContactParams, EncounterParams, FriendParams, ListParams};
