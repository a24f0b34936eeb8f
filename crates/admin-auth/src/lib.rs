//! Credential handling for the admin API client
//!
//! Owns everything about the access token that does not require talking to
//! the backend:
//! 1. `store::TokenStore` is the credential-store boundary the client reads
//!    and mutates (get, set, logout, is_authenticated).
//! 2. `store::MemoryTokenStore` keeps the session for the life of the process;
//!    `credentials::FileTokenStore` persists it between runs with a max age.
//! 3. `claims` decodes the unverified `exp` claim used for proactive refresh.
//! 4. `identity` and `token` are the auth endpoints' wire types.

pub mod claims;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod store;
pub mod token;

pub use claims::{expiry_secs, is_expired, is_expired_at};
pub use constants::*;
pub use credentials::FileTokenStore;
pub use error::{Error, Result};
pub use identity::{User, UserStatus};
pub use store::{MemoryTokenStore, StoreFuture, TokenStore};
pub use token::{LoginPayload, LoginResponse, MeResponse, RefreshResponse, RegisterPayload};
