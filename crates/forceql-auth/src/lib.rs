//! # forceql-auth
//!
//! Authentication for the forceql data context.
//!
//! The only flow this crate implements is the OAuth 2.0 resource-owner
//! password grant ("impersonation"): client id/secret plus end-user
//! credentials are traded for an access token and the instance URL of the
//! org the token is valid for. The [`Session`] type owns the token
//! lifecycle: it authenticates lazily, hands out the current token, and
//! re-authenticates exactly once when the transport reports an
//! authorization failure.
//!
//! ## Security
//!
//! - Secrets (password, security token, client secret, access token) are
//!   redacted in `Debug` output.
//! - Tracing spans skip credential parameters.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forceql_auth::{ImpersonationParams, Instance, Session};
//!
//! let params = ImpersonationParams::new(
//!     "client_id",
//!     "client_secret",
//!     "login@mail.com",
//!     "password",
//!     "security_token",
//!     Instance::Production,
//! );
//! let session = Session::new(params);
//! let auth = session.current().await?; // authenticates on first use
//! println!("instance: {}", auth.instance_url);
//! ```

mod credentials;
mod error;
mod oauth;
mod session;

pub use credentials::{ImpersonationParams, Instance};
pub use error::{Error, ErrorKind, Result};
pub use oauth::{OAuthClient, TokenResponse};
pub use session::{AuthState, Session, SessionPhase};

/// Login URL for production orgs.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Login URL for sandbox orgs.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
