//! Credential configuration for the password grant.
//!
//! All credential types implement custom Debug to redact sensitive data.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

/// Which identity endpoint to authenticate against.
///
/// The selector is the host the token request is sent to; the org's actual
/// instance URL comes back in the token response.
#[derive(Clone, PartialEq, Eq)]
pub enum Instance {
    /// `login.salesforce.com`
    Production,
    /// `test.salesforce.com`
    Sandbox,
    /// A named instance or custom domain, e.g. `eu11`.
    Named(String),
}

impl Instance {
    /// The base URL of the identity endpoint for this selector.
    pub fn login_url(&self) -> String {
        match self {
            Instance::Production => crate::PRODUCTION_LOGIN_URL.to_string(),
            Instance::Sandbox => crate::SANDBOX_LOGIN_URL.to_string(),
            Instance::Named(name) => {
                if name.starts_with("http://") || name.starts_with("https://") {
                    name.trim_end_matches('/').to_string()
                } else {
                    format!("https://{}.salesforce.com", name)
                }
            }
        }
    }
}

impl FromStr for Instance {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "login" | "production" => Instance::Production,
            "test" | "sandbox" => Instance::Sandbox,
            other => Instance::Named(other.to_string()),
        })
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instance::Production => write!(f, "Production"),
            Instance::Sandbox => write!(f, "Sandbox"),
            Instance::Named(name) => write!(f, "Named({})", name),
        }
    }
}

/// Parameters for the resource-owner password grant.
///
/// Sensitive fields are redacted in Debug output to prevent accidental
/// exposure in logs.
#[derive(Clone)]
pub struct ImpersonationParams {
    /// Consumer key (client_id) of the connected app.
    pub client_id: String,
    client_secret: String,
    /// End-user login name.
    pub username: String,
    password: String,
    security_token: String,
    /// Identity endpoint selector.
    pub instance: Instance,
}

impl std::fmt::Debug for ImpersonationParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpersonationParams")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .field("instance", &self.instance)
            .finish()
    }
}

/// On-disk JSON shape. Accepts both conventional snake_case keys and the
/// legacy capitalized spelling used by existing configuration files.
#[derive(Deserialize)]
struct ParamsFile {
    #[serde(alias = "Clientid", alias = "clientId")]
    client_id: String,
    #[serde(alias = "Clientsecret", alias = "clientSecret")]
    client_secret: String,
    #[serde(alias = "Username")]
    username: String,
    #[serde(alias = "Password")]
    password: String,
    #[serde(default, alias = "Securitytoken", alias = "securityToken")]
    security_token: String,
    #[serde(
        default,
        alias = "Instancename",
        alias = "Instacename",
        alias = "instanceName"
    )]
    instance_name: Option<String>,
}

impl ImpersonationParams {
    /// Create new parameters with the given values.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
        instance: Instance,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
            security_token: security_token.into(),
            instance,
        }
    }

    /// Parse parameters from a configuration JSON document.
    ///
    /// The expected document carries client id/secret, username, password,
    /// security token and an instance selector (`"login"`, `"test"` or an
    /// instance name like `"eu11"`).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ParamsFile = serde_json::from_str(json)?;
        let instance = match file.instance_name.as_deref() {
            None | Some("") => Instance::Production,
            // FromStr is infallible
            Some(name) => name.parse().unwrap_or(Instance::Production),
        };

        Ok(Self::new(
            file.client_id,
            file.client_secret,
            file.username,
            file.password,
            file.security_token,
            instance,
        ))
    }

    /// Load parameters from environment variables.
    ///
    /// Required: `FORCEQL_CLIENT_ID`, `FORCEQL_CLIENT_SECRET`,
    /// `FORCEQL_USERNAME`, `FORCEQL_PASSWORD`.
    /// Optional: `FORCEQL_SECURITY_TOKEN`, `FORCEQL_INSTANCE` (default:
    /// production).
    pub fn from_env() -> Result<Self> {
        fn required(name: &str) -> Result<String> {
            std::env::var(name).map_err(|_| Error::new(ErrorKind::EnvVar(name.to_string())))
        }

        let instance = match std::env::var("FORCEQL_INSTANCE") {
            Ok(value) => value.parse().unwrap_or(Instance::Production),
            Err(_) => Instance::Production,
        };

        Ok(Self::new(
            required("FORCEQL_CLIENT_ID")?,
            required("FORCEQL_CLIENT_SECRET")?,
            required("FORCEQL_USERNAME")?,
            required("FORCEQL_PASSWORD")?,
            std::env::var("FORCEQL_SECURITY_TOKEN").unwrap_or_default(),
            instance,
        ))
    }

    /// The password as submitted to the identity endpoint: the user password
    /// with the security token appended.
    pub(crate) fn password_with_token(&self) -> String {
        format!("{}{}", self.password, self.security_token)
    }

    /// Get the client secret (for the token request).
    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}
