//! Transport seam: the five remote calls everything else is built on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use forceql_auth::{AuthState, Session};
use forceql_client::{ClientConfig, HttpClient, RequestSpec, DEFAULT_API_VERSION};

use crate::entity::FieldMap;
use crate::error::{Error, Result};

/// One page of query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    /// Total number of records matching the query.
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    /// Whether all records are returned (no more pages).
    pub done: bool,
    /// Continuation URL for the next page, when the result set exceeds the
    /// page size.
    #[serde(rename = "nextRecordsUrl", default)]
    pub next_records_url: Option<String>,
    /// The raw rows of this page.
    #[serde(default)]
    pub records: Vec<FieldMap>,
}

/// The remote calls the data context depends on.
///
/// Implemented by [`RestTransport`] for the real service and by stub
/// implementations in tests. These awaits are the only suspension points of
/// the crate.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a translated query and return the first page.
    async fn query(&self, soql: &str) -> Result<QueryPage>;

    /// Follow a continuation URL from a previous page.
    async fn query_next(&self, next_records_url: &str) -> Result<QueryPage>;

    /// Create a record; returns the assigned identity.
    async fn create(&self, object: &str, fields: &FieldMap) -> Result<String>;

    /// Update a record by identity with the given (changed) fields.
    async fn update(&self, object: &str, id: &str, fields: &FieldMap) -> Result<()>;

    /// Delete a record by identity.
    async fn delete(&self, object: &str, id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct CreateResult {
    id: String,
    #[allow(dead_code)]
    success: bool,
}

/// Run a session-authenticated call; on an authorization failure,
/// re-authenticate once and retry the call once. A second authorization
/// failure surfaces to the caller.
macro_rules! with_reauth {
    ($self:ident, $auth:ident => $call:expr) => {{
        let $auth = $self.session.current().await?;
        match $call.await {
            Err(err) if err.is_unauthorized() => {
                let $auth = $self.session.handle_unauthorized(&$auth.access_token).await?;
                $call.await
            }
            other => other,
        }
    }};
}

/// REST implementation of [`Transport`] bound to a [`Session`].
pub struct RestTransport {
    session: Arc<Session>,
    http: HttpClient,
    api_version: String,
}

impl std::fmt::Debug for RestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestTransport")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl RestTransport {
    /// Create a transport with default HTTP configuration.
    pub fn new(session: Arc<Session>) -> Result<Self> {
        Self::with_config(session, ClientConfig::default())
    }

    /// Create a transport with custom HTTP configuration.
    pub fn with_config(session: Arc<Session>, config: ClientConfig) -> Result<Self> {
        let http = HttpClient::new(config)?;
        Ok(Self {
            session,
            http,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Set the API version (e.g. "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn rest_url(&self, auth: &AuthState, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            auth.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    async fn run_query(&self, auth: &AuthState, soql: &str) -> Result<QueryPage> {
        let url = format!(
            "{}?q={}",
            self.rest_url(auth, "query"),
            urlencoding::encode(soql)
        );
        self.http
            .send_json(RequestSpec::get(url).bearer_auth(&auth.access_token))
            .await
            .map_err(Error::from)
    }

    async fn run_query_next(&self, auth: &AuthState, next_url: &str) -> Result<QueryPage> {
        let url = if next_url.starts_with("http://") || next_url.starts_with("https://") {
            next_url.to_string()
        } else {
            format!("{}{}", auth.instance_url, next_url)
        };
        self.http
            .send_json(RequestSpec::get(url).bearer_auth(&auth.access_token))
            .await
            .map_err(Error::from)
    }

    async fn run_create(&self, auth: &AuthState, object: &str, fields: &FieldMap) -> Result<String> {
        let url = self.rest_url(auth, &format!("sobjects/{}", object));
        let result: CreateResult = self
            .http
            .send_json(
                RequestSpec::post(url)
                    .bearer_auth(&auth.access_token)
                    .json(fields)?,
            )
            .await?;
        Ok(result.id)
    }

    async fn run_update(
        &self,
        auth: &AuthState,
        object: &str,
        id: &str,
        fields: &FieldMap,
    ) -> Result<()> {
        let url = self.rest_url(
            auth,
            &format!("sobjects/{}/{}", object, urlencoding::encode(id)),
        );
        self.http
            .send_no_content(
                RequestSpec::patch(url)
                    .bearer_auth(&auth.access_token)
                    .json(fields)?,
            )
            .await
            .map_err(Error::from)
    }

    async fn run_delete(&self, auth: &AuthState, object: &str, id: &str) -> Result<()> {
        let url = self.rest_url(
            auth,
            &format!("sobjects/{}/{}", object, urlencoding::encode(id)),
        );
        self.http
            .send_no_content(RequestSpec::delete(url).bearer_auth(&auth.access_token))
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl Transport for RestTransport {
    #[instrument(skip(self))]
    async fn query(&self, soql: &str) -> Result<QueryPage> {
        with_reauth!(self, auth => self.run_query(&auth, soql))
    }

    #[instrument(skip(self))]
    async fn query_next(&self, next_records_url: &str) -> Result<QueryPage> {
        with_reauth!(self, auth => self.run_query_next(&auth, next_records_url))
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, object: &str, fields: &FieldMap) -> Result<String> {
        with_reauth!(self, auth => self.run_create(&auth, object, fields))
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, object: &str, id: &str, fields: &FieldMap) -> Result<()> {
        with_reauth!(self, auth => self.run_update(&auth, object, id, fields))
    }

    #[instrument(skip(self))]
    async fn delete(&self, object: &str, id: &str) -> Result<()> {
        with_reauth!(self, auth => self.run_delete(&auth, object, id))
    }
}
