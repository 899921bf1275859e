//! REST API client for the marketplace backend.
//!
//! Every path is resolved under `{api_url}/{stage}`. When the client holds
//! an access token it is sent as a bearer token on every call.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use groupbuy_core::analytics::{AnalyticsOverview, CustomerSavings, PoolSalesSummary};
use groupbuy_core::error::CoreError;
use groupbuy_core::models::{Pool, PoolRequest, Product};
use groupbuy_core::sources::{PoolSource, ProductSource, RoleSource};
use groupbuy_core::types::DbId;
use groupbuy_core::validation::{NewPool, NewPoolRequest, NewProduct};

use crate::config::ClientConfig;

/// HTTP client for the marketplace API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

/// Body of a successful `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: DbId,
}

/// Filter for `GET /requests`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestQuery {
    ByEmail(String),
    ByPool(DbId),
}

#[derive(Debug, Deserialize)]
struct RoleResponse {
    #[serde(default)]
    role: Option<String>,
}

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the access token.
    #[error("Unauthorized: {body}")]
    Unauthorized { body: String },

    /// Any other non-2xx status.
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    /// HTTP status of the failed call, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Status { status, .. } => Some(*status),
        }
    }

    /// Map into the domain error for a lookup of `entity` with `id`.
    pub fn into_core(self, entity: &'static str, id: DbId) -> CoreError {
        match self.status() {
            Some(404) => CoreError::NotFound { entity, id },
            Some(401) => CoreError::Unauthorized(self.to_string()),
            Some(403) => CoreError::Forbidden(self.to_string()),
            _ => CoreError::Internal(self.to_string()),
        }
    }
}

impl ApiClient {
    /// Build a client for the configured API with its request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.base_url()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    ///
    /// * `base_url` - API root including the stage, e.g. `http://host/prod`.
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Attach (or clear) the bearer token sent with every call.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- products ----

    /// `GET /products`, optionally restricted to one company's products.
    pub async fn get_products(&self, email: Option<&str>) -> Result<Vec<Product>, ApiError> {
        let mut request = self.get("/products");
        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }
        Self::parse_response(request.send().await?).await
    }

    pub async fn get_product(&self, id: DbId) -> Result<Product, ApiError> {
        let response = self.get(&format!("/products/{id}")).send().await?;
        Self::parse_response(response).await
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Created, ApiError> {
        let response = self.post("/products").json(product).send().await?;
        Self::parse_response(response).await
    }

    // ---- pools ----

    /// `GET /pools`, optionally restricted to one company's pools.
    pub async fn get_pools(&self, email: Option<&str>) -> Result<Vec<Pool>, ApiError> {
        let mut request = self.get("/pools");
        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }
        Self::parse_response(request.send().await?).await
    }

    pub async fn get_pool(&self, id: DbId) -> Result<Pool, ApiError> {
        let response = self.get(&format!("/pools/{id}")).send().await?;
        Self::parse_response(response).await
    }

    pub async fn create_pool(&self, pool: &NewPool) -> Result<Created, ApiError> {
        let response = self.post("/pools").json(pool).send().await?;
        Self::parse_response(response).await
    }

    // ---- requests ----

    pub async fn get_requests(&self, query: &RequestQuery) -> Result<Vec<PoolRequest>, ApiError> {
        let request = match query {
            RequestQuery::ByEmail(email) => self.get("/requests").query(&[("email", email.as_str())]),
            RequestQuery::ByPool(pool_id) => self.get("/requests").query(&[("pool_id", pool_id)]),
        };
        Self::parse_response(request.send().await?).await
    }

    /// `POST /pools/{id}/requests` to join a pool.
    pub async fn create_pool_request(
        &self,
        pool_id: DbId,
        request: &NewPoolRequest,
    ) -> Result<Created, ApiError> {
        let response = self
            .post(&format!("/pools/{pool_id}/requests"))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- user ----

    /// `GET /user/role`. A 404 means the user has no role yet.
    pub async fn get_user_role(&self) -> Result<Option<String>, ApiError> {
        let response = self.get("/user/role").send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Backend reports no role assigned");
            return Ok(None);
        }
        let body: RoleResponse = Self::parse_response(response).await?;
        Ok(body.role.filter(|r| !r.is_empty()))
    }

    // ---- analytics ----

    pub async fn get_analytics_overview(&self) -> Result<AnalyticsOverview, ApiError> {
        let response = self.get("/analytics/overview").send().await?;
        Self::parse_response(response).await
    }

    pub async fn get_analytics_pools_sales(&self) -> Result<Vec<PoolSalesSummary>, ApiError> {
        let response = self.get("/analytics/pools-sales").send().await?;
        Self::parse_response(response).await
    }

    pub async fn get_analytics_customers_savings(
        &self,
    ) -> Result<Vec<CustomerSavings>, ApiError> {
        let response = self.get("/analytics/customers-savings").send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or the matching [`ApiError`]
    /// carrying the body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %url, "Access token rejected");
            return Err(ApiError::Unauthorized { body });
        }

        tracing::error!(path = %url, status = status.as_u16(), body = %body, "API call failed");
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ProductSource for ApiClient {
    async fn product(&self, id: DbId) -> Result<Product, CoreError> {
        self.get_product(id)
            .await
            .map_err(|e| e.into_core("Product", id))
    }
}

#[async_trait]
impl PoolSource for ApiClient {
    async fn pool(&self, id: DbId) -> Result<Pool, CoreError> {
        self.get_pool(id).await.map_err(|e| e.into_core("Pool", id))
    }
}

#[async_trait]
impl RoleSource for ApiClient {
    async fn user_role(&self) -> Result<Option<String>, CoreError> {
        self.get_user_role()
            .await
            .map_err(|e| e.into_core("User role", 0))
    }
}
