//! The pools, requests and analytics views wired to the API.
//!
//! Each view is loaded as a whole, gated by the capabilities of the
//! session's role, and stored in [`ViewState`] as a serializable snapshot.

use serde::Serialize;

use groupbuy_client::api::{Created, RequestQuery};
use groupbuy_client::auth::email_from_token;
use groupbuy_client::ApiClient;
use groupbuy_core::analytics::{
    success_breakdown, summarize, summarize_customers, top_revenue_chart, AnalyticsOverview,
    CustomerSummary, PoolSalesSummary, ProductSalesSummary, RevenueChart, SuccessBreakdown,
    TOP_CHART_SIZE,
};
use groupbuy_core::pool_board::{load_pool_cards, PoolCard};
use groupbuy_core::requests::{enrich, filter_by_phase, EnrichedRequest, RequestFilter, RequestStats};
use groupbuy_core::roles::Role;
use groupbuy_core::session::{Capabilities, Session, SessionStore, TokenSet, KEY_ID_TOKEN};
use groupbuy_core::types::{DbId, Timestamp};
use groupbuy_core::validation::{
    validate_create_pool, validate_join_request, validate_new_product, CreatePoolInput,
    JoinPoolInput, NewProductInput,
};

use crate::error::DashboardError;
use crate::state::{Snapshot, ViewState};

// ---------------------------------------------------------------------------
// View snapshots
// ---------------------------------------------------------------------------

/// Who is signed in and what they may do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub logged_in: bool,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolsView {
    pub role: Option<Role>,
    pub capabilities: Capabilities,
    pub cards: Vec<PoolCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestsView {
    pub email: String,
    pub filter: RequestFilter,
    /// Counters over all requests, regardless of the filter.
    pub stats: RequestStats,
    pub requests: Vec<EnrichedRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsView {
    pub overview: AnalyticsOverview,
    pub success_rate_text: String,
    pub revenue_chart: RevenueChart,
    pub success_breakdown: SuccessBreakdown,
    pub per_product: Vec<ProductSalesSummary>,
    pub pool_sales: Vec<PoolSalesSummary>,
    pub customers: CustomerSummary,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// API client, session and the last loaded views.
pub struct Dashboard<S> {
    api: ApiClient,
    session: Session<S>,
    state: ViewState,
}

impl<S: SessionStore> Dashboard<S> {
    /// The client is given the session's access token, if any.
    pub fn new(api: ApiClient, session: Session<S>) -> Self {
        let api = api.with_access_token(session.access_token());
        Self {
            api,
            session,
            state: ViewState::new(),
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Stored email, or the email claim of the stored ID token.
    pub fn user_email(&self) -> Option<String> {
        self.session.user_email().or_else(|| {
            self.session
                .store()
                .get(KEY_ID_TOKEN)
                .and_then(|t| email_from_token(&t))
        })
    }

    pub async fn role(&self, now: Timestamp) -> Option<Role> {
        self.session.resolve_role(now, &self.api).await
    }

    pub async fn capabilities(&self, now: Timestamp) -> (Option<Role>, Capabilities) {
        let role = self.role(now).await;
        let capabilities = Capabilities::for_role(role.as_ref());
        (role, capabilities)
    }

    // ---- session ----

    pub async fn session_view(&self, now: Timestamp) -> SessionView {
        let (role, capabilities) = self.capabilities(now).await;
        SessionView {
            logged_in: self.session.is_logged_in(now),
            email: self.user_email(),
            role,
            capabilities,
        }
    }

    /// Store tokens obtained from the identity provider.
    pub fn login(&mut self, tokens: &TokenSet, now: Timestamp) -> Result<(), DashboardError> {
        let email = tokens
            .id_token
            .as_deref()
            .and_then(email_from_token)
            .or_else(|| email_from_token(&tokens.access_token));
        self.session.save_tokens(tokens, email.as_deref(), now)?;
        self.api = self
            .api
            .clone()
            .with_access_token(Some(tokens.access_token.clone()));
        self.state.clear();
        tracing::info!(email = ?email, "Session stored");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), DashboardError> {
        self.session.logout()?;
        self.api = self.api.clone().with_access_token(None);
        self.state.clear();
        Ok(())
    }

    // ---- views ----

    /// Load every pool visible to the user. Companies see their own pools.
    pub async fn refresh_pools(
        &mut self,
        now: Timestamp,
    ) -> Result<&Snapshot<PoolsView>, DashboardError> {
        let (role, capabilities) = self.capabilities(now).await;

        let owner = match role {
            Some(Role::Company) => self.user_email(),
            _ => None,
        };
        let pools = self.api.get_pools(owner.as_deref()).await?;
        let cards = load_pool_cards(pools, &self.api, &capabilities, now).await;

        tracing::info!(pools = cards.len(), role = ?role, "Pools view refreshed");
        Ok(self.state.replace_pools(
            PoolsView {
                role,
                capabilities,
                cards,
            },
            now,
        ))
    }

    /// Load the signed-in client's requests with their pool status.
    pub async fn refresh_requests(
        &mut self,
        filter: RequestFilter,
        now: Timestamp,
    ) -> Result<&Snapshot<RequestsView>, DashboardError> {
        if !self.session.is_logged_in(now) {
            return Err(DashboardError::NotLoggedIn);
        }
        let (_, capabilities) = self.capabilities(now).await;
        if !capabilities.can_view_requests {
            return Err(DashboardError::NotPermitted("view pool requests"));
        }
        let email = self.user_email().ok_or(DashboardError::NotLoggedIn)?;

        let requests = self
            .api
            .get_requests(&RequestQuery::ByEmail(email.clone()))
            .await?;
        let enriched = enrich(requests, &self.api, &self.api, now).await;
        let stats = RequestStats::from_requests(&enriched);
        let requests: Vec<EnrichedRequest> = filter_by_phase(&enriched, filter)
            .into_iter()
            .cloned()
            .collect();

        tracing::info!(
            total = stats.total_requests,
            shown = requests.len(),
            filter = ?filter,
            "Requests view refreshed"
        );
        Ok(self.state.replace_requests(
            RequestsView {
                email,
                filter,
                stats,
                requests,
            },
            now,
        ))
    }

    /// Load the company analytics dashboard.
    pub async fn refresh_analytics(
        &mut self,
        now: Timestamp,
    ) -> Result<&Snapshot<AnalyticsView>, DashboardError> {
        if !self.session.is_logged_in(now) {
            return Err(DashboardError::NotLoggedIn);
        }
        let (_, capabilities) = self.capabilities(now).await;
        if !capabilities.can_view_analytics {
            return Err(DashboardError::NotPermitted("view analytics"));
        }

        let (mut overview, pool_sales, customers) = futures::try_join!(
            self.api.get_analytics_overview(),
            self.api.get_analytics_pools_sales(),
            self.api.get_analytics_customers_savings(),
        )?;

        let report = summarize(&pool_sales);
        overview.fill_missing_from(&report.overview);

        let view = AnalyticsView {
            success_rate_text: overview.success_rate_text(),
            overview,
            revenue_chart: top_revenue_chart(&pool_sales, TOP_CHART_SIZE),
            success_breakdown: success_breakdown(&pool_sales),
            per_product: report.per_product,
            pool_sales,
            customers: summarize_customers(customers),
        };

        tracing::info!(
            pools = view.pool_sales.len(),
            customers = view.customers.total_customers,
            "Analytics view refreshed"
        );
        Ok(self.state.replace_analytics(view, now))
    }

    // ---- actions ----

    /// Join a pool. The email defaults to the session's email.
    pub async fn join_pool(
        &self,
        pool_id: DbId,
        input: &JoinPoolInput,
        now: Timestamp,
    ) -> Result<Created, DashboardError> {
        let (_, capabilities) = self.capabilities(now).await;
        if !capabilities.can_join_pool {
            return Err(DashboardError::NotPermitted("join pools"));
        }

        let input = JoinPoolInput {
            email: input.email.clone().or_else(|| self.user_email()),
            quantity: input.quantity,
        };
        let pool = self.api.get_pool(pool_id).await?;
        let request = validate_join_request(&pool, &input, now)?;
        let created = self.api.create_pool_request(pool_id, &request).await?;

        tracing::info!(pool_id, request_id = created.id, quantity = request.quantity, "Joined pool");
        Ok(created)
    }

    pub async fn create_pool(
        &self,
        input: &CreatePoolInput,
        now: Timestamp,
    ) -> Result<Created, DashboardError> {
        let (_, capabilities) = self.capabilities(now).await;
        if !capabilities.can_create_pool {
            return Err(DashboardError::NotPermitted("create pools"));
        }

        let pool = validate_create_pool(input, now.date_naive())?;
        let created = self.api.create_pool(&pool).await?;

        tracing::info!(pool_id = created.id, product_id = pool.product_id, "Pool created");
        Ok(created)
    }

    pub async fn create_product(
        &self,
        input: &NewProductInput,
        now: Timestamp,
    ) -> Result<Created, DashboardError> {
        let (_, capabilities) = self.capabilities(now).await;
        if !capabilities.can_create_pool {
            return Err(DashboardError::NotPermitted("create products"));
        }

        let product = validate_new_product(input)?;
        let created = self.api.create_product(&product).await?;

        tracing::info!(product_id = created.id, name = %product.name, "Product created");
        Ok(created)
    }
}
