use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{MethodRouter, get, post},
};
use cafe_auth::{AuthState, TokenService, TokenState, enforce_permissions};
use cafe_storage::DynStorage;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{
    bootstrap,
    cache::{CacheBackend, CafeListCache},
    config::{AppConfig, StorageBackend},
    handlers,
    middleware as app_middleware,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynStorage,
    pub tokens: Arc<TokenService>,
    pub cafe_cache: CafeListCache,
}

impl AppState {
    pub fn new(storage: DynStorage, tokens: Arc<TokenService>, cafe_cache: CafeListCache) -> Self {
        Self {
            storage,
            tokens,
            cafe_cache,
        }
    }

    /// Connects the configured storage backend and builds the token service
    /// and the cafe-list cache.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let policy = cfg.city_name_policy();
        let storage = match cfg.storage.backend {
            StorageBackend::Memory => cafe_db_memory::create_storage(policy),
            StorageBackend::Postgres => {
                cafe_db_postgres::create_storage(cfg.storage.postgres.clone(), policy).await?
            }
        };
        tracing::info!(
            backend = %cfg.storage.backend,
            case_insensitive_cities = policy.is_case_insensitive(),
            "Storage ready"
        );

        let tokens = Arc::new(TokenService::from_config(&cfg.auth)?);
        if cfg.auth.uses_development_secret() {
            tracing::warn!(
                "auth.signing.secret is the built-in development secret; set CAFE__AUTH__SIGNING__SECRET in production"
            );
        }

        let cafe_cache = CafeListCache::new(
            CacheBackend::from_enabled(cfg.cache.enabled),
            cfg.cache.ttl,
            policy,
        );

        Ok(Self::new(storage, tokens, cafe_cache))
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.tokens.clone())
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(state: &AppState) -> Self {
        TokenState::new(state.tokens.clone(), state.storage.clone())
    }
}

/// Registers `method_router` under `path` both with and without the
/// trailing slash.
fn route_both<S>(router: Router<S>, path: &str, method_router: MethodRouter<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let bare = path.trim_end_matches('/');
    router
        .route(bare, method_router.clone())
        .route(&format!("{bare}/"), method_router)
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let auth = AuthState::from_ref(&state);

    // Cafe API: the permission matrix guards every route
    let mut api = Router::new();
    api = route_both(api, "/cities/", get(handlers::list_cities));
    api = route_both(
        api,
        "/cities/{city}/cafes/",
        get(handlers::list_cafes).post(handlers::create_cafe),
    );
    api = route_both(
        api,
        "/cities/{city}/cafes/{cafe}/",
        axum::routing::put(handlers::replace_cafe)
            .patch(handlers::patch_cafe)
            .delete(handlers::delete_cafe),
    );
    api = route_both(
        api,
        "/cities/{city}/cafes/{cafe}/ratings",
        get(handlers::list_ratings),
    );
    let api = api.route_layer(middleware::from_fn_with_state(auth, enforce_permissions));

    // Public endpoints
    let mut public = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz));
    public = route_both(public, "/token/", post(cafe_auth::obtain_token_handler));
    public = route_both(public, "/token/refresh/", post(cafe_auth::refresh_token_handler));
    public = route_both(public, "/token/verify/", post(cafe_auth::verify_token_handler));
    public = route_both(public, "/register/", post(handlers::register));

    Router::new()
        .merge(public)
        .merge(api)
        .fallback(handlers::not_found)
        .with_state(state)
        // Middleware stack (outermost last: request id -> trace -> compression/cors -> timeout -> body limit)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<app_middleware::RequestId>()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

pub struct CafeServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects storage, seeds bootstrap data and assembles the router.
    pub async fn build(self) -> anyhow::Result<CafeServer> {
        let state = AppState::from_config(&self.config).await?;
        let stats = bootstrap::run(state.storage.as_ref(), &self.config.bootstrap).await?;
        tracing::info!(
            admin_created = stats.admin_created,
            categories = stats.categories,
            "Bootstrap complete"
        );
        let app = build_app(state, &self.config);

        Ok(CafeServer {
            addr: self.addr,
            app,
        })
    }
}

impl CafeServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
