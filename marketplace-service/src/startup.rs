use crate::config::{MarketplaceConfig, StoreBackend};
use crate::handlers;
use crate::middleware::session::session_middleware;
use crate::models::User;
use crate::services::memory_store::MemoryStore;
use crate::services::mongo_store::MongoStore;
use crate::services::notifier::Notifier;
use crate::services::password::hash_password;
use crate::services::pdf::{ChromiumPdfRenderer, PdfRenderer};
use crate::services::revocation::{MemoryRevocations, RedisRevocations, SessionRevocations};
use crate::services::session::SessionService;
use crate::services::store::MarketplaceStore;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{http_request_span, request_id_middleware},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MarketplaceConfig>,
    pub store: Arc<dyn MarketplaceStore>,
    pub sessions: SessionService,
    pub revocations: Arc<dyn SessionRevocations>,
    pub pdf: Arc<dyn PdfRenderer>,
    pub notifier: Notifier,
    pub login_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(
        config: MarketplaceConfig,
        store: Arc<dyn MarketplaceStore>,
        revocations: Arc<dyn SessionRevocations>,
        pdf: Arc<dyn PdfRenderer>,
    ) -> Self {
        let sessions = SessionService::new(
            &config.session.secret,
            config.session.ttl_hours,
            config.session.cookie_name.clone(),
            config.session.secure_cookie,
        );
        let login_limiter = create_ip_rate_limiter(
            config.login_rate_limit.attempts,
            config.login_rate_limit.window_seconds,
        );
        Self {
            config: Arc::new(config),
            notifier: Notifier::new(store.clone()),
            store,
            sessions,
            revocations,
            pdf,
            login_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/session", get(handlers::auth::session))
        .route(
            "/api/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/api/customers/me", get(handlers::customers::my_customer))
        .route(
            "/api/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/api/customers/:id/branches",
            get(handlers::customers::list_branches).post(handlers::customers::create_branch),
        )
        .route(
            "/api/customers/:id/statement",
            get(handlers::statements::customer_statement),
        )
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/api/orders/:id",
            get(handlers::orders::get_order).patch(handlers::orders::patch_order),
        )
        .route(
            "/api/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_bulk_payment),
        )
        .route(
            "/api/transactions/:id",
            axum::routing::delete(handlers::transactions::delete_transaction),
        )
        .route(
            "/api/generate-report",
            post(handlers::reports::generate_sales_report),
        )
        .route(
            "/api/generate-customer-report",
            post(handlers::reports::generate_customer_report),
        )
        .route(
            "/api/messages",
            get(handlers::messages::list_messages).post(handlers::messages::send_message),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            patch(handlers::notifications::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        .route_layer(from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .merge(auth_routes)
        .merge(protected)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span))
        .layer(from_fn(request_id_middleware))
}

async fn connect_store(config: &MarketplaceConfig) -> Result<Arc<dyn MarketplaceStore>, AppError> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    e
                })?;
            store.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn connect_revocations(
    config: &MarketplaceConfig,
) -> Result<Arc<dyn SessionRevocations>, AppError> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisRevocations::connect(url).await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            e
        })?)),
        None => {
            tracing::warn!("REDIS_URL not set; session revocations are kept in process");
            Ok(Arc::new(MemoryRevocations::new()))
        }
    }
}

/// Create the configured admin account on first start.
async fn bootstrap_admin(state: &AppState) -> Result<(), AppError> {
    let Some(admin) = &state.config.bootstrap_admin else {
        return Ok(());
    };
    let email = admin.email.to_lowercase();
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let user = User::new_admin(email, hash_password(&admin.password)?);
    state.store.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, "Bootstrap admin created");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: MarketplaceConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        let revocations = connect_revocations(&config).await?;
        let pdf: Arc<dyn PdfRenderer> = Arc::new(ChromiumPdfRenderer::new(
            config.pdf.chrome_path.clone(),
            Duration::from_secs(config.pdf.timeout_secs),
            config.pdf.work_dir.clone(),
        ));

        let port = config.common.port;
        let state = AppState::new(config, store, revocations, pdf);
        bootstrap_admin(&state).await?;

        let router = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM. Client addresses are kept for the
    /// login rate limiter.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}
