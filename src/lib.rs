//! Barangay portal - record lifecycle and archival service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Certificates, appointments, blotter, announcements,      │
//! │    events, residents                                        │
//! │  - Archives, settings, dashboard, metrics                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Lifecycle Layer                           │
//! │  - Status machines and CRUD per record                      │
//! │  - Archive/restore, reference numbers, settings             │
//! │  - Notification dispatch (push + email, best effort)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Path-addressed document store (SQLite via sqlx)          │
//! │  - Settings cache (moka)                                    │
//! │  - R2 object storage                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `lifecycle`: Record lifecycles, archive manager, reference numbers, settings
//! - `notify`: Push and email dispatch
//! - `data`: Store port, SQLite store and settings cache
//! - `storage`: Cloudflare R2 uploads
//! - `config`: Configuration management
//! - `error`: Error types and the response envelope

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod storage;

use std::sync::Arc;

use lifecycle::{
    AccountDirectory, AnnouncementService, AppointmentService, ArchiveService, BlotterService,
    CertificateService, DashboardService, EventService, LoggingAccountDirectory,
    ReferenceNumberGenerator, ResidentService, SettingsService,
};
use notify::{
    Dispatcher, EmailSender, HttpEmailSender, HttpPushSender, LogOnlyEmailSender,
    LogOnlyPushSender, NotificationSender,
};

/// Application state shared across all handlers
///
/// Cloned for each request; every service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Document store
    pub store: Arc<dyn data::Store>,

    pub settings: Arc<SettingsService>,
    pub archives: Arc<ArchiveService>,
    pub certificates: Arc<CertificateService>,
    pub appointments: Arc<AppointmentService>,
    pub blotter: Arc<BlotterService>,
    pub announcements: Arc<AnnouncementService>,
    pub events: Arc<EventService>,
    pub residents: Arc<ResidentService>,
    pub dashboard: Arc<DashboardService>,
}

/// Outbound adapters the lifecycle services talk to
pub struct Ports {
    pub push: Arc<dyn NotificationSender>,
    pub email: Arc<dyn EmailSender>,
    pub storage: Arc<dyn storage::ObjectStorage>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl Ports {
    /// Adapters described by the configuration
    ///
    /// Push and email fall back to log-only senders when no endpoint is
    /// configured.
    pub fn from_config(config: &config::AppConfig) -> Result<Self, error::AppError> {
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent(concat!("barangay/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
        );

        let push: Arc<dyn NotificationSender> = match &config.notifications.push.endpoint {
            Some(endpoint) => Arc::new(HttpPushSender::new(
                http_client.clone(),
                endpoint.clone(),
                config.notifications.push.api_key.clone(),
            )),
            None => Arc::new(LogOnlyPushSender),
        };

        let email: Arc<dyn EmailSender> = match &config.notifications.email.endpoint {
            Some(endpoint) => Arc::new(HttpEmailSender::new(
                http_client.clone(),
                endpoint.clone(),
                config.notifications.email.api_key.clone(),
                config.notifications.email.from_address.clone(),
            )),
            None => Arc::new(LogOnlyEmailSender),
        };

        let storage = storage::MediaStorage::new(&config.storage.media, &config.cloudflare)?;

        Ok(Self {
            push,
            email,
            storage: Arc::new(storage),
            accounts: Arc::new(LoggingAccountDirectory),
        })
    }
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the SQLite store
    /// 2. Build outbound adapters from configuration
    /// 3. Wire the lifecycle services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store = data::SqliteStore::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Store opened");

        let ports = Ports::from_config(&config)?;
        tracing::info!(
            push = config.notifications.push.endpoint.is_some(),
            email = config.notifications.email.endpoint.is_some(),
            "Outbound adapters initialized"
        );

        Ok(Self::with_ports(config, Arc::new(store), ports))
    }

    /// Wire every service over the given store and adapters
    pub fn with_ports(config: config::AppConfig, store: Arc<dyn data::Store>, ports: Ports) -> Self {
        let offset = config.barangay.offset();

        let settings = Arc::new(SettingsService::new(
            store.clone(),
            data::SettingsCache::new(config.cache.settings_ttl),
        ));
        let dispatcher = Dispatcher::new(
            ports.push,
            ports.email,
            settings.clone(),
            config.notifications.staff_roles.clone(),
        );
        let archives = Arc::new(ArchiveService::new(store.clone()));
        let references = Arc::new(ReferenceNumberGenerator::new(
            store.clone(),
            config.reference_numbers.strategy,
            offset,
        ));

        let certificates = Arc::new(CertificateService::new(
            store.clone(),
            archives.clone(),
            dispatcher.clone(),
            ports.storage,
            settings.clone(),
        ));
        let appointments = Arc::new(AppointmentService::new(
            store.clone(),
            archives.clone(),
            dispatcher.clone(),
            references.clone(),
            offset,
        ));
        let blotter = Arc::new(BlotterService::new(
            store.clone(),
            archives.clone(),
            dispatcher.clone(),
            references,
            offset,
        ));
        let announcements = Arc::new(AnnouncementService::new(
            store.clone(),
            archives.clone(),
            dispatcher.clone(),
            offset,
        ));
        let events = Arc::new(EventService::new(store.clone(), archives.clone(), offset));
        let residents = Arc::new(ResidentService::new(
            store.clone(),
            archives.clone(),
            dispatcher,
            ports.accounts,
        ));
        let dashboard = Arc::new(DashboardService::new(store.clone()));

        tracing::info!(
            reference_strategy = ?config.reference_numbers.strategy,
            utc_offset_minutes = config.barangay.utc_offset_minutes,
            "Application state initialized successfully"
        );

        Self {
            config: Arc::new(config),
            store,
            settings,
            archives,
            certificates,
            appointments,
            blotter,
            announcements,
            events,
            residents,
            dashboard,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::portal_router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(middleware::from_fn(count_requests))
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if server.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Count every request by method and response status
async fn count_requests(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    response
}

async fn health_check() -> &'static str {
    "OK"
}
