use anchorlab::config::AppConfig;
use anchorlab::crypto::PersonalDataCipher;
use anchorlab::db::{seed, PgStore};
use anchorlab::middleware::RateLimiter;
use anchorlab::services::ai::{OpenAiGenerator, TextGenerator};
use anchorlab::services::mailer::Mailer;
use anchorlab::state::{AppState, SharedState};
use anchorlab::web;
use anyhow::anyhow;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get_service,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let cipher = Arc::new(
        PersonalDataCipher::new(&config.enc_key).map_err(|e| anyhow!("APP_ENC_KEY rejected: {e}"))?,
    );
    seed::seed_admin(&pool, &cipher, config.admin_bootstrap.as_ref()).await?;

    let ai = config.openai_api_key.clone().map(|key| {
        Arc::new(OpenAiGenerator::new(key, config.openai_model.clone())) as Arc<dyn TextGenerator>
    });

    let shared: SharedState = Arc::new(AppState {
        store: PgStore::new(pool.clone()),
        pool,
        cipher,
        ai,
        mailer: Mailer::new(config.mail.clone()),
        session_key: config.session_key.clone(),
        login_limiter: RateLimiter::for_login(),
        config: Arc::new(config.clone()),
    });

    let cors = match config.public_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        _ => CorsLayer::permissive(),
    };

    let static_handler = ServeDir::new("static").not_found_service(ServeFile::new("static/index.html"));

    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .fallback_service(get_service(static_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        );

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
