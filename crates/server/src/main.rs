//! Scribe server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use scribe_api::AppState;
use scribe_common::{Config, LocalStorage};
use scribe_core::{
    BlogService, CommentService, MediaService, TokenService, UserService, VoteService,
};
use scribe_db::repositories::{
    BlogPostRepository, CommentRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting scribe server...");

    let config = Config::load().context("failed to load configuration")?;

    let db = scribe_db::init(&config)
        .await
        .context("failed to connect to database")?;
    scribe_db::migrate(&db)
        .await
        .context("failed to run migrations")?;
    let db = Arc::new(db);

    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create upload directory {}",
                config.storage.upload_dir.display()
            )
        })?;

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = BlogPostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));

    // Services
    let storage = Arc::new(LocalStorage::new(
        config.storage.upload_dir.clone(),
        config.storage.base_url.clone(),
    ));
    let media_service = MediaService::new(storage, &config.storage);
    media_service
        .install_default_avatar()
        .await
        .context("failed to install default avatar")?;
    let vote_service = VoteService::new(vote_repo, post_repo.clone(), comment_repo.clone());
    let user_service = UserService::new(user_repo.clone(), TokenService::new(&config.auth));
    let blog_service = BlogService::new(
        post_repo.clone(),
        comment_repo.clone(),
        user_repo.clone(),
        vote_service.clone(),
        media_service.clone(),
    );
    let comment_service =
        CommentService::new(comment_repo, post_repo, user_repo, vote_service.clone());

    let state = AppState {
        user_service,
        blog_service,
        comment_service,
        vote_service,
        media_service,
    };

    let app = scribe_api::app(state).nest_service(
        &config.storage.base_url,
        ServeDir::new(&config.storage.upload_dir),
    );

    // Start server with graceful shutdown
    let ip: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid server.host {}", config.server.host))?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!(url = %config.server.url, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
