use clap::Parser;
use emdp_apply_server::api::{build_routes, common};
use emdp_apply_server::core::models::RelayConfig;
use emdp_apply_server::state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    port: u16,

    /// Directory containing the static lab site (for production)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RelayConfig::from_env();

    if config.dropbox.access_token.is_none() && config.dropbox.refresh_token.is_none() {
        tracing::warn!(
            "Dropbox credentials not configured; submissions will fail with upstream-auth errors"
        );
    }

    // 未配置来源白名单时放行所有来源
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any)
    };

    // axum 默认 2MB 请求体上限,放宽到两份文件加上字段余量
    let body_limit =
        axum::extract::DefaultBodyLimit::max(config.max_file_bytes * 2 + 1024 * 1024);

    let app_state = Arc::new(AppState::new(config).expect("Failed to init state"));

    let app = build_routes(app_state)
        .layer(body_limit)
        .layer(cors)
        .layer(axum::middleware::from_fn(common::request_logger));

    // Add static file serving if STATIC_DIR is provided (production mode)
    let app = if let Some(static_dir) = &args.static_dir {
        let index_path = static_dir.join("index.html");
        if static_dir.exists() && index_path.exists() {
            tracing::info!("Serving static files from {:?}", static_dir);
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_path));
            app.fallback_service(serve_dir)
        } else {
            tracing::warn!("Static directory {:?} or index.html not found", static_dir);
            app
        }
    } else {
        app
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("Apply relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}
