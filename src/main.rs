use std::sync::Arc;

use clap::Parser;
use libris::auth::{Admins, Authenticator};
use libris::avatars::AvatarStore;
use libris::config::{Cli, Config, default_config_dir, default_config_path};
use libris::db::Database;
use libris::handler::{AppState, app};
use tokio::signal;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Determine config path and data directory
    // If --config is provided, use its parent directory for data (database, uploads)
    // Otherwise use ~/.libris/ for both
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => {
            let dir = default_config_dir();
            (default_config_path(), dir)
        }
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt().json().init();
    tracing::info!("libris.svc starting");

    let cfg = Config::new(config_path.to_str().unwrap()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    let avatars = Arc::new(
        AvatarStore::new(data_dir.join(cfg.app.get_uploads_dir()))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to setup avatar storage");
                std::process::exit(1);
            }),
    );
    let auth = Arc::new(Authenticator::from_config(&cfg).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup authenticator");
        std::process::exit(1);
    }));

    if let Err(e) = Admins::new(&db)
        .ensure_default(cfg.auth.admin_username(), cfg.auth.admin_password())
        .await
    {
        tracing::error!(error = %e, "failed to provision admin account");
        std::process::exit(1);
    }

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let app = app(AppState { db, avatars, auth });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("libris.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
    }

    tracing::info!("libris.svc going off, graceful shutdown complete");
}
