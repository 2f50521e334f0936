// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use social_api_server::{
    api::router,
    config::{Config, LOG_FORMAT_ENV},
    mailer::{LogMailer, Mailer, SendGridMailer},
    state::AppState,
    storage::Storage,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let storage = match Storage::open(&config.database_path(), config.storage_timeout) {
        Ok(storage) => storage,
        Err(e) => {
            error!(error = %e, path = %config.database_path().display(), "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.sendgrid_api_key {
        Some(api_key) => match SendGridMailer::new(config.mail.from_email.clone(), api_key.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                error!(error = %e, "Failed to build SendGrid client");
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("SENDGRID_API_KEY not set, welcome emails are only logged");
            Arc::new(LogMailer)
        }
    };

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %config.host, port = config.port, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let env = config.env.clone();
    let rate_limit_enabled = config.rate_limiter.enabled;
    let state = AppState::new(config, storage, mailer);

    let shutdown = CancellationToken::new();
    if rate_limit_enabled {
        tokio::spawn(state.rate_limiter.clone().run_sweeper(shutdown.clone()));
    }

    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, %env, version = env!("CARGO_PKG_VERSION"), "Social API listening (docs at /docs)");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await;

    shutdown.cancel();
    match served {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
