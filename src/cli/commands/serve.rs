use anyhow::Context;
use clap::Args;
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::{build_router, RouterOptions, Services, Stores};
use crate::auth::{AccessPolicy, JwtVerifier};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::middleware::SecurityContext;
use crate::siblings::HttpSiblings;
use crate::types::ServiceKind;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(
        long,
        default_value = "all",
        help = "Service to mount: all, or a comma separated list of practitioner, facility, individual, examination"
    )]
    pub service: String,

    #[arg(long, help = "Port to bind (overrides CLINIC_API_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Keep records in memory instead of PostgreSQL")]
    pub in_memory: bool,

    #[arg(long, help = "Apply migrations before serving")]
    pub migrate: bool,
}

pub fn parse_services(raw: &str) -> anyhow::Result<Vec<ServiceKind>> {
    if raw.trim() == "all" {
        return Ok(ServiceKind::ALL.to_vec());
    }
    let mut kinds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind: ServiceKind = part.parse().map_err(anyhow::Error::msg)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        anyhow::bail!("no service selected");
    }
    Ok(kinds)
}

pub async fn handle(args: ServeArgs, config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    let mounted = parse_services(&args.service)?;
    info!("Starting Clinic API in {:?} mode", config.environment);

    let verifier = JwtVerifier::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)?;
    let policy = match &config.security.access_policy_file {
        Some(path) => AccessPolicy::from_yaml_file(path).with_context(|| format!("loading access policy {}", path))?,
        None => AccessPolicy::default(),
    };

    let stores = if args.in_memory {
        warn!("Serving from in-memory stores; records are lost on exit");
        Stores::memory()
    } else {
        let manager = DatabaseManager::connect(&config.database).await?;
        if args.migrate {
            manager.migrate().await?;
        }
        Stores::postgres(manager)
    };

    let services = if mounted.len() == ServiceKind::ALL.len() {
        Services::all_local(&stores)
    } else {
        let http = Arc::new(HttpSiblings::new(&config.siblings, verifier.clone())?);
        Services::assemble(&stores, &mounted, http.clone(), http)
    };

    let router = build_router(
        &services,
        SecurityContext::new(verifier, policy),
        &RouterOptions::from_config(&config),
    );

    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let names: Vec<&str> = mounted.iter().map(ServiceKind::as_str).collect();
    info!("Clinic API listening on http://{} (services: {})", bind_addr, names.join(", "));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let crate::app::StoreBackend::Postgres(manager) = &stores.backend {
        manager.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
