#![allow(dead_code)]
mod db_core;
mod email;
mod error;
mod model;
mod prompt;
mod routes;
mod server_config;
#[cfg(test)]
mod testing;
mod triage;
mod util;

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::{extract::FromRef, Router};
use mimalloc::MiMalloc;
use routes::AppRouter;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use server_config::ServerConfig;
use tokio::{signal, task::JoinHandle};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub http_client: HttpClient,
    pub conn: Arc<DatabaseConnection>,
    pub config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let config = Arc::new(ServerConfig::load()?);

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL is not set in .env file");
    let mut db_options = ConnectOptions::new(db_url);
    db_options.sqlx_logging(false);

    let conn = Database::connect(db_options)
        .await
        .expect("Database connection failed");

    let http_client = reqwest::ClientBuilder::new().use_rustls_tls().build()?;

    let state = ServerState {
        http_client,
        conn: Arc::new(conn),
        config: config.clone(),
    };

    let router = AppRouter::create(state.clone());

    let mut scheduler = JobScheduler::new()
        .await
        .expect("Failed to create scheduler");

    if config.schedule.in_process_cron {
        let state_clone = state.clone();
        let every = Duration::from_secs(config.schedule.cron_every_secs);
        scheduler
            .add(Job::new_repeated_async(every, move |uuid, mut l| {
                let state = state_clone.clone();
                Box::pin(async move {
                    tracing::info!("Job: {}\n Running scheduled triage sweep...", uuid);
                    match triage::runner::run_due_accounts(
                        &state.http_client,
                        &state.conn,
                        &state.config,
                    )
                    .await
                    {
                        Ok(report) => {
                            tracing::info!(
                                "Triage sweep {} finished: ran {}, skipped {}",
                                uuid,
                                report.ran,
                                report.skipped
                            );
                        }
                        Err(e) => {
                            tracing::error!("Triage sweep failed: {:?}", e);
                        }
                    }

                    let next_tick = l.next_tick_for_job(uuid).await;
                    if let Ok(Some(ts)) = next_tick {
                        tracing::info!("Next triage sweep is at {:?}", ts)
                    }
                })
            })?)
            .await?;
    }

    scheduler.set_shutdown_handler(Box::new(move || {
        Box::pin(async move {
            tracing::info!("Shutting down scheduler");
        })
    }));

    match scheduler.start().await {
        Ok(_) => {
            tracing::info!("Scheduler started");
        }
        Err(e) => {
            tracing::error!("Failed to start scheduler: {:?}", e);
        }
    }

    run_server(router, scheduler).await?;

    Ok(())
}

async fn shutdown_signal(mut scheduler: JobScheduler) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            scheduler.shutdown().await.unwrap();
            tracing::info!("Cleanups done, shutting down");
        },
        _ = terminate => {
            scheduler.shutdown().await.unwrap();
            tracing::info!("Cleanups done, shutting down");
        },
    }
}

fn run_server(router: Router, scheduler: JobScheduler) -> JoinHandle<()> {
    tokio::spawn(async {
        let port = env::var("PORT").unwrap_or("5006".to_string());
        tracing::info!("Triage server running on http://0.0.0.0:{}", port);

        let addr = SocketAddr::from(([0, 0, 0, 0], port.parse::<u16>().unwrap()));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal(scheduler))
            .await
            .unwrap();
    })
}
