use std::{process, sync::Arc};

use batchgate::{
    application::{backend::TransformEngine, batch::BatchService, error::AppError},
    config,
    infra::{
        engine::HttpTransformEngine,
        error::InfraError,
        http::{self, GatewayState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let engine = HttpTransformEngine::new(&settings.engine)?;
    info!(
        engine = %engine.endpoint(),
        timeout_secs = settings.engine.timeout.as_secs(),
        "engine client ready"
    );
    let engine: Arc<dyn TransformEngine> = Arc::new(engine);
    let state = GatewayState::new(BatchService::new(engine), settings.uploads);

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: GatewayState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        addr = %settings.server.addr,
        max_files = settings.uploads.max_files.get(),
        max_file_bytes = settings.uploads.max_file_bytes.get(),
        "gateway listening"
    );

    let stop = Arc::new(Notify::new());
    let drained = {
        let stop = Arc::clone(&stop);
        async move { stop.notified().await }
    };
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(drained)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::server(err.to_string()));
        }
        () = shutdown_signal() => {
            info!("shutdown requested, draining in-flight requests");
            stop.notify_one();
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::server(err.to_string())),
        Err(_) => {
            warn!(
                grace_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
