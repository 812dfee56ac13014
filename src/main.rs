use std::{process, sync::Arc, time::Duration};

use folio::{
    application::{catalog::CatalogService, error::AppError},
    config,
    infra::{
        content::{FsContentStore, SystemClock},
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Check(args) => run_check(settings, &args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = FsContentStore::new(settings.content.directory.clone(), Arc::new(SystemClock));
    let catalog = Arc::new(CatalogService::new(Arc::new(store)));
    let state = HttpState::new(catalog, &settings.site, settings.content.page_size);

    serve_http(&settings, state).await
}

fn run_check(settings: config::Settings, args: &config::CheckArgs) -> Result<(), AppError> {
    let store = FsContentStore::new(settings.content.directory.clone(), Arc::new(SystemClock));
    let scan = store.scan();

    for skipped in &scan.skipped {
        warn!(
            target = "folio::check",
            file = %skipped.file_name,
            error = %skipped.error,
            "post failed to parse"
        );
    }

    let mut series: Vec<&str> = Vec::new();
    for post in &scan.posts {
        if let Some(name) = post.meta.series.as_deref() {
            if !series.contains(&name) {
                series.push(name);
            }
        }
    }

    // Colliding slugs (`a.md` next to `a.mdx`) still serve, but only one
    // of the files gets the detail view.
    let catalog = CatalogService::new(Arc::new(store));
    let slugs = catalog.all_slugs();
    let mut seen: Vec<&str> = Vec::new();
    for slug in &slugs {
        if seen.contains(&slug.as_str()) {
            warn!(
                target = "folio::check",
                slug = %slug,
                "more than one content file resolves to this slug"
            );
        } else {
            seen.push(slug);
        }
    }

    info!(
        target = "folio::check",
        posts = scan.posts.len(),
        skipped = scan.skipped.len(),
        series = series.len(),
        "content check complete"
    );

    if args.strict && !scan.skipped.is_empty() {
        return Err(AppError::validation(format!(
            "{} content file(s) failed to parse",
            scan.skipped.len()
        )));
    }

    Ok(())
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "folio::serve",
        addr = %settings.server.public_addr,
        "listening for requests"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = drain_deadline(settings.server.graceful_shutdown) => {
            warn!(target = "folio::serve", "graceful shutdown period elapsed, exiting");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "folio::serve", error = %err, "failed to listen for shutdown signal");
    }
}

// Starts counting only once the shutdown signal has fired, so in-flight
// requests get the configured drain window and no more.
async fn drain_deadline(grace: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(grace).await;
}
