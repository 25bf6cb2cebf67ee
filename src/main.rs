use std::{process, sync::Arc, time::Duration};

use axum::Router;
use notekeep::{
    application::{
        cascade::NotebookDeletion,
        error::AppError,
        ids::{IdAllocator, NOTE_COUNTER, NOTEBOOK_COUNTER},
        notebooks::NotebookService,
        notes::NoteService,
        repos::{NotebooksRepo, NotesRepo, SequenceRepo},
        validation::NotebookValidator,
    },
    cache::{CacheTierStore, MemoryTierStore},
    config::{self, ServiceRole, Settings},
    infra::{
        cache::RedisTierStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{NotebooksState, NotesState, build_notebooks_router, build_notes_router},
        memory::MemoryRepositories,
        peers::{HttpNotebooksPeer, HttpNotesPeer, PeerClient},
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    info!(
        service = settings.role.as_str(),
        addr = %settings.server.addr,
        "starting notekeep"
    );

    let router = match settings.role {
        ServiceRole::Notebooks => build_notebooks_service(&settings).await?,
        ServiceRole::Notes => build_notes_service(&settings).await?,
    };

    serve_http(&settings, router).await
}

struct Repositories {
    sequences: Arc<dyn SequenceRepo>,
    notebooks: Arc<dyn NotebooksRepo>,
    notes: Arc<dyn NotesRepo>,
    db: Option<Arc<PostgresRepositories>>,
}

async fn init_repositories(settings: &Settings) -> Result<Repositories, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!(
            service = settings.role.as_str(),
            "database url is not configured, using in-memory repositories"
        );
        let memory = Arc::new(MemoryRepositories::new());
        return Ok(Repositories {
            sequences: memory.clone(),
            notebooks: memory.clone(),
            notes: memory,
            db: None,
        });
    };

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool, settings.role)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let repositories = Arc::new(PostgresRepositories::new(pool));
    Ok(Repositories {
        sequences: repositories.clone(),
        notebooks: repositories.clone(),
        notes: repositories.clone(),
        db: Some(repositories),
    })
}

async fn build_notebooks_service(settings: &Settings) -> Result<Router, AppError> {
    let repositories = init_repositories(settings).await?;

    let notes_client = PeerClient::new(
        settings.peers.notes_origin.clone(),
        "notes",
        settings.peers.request_timeout,
    )?;
    let deletion = NotebookDeletion::new(
        repositories.notebooks.clone(),
        Arc::new(HttpNotesPeer::new(notes_client)),
    );
    let ids = IdAllocator::new(
        repositories.sequences,
        NOTEBOOK_COUNTER,
        settings.ids.notebooks.clone(),
    );
    let service = NotebookService::new(repositories.notebooks, ids, deletion);

    Ok(build_notebooks_router(NotebooksState {
        notebooks: Arc::new(service),
        db: repositories.db,
    }))
}

async fn build_notes_service(settings: &Settings) -> Result<Router, AppError> {
    let repositories = init_repositories(settings).await?;

    let tiers: Arc<dyn CacheTierStore> = match settings.cache.redis_url.as_deref() {
        Some(url) => Arc::new(RedisTierStore::connect(url, &settings.cache)?),
        None => {
            warn!("redis url is empty, caching the notebook listing in process");
            Arc::new(MemoryTierStore::new())
        }
    };

    let notebooks_client = PeerClient::new(
        settings.peers.notebooks_origin.clone(),
        "notebooks",
        settings.peers.request_timeout,
    )?;
    let validator = NotebookValidator::new(
        tiers,
        Arc::new(HttpNotebooksPeer::new(notebooks_client)),
        settings.cache.fresh_ttl,
    );
    let ids = IdAllocator::new(
        repositories.sequences,
        NOTE_COUNTER,
        settings.ids.notes.clone(),
    );
    let service = NoteService::new(repositories.notes, ids, validator, settings.retry);

    Ok(build_notes_router(NotesState {
        notes: Arc::new(service),
        db: repositories.db,
    }))
}

async fn serve_http(settings: &Settings, router: Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        service = settings.role.as_str(),
        addr = %settings.server.addr,
        "listening"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!("server stopped");
        }
        () = shutdown_deadline(grace) => {
            warn!(
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn shutdown_deadline(grace: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(grace).await;
}
