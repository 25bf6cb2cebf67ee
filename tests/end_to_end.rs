//! Both services on ephemeral ports, talking over real HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use futures::future::join_all;
use notekeep_api_types::{Note, Notebook};
use reqwest::{Client, Url};
use serde_json::json;
use tokio::net::TcpListener;

use notekeep::application::cascade::NotebookDeletion;
use notekeep::application::ids::{IdAllocator, NOTE_COUNTER, NOTEBOOK_COUNTER};
use notekeep::application::notebooks::NotebookService;
use notekeep::application::notes::NoteService;
use notekeep::application::retry::RetryPolicy;
use notekeep::application::validation::NotebookValidator;
use notekeep::cache::{MemoryTierStore, Tier};
use notekeep::domain::ids::{
    DEFAULT_LENGTH, DEFAULT_MULTIPLIER, DEFAULT_NOTE_SALT, DEFAULT_NOTEBOOK_SALT, IdCodec,
    NOTE_PREFIX, NOTEBOOK_PREFIX,
};
use notekeep::infra::http::{NotebooksState, NotesState, build_notebooks_router, build_notes_router};
use notekeep::infra::memory::MemoryRepositories;
use notekeep::infra::peers::{HttpNotebooksPeer, HttpNotesPeer, PeerClient};

/// Lets a test take a service down and count the requests it receives.
#[derive(Default)]
struct Probe {
    down: AtomicBool,
    hits: Mutex<HashMap<String, usize>>,
}

impl Probe {
    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn hits(&self, method: &str, path: &str) -> usize {
        let hits = self.hits.lock().unwrap();
        hits.get(&format!("{method} {path}")).copied().unwrap_or(0)
    }
}

async fn probe_layer(State(probe): State<Arc<Probe>>, request: Request, next: Next) -> Response {
    let key = format!("{} {}", request.method(), request.uri().path());
    *probe.hits.lock().unwrap().entry(key).or_default() += 1;

    if probe.down.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    next.run(request).await
}

struct Cluster {
    client: Client,
    notebooks_addr: SocketAddr,
    notes_addr: SocketAddr,
    notebooks_probe: Arc<Probe>,
    notes_probe: Arc<Probe>,
    tiers: Arc<MemoryTierStore>,
}

impl Cluster {
    async fn start() -> Self {
        let notebooks_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let notes_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let notebooks_addr = notebooks_listener.local_addr().unwrap();
        let notes_addr = notes_listener.local_addr().unwrap();
        let timeout = Duration::from_millis(500);

        let notebooks_probe = Arc::new(Probe::default());
        let notes_probe = Arc::new(Probe::default());
        let tiers = Arc::new(MemoryTierStore::new());

        let notebook_repos = Arc::new(MemoryRepositories::new());
        let notes_peer = HttpNotesPeer::new(
            PeerClient::new(origin(notes_addr), "notes", timeout).unwrap(),
        );
        let notebook_codec = IdCodec::new(
            NOTEBOOK_PREFIX,
            DEFAULT_LENGTH,
            DEFAULT_NOTEBOOK_SALT,
            DEFAULT_MULTIPLIER,
        )
        .unwrap();
        let notebooks = NotebookService::new(
            notebook_repos.clone(),
            IdAllocator::new(notebook_repos.clone(), NOTEBOOK_COUNTER, notebook_codec),
            NotebookDeletion::new(notebook_repos, Arc::new(notes_peer)),
        );
        let notebooks_router = build_notebooks_router(NotebooksState {
            notebooks: Arc::new(notebooks),
            db: None,
        });

        let note_repos = Arc::new(MemoryRepositories::new());
        let notebooks_peer = HttpNotebooksPeer::new(
            PeerClient::new(origin(notebooks_addr), "notebooks", timeout).unwrap(),
        );
        let note_codec =
            IdCodec::new(NOTE_PREFIX, DEFAULT_LENGTH, DEFAULT_NOTE_SALT, DEFAULT_MULTIPLIER)
                .unwrap();
        let notes = NoteService::new(
            note_repos.clone(),
            IdAllocator::new(note_repos, NOTE_COUNTER, note_codec),
            NotebookValidator::new(tiers.clone(), Arc::new(notebooks_peer), Duration::from_secs(1)),
            RetryPolicy::new(NonZeroU32::new(2).unwrap(), Duration::from_millis(10)),
        );
        let notes_router = build_notes_router(NotesState {
            notes: Arc::new(notes),
            db: None,
        });

        spawn(notebooks_listener, notebooks_router, notebooks_probe.clone());
        spawn(notes_listener, notes_router, notes_probe.clone());

        Self {
            client: Client::new(),
            notebooks_addr,
            notes_addr,
            notebooks_probe,
            notes_probe,
            tiers,
        }
    }

    fn notebooks(&self, path: &str) -> String {
        format!("http://{}{path}", self.notebooks_addr)
    }

    fn notes(&self, path: &str) -> String {
        format!("http://{}{path}", self.notes_addr)
    }

    fn clear_tiers(&self) {
        for tier in Tier::ALL {
            self.tiers.clear(tier);
        }
    }

    async fn create_notebook(&self, name: &str) -> Notebook {
        let response = self
            .client
            .post(self.notebooks("/api/notebooks"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn create_note(&self, notebook_id: Option<&str>) -> reqwest::Response {
        self.client
            .post(self.notes("/api/notes"))
            .json(&json!({ "title": "t", "content": "c", "notebookId": notebook_id }))
            .send()
            .await
            .unwrap()
    }

    async fn status_of(&self, url: String) -> StatusCode {
        self.client.get(url).send().await.unwrap().status()
    }
}

fn origin(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}")).unwrap()
}

fn spawn(listener: TcpListener, router: Router, probe: Arc<Probe>) {
    let router = router.layer(middleware::from_fn_with_state(probe, probe_layer));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

#[tokio::test]
async fn notes_follow_their_notebook_through_cascade() {
    let cluster = Cluster::start().await;

    let first = cluster.create_notebook("A").await;
    assert_eq!(first.id, "b8ameai");
    let second = cluster.create_notebook("B").await;
    assert_eq!(second.id, "bA1o2RP");

    let response = cluster.create_note(Some(&first.id)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let note: Note = response.json().await.unwrap();
    assert_eq!(note.id, "nyUmPne");
    assert_eq!(note.notebook_id.as_deref(), Some(first.id.as_str()));

    cluster.clear_tiers();
    let listings_before = cluster.notebooks_probe.hits("GET", "/api/notebooks");
    let response = cluster.create_note(Some("bzzzzzz")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        cluster.notebooks_probe.hits("GET", "/api/notebooks") - listings_before,
        1
    );

    cluster.notes_probe.set_down(true);
    let response = cluster
        .client
        .delete(cluster.notebooks(&format!("/api/notebooks/{}", first.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        cluster
            .status_of(cluster.notebooks(&format!("/api/notebooks/{}", first.id)))
            .await,
        StatusCode::OK
    );

    cluster.notes_probe.set_down(false);
    let response = cluster
        .client
        .delete(cluster.notebooks(&format!("/api/notebooks/{}", first.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        cluster
            .status_of(cluster.notes(&format!("/api/notes/{}", note.id)))
            .await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        cluster
            .status_of(cluster.notebooks(&format!("/api/notebooks/{}", first.id)))
            .await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        cluster
            .status_of(cluster.notebooks(&format!("/api/notebooks/{}", second.id)))
            .await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn cascade_without_notes_still_deletes_notebook() {
    let cluster = Cluster::start().await;
    let notebook = cluster.create_notebook("empty").await;

    let response = cluster
        .client
        .delete(cluster.notebooks(&format!("/api/notebooks/{}", notebook.id)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(cluster.notes_probe.hits("DELETE", "/api/notes"), 1);
}

#[tokio::test]
async fn stale_listing_governs_while_notebooks_are_down() {
    let cluster = Cluster::start().await;
    let notebook = cluster.create_notebook("A").await;

    let response = cluster.create_note(Some(&notebook.id)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    cluster.tiers.clear(Tier::Fresh);
    cluster.notebooks_probe.set_down(true);

    let response = cluster.create_note(Some(&notebook.id)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = cluster.create_note(Some("bzzzzzz")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notes_without_a_notebook_skip_validation() {
    let cluster = Cluster::start().await;
    cluster.notebooks_probe.set_down(true);

    let response = cluster.create_note(None).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(cluster.notebooks_probe.hits("GET", "/health"), 0);
    assert_eq!(cluster.notebooks_probe.hits("GET", "/api/notebooks"), 0);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_ids() {
    let cluster = Cluster::start().await;

    let created = join_all((0..8).map(|n| {
        let cluster = &cluster;
        async move { cluster.create_notebook(&format!("nb-{n}")).await }
    }))
    .await;

    let mut ids: Vec<String> = created.into_iter().map(|notebook| notebook.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
