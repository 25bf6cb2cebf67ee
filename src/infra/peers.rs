//! HTTP clients for calls between the notebook and note services.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use notekeep_api_types::{DeleteNotesByNotebookRequest, IdEntry};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use tracing::debug;

use crate::application::peers::{Cleanup, NotebooksPeer, NotesPeer, PeerError};

use super::error::InfraError;

pub const METRIC_PEER_REQUEST_MS: &str = "notekeep_peer_request_ms";

/// Shared client bound to one peer origin.
#[derive(Clone, Debug)]
pub struct PeerClient {
    client: Client,
    base: Url,
    peer: &'static str,
}

impl PeerClient {
    pub fn new(base: Url, peer: &'static str, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self::with_client(client, base, peer))
    }

    pub fn with_client(client: Client, base: Url, peer: &'static str) -> Self {
        Self { client, base, peer }
    }

    pub fn user_agent() -> &'static str {
        concat!("notekeep/", env!("CARGO_PKG_VERSION"))
    }

    pub fn origin(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, PeerError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PeerError::unreachable(format!("origin `{}` cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, PeerError> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, PeerError> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(
            METRIC_PEER_REQUEST_MS,
            "peer" => self.peer,
            "endpoint" => endpoint
        )
        .record(elapsed_ms);

        match result {
            Ok(response) => {
                debug!(
                    target = "notekeep::infra::peers",
                    peer = self.peer,
                    endpoint,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "peer responded"
                );
                Ok(response)
            }
            Err(err) => Err(PeerError::unreachable(err.to_string())),
        }
    }

    /// `true` only for a 200 from `GET /health`.
    async fn is_live(&self) -> bool {
        let Ok(request) = self.request(Method::GET, &["health"]) else {
            return false;
        };
        match self.send("health", request).await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(err) => {
                debug!(
                    target = "notekeep::infra::peers",
                    peer = self.peer,
                    error = %err,
                    "health probe failed"
                );
                false
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpNotebooksPeer {
    client: PeerClient,
}

impl HttpNotebooksPeer {
    pub fn new(client: PeerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotebooksPeer for HttpNotebooksPeer {
    fn origin(&self) -> &str {
        self.client.origin()
    }

    async fn is_live(&self) -> bool {
        self.client.is_live().await
    }

    async fn list_ids(&self) -> Result<Vec<IdEntry>, PeerError> {
        let request = self.client.request(Method::GET, &["api", "notebooks"])?;
        let response = self.client.send("list_notebooks", request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(PeerError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json::<Vec<IdEntry>>()
            .await
            .map_err(|err| PeerError::Decode(err.to_string()))
    }

    async fn notebook_exists(&self, id: &str) -> Result<bool, PeerError> {
        let request = self.client.request(Method::GET, &["api", "notebooks", id])?;
        let response = self.client.send("get_notebook", request).await?;
        Ok(response.status() == StatusCode::OK)
    }
}

#[derive(Clone, Debug)]
pub struct HttpNotesPeer {
    client: PeerClient,
}

impl HttpNotesPeer {
    pub fn new(client: PeerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotesPeer for HttpNotesPeer {
    fn origin(&self) -> &str {
        self.client.origin()
    }

    async fn is_live(&self) -> bool {
        self.client.is_live().await
    }

    async fn delete_by_notebook(&self, notebook_id: &str) -> Result<Cleanup, PeerError> {
        let body = DeleteNotesByNotebookRequest {
            notebook_id: Some(notebook_id.to_string()),
        };
        let request = self
            .client
            .request(Method::DELETE, &["api", "notes"])?
            .json(&body);
        let response = self.client.send("delete_notes_by_notebook", request).await?;

        match response.status() {
            status if status.is_success() => Ok(Cleanup::Deleted),
            StatusCode::NOT_FOUND => Ok(Cleanup::NoneMatched),
            status => Err(PeerError::Status {
                status: status.as_u16(),
            }),
        }
    }
}
