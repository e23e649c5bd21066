//! Scripted [`Client`] and [`Authenticator`] doubles for exercising sessions without a network.
//!
//! Every call is recorded so tests can check what would have been sent and how often.

use crate::error::Error;
use crate::oauth::ClientSecrets;
use crate::session::{Authenticator, Client, UploadTransfer};
use crate::youtube_api::types::{ListRequest, ListResponse};
use crate::youtube_api::upload::ChunkOutcome;
use crate::youtube_api::videos::VideoInsert;
use eyre::Context;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockState {
    list_responses: VecDeque<eyre::Result<serde_json::Value>>,
    list_requests: Vec<ListRequest>,
    uploads: Vec<(VideoInsert, PathBuf)>,
    chunks: VecDeque<eyre::Result<ChunkOutcome>>,
    chunk_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Queues the raw JSON body of the next `list` response.
    pub(crate) fn with_list_response(self, response: serde_json::Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .list_responses
            .push_back(Ok(response));
        self
    }

    pub(crate) fn with_list_error(self, error: Error) -> Self {
        self.state
            .lock()
            .unwrap()
            .list_responses
            .push_back(Err(error.into()));
        self
    }

    /// Queues what successive `next_chunk` calls return.
    pub(crate) fn with_chunks(self, chunks: impl IntoIterator<Item = ChunkOutcome>) -> Self {
        self.state
            .lock()
            .unwrap()
            .chunks
            .extend(chunks.into_iter().map(Ok));
        self
    }

    pub(crate) fn with_chunk_error(self, error: Error) -> Self {
        self.state
            .lock()
            .unwrap()
            .chunks
            .push_back(Err(error.into()));
        self
    }

    pub(crate) fn list_requests(&self) -> Vec<ListRequest> {
        self.state.lock().unwrap().list_requests.clone()
    }

    pub(crate) fn uploads(&self) -> Vec<(VideoInsert, PathBuf)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub(crate) fn chunk_calls(&self) -> usize {
        self.state.lock().unwrap().chunk_calls
    }
}

impl Client for MockClient {
    type Upload = MockTransfer;

    async fn begin_upload(
        &self,
        metadata: &VideoInsert,
        media: &Path,
    ) -> eyre::Result<MockTransfer> {
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((metadata.clone(), media.to_path_buf()));
        Ok(MockTransfer {
            state: Arc::clone(&self.state),
        })
    }

    async fn list<T>(&self, request: &ListRequest) -> eyre::Result<ListResponse<T>>
    where
        T: DeserializeOwned,
    {
        let mut state = self.state.lock().unwrap();
        state.list_requests.push(request.clone());
        let response = state
            .list_responses
            .pop_front()
            .unwrap_or_else(|| Err(eyre::eyre!("no scripted list response left")))?;
        serde_json::from_value(response).context("parse scripted list response")
    }
}

#[derive(Debug)]
pub(crate) struct MockTransfer {
    state: Arc<Mutex<MockState>>,
}

impl UploadTransfer for MockTransfer {
    async fn next_chunk(&mut self) -> eyre::Result<ChunkOutcome> {
        let mut state = self.state.lock().unwrap();
        state.chunk_calls += 1;
        state
            .chunks
            .pop_front()
            .unwrap_or_else(|| Err(eyre::eyre!("no scripted chunk left")))
    }
}

#[derive(Debug, Default)]
struct AuthenticatorCalls {
    count: usize,
    scopes: Vec<String>,
    client_id: Option<String>,
}

/// Hands out a fixed client, or refuses consent.
#[derive(Debug)]
pub(crate) struct MockAuthenticator {
    client: Option<MockClient>,
    calls: Mutex<AuthenticatorCalls>,
}

impl MockAuthenticator {
    pub(crate) fn new(client: MockClient) -> Self {
        Self {
            client: Some(client),
            calls: Mutex::default(),
        }
    }

    /// An authenticator whose user always denies access.
    pub(crate) fn refusing() -> Self {
        Self {
            client: None,
            calls: Mutex::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().count
    }

    pub(crate) fn scopes(&self) -> Vec<String> {
        self.calls.lock().unwrap().scopes.clone()
    }

    pub(crate) fn client_id(&self) -> Option<String> {
        self.calls.lock().unwrap().client_id.clone()
    }
}

impl Authenticator for MockAuthenticator {
    type Client = MockClient;

    async fn run_interactive_consent(
        &self,
        secrets: &ClientSecrets,
        scopes: &[&str],
    ) -> eyre::Result<MockClient> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.count += 1;
            calls.scopes = scopes.iter().map(|s| s.to_string()).collect();
            calls.client_id = Some(secrets.client_id.clone());
        }
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Err(Error::credential("access_denied").into()),
        }
    }
}
