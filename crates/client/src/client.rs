//! HTTP + WebSocket client for one docflow client id.
//!
//! [`DocflowClient`] holds the server URL and the id. Call
//! [`DocflowClient::connect`] to open a live [`ProgressStream`], then
//! [`DocflowClient::upload`] to start a job whose events arrive on it.

use std::path::Path;
use std::time::Duration;

use docflow_core::progress::ProgressEvent;
use docflow_core::storage::FALLBACK_FILE_NAME;
use docflow_core::types::ClientId;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ClientError;

/// How often the stream sends a keep-alive text frame.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Body of the keep-alive text frame. The server ignores its content.
pub const KEEPALIVE_TEXT: &str = "ping";

/// Body of a successful `POST /upload/{client_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub job_id: uuid::Uuid,
}

/// Connection settings for a single client id.
#[derive(Debug)]
pub struct DocflowClient {
    base_url: Url,
    client_id: ClientId,
    http: reqwest::Client,
}

impl DocflowClient {
    /// Create a client for `client_id` against an `http://` or `https://`
    /// server base URL, e.g. `http://localhost:8000`.
    pub fn new(base_url: &str, client_id: ClientId) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;

        match base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ClientError::InvalidUrl(format!(
                    "Unsupported scheme '{other}', expected http or https"
                )))
            }
        }

        Ok(Self {
            base_url,
            client_id,
            http: reqwest::Client::new(),
        })
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// `{base}/upload/{client_id}`
    pub fn upload_url(&self) -> Result<Url, ClientError> {
        endpoint(&self.base_url, "upload", &self.client_id)
    }

    /// `{base}/ws/{client_id}` with the scheme switched to `ws`/`wss`.
    pub fn stream_url(&self) -> Result<Url, ClientError> {
        let mut url = endpoint(&self.base_url, "ws", &self.client_id)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::InvalidUrl(format!("Cannot use {scheme} for {url}")))?;
        Ok(url)
    }

    /// Open the progress stream for this client id.
    pub async fn connect(&self) -> Result<ProgressStream, ClientError> {
        let url = self.stream_url()?;

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to connect to {url}: {e}")))?;

        tracing::info!(client_id = %self.client_id, "Connected to {url}");

        Ok(ProgressStream {
            client_id: self.client_id.clone(),
            ws_stream,
        })
    }

    /// Upload the file at `path` as the `file` multipart field.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse, ClientError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        self.upload_bytes(file_name, data).await
    }

    /// Upload in-memory bytes under `file_name`.
    pub async fn upload_bytes(
        &self,
        file_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let url = self.upload_url()?;
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.into());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let reason = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("no details");
            return Err(ClientError::Upload(format!("{status}: {reason}")));
        }

        response
            .json::<UploadResponse>()
            .await
            .map_err(|e| ClientError::Upload(format!("Unreadable response: {e}")))
    }
}

/// A live progress stream for one client id.
pub struct ProgressStream {
    client_id: ClientId,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ProgressStream {
    /// Read events until a terminal one arrives, calling `on_event` for
    /// each. Sends a keep-alive text frame immediately and then every
    /// `ping_interval`.
    ///
    /// Returns the terminal event, or `None` if the server closed the
    /// stream first.
    pub async fn follow<F>(
        self,
        ping_interval: Duration,
        mut on_event: F,
    ) -> Result<Option<ProgressEvent>, ClientError>
    where
        F: FnMut(&ProgressEvent),
    {
        let client_id = self.client_id;
        let (mut sink, mut stream) = self.ws_stream.split();

        let mut ticker = interval_at(Instant::now() + ping_interval, ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        send_keepalive(&mut sink).await?;

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let event: ProgressEvent = serde_json::from_str(&text)
                            .map_err(|e| ClientError::Protocol(format!("Malformed event: {e}")))?;
                        on_event(&event);

                        if event.is_terminal() {
                            let _ = sink.close().await;
                            return Ok(Some(event));
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(
                            client_id = %client_id,
                            reason = ?frame.map(|f| f.reason.into_owned()),
                            "Server closed the stream",
                        );
                        return Ok(None);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ClientError::Protocol(e.to_string())),
                    None => return Ok(None),
                },

                _ = ticker.tick() => send_keepalive(&mut sink).await?,
            }
        }
    }
}

async fn send_keepalive<S>(sink: &mut S) -> Result<(), ClientError>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(KEEPALIVE_TEXT.into()))
        .await
        .map_err(|e| ClientError::Protocol(format!("Keep-alive failed: {e}")))
}

fn endpoint(base: &Url, route: &str, client_id: &ClientId) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(route)
        .push(client_id.as_str());
    Ok(url)
}
