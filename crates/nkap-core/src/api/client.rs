//! Session-aware client for the nkap REST API.
//!
//! Every request reads the bearer token fresh from the credential store and
//! attaches it when present. A 401 or 403 answer clears the stored token and
//! notifies the registered unauthorized handler before the error is handed
//! back to the caller.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, TOKEN_KEY};

use super::envelope::ApiResponse;
use super::error::CONNECTIVITY_MESSAGE;
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/nkap";

/// Timeout for ordinary JSON requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for multipart uploads.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries for an opted-in GET.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Multipart field the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "image";

/// Content type assumed when the extension is not recognised.
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Pass as `body` to [`ApiClient::request`] when there is none.
pub const NO_BODY: Option<&()> = None;

/// Callback fired when the server rejects the session.
pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Bounded exponential backoff. Only ever applied to GET requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub content_type: Option<String>,
    pub query: Vec<(String, String)>,
    pub retry: Option<RetryPolicy>,
}

impl RequestOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

enum Payload {
    Empty,
    Json(Vec<u8>),
    Multipart(Form),
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    #[serde(default)]
    url: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

struct Inner {
    http: Client,
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    on_unauthorized: RwLock<Option<UnauthorizedHandler>>,
    /// Bumped on every token write, delete and teardown.
    generation: AtomicU64,
    /// Held while the token and generation are read or changed together.
    credential_lock: Mutex<()>,
}

/// The credential a request went out with.
#[derive(Debug, Clone)]
struct Credential {
    token: Option<String>,
    generation: u64,
}

impl Inner {
    fn lock_credential(&self) -> MutexGuard<'_, ()> {
        self.credential_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> Result<Credential, ApiError> {
        let _guard = self.lock_credential();
        Ok(Credential {
            token: self.store.get(TOKEN_KEY)?,
            generation: self.generation.load(Ordering::SeqCst),
        })
    }

    fn store_token(&self, token: &str) -> Result<(), ApiError> {
        let _guard = self.lock_credential();
        self.store.set(TOKEN_KEY, token)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear_token(&self) -> Result<bool, ApiError> {
        let _guard = self.lock_credential();
        let removed = self.store.delete(TOKEN_KEY)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(removed)
    }

    /// Drop the credential `sent` was issued under, if it is still current.
    ///
    /// Returns whether this caller won the teardown and must notify. Later
    /// detectors for the same generation, and requests issued before a
    /// newer login or logout, get `false`.
    fn tear_down(&self, sent: &Credential) -> bool {
        let _guard = self.lock_credential();
        if self.generation.load(Ordering::SeqCst) != sent.generation {
            return false;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        if sent.token.is_some() {
            if let Err(e) = self.store.delete(TOKEN_KEY) {
                warn!(error = %e, "Failed to delete rejected token");
            }
        }
        true
    }
}

/// API client for nkap.
/// Clone is cheap and clones share the handler registration.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                store,
                on_unauthorized: RwLock::new(None),
                generation: AtomicU64::new(0),
                credential_lock: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ===== Session Management =====

    /// Register the callback fired on 401/403. Replaces any previous one.
    pub fn set_unauthorized_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(handler));
    }

    pub fn clear_unauthorized_handler(&self) {
        let mut slot = self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Persist the token from a successful login or registration.
    ///
    /// Starts a new session generation, so rejections of requests sent
    /// under an earlier token no longer tear anything down. Calls the
    /// credential store inline; see [`CredentialStore`] on blocking.
    pub fn store_token(&self, token: &str) -> Result<(), ApiError> {
        self.inner.store_token(token)?;
        debug!("Stored session token");
        Ok(())
    }

    /// Remove the stored token. Returns whether one was present.
    pub fn clear_token(&self) -> Result<bool, ApiError> {
        self.inner.clear_token()
    }

    pub fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.inner.store.get(TOKEN_KEY)?)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }

    /// Read the credential for an outgoing request off the runtime threads.
    async fn credential(&self) -> Result<Credential, ApiError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.snapshot())
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Credential read failed: {}", e)))?
    }

    /// Tear down the session after the server rejected a request.
    ///
    /// Only the first detector for a given session generation deletes the
    /// token and fires the handler.
    async fn handle_auth_failure(&self, sent: Credential, status: u16) {
        let inner = self.inner.clone();
        let notify = match tokio::task::spawn_blocking(move || inner.tear_down(&sent)).await {
            Ok(notify) => notify,
            Err(e) => {
                warn!(error = %e, "Session teardown task failed");
                return;
            }
        };

        if !notify {
            debug!(status, "Session already torn down");
            return;
        }

        warn!(status, "Authentication rejected, session cleared");
        let handler = self
            .inner
            .on_unauthorized
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    // ===== Transport =====

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        options: &RequestOptions,
        default_timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let timeout = options.timeout.unwrap_or(default_timeout);
        let credential = self.credential().await?;

        let mut builder = self
            .inner
            .http
            .request(method.clone(), self.url(path))
            .timeout(timeout)
            .header(header::ACCEPT, JSON_CONTENT_TYPE);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(ref token) = credential.token {
            builder = builder.bearer_auth(token);
        }
        builder = match payload {
            Payload::Empty => builder,
            Payload::Json(bytes) => builder
                .header(
                    header::CONTENT_TYPE,
                    options.content_type.as_deref().unwrap_or(JSON_CONTENT_TYPE),
                )
                .body(bytes),
            Payload::Multipart(form) => builder.multipart(form),
        };

        debug!(
            method = %method,
            path,
            authenticated = credential.token.is_some(),
            "Sending request"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(e, timeout))?;

        debug!(method = %method, path, status = status.as_u16(), "Response received");

        if status.is_success() {
            let body = if text.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&text).map_err(|e| {
                    ApiError::Decode(format!("{} {}: {}", method, path, e))
                })?
            };
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let err = ApiError::from_status(status, &text);
        if err.is_unauthorized() {
            self.handle_auth_failure(credential, status.as_u16()).await;
        }
        Err(err)
    }

    /// Issue a JSON request against the base endpoint.
    ///
    /// Resolves with the parsed body for any 2xx status; the caller decides
    /// what to make of the envelope's `success` flag. Non-2xx statuses and
    /// transport failures come back as errors. Nothing is retried unless
    /// `options.retry` is set and the method is GET.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = match body {
            Some(body) => Some(
                serde_json::to_vec(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
            ),
            None => None,
        };
        let retry = options.retry.filter(|_| method == Method::GET);

        let mut attempt = 0;
        let mut backoff = retry.map(|p| p.initial_backoff).unwrap_or_default();

        loop {
            let payload = match bytes {
                Some(ref bytes) => Payload::Json(bytes.clone()),
                None => Payload::Empty,
            };
            let result = self
                .send_once(
                    method.clone(),
                    path,
                    payload,
                    &options,
                    self.inner.config.request_timeout,
                )
                .await;

            match (result, retry) {
                (Err(e), Some(policy)) if e.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    warn!(
                        path,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                }
                (result, _) => return result,
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, NO_BODY, options)
            .await?
            .into_payload()
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await?
            .into_payload()
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::POST, path, NO_BODY, RequestOptions::default())
            .await?
            .into_payload()
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await?
            .into_payload()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, NO_BODY, RequestOptions::default())
            .await?
            .into_payload()
    }

    // ===== Uploads =====

    /// Upload one local file as multipart form data and return its URL.
    ///
    /// Every failure is reported as `ApiError::Upload`; the underlying
    /// transport or HTTP error is kept as its cause. Never retried.
    pub async fn upload_file(&self, path: &str, file: impl AsRef<Path>) -> Result<String, ApiError> {
        let file = local_path(file.as_ref());
        match self.try_upload(path, &file).await {
            Ok(url) => Ok(url),
            Err(e @ ApiError::Upload { .. }) => {
                warn!(file = %file.display(), error = %e, "Upload failed");
                Err(e)
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Upload failed");
                Err(ApiError::Upload {
                    message: upload_failure_message(&e),
                    cause: Some(Box::new(e)),
                })
            }
        }
    }

    async fn try_upload(&self, path: &str, file: &Path) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(file).await.map_err(|e| ApiError::Upload {
            message: format!("Unable to read {}: {}", file.display(), e),
            cause: None,
        })?;

        let filename = upload_file_name(file);
        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(content_type_for(&filename))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .send_once(
                Method::POST,
                path,
                Payload::Multipart(form),
                &RequestOptions::default(),
                self.inner.config.upload_timeout,
            )
            .await?;

        let reply = response.envelope::<UploadReply>()?;
        match reply.payload.url {
            Some(url) if reply.success && !url.is_empty() => Ok(url),
            _ => Err(ApiError::Upload {
                message: reply
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Upload failed".to_string()),
                cause: None,
            }),
        }
    }

    /// Upload files one after another, skipping past individual failures.
    ///
    /// Returns the URLs of the files that made it, in submission order. Fails
    /// only when not a single file could be uploaded.
    pub async fn upload_files<P: AsRef<Path>>(
        &self,
        path: &str,
        files: &[P],
    ) -> Result<Vec<String>, ApiError> {
        let total = files.len();
        let mut urls = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (i, file) in files.iter().enumerate() {
            debug!(index = i + 1, total, "Uploading file");
            match self.upload_file(path, file).await {
                Ok(url) => urls.push(url),
                Err(e) => errors.push(format!("File {}: {}", i + 1, e)),
            }
        }

        if urls.is_empty() && !errors.is_empty() {
            return Err(ApiError::UploadBatch { errors });
        }
        if !errors.is_empty() {
            info!(uploaded = urls.len(), failed = errors.len(), "Partial upload");
        }
        Ok(urls)
    }
}

fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2)
}

/// Accept both plain paths and `file://` URIs.
fn local_path(file: &Path) -> PathBuf {
    match file.to_str().and_then(|s| s.strip_prefix("file://")) {
        Some(stripped) => PathBuf::from(stripped),
        None => file.to_path_buf(),
    }
}

fn upload_file_name(file: &Path) -> String {
    file.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("image_{}.jpg", Utc::now().timestamp_millis()))
}

/// Guess a content type from the file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("bmp") => "image/bmp",
        Some("pdf") => "application/pdf",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// The server's own words when it gave any, otherwise the connectivity hint.
fn upload_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Http { message, .. }
        | ApiError::Unauthorized { message, .. }
        | ApiError::Rejected { message }
            if !message.is_empty() =>
        {
            message.clone()
        }
        ApiError::RateLimited => err.user_message(),
        _ => CONNECTIVITY_MESSAGE.to_string(),
    }
}
