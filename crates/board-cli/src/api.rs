//! REST boundary: the authoritative snapshot load and the write operations.
//!
//! One deliberate absence: there is no retry loop anywhere here. A failed
//! snapshot or write surfaces as a [`FetchError`] for the caller to present,
//! and the operator retries. Writes are never applied to local state from
//! this module either — confirmed state arrives through the push channel (or
//! the returned entity fed through the same update path), so there is no
//! optimistic-rollback logic to get wrong.

use board_core::model::{Comment, Status, Task, UserAccount};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the REST boundary. Transient and retryable by the operator,
/// never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response; `message` carries the error body when the backend
    /// sent one.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not decode as the expected shape.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Fields for a new task. `user` is the assignee's username, as the backend
/// expects.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub user: String,
    pub priority: String,
    pub status: String,
    pub deadline: String,
}

/// Admin-side full update. Same shape as [`TaskDraft`]; the backend replaces
/// every field.
pub type TaskPatch = TaskDraft;

#[derive(Debug, Clone, Serialize)]
struct StatusPatch {
    status: Status,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewComment<'a> {
    task_id: i64,
    content: &'a str,
}

/// The body shape the backend uses for errors.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a non-success response's body into a [`FetchError::Status`].
///
/// Success and failure are carried by HTTP status, not embedded in the body,
/// so any non-2xx is an error even when the body is empty or unparseable.
fn status_error(status: u16, body: &str) -> FetchError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |parsed| parsed.message);
    FetchError::Status {
        status,
        message: if message.is_empty() {
            "no error body".to_string()
        } else {
            message
        },
    }
}

/// Thin client over the remote task service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client for `base` (no trailing slash required), attaching
    /// `token` as a bearer credential when present.
    ///
    /// # Errors
    ///
    /// [`FetchError::Transport`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(base: &str, token: Option<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.endpoint(path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// One authoritative read of the full collection.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`]; the caller surfaces a loading-error state and
    /// must not retry automatically.
    pub async fn fetch_all(&self) -> Result<Vec<Task>, FetchError> {
        debug!("loading full task snapshot");
        self.expect_json(self.request(reqwest::Method::GET, "/task/getall"))
            .await
    }

    /// Server-side filtered snapshot: only tasks assigned to `user_id`.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn fetch_for_user(&self, user_id: i64) -> Result<Vec<Task>, FetchError> {
        debug!(user_id, "loading per-user task snapshot");
        self.expect_json(self.request(
            reqwest::Method::GET,
            &format!("/task/getuser/{user_id}"),
        ))
        .await
    }

    /// The user directory, for assignment choices.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn fetch_users(&self) -> Result<Vec<UserAccount>, FetchError> {
        self.expect_json(self.request(reqwest::Method::GET, "/auth/getall"))
            .await
    }

    /// Create a task; the created entity comes back and the corresponding
    /// `task.created` event follows on the push channel.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, FetchError> {
        self.expect_json(
            self.request(reqwest::Method::POST, "/task/create")
                .json(draft),
        )
        .await
    }

    /// Admin-side full update of one task.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task, FetchError> {
        self.expect_json(
            self.request(reqwest::Method::PUT, &format!("/task/update/{id}"))
                .json(patch),
        )
        .await
    }

    /// Assignee-side status change.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn update_status(&self, id: i64, status: Status) -> Result<Task, FetchError> {
        self.expect_json(
            self.request(reqwest::Method::PUT, &format!("/task/updatebyuser/{id}"))
                .json(&StatusPatch { status }),
        )
        .await
    }

    /// Delete one task.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn delete_task(&self, id: i64) -> Result<(), FetchError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/task/delete/{id}"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(())
    }

    /// Append a comment to a task.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`].
    pub async fn add_comment(&self, task_id: i64, content: &str) -> Result<Comment, FetchError> {
        self.expect_json(
            self.request(reqwest::Method::POST, "/comment/create")
                .json(&NewComment { task_id, content }),
        )
        .await
    }
}
