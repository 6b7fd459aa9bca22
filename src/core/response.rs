//! Server response types
//!
//! The execute endpoint's body is owned by the server and only loosely
//! shaped, so it is deserialized leniently and then validated into
//! [`LaunchOutcome`] before anything branches on it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use super::LaunchError;

/// Default prefix of the static output page
pub const DEFAULT_OUTPUT_PREFIX: &str = "/output";

/// Execution ids arrive as integers from the server but are opaque here
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExecutionId {
    Text(String),
    Number(serde_json::Number),
}

impl ExecutionId {
    fn into_string(self) -> String {
        match self {
            ExecutionId::Text(s) => s,
            ExecutionId::Number(n) => n.to_string(),
        }
    }
}

/// Raw body of a successful `POST /execute_command`
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    redirect: Option<bool>,
    #[serde(default)]
    stream_url: Option<String>,
    #[serde(default)]
    execution_id: Option<ExecutionId>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CommandResponse {
    /// Parse a response body
    pub fn from_slice(body: &[u8]) -> Result<Self, LaunchError> {
        serde_json::from_slice(body).map_err(|e| LaunchError::Parse(e.to_string()))
    }

    pub fn redirect(&self) -> bool {
        self.redirect.unwrap_or(false)
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn execution_id(&self) -> Option<String> {
        self.execution_id
            .clone()
            .map(ExecutionId::into_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// Validate the shape and decide where to go next.
    ///
    /// A set `redirect` flag without a stream URL falls back to the
    /// output page, as does an unset flag.
    pub fn into_outcome(self) -> Result<LaunchOutcome, LaunchError> {
        if self.redirect() {
            if let Some(url) = self.stream_url() {
                return Ok(LaunchOutcome::Redirect {
                    url: url.to_string(),
                });
            }
        }

        match self.execution_id() {
            Some(execution_id) => {
                id_segment(&execution_id)?;
                Ok(LaunchOutcome::Completed { execution_id })
            }
            None => Err(LaunchError::Parse(
                "response carried neither a stream URL nor an execution id".to_string(),
            )),
        }
    }
}

/// Validated result of a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Server asked to follow its streaming view
    Redirect { url: String },
    /// Server accepted the run; output is viewed by id
    Completed { execution_id: String },
}

/// Where the caller should navigate after a successful launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub outcome: LaunchOutcome,
    path: String,
}

impl LaunchTarget {
    pub fn new(outcome: LaunchOutcome, output_prefix: &str) -> Result<Self, LaunchError> {
        let path = match &outcome {
            LaunchOutcome::Redirect { url } => url.clone(),
            LaunchOutcome::Completed { execution_id } => id_path(output_prefix, execution_id)?,
        };
        Ok(Self { outcome, path })
    }

    /// Stream URL as given by the server, or `<output_prefix>/<execution_id>`
    /// with the id percent-encoded
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn execution_id(&self) -> Option<&str> {
        match &self.outcome {
            LaunchOutcome::Completed { execution_id } => Some(execution_id),
            LaunchOutcome::Redirect { .. } => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.outcome, LaunchOutcome::Redirect { .. })
    }

    /// Absolute URL under the server base. Absolute stream URLs are kept.
    pub fn resolve(&self, base: &Url) -> Result<Url, url::ParseError> {
        join_under(base, &self.path)
    }
}

/// Join `path` below `base`, keeping any path prefix the base carries:
/// `https://h/app` + `/output/1` is `https://h/app/output/1`.
/// Absolute URLs in `path` replace the base.
pub fn join_under(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
}

/// Execution id as a single percent-encoded path segment
pub(crate) fn id_segment(execution_id: &str) -> Result<String, LaunchError> {
    if execution_id.trim().is_empty() || matches!(execution_id, "." | "..") {
        return Err(LaunchError::Parse(format!(
            "invalid execution id '{}'",
            execution_id
        )));
    }
    Ok(urlencoding::encode(execution_id).into_owned())
}

/// `<prefix>/<encoded id>`
pub(crate) fn id_path(prefix: &str, execution_id: &str) -> Result<String, LaunchError> {
    Ok(format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        id_segment(execution_id)?
    ))
}

/// Lifecycle state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Pending,
    Running,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExecutionState::Success | ExecutionState::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Running => "running",
            ExecutionState::Success => "success",
            ExecutionState::Failure => "failure",
            ExecutionState::Unknown => "unknown",
        }
    }
}

/// Body of `GET /status/<id>`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatus {
    id: ExecutionId,
    pub command_name: String,
    pub target_host: String,
    pub status: ExecutionState,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub user: Option<String>,
}

impl ExecutionStatus {
    pub fn id(&self) -> String {
        self.id.clone().into_string()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_deref().and_then(parse_server_time)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_deref().and_then(parse_server_time)
    }
}

/// Body of `GET /output/<id>`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OutputResponse {
    #[serde(default)]
    pub output: Option<String>,
}

/// Body of error responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

/// Server timestamps are RFC 2822 (`Tue, 01 Jan 2024 10:00:00 GMT`)
/// or RFC 3339 depending on how they were serialized
fn parse_server_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
