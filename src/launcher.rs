//! Command launcher
//!
//! Reads the bearer token, POSTs one execute request and turns the server's
//! answer into a [`LaunchTarget`]. Navigation is left to the caller.

use std::sync::Arc;

use crate::core::{
    id_path, CommandRequest, CommandResponse, ErrorBody, ExecutionStatus, LaunchError,
    LaunchTarget, OutputResponse, TokenStore, DEFAULT_OUTPUT_PREFIX,
};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Command run by [`CommandLauncher::launch_predefined_task`] by default
pub const PREDEFINED_TASK: &str = "long_running_task.sh";

/// Endpoint paths and the predefined task name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSettings {
    pub endpoint: String,
    pub output_prefix: String,
    pub status_prefix: String,
    pub predefined_task: String,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            endpoint: "/execute_command".to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            status_prefix: "/status".to_string(),
            predefined_task: PREDEFINED_TASK.to_string(),
        }
    }
}

/// Launches commands on remote hosts through the execute endpoint.
///
/// Holds no per-call state; share it behind an `Arc` where several
/// callers need it.
pub struct CommandLauncher {
    tokens: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    settings: LauncherSettings,
}

impl CommandLauncher {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        settings: LauncherSettings,
    ) -> Self {
        Self {
            tokens,
            transport,
            settings,
        }
    }

    /// Launch `command_name` on `target_host`.
    ///
    /// The token is read fresh on every call. Without one nothing is sent.
    /// Exactly one request is made; there is no retry.
    pub async fn launch(
        &self,
        command_name: &str,
        target_host: &str,
        params: Vec<String>,
    ) -> Result<LaunchTarget, LaunchError> {
        let token = self.tokens.get()?.ok_or(LaunchError::MissingToken)?;

        let request = CommandRequest::new(command_name, target_host).with_params(params);
        let body = serde_json::to_vec(&request)
            .map_err(|e| LaunchError::Parse(format!("Failed to encode request: {}", e)))?;

        tracing::info!(
            command = command_name,
            host = target_host,
            params = request.params.len(),
            "Launching command"
        );

        let response = self
            .transport
            .send(ApiRequest::post_json(&self.settings.endpoint, body).with_bearer(token))
            .await?;

        if !response.is_success() {
            let detail = error_detail(&response);
            tracing::warn!(
                status = response.status,
                detail = detail.as_deref().unwrap_or(""),
                "Execute request rejected"
            );
            return Err(LaunchError::status(response.status, &response.reason, detail));
        }

        let parsed = CommandResponse::from_slice(&response.body)?;
        if let Some(task_id) = &parsed.task_id {
            tracing::debug!(
                task_id = task_id.as_str(),
                status = parsed.status.as_deref().unwrap_or("unknown"),
                "Server queued task"
            );
        }
        let target = LaunchTarget::new(parsed.into_outcome()?, &self.settings.output_prefix)?;

        tracing::info!(path = target.path(), stream = target.is_stream(), "Command launched");
        Ok(target)
    }

    /// Callback form of [`launch`](Self::launch).
    ///
    /// On failure `on_error` is called once with the error message and
    /// `None` is returned. Without a callback the failure is only logged.
    pub async fn launch_with_callback<F>(
        &self,
        command_name: &str,
        target_host: &str,
        params: Vec<String>,
        on_error: Option<F>,
    ) -> Option<LaunchTarget>
    where
        F: FnOnce(String) + Send,
    {
        match self.launch(command_name, target_host, params).await {
            Ok(target) => Some(target),
            Err(e) => {
                tracing::debug!("Launch failed: {}", e);
                if let Some(on_error) = on_error {
                    on_error(e.to_string());
                }
                None
            }
        }
    }

    /// Launch the predefined task with no parameters
    pub async fn launch_predefined_task(
        &self,
        target_host: &str,
    ) -> Result<LaunchTarget, LaunchError> {
        self.launch(&self.settings.predefined_task, target_host, Vec::new())
            .await
    }

    pub async fn launch_predefined_task_with_callback<F>(
        &self,
        target_host: &str,
        on_error: Option<F>,
    ) -> Option<LaunchTarget>
    where
        F: FnOnce(String) + Send,
    {
        self.launch_with_callback(&self.settings.predefined_task, target_host, Vec::new(), on_error)
            .await
    }

    /// Status of a submitted execution
    pub async fn fetch_status(&self, execution_id: &str) -> Result<ExecutionStatus, LaunchError> {
        let path = id_path(&self.settings.status_prefix, execution_id)?;
        let response = self.get(&path, execution_id, "fetch status").await?;
        serde_json::from_slice(&response.body).map_err(|e| LaunchError::Parse(e.to_string()))
    }

    /// Final output of a finished execution; empty while still running
    pub async fn fetch_output(&self, execution_id: &str) -> Result<String, LaunchError> {
        let path = id_path(&self.settings.output_prefix, execution_id)?;
        let response = self.get(&path, execution_id, "fetch output").await?;
        let parsed: OutputResponse =
            serde_json::from_slice(&response.body).map_err(|e| LaunchError::Parse(e.to_string()))?;
        Ok(parsed.output.unwrap_or_default())
    }

    /// GET with the bearer token when one is stored
    async fn get(
        &self,
        path: &str,
        execution_id: &str,
        action: &str,
    ) -> Result<ApiResponse, LaunchError> {
        let mut request = ApiRequest::get(path);
        if let Some(token) = self.tokens.get()? {
            request = request.with_bearer(token);
        }

        let response = self.transport.send(request).await?;
        match response.status {
            404 => Err(LaunchError::NotFound(execution_id.to_string())),
            _ if !response.is_success() => {
                let detail = error_detail(&response);
                Err(LaunchError::status_for(action, response.status, &response.reason, detail))
            }
            _ => Ok(response),
        }
    }
}

fn error_detail(response: &ApiResponse) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LaunchOutcome, MemoryTokenStore, MISSING_TOKEN_MESSAGE};
    use crate::transport::ApiMethod;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Replays canned responses and records what was sent
    #[derive(Default)]
    struct FakeTransport {
        responses: Mutex<VecDeque<Result<ApiResponse, LaunchError>>>,
        sent: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        fn replying(status: u16, reason: &str, body: &str) -> Arc<Self> {
            let fake = Self::default();
            fake.responses.lock().unwrap().push_back(Ok(ApiResponse {
                status,
                reason: reason.to_string(),
                body: body.as_bytes().to_vec(),
            }));
            Arc::new(fake)
        }

        fn failing(message: &str) -> Arc<Self> {
            let fake = Self::default();
            fake.responses
                .lock()
                .unwrap()
                .push_back(Err(LaunchError::Transport(message.to_string())));
            Arc::new(fake)
        }

        fn sent(&self) -> Vec<ApiRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, LaunchError> {
            self.sent.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LaunchError::Transport("no canned response".to_string())))
        }
    }

    fn launcher(tokens: MemoryTokenStore, transport: Arc<FakeTransport>) -> CommandLauncher {
        CommandLauncher::new(Arc::new(tokens), transport, LauncherSettings::default())
    }

    fn sent_json(request: &ApiRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_sends_nothing() {
        let transport = FakeTransport::replying(200, "OK", r#"{"execution_id": 1}"#);
        let launcher = launcher(MemoryTokenStore::new(), transport.clone());

        let mut messages = Vec::new();
        let target = launcher
            .launch_with_callback("uptime", "web-01", Vec::new(), Some(|m: String| messages.push(m)))
            .await;

        assert!(target.is_none());
        assert_eq!(messages, vec![MISSING_TOKEN_MESSAGE.to_string()]);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_to_stream_url() {
        let transport =
            FakeTransport::replying(200, "OK", r#"{"redirect": true, "stream_url": "/stream/42"}"#);
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport.clone());

        let target = launcher.launch("tail.sh", "web-01", Vec::new()).await.unwrap();
        assert_eq!(target.path(), "/stream/42");
        assert!(target.is_stream());
    }

    #[tokio::test]
    async fn test_fallback_to_output_page() {
        let transport =
            FakeTransport::replying(202, "Accepted", r#"{"redirect": false, "execution_id": "abc"}"#);
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport);

        let target = launcher.launch("uptime", "web-01", Vec::new()).await.unwrap();
        assert_eq!(target.path(), "/output/abc");
        assert_eq!(
            target.outcome,
            LaunchOutcome::Completed {
                execution_id: "abc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = FakeTransport::replying(202, "Accepted", r#"{"execution_id": 3}"#);
        let launcher = launcher(MemoryTokenStore::with_token("secret-token"), transport.clone());

        launcher
            .launch("backup.sh", "db-01", vec!["--full".to_string(), "/var".to_string()])
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, ApiMethod::Post);
        assert_eq!(sent[0].path, "/execute_command");
        assert_eq!(sent[0].bearer.as_deref(), Some("secret-token"));
        assert_eq!(
            sent_json(&sent[0]),
            serde_json::json!({
                "command_name": "backup.sh",
                "target_host": "db-01",
                "params": ["--full", "/var"],
                "stream_to_ui": true
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_reports_status_text() {
        let transport = FakeTransport::replying(
            500,
            "Internal Server Error",
            r#"{"error": "Failed to trigger command: broker down"}"#,
        );
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport);

        let mut messages = Vec::new();
        let target = launcher
            .launch_with_callback("uptime", "web-01", Vec::new(), Some(|m: String| messages.push(m)))
            .await;

        assert!(target.is_none());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_server_error_keeps_detail() {
        let transport = FakeTransport::replying(
            500,
            "Internal Server Error",
            r#"{"error": "broker down"}"#,
        );
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport);

        match launcher.launch("uptime", "web-01", Vec::new()).await {
            Err(LaunchError::Status { status, detail, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(detail.as_deref(), Some("broker down"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_reports_message() {
        let transport = FakeTransport::failing("error sending request: connection refused");
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport.clone());

        let mut messages = Vec::new();
        let target = launcher
            .launch_with_callback("uptime", "web-01", Vec::new(), Some(|m: String| messages.push(m)))
            .await;

        assert!(target.is_none());
        assert_eq!(messages, vec!["error sending request: connection refused".to_string()]);
        // Single attempt
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let transport = FakeTransport::replying(200, "OK", "<html>proxy page</html>");
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport);

        let err = assert_err!(launcher.launch("uptime", "web-01", Vec::new()).await);
        assert!(matches!(err, LaunchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_failure_without_callback_is_swallowed() {
        let transport = FakeTransport::replying(503, "Service Unavailable", "");
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport);

        let target = launcher
            .launch_with_callback::<fn(String)>("uptime", "web-01", Vec::new(), None)
            .await;
        assert!(target.is_none());
    }

    #[tokio::test]
    async fn test_token_read_fresh_each_call() {
        let tokens = Arc::new(MemoryTokenStore::new());
        let transport = Arc::new(FakeTransport::default());
        {
            let mut responses = transport.responses.lock().unwrap();
            responses.push_back(Ok(ApiResponse {
                status: 202,
                reason: "Accepted".to_string(),
                body: br#"{"execution_id": 1}"#.to_vec(),
            }));
        }
        let launcher = CommandLauncher::new(tokens.clone(), transport.clone(), LauncherSettings::default());

        let err = launcher.launch("uptime", "web-01", Vec::new()).await.unwrap_err();
        assert!(matches!(err, LaunchError::MissingToken));

        tokens.set("logged-in").unwrap();
        let target = launcher.launch("uptime", "web-01", Vec::new()).await.unwrap();
        assert_eq!(target.path(), "/output/1");
        assert_eq!(transport.sent()[0].bearer.as_deref(), Some("logged-in"));
    }

    #[tokio::test]
    async fn test_predefined_task_matches_launch() {
        let body = r#"{"redirect": true, "stream_url": "/stream/9"}"#;

        let direct_transport = FakeTransport::replying(200, "OK", body);
        let direct = launcher(MemoryTokenStore::with_token("tok"), direct_transport.clone());
        let direct_target = direct
            .launch(PREDEFINED_TASK, "worker-1", Vec::new())
            .await
            .unwrap();

        let wrapped_transport = FakeTransport::replying(200, "OK", body);
        let wrapped = launcher(MemoryTokenStore::with_token("tok"), wrapped_transport.clone());
        let wrapped_target = wrapped.launch_predefined_task("worker-1").await.unwrap();

        assert_eq!(direct_target, wrapped_target);
        assert_eq!(
            sent_json(&direct_transport.sent()[0]),
            sent_json(&wrapped_transport.sent()[0])
        );
        assert_eq!(
            sent_json(&wrapped_transport.sent()[0])["command_name"],
            "long_running_task.sh"
        );
    }

    #[tokio::test]
    async fn test_predefined_task_callback_without_token() {
        let transport = Arc::new(FakeTransport::default());
        let launcher = launcher(MemoryTokenStore::new(), transport.clone());

        let mut called = 0;
        let target = launcher
            .launch_predefined_task_with_callback("worker-1", Some(|_: String| called += 1))
            .await;
        assert!(target.is_none());
        assert_eq!(called, 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let transport = FakeTransport::replying(
            200,
            "OK",
            r#"{"id": 4, "command_name": "uptime", "target_host": "web-01",
                "status": "success", "exit_code": 0}"#,
        );
        let launcher = launcher(MemoryTokenStore::new(), transport.clone());

        let status = assert_ok!(launcher.fetch_status("4").await);
        assert_eq!(status.id(), "4");
        assert_eq!(status.exit_code, Some(0));
        assert!(status.status.is_finished());

        let sent = transport.sent();
        assert_eq!(sent[0].method, ApiMethod::Get);
        assert_eq!(sent[0].path, "/status/4");
        assert_eq!(sent[0].bearer, None);
    }

    #[tokio::test]
    async fn test_fetch_output_not_found() {
        let transport =
            FakeTransport::replying(404, "Not Found", r#"{"error": "Execution not found"}"#);
        let launcher = launcher(MemoryTokenStore::with_token("tok"), transport.clone());

        let err = assert_err!(launcher.fetch_output("99").await);
        assert!(matches!(err, LaunchError::NotFound(ref id) if id == "99"));
        assert_eq!(transport.sent()[0].path, "/output/99");
        assert_eq!(transport.sent()[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_fetch_paths_encode_execution_id() {
        let transport = FakeTransport::replying(200, "OK", r#"{"output": "done"}"#);
        let launcher = launcher(MemoryTokenStore::new(), transport.clone());

        assert_eq!(launcher.fetch_output("../admin").await.unwrap(), "done");
        assert_eq!(transport.sent()[0].path, "/output/..%2Fadmin");
    }

    #[tokio::test]
    async fn test_fetch_dot_execution_id_sends_nothing() {
        let transport = Arc::new(FakeTransport::default());
        let launcher = launcher(MemoryTokenStore::new(), transport.clone());

        let err = assert_err!(launcher.fetch_status("..").await);
        assert!(matches!(err, LaunchError::Parse(_)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_output_null_is_empty() {
        let transport = FakeTransport::replying(200, "OK", r#"{"output": null}"#);
        let launcher = launcher(MemoryTokenStore::new(), transport);
        assert_eq!(launcher.fetch_output("1").await.unwrap(), "");
    }
}
