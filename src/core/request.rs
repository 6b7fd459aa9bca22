//! Execute-command request body

use serde::Serialize;

/// Body of `POST /execute_command`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub command_name: String,
    pub target_host: String,
    pub params: Vec<String>,
    /// Always true from this client
    pub stream_to_ui: bool,
}

impl CommandRequest {
    pub fn new(command_name: impl Into<String>, target_host: impl Into<String>) -> Self {
        Self {
            command_name: command_name.into(),
            target_host: target_host.into(),
            params: Vec::new(),
            stream_to_ui: true,
        }
    }

    /// With positional parameters, order preserved
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }
}
