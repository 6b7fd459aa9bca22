//! streamexec - trigger remote command execution and jump to its output
//!
//! A [`CommandLauncher`] reads a bearer token from a [`TokenStore`], POSTs
//! an execute request through a [`Transport`] and returns the
//! [`LaunchTarget`] the caller should open next: the server's streaming view
//! or the static `/output/<execution_id>` page.

pub mod config;
pub mod core;
pub mod launcher;
pub mod transport;

pub use crate::config::{Config, ConfigError, TokenBackend};
pub use crate::core::{
    CommandRequest, CommandResponse, ExecutionState, ExecutionStatus, LaunchError, LaunchOutcome,
    LaunchTarget, TokenStore, TokenStoreError,
};
pub use crate::launcher::{CommandLauncher, LauncherSettings, PREDEFINED_TASK};
pub use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
