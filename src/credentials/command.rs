//! Token provider backed by an external command.

use std::process::Stdio;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::process::Command;

use crate::config::CredentialConfig;
use crate::credentials::{CredentialError, TokenProvider};

/// Runs a program and uses its trimmed stdout as the token.
#[derive(Debug, Clone)]
pub struct CommandTokenProvider {
    program: String,
    args: Vec<String>,
}

impl CommandTokenProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `credential.command`; the first element is the program.
    /// Validation guarantees it is non-empty.
    pub fn from_config(config: &CredentialConfig) -> Self {
        let mut parts = config.command.iter().cloned();
        let program = parts.next().unwrap_or_default();
        Self::new(program, parts.collect())
    }

    async fn run(&self) -> Result<String, CredentialError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CredentialError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CredentialError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl TokenProvider for CommandTokenProvider {
    fn acquire_token(&self) -> BoxFuture<'_, Result<String, CredentialError>> {
        self.run().boxed()
    }
}
