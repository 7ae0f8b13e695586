use async_trait::async_trait;
use log::debug;
use std::process::{Output, Stdio};
use tokio::process;

use mc_poll_bot_lib::{
    communication::{CommandOutcome, ServerProvider, ServerStatus},
    error::ProviderError,
};

/// Error text the hosting provider returns for commands that it couldn't
/// validate but that may still have run
const UNCONFIRMED_MARKER: &str = "Invalid command";

/// Reaches the hosting provider through operator-supplied shell commands
///
/// Arguments are passed positionally (`$1` is the server id, `$2` the console
/// command), never spliced into the script text.
#[derive(Debug, Clone)]
pub struct ShellProvider {
    status_command: String,
    execute_command: String,
}

impl ShellProvider {
    pub fn new<S: Into<String>>(status_command: S, execute_command: S) -> Self {
        Self {
            status_command: status_command.into(),
            execute_command: execute_command.into(),
        }
    }

    async fn run(&self, script: &str, args: &[&str]) -> Result<Output, ProviderError> {
        if script.trim().is_empty() {
            return Err(ProviderError::Failed(
                "no provider command is configured".into(),
            ));
        }

        process::Command::new("sh")
            .arg("-c")
            .arg(script)
            .arg("mc-poll-bot")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderError::Failed(format!("failed to run provider command: {}", e)))
    }
}

#[async_trait]
impl ServerProvider for ShellProvider {
    async fn server_status(&self, server_id: &str) -> Result<ServerStatus, ProviderError> {
        let output = self.run(&self.status_command, &[server_id]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Status command for {} printed {:?}", server_id, stdout);

        // A printed status code wins over the exit code
        Ok(match stdout.trim().parse::<u8>() {
            Ok(code) => ServerStatus::from_code(code),
            Err(_) if output.status.success() => ServerStatus::Online,
            Err(_) => ServerStatus::Offline,
        })
    }

    async fn execute_command(
        &self,
        server_id: &str,
        command: &str,
    ) -> Result<CommandOutcome, ProviderError> {
        let output = self
            .run(&self.execute_command, &[server_id, command])
            .await?;

        if output.status.success() {
            return Ok(CommandOutcome::Executed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stderr.contains(UNCONFIRMED_MARKER) || stdout.contains(UNCONFIRMED_MARKER) {
            return Ok(CommandOutcome::Unconfirmed);
        }

        let message = stderr.trim();
        Err(ProviderError::CommandRejected(if message.is_empty() {
            output.status.to_string()
        } else {
            message.to_string()
        }))
    }
}

#[cfg(test)]
mod test {
    use super::ShellProvider;
    use mc_poll_bot_lib::{
        communication::{CommandOutcome, ServerProvider, ServerStatus},
        error::ProviderError,
    };

    fn status_of(script: &str) -> ShellProvider {
        ShellProvider::new(script, "")
    }

    fn executing(script: &str) -> ShellProvider {
        ShellProvider::new("", script)
    }

    #[tokio::test]
    async fn printed_status_code() {
        let status = status_of("echo 1").server_status("srv1").await.unwrap();
        assert_eq!(status, ServerStatus::Online);

        let status = status_of("echo 2").server_status("srv1").await.unwrap();
        assert_eq!(status, ServerStatus::Starting);
    }

    #[tokio::test]
    async fn exit_code_status() {
        let status = status_of("true").server_status("srv1").await.unwrap();
        assert_eq!(status, ServerStatus::Online);

        let status = status_of("exit 3").server_status("srv1").await.unwrap();
        assert_eq!(status, ServerStatus::Offline);
    }

    #[tokio::test]
    async fn server_id_is_first_argument() {
        let provider = status_of(r#"test "$1" = srv1"#);
        assert_eq!(
            provider.server_status("srv1").await.unwrap(),
            ServerStatus::Online
        );
        assert_eq!(
            provider.server_status("srv2").await.unwrap(),
            ServerStatus::Offline
        );
    }

    #[tokio::test]
    async fn unconfigured_command() {
        let err = status_of("  ").server_status("srv1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Failed(_)));
    }

    #[tokio::test]
    async fn command_is_passed_verbatim() {
        let provider = executing(r#"test "$1" = srv1 && test "$2" = 'tempban Steve 30m a; exit 1'"#);
        let outcome = provider
            .execute_command("srv1", "tempban Steve 30m a; exit 1")
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Executed);
    }

    #[tokio::test]
    async fn rejected_command() {
        let err = executing("echo 'Unknown command' >&2; exit 1")
            .execute_command("srv1", "tempban Steve")
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::CommandRejected("Unknown command".into()));
    }

    #[tokio::test]
    async fn invalid_command_is_unconfirmed() {
        let outcome = executing("echo 'Error: Invalid command' >&2; exit 1")
            .execute_command("srv1", "tempban Steve")
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Unconfirmed);
    }
}
