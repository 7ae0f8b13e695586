//! The collaborators a `PollManager` talks to
//!
//! Front-ends implement these traits to connect the poll core to a hosting
//! provider and to whatever surface the polls are shown on.

use async_trait::async_trait;
use std::fmt;

use crate::error::{DisplayError, ProviderError};
use crate::poll::{DisplayLocation, PollView};

/// The state of a remote Minecraft server as reported by the hosting provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Offline,
    Online,
    Starting,
    Stopping,
    Restarting,
    Saving,
    Loading,
    Crashed,
    Pending,
    Preparing,
    Unknown(u8),
}

impl ServerStatus {
    /// Maps the provider's numeric status code to a `ServerStatus`
    pub fn from_code(code: u8) -> Self {
        use ServerStatus::*;

        match code {
            0 => Offline,
            1 => Online,
            2 => Starting,
            3 => Stopping,
            4 => Restarting,
            5 => Saving,
            6 => Loading,
            7 => Crashed,
            8 => Pending,
            10 => Preparing,
            n => Unknown(n),
        }
    }

    /// Only an online server accepts console commands
    pub fn is_online(&self) -> bool {
        *self == ServerStatus::Online
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ServerStatus::*;

        match self {
            Offline => f.write_str("Offline"),
            Online => f.write_str("Online"),
            Starting => f.write_str("Starting"),
            Stopping => f.write_str("Stopping"),
            Restarting => f.write_str("Restarting"),
            Saving => f.write_str("Saving"),
            Loading => f.write_str("Loading"),
            Crashed => f.write_str("Crashed"),
            Pending => f.write_str("Pending"),
            Preparing => f.write_str("Preparing"),
            Unknown(code) => write!(f, "Unknown ({})", code),
        }
    }
}

/// How a console command that was not outright rejected fared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The provider confirmed the command ran
    Executed,
    /// The provider reported an error that it is known to report for commands
    /// that may still have run (its "Invalid command" response)
    Unconfirmed,
}

/// The hosting provider the poll outcome is applied through
#[async_trait]
pub trait ServerProvider: Send + Sync {
    /// Fetch the current status of the server
    async fn server_status(&self, server_id: &str) -> Result<ServerStatus, ProviderError>;

    /// Run `command` on the server's console
    async fn execute_command(
        &self,
        server_id: &str,
        command: &str,
    ) -> Result<CommandOutcome, ProviderError>;
}

/// The surface polls are shown on
#[async_trait]
pub trait PollDisplay: Send + Sync {
    /// Show the given poll state at `view.location`
    ///
    /// Called once when a poll opens, after every vote, and once more with
    /// `view.finalized` set when the poll is resolved.
    async fn render_poll(&self, view: &PollView) -> Result<(), DisplayError>;

    /// Post a plain status message next to the poll
    async fn notify(&self, location: &DisplayLocation, text: &str) -> Result<(), DisplayError>;
}

/// Someone asking to end a poll early
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: String,
    pub name: String,
    /// Role identities the requester holds
    pub roles: Vec<String>,
}

/// Decides who may end polls early
pub trait PrivilegeCheck: Send + Sync {
    fn has_privilege(&self, requester: &Requester) -> bool;
}

/// Grants the privilege to holders of a single role
///
/// If no role is configured everyone is privileged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredRole(pub Option<String>);

impl PrivilegeCheck for RequiredRole {
    fn has_privilege(&self, requester: &Requester) -> bool {
        match &self.0 {
            Some(role) => requester.roles.iter().any(|r| r == role),
            None => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn requester(roles: &[&str]) -> Requester {
        Requester {
            id: "1".into(),
            name: "mod#0001".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerStatus::from_code(1), ServerStatus::Online);
        assert_eq!(ServerStatus::from_code(10), ServerStatus::Preparing);
        assert_eq!(ServerStatus::from_code(9), ServerStatus::Unknown(9));
        assert!(ServerStatus::Online.is_online());
        assert!(!ServerStatus::Starting.is_online());
        assert_eq!(ServerStatus::Unknown(9).to_string(), "Unknown (9)");
    }

    #[test]
    fn required_role() {
        let check = RequiredRole(Some("42".into()));
        assert!(check.has_privilege(&requester(&["7", "42"])));
        assert!(!check.has_privilege(&requester(&["7"])));
        assert!(!check.has_privilege(&requester(&[])));
    }

    #[test]
    fn no_required_role_allows_everyone() {
        assert!(RequiredRole(None).has_privilege(&requester(&[])));
    }
}
