use crate::{
    communication::ServerStatus,
    error::ProviderError,
    poll::PollId,
    tally::TallyCounts,
};

/// What caused a poll to be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The poll window ran out
    Deadline,
    /// A privileged requester ended the poll early
    EndRequest,
}

/// The result of applying (or not applying) a poll's outcome command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Yes votes did not outnumber no votes
    Failed,
    /// The poll passed but the server was not online to take the command
    ServerOffline(ServerStatus),
    /// The poll passed but the server status could not be fetched
    StatusUnavailable(ProviderError),
    Executed {
        command: String,
    },
    /// The command was sent but the provider could not confirm it ran
    Unconfirmed {
        command: String,
    },
    CommandFailed {
        command: String,
        error: ProviderError,
    },
}

impl Outcome {
    /// True if the poll passed, regardless of what happened afterwards
    pub fn passed(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }

    /// The status message posted once the poll is resolved
    pub fn notice(&self, target: &str, initiator: &str) -> String {
        let body = match self {
            Outcome::Failed => format!("Poll failed. {} will not be temp-banned.", target),
            Outcome::ServerOffline(status) => format!(
                "Poll passed but the server is not online (status: {}). \
                Please ban {} manually when the server starts.",
                status, target
            ),
            Outcome::StatusUnavailable(e) => format!(
                "Poll passed but the server status could not be checked: {}. \
                Please ban {} manually.",
                e, target
            ),
            Outcome::Executed { command } => format!("Poll passed. Executed: `{}`", command),
            Outcome::Unconfirmed { command } => format!(
                "Poll passed. Sent `{}` but the provider could not confirm it ran; \
                check the server console.",
                command
            ),
            Outcome::CommandFailed { command, error } => format!(
                "Poll passed but command `{}` failed: {}\n\
                The server might not have a plugin providing this command, or it \
                expects a different format. Adjust the configured command template \
                or ban {} manually.",
                command, error, target
            ),
        };

        format!("{} (Initiated by {})", body, initiator)
    }
}

/// A report of a single poll resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: PollId,
    pub target: String,
    pub counts: TallyCounts,
    pub trigger: Trigger,
    pub outcome: Outcome,
}

#[cfg(test)]
mod test {
    use super::Outcome;
    use crate::{communication::ServerStatus, error::ProviderError};

    #[test]
    fn failed_notice() {
        assert_eq!(
            Outcome::Failed.notice("Steve", "mod#0001"),
            "Poll failed. Steve will not be temp-banned. (Initiated by mod#0001)"
        );
    }

    #[test]
    fn offline_notice_asks_for_manual_action() {
        let notice = Outcome::ServerOffline(ServerStatus::Offline).notice("Steve", "mod#0001");
        assert!(notice.contains("ban Steve manually"));
        assert!(notice.contains("Offline"));
    }

    #[test]
    fn command_failure_notice_contains_command() {
        let outcome = Outcome::CommandFailed {
            command: "tempban Steve 30m griefing".into(),
            error: ProviderError::CommandRejected("Unknown command".into()),
        };
        let notice = outcome.notice("Steve", "mod#0001");

        assert!(notice.contains("`tempban Steve 30m griefing`"));
        assert!(notice.contains("Unknown command"));
        assert!(notice.contains("command template"));
        assert!(outcome.passed());
    }
}
