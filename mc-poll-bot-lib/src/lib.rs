use tokio::sync::Mutex;
use tokio::time;

use log::*;

use std::sync::Arc;
use std::time::Duration;

use crate::communication::*;
use crate::error::{PollConfigError, PollError};
use crate::outcome::{Outcome, Resolution, Trigger};
use crate::poll::{NewPoll, PendingRender, Poll, PollId, PollSpec};
use crate::registry::PollRegistry;
use crate::tally::{Choice, TallyCounts};
use crate::template::CommandTemplate;

pub mod communication;
pub mod error;
pub mod outcome;
pub mod poll;
pub mod registry;
pub mod tally;
pub mod template;
#[cfg(test)]
mod test;

/// How long a poll stays open if nobody ends it early
pub const DEFAULT_POLL_DURATION: Duration = Duration::from_secs(5 * 60);

/// Used when a poll is started without a reason
pub const DEFAULT_REASON: &str = "No reason provided";

/// Configuration provided to set up a `PollManager`
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// How long polls stay open
    pub duration: Duration,
    /// The console command issued when a poll passes
    pub command_template: CommandTemplate,
    /// Reason recorded for polls started without one
    pub default_reason: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_POLL_DURATION,
            command_template: CommandTemplate::default(),
            default_reason: DEFAULT_REASON.into(),
        }
    }
}

impl PollConfig {
    /// Validates aspects of the config
    ///
    /// The command template must name the player somewhere and the poll window
    /// can't be empty. The config will be returned to you if it is valid.
    pub fn validate(self) -> Result<Self, PollConfigError> {
        use PollConfigError::*;

        if !self.command_template.has_player_token() {
            Err(TemplateMissingPlayer(self.command_template.to_string()))
        } else if self.duration == Duration::from_secs(0) {
            Err(ZeroDuration)
        } else {
            Ok(self)
        }
    }
}

/// Runs time-boxed temp-ban polls
///
/// Front-ends feed poll creation requests, votes and end requests into this;
/// it keeps the tallies, closes polls when their window runs out, and applies
/// the outcome through the configured `ServerProvider`.
///
/// This struct can be cloned and passed around as needed.
#[derive(Clone)]
pub struct PollManager {
    inner: Arc<PollManagerInner>,
}

// Groups together everything the manager's clones share
struct PollManagerInner {
    config: PollConfig,
    registry: Mutex<PollRegistry>,
    provider: Arc<dyn ServerProvider>,
    display: Arc<dyn PollDisplay>,
    privilege: Arc<dyn PrivilegeCheck>,
}

impl PollManager {
    /// Create a new `PollManager` with the given `PollConfig`
    ///
    /// The config will be validated before it is used.
    pub fn new(
        config: PollConfig,
        provider: Arc<dyn ServerProvider>,
        display: Arc<dyn PollDisplay>,
        privilege: Arc<dyn PrivilegeCheck>,
    ) -> Result<Self, PollConfigError> {
        let config = config.validate()?;

        Ok(Self {
            inner: Arc::new(PollManagerInner {
                config,
                registry: Mutex::new(PollRegistry::new()),
                provider,
                display,
                privilege,
            }),
        })
    }

    /// Opens a new poll and arms its deadline
    ///
    /// The initial (empty) poll state is rendered at `new_poll.location`.
    pub async fn create_poll(&self, new_poll: NewPoll) -> Result<PollId, PollError> {
        let target = new_poll.target.trim();
        if target.is_empty() {
            return Err(PollError::MissingTarget);
        }

        let reason = new_poll
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.inner.config.default_reason.as_str())
            .to_string();

        let spec = PollSpec {
            target: target.to_string(),
            reason,
            server_id: new_poll.server_id,
            initiator: new_poll.initiator,
            location: new_poll.location,
        };

        let render = {
            let mut registry = self.inner.registry.lock().await;
            let manager = self.clone();
            let duration = self.inner.config.duration;

            registry
                .create(spec, move |id| {
                    let id = id.clone();
                    tokio::spawn(async move {
                        time::sleep(duration).await;
                        manager.resolve(&id, Trigger::Deadline).await;
                    })
                })
                .snapshot(false)
        };

        let view = &render.view;
        info!(
            "{} opened poll {} to temp-ban {} (reason: {})",
            view.initiator, view.id, view.target, view.reason
        );

        let id = view.id.clone();
        self.show(render).await;
        Ok(id)
    }

    /// Records `voter`'s choice in the given poll
    ///
    /// Returns the updated counts, or `PollError::NotFound` if the poll is no
    /// longer open.
    pub async fn cast_vote(
        &self,
        id: &PollId,
        voter: &str,
        choice: Choice,
    ) -> Result<TallyCounts, PollError> {
        let render = {
            let mut registry = self.inner.registry.lock().await;
            let poll = registry
                .get_mut(id)
                .ok_or_else(|| PollError::NotFound(id.clone()))?;

            poll.tally.cast_vote(voter, choice);
            poll.snapshot(false)
        };

        let counts = render.view.counts;
        debug!(
            "Vote {:?} from {} in poll {} (yes: {}, no: {})",
            choice, voter, id, counts.yes, counts.no
        );

        self.show(render).await;
        Ok(counts)
    }

    /// Ends the given poll early on behalf of `requester`
    ///
    /// Only privileged requesters may do this; anyone else gets
    /// `PollError::PermissionDenied` and the poll stays open.
    pub async fn request_end(
        &self,
        id: &PollId,
        requester: &Requester,
    ) -> Result<Resolution, PollError> {
        if !self.contains(id).await {
            return Err(PollError::NotFound(id.clone()));
        }

        if !self.inner.privilege.has_privilege(requester) {
            debug!("{} was denied ending poll {}", requester.name, id);
            return Err(PollError::PermissionDenied);
        }

        info!("{} is ending poll {} early", requester.name, id);
        self.resolve(id, Trigger::EndRequest)
            .await
            .ok_or_else(|| PollError::NotFound(id.clone()))
    }

    /// Resolves the given poll exactly once
    ///
    /// Whichever trigger takes the poll out of the registry first performs the
    /// resolution; every later trigger gets `None`. Collaborator failures
    /// along the way are logged and reported in the returned `Resolution`,
    /// they never leave the poll open.
    pub async fn resolve(&self, id: &PollId, trigger: Trigger) -> Option<Resolution> {
        // Must happen before anything below awaits
        let mut poll = self.inner.registry.lock().await.remove(id)?;

        if trigger != Trigger::Deadline {
            poll.cancel_deadline();
        }

        let render = poll.snapshot(true);
        let counts = render.view.counts;
        self.show(render).await;

        let outcome = if counts.passed() {
            self.apply_outcome(&poll).await
        } else {
            Outcome::Failed
        };

        info!(
            "Poll {} for {} resolved by {:?} with {} yes / {} no: {:?}",
            id, poll.target, trigger, counts.yes, counts.no, outcome
        );

        let notice = outcome.notice(&poll.target, &poll.initiator);
        if let Err(e) = self.inner.display.notify(&poll.location, &notice).await {
            warn!("Failed to post result of poll {}: {}", id, e);
        }

        Some(Resolution {
            id: poll.id,
            target: poll.target,
            counts,
            trigger,
            outcome,
        })
    }

    /// Hands a snapshot to the display, dropping it if it is already outdated
    async fn show(&self, render: PendingRender) {
        let id = render.view.id.clone();
        let finalized = render.view.finalized;

        match render.show(self.inner.display.as_ref()).await {
            Some(Ok(())) => {}
            Some(Err(e)) if finalized => {
                warn!("Failed to display final state of poll {}: {}", id, e)
            }
            Some(Err(e)) => warn!("Failed to display poll {}: {}", id, e),
            None => debug!("Dropped outdated render of poll {}", id),
        }
    }

    /// Sends the outcome command for a passed poll if the server can take it
    async fn apply_outcome(&self, poll: &Poll) -> Outcome {
        let provider = &self.inner.provider;

        let status = match provider.server_status(&poll.server_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Failed to get status of server {} for poll {}: {}",
                    poll.server_id, poll.id, e
                );
                return Outcome::StatusUnavailable(e);
            }
        };

        if !status.is_online() {
            return Outcome::ServerOffline(status);
        }

        let command = self
            .inner
            .config
            .command_template
            .render(&poll.target, &poll.reason);
        info!(
            "Executing poll outcome on server {}: {}",
            poll.server_id, command
        );

        match provider.execute_command(&poll.server_id, &command).await {
            Ok(CommandOutcome::Executed) => Outcome::Executed { command },
            Ok(CommandOutcome::Unconfirmed) => {
                warn!(
                    "Server {} could not confirm command `{}` ran",
                    poll.server_id, command
                );
                Outcome::Unconfirmed { command }
            }
            Err(error) => {
                warn!("Poll outcome command `{}` failed: {}", command, error);
                Outcome::CommandFailed { command, error }
            }
        }
    }

    /// Returns true if the given poll is still open
    pub async fn contains(&self, id: &PollId) -> bool {
        self.inner.registry.lock().await.contains(id)
    }

    /// Ids of all currently open polls
    pub async fn open_polls(&self) -> Vec<PollId> {
        let registry = self.inner.registry.lock().await;
        let mut ids: Vec<_> = registry.ids().cloned().collect();
        ids.sort();
        ids
    }
}
