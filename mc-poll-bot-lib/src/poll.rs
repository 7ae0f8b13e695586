use std::{
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::communication::PollDisplay;
use crate::error::DisplayError;
use crate::tally::{TallyCounts, VoteTally};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque identifier of a poll
///
/// Front-ends embed this in every control tied to the poll and hand it back
/// when votes or end requests come in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollId(String);

impl PollId {
    /// Generates a fresh id of the form `poll_<time>_<random>`
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();

        Self(format!("poll_{}_{}", to_base36(millis), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PollId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".into();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ID_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}

/// Where a poll is shown on the display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayLocation {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A request to open a new poll
#[derive(Debug, Clone)]
pub struct NewPoll {
    /// Who the poll is about (a Minecraft username)
    pub target: String,
    /// Why the poll was started; a configured placeholder is used if `None`
    pub reason: Option<String>,
    /// The server the outcome command is sent to
    pub server_id: String,
    /// Display name of whoever started the poll
    pub initiator: String,
    pub location: DisplayLocation,
}

/// Fully resolved poll data that the registry turns into a `Poll`
#[derive(Debug, Clone)]
pub struct PollSpec {
    pub target: String,
    pub reason: String,
    pub server_id: String,
    pub initiator: String,
    pub location: DisplayLocation,
}

/// A snapshot of a poll handed to the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollView {
    pub id: PollId,
    pub target: String,
    pub reason: String,
    pub server_id: String,
    pub initiator: String,
    pub location: DisplayLocation,
    pub counts: TallyCounts,
    /// Set once the poll has been resolved and no longer accepts votes
    pub finalized: bool,
}

/// An open poll
///
/// Polls are owned by the `PollRegistry` and only leave it when they are
/// resolved.
#[derive(Debug)]
pub struct Poll {
    pub(crate) id: PollId,
    pub(crate) target: String,
    pub(crate) reason: String,
    pub(crate) server_id: String,
    pub(crate) initiator: String,
    pub(crate) location: DisplayLocation,
    pub(crate) tally: VoteTally,
    pub(crate) deadline: Option<JoinHandle<()>>,
    render_seq: u64,
    render_state: Arc<Mutex<RenderState>>,
}

impl Poll {
    pub(crate) fn new(id: PollId, spec: PollSpec) -> Self {
        Self {
            id,
            target: spec.target,
            reason: spec.reason,
            server_id: spec.server_id,
            initiator: spec.initiator,
            location: spec.location,
            tally: VoteTally::new(),
            deadline: None,
            render_seq: 0,
            render_state: Arc::new(Mutex::new(RenderState::default())),
        }
    }

    /// Cancels the deadline timer if one is still armed
    pub(crate) fn cancel_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }

    pub(crate) fn view(&self, finalized: bool) -> PollView {
        PollView {
            id: self.id.clone(),
            target: self.target.clone(),
            reason: self.reason.clone(),
            server_id: self.server_id.clone(),
            initiator: self.initiator.clone(),
            location: self.location,
            counts: self.tally.counts(),
            finalized,
        }
    }

    /// Takes a numbered snapshot of the poll for the display
    ///
    /// Must be called while the registry is locked so that snapshot numbers
    /// follow the order in which the poll changed.
    pub(crate) fn snapshot(&mut self, finalized: bool) -> PendingRender {
        self.render_seq += 1;

        PendingRender {
            view: self.view(finalized),
            seq: self.render_seq,
            state: self.render_state.clone(),
        }
    }
}

/// What has already been shown for a poll
#[derive(Debug, Default)]
pub(crate) struct RenderState {
    shown: u64,
    finalized: bool,
}

/// A poll snapshot on its way to the display
#[derive(Debug)]
pub(crate) struct PendingRender {
    pub(crate) view: PollView,
    seq: u64,
    state: Arc<Mutex<RenderState>>,
}

impl PendingRender {
    /// Renders the snapshot unless a newer one has already been rendered
    ///
    /// Renders of one poll are serialized, and nothing is rendered after the
    /// finalized state. Returns `None` if the snapshot was dropped.
    pub(crate) async fn show(
        self,
        display: &dyn PollDisplay,
    ) -> Option<Result<(), DisplayError>> {
        let mut state = self.state.lock().await;
        if state.finalized || self.seq <= state.shown {
            return None;
        }

        state.shown = self.seq;
        state.finalized = self.view.finalized;
        Some(display.render_poll(&self.view).await)
    }
}

#[cfg(test)]
mod test {
    use super::{to_base36, PollId};

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = PollId::generate();
        let parts: Vec<_> = id.as_str().split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "poll");
        assert_eq!(parts[2].len(), 6);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c == '_' || c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
