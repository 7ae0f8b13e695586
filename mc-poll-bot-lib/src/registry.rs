use std::collections::HashMap;

use tokio::task::JoinHandle;

use crate::poll::{Poll, PollId, PollSpec};

/// Maps poll ids to the polls that are currently open
///
/// Nothing here is persisted; the registry starts out empty and dies with the
/// process.
#[derive(Debug, Default)]
pub struct PollRegistry {
    polls: HashMap<PollId, Poll>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a poll for `spec` under a freshly generated id
    ///
    /// `arm_deadline` is handed the new id and must return the handle of the
    /// task that will resolve the poll when its window closes.
    pub fn create<F>(&mut self, spec: PollSpec, arm_deadline: F) -> &mut Poll
    where
        F: FnOnce(&PollId) -> JoinHandle<()>,
    {
        self.create_with_ids(spec, PollId::generate, arm_deadline)
    }

    fn create_with_ids<G, F>(
        &mut self,
        spec: PollSpec,
        mut next_id: G,
        arm_deadline: F,
    ) -> &mut Poll
    where
        G: FnMut() -> PollId,
        F: FnOnce(&PollId) -> JoinHandle<()>,
    {
        let mut id = next_id();
        while self.polls.contains_key(&id) {
            id = next_id();
        }

        let mut poll = Poll::new(id.clone(), spec);
        poll.deadline = Some(arm_deadline(&id));

        self.polls.entry(id).or_insert(poll)
    }

    pub fn get(&self, id: &PollId) -> Option<&Poll> {
        self.polls.get(id)
    }

    pub fn get_mut(&mut self, id: &PollId) -> Option<&mut Poll> {
        self.polls.get_mut(id)
    }

    /// Takes the poll out of the registry, returning it if it was present
    pub fn remove(&mut self, id: &PollId) -> Option<Poll> {
        self.polls.remove(id)
    }

    pub fn contains(&self, id: &PollId) -> bool {
        self.polls.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PollId> {
        self.polls.keys()
    }
}
