//! Tests for the poll lifecycle, run against recording fakes of the
//! collaborators

use async_trait::async_trait;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::communication::*;
use crate::error::{DisplayError, ProviderError};
use crate::poll::{DisplayLocation, NewPoll, PollView};
use crate::{PollConfig, PollManager};


pub const LOCATION: DisplayLocation = DisplayLocation {
    channel_id: 100,
    message_id: 200,
};

/// A provider that answers with canned results and records what it was asked
pub struct FakeProvider {
    status: Result<ServerStatus, ProviderError>,
    execute: Result<CommandOutcome, ProviderError>,
    status_queries: AtomicUsize,
    executed: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    pub fn online() -> Self {
        Self::new(Ok(ServerStatus::Online), Ok(CommandOutcome::Executed))
    }

    pub fn new(
        status: Result<ServerStatus, ProviderError>,
        execute: Result<CommandOutcome, ProviderError>,
    ) -> Self {
        Self {
            status,
            execute,
            status_queries: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    /// (server id, command) pairs in the order they were executed
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerProvider for FakeProvider {
    async fn server_status(&self, _server_id: &str) -> Result<ServerStatus, ProviderError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.status.clone()
    }

    async fn execute_command(
        &self,
        server_id: &str,
        command: &str,
    ) -> Result<CommandOutcome, ProviderError> {
        self.executed
            .lock()
            .unwrap()
            .push((server_id.to_string(), command.to_string()));
        tokio::task::yield_now().await;
        self.execute.clone()
    }
}

/// A display surface that records everything shown on it
#[derive(Default)]
pub struct FakeDisplay {
    failing: bool,
    /// Open renders showing this many yes votes take the given time to land
    slow_render: Option<(usize, Duration)>,
    renders: Mutex<Vec<PollView>>,
    notices: Mutex<Vec<(DisplayLocation, String)>>,
}

impl FakeDisplay {
    /// A display whose every update fails (after recording it)
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// A display that is slow to show the open poll with `yes` yes votes
    pub fn slow_at(yes: usize, delay: Duration) -> Self {
        Self {
            slow_render: Some((yes, delay)),
            ..Self::default()
        }
    }

    /// Renders in the order they landed on the display
    pub fn renders(&self) -> Vec<PollView> {
        self.renders.lock().unwrap().clone()
    }

    pub fn last_render(&self) -> PollView {
        self.renders.lock().unwrap().last().cloned().unwrap()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn result(&self) -> Result<(), DisplayError> {
        if self.failing {
            Err(DisplayError("channel is gone".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PollDisplay for FakeDisplay {
    async fn render_poll(&self, view: &PollView) -> Result<(), DisplayError> {
        if let Some((yes, delay)) = self.slow_render {
            if !view.finalized && view.counts.yes == yes {
                tokio::time::sleep(delay).await;
            }
        }

        self.renders.lock().unwrap().push(view.clone());
        tokio::task::yield_now().await;
        self.result()
    }

    async fn notify(&self, location: &DisplayLocation, text: &str) -> Result<(), DisplayError> {
        self.notices
            .lock()
            .unwrap()
            .push((*location, text.to_string()));
        tokio::task::yield_now().await;
        self.result()
    }
}

pub struct Harness {
    pub manager: PollManager,
    pub provider: Arc<FakeProvider>,
    pub display: Arc<FakeDisplay>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeProvider::online(), FakeDisplay::default())
    }

    pub fn with(provider: FakeProvider, display: FakeDisplay) -> Self {
        let provider = Arc::new(provider);
        let display = Arc::new(display);
        let manager = PollManager::new(
            PollConfig::default(),
            provider.clone(),
            display.clone(),
            Arc::new(RequiredRole(Some("admin".into()))),
        )
        .unwrap();

        Self {
            manager,
            provider,
            display,
        }
    }
}

pub fn new_poll(target: &str, reason: Option<&str>) -> NewPoll {
    NewPoll {
        target: target.into(),
        reason: reason.map(Into::into),
        server_id: "srv1".into(),
        initiator: "mod#0001".into(),
        location: LOCATION,
    }
}

pub fn admin() -> Requester {
    Requester {
        id: "1".into(),
        name: "admin#0001".into(),
        roles: vec!["member".into(), "admin".into()],
    }
}

pub fn member() -> Requester {
    Requester {
        id: "2".into(),
        name: "member#0002".into(),
        roles: vec!["member".into()],
    }
}
