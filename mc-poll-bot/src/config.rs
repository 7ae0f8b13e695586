use crate::Opt;
use anyhow::Context;
use mc_poll_bot_lib::{template::CommandTemplate, PollConfig, DEFAULT_REASON};
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU64, path::Path, time::Duration};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

/// Represents the mc-poll-bot config structure
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    /// Discord-related config options
    pub discord: Discord,
    /// Poll-related config options
    pub poll: Poll,
    /// Hosting provider config options
    pub provider: Provider,
    /// Logging-related config options
    pub logging: Logging,
}

impl Config {
    /// Load a config file at `path`
    ///
    /// If the config does not exist at the path a default config will be created,
    /// returned, and also written to the path.
    ///
    /// This will not overwrite an existing file, however.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        if !path.exists() {
            let default_config = Self::default();
            default_config
                .store(path)
                .await
                .with_context(|| "Failed to save default config file")?;

            Ok(default_config)
        } else {
            let mut file = File::open(path)
                .await
                .with_context(|| format!("Failed to open config file at {:?}", path))?;
            let mut buffer = String::new();
            file.read_to_string(&mut buffer)
                .await
                .with_context(|| format!("Failed to read config file at {:?}", path))?;

            toml::from_str(&buffer)
                .with_context(|| format!("Failed to parse config file at {:?}", path))
        }
    }

    /// Write the current config to `path`
    ///
    /// This will overwrite whatever file is currently at `path`.
    pub async fn store(&self, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .await
            .with_context(|| format!("Failed to open config file at {:?}", path))?;

        file.write_all(toml::to_string(self)?.as_bytes())
            .await
            .with_context(|| format!("Failed to write config file to {:?}", path))
    }

    /// Merge args passed in via the CLI into this config
    pub fn merge_in_args(&mut self, args: Opt) {
        if let Some(server_id) = args.server_id {
            self.provider.server_id = Some(server_id);
        }
    }
}

/// Discord-related config options
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Discord {
    pub token: String,
    /// Role allowed to end polls early; everyone may if unset
    pub required_role: Option<NonZeroU64>,
    /// Role allowed to start polls; everyone may if unset
    pub start_role: Option<NonZeroU64>,
}

impl Default for Discord {
    fn default() -> Self {
        Self {
            token: "".into(),
            required_role: None,
            start_role: None,
        }
    }
}

/// Poll-related config options
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Poll {
    /// How long a poll stays open, in seconds
    pub duration_secs: u64,
    /// Console command run when a poll passes
    ///
    /// `{player}` and `{reason}` are replaced with the poll's target and reason.
    pub command_template: String,
    /// Reason used for polls started without one
    pub default_reason: String,
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            duration_secs: 300,
            command_template: CommandTemplate::default().to_string(),
            default_reason: DEFAULT_REASON.into(),
        }
    }
}

impl Poll {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            duration: Duration::from_secs(self.duration_secs),
            command_template: CommandTemplate::new(self.command_template.as_str()),
            default_reason: self.default_reason.clone(),
        }
    }
}

/// Hosting provider config options
///
/// The provider is reached through shell commands. Both commands are run with
/// `sh -c`, receiving the server id as `$1` and (for `execute_command`) the
/// console command as `$2`.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Provider {
    /// The server polls act on
    pub server_id: Option<String>,
    /// Prints the server's numeric status code, or exits 0 if it is online
    pub status_command: String,
    /// Runs `$2` on the server's console
    pub execute_command: String,
}

/// Logging-related config options
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Logging {
    /// Logging level for mc-poll-bot dependencies
    ///
    /// This only affects file logging.
    #[serde(with = "LevelDef")]
    pub all: log::Level,
    /// Logging level for mc-poll-bot itself
    ///
    /// This only affects file logging.
    #[serde(rename = "self")]
    #[serde(with = "LevelDef")]
    pub self_level: log::Level,
    /// Logging level for the Discord libraries
    ///
    /// This only affects file logging.
    #[serde(with = "LevelDef")]
    pub discord: log::Level,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            all: log::Level::Warn,
            self_level: log::Level::Debug,
            discord: log::Level::Info,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "log::Level")]
enum LevelDef {
    Error = 1,
    Warn,
    Info,
    Debug,
    Trace,
}
