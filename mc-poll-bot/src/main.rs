use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};

use log::*;

use mc_poll_bot_lib::{
    communication::{RequiredRole, ServerProvider},
    PollManager,
};

use crate::discord::{BridgeSettings, DiscordBridge};
use crate::provider::ShellProvider;

use config::Config;
use structopt::StructOpt;

mod config;
mod discord;
mod logging;
mod provider;

#[derive(StructOpt, Debug)]
pub struct Opt {
    /// Path to config
    #[structopt(
        short = "c",
        long,
        parse(from_os_str),
        default_value = "./mc-poll-bot-config.toml"
    )]
    config: PathBuf,

    /// Generate a default config and then exit the program
    #[structopt(short = "g", long)]
    gen_config: bool,

    /// ID of the server polls act on (overrides the config)
    #[structopt(short = "s", long)]
    server_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log_panics::init();

    let opt = Opt::from_args();
    let config_filepath = opt.config.clone();
    let mut config = Config::load(&config_filepath).await?;

    if opt.gen_config {
        return Ok(());
    }

    config.merge_in_args(opt);

    logging::setup_logger(
        config_filepath.with_file_name("mc-poll-bot.log"),
        config.logging.all,
        config.logging.self_level,
        config.logging.discord,
    )
    .with_context(|| "Failed to set up logging")?;

    if config.discord.token.is_empty() {
        return Err(anyhow!(
            "A Discord bot token must be set in the config at {:?}",
            config_filepath
        ));
    }

    if config.provider.server_id.is_none() {
        warn!("No server id is configured, polls can't be started");
    }

    let poll_config = config
        .poll
        .to_poll_config()
        .validate()
        .with_context(|| "Invalid poll config")?;

    let provider: Arc<dyn ServerProvider> = Arc::new(ShellProvider::new(
        config.provider.status_command.clone(),
        config.provider.execute_command.clone(),
    ));

    let (discord, shard) = DiscordBridge::new(
        config.discord.token.clone(),
        BridgeSettings {
            required_role: config.discord.required_role,
            start_role: config.discord.start_role,
            server_id: config.provider.server_id.clone(),
            poll_duration_mins: (poll_config.duration.as_secs() + 59) / 60,
        },
        provider.clone(),
    );

    let privilege = RequiredRole(config.discord.required_role.map(|r| r.to_string()));

    let manager = PollManager::new(
        poll_config,
        provider,
        Arc::new(discord.clone()),
        Arc::new(privilege),
    )?;

    info!("Connecting to Discord");
    discord.run(shard, manager).await;

    info!("Discord connection closed, shutting down");
    Ok(())
}
