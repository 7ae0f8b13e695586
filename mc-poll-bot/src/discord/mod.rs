use async_trait::async_trait;
use log::{debug, info, warn};

use twilight_gateway::{Event, Intents, Shard, ShardId};
use twilight_http::Client as DiscordClient;
use twilight_model::{
    application::{
        command::{CommandOption, CommandOptionType},
        interaction::{
            application_command::{CommandData, CommandOptionValue},
            Interaction, InteractionData,
        },
    },
    channel::message::{Embed, MessageFlags},
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    id::{
        marker::{ApplicationMarker, ChannelMarker, MessageMarker, RoleMarker},
        Id,
    },
    user::User,
};

use mc_poll_bot_lib::{
    communication::{CommandOutcome, PollDisplay, Requester, ServerProvider},
    error::{DisplayError, PollError},
    poll::{DisplayLocation, NewPoll, PollId, PollView},
    PollManager,
};

use std::{fmt, num::NonZeroU64, sync::Arc};

use util::{
    console_embed, parse_custom_id, poll_components, poll_embed, sanitize_for_markdown,
    status_embed, PollAction,
};

pub mod util;

static TEMPBANVOTE_COMMAND: &str = "tempbanvote";
static STATUS_COMMAND: &str = "status";
static CONSOLE_COMMAND: &str = "console";

/// Settings the bridge needs from the config file
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Role allowed to end polls early and to use `/status` and `/console`
    pub required_role: Option<NonZeroU64>,
    /// Role allowed to start polls
    pub start_role: Option<NonZeroU64>,
    /// The server polls act on
    pub server_id: Option<String>,
    /// Shown to voters in the poll description
    pub poll_duration_mins: u64,
}

/// Connects polls to Discord
///
/// Slash commands and button presses are turned into `PollManager` calls,
/// and polls are displayed as embeds with vote buttons. `/status` and
/// `/console` go straight to the `ServerProvider`.
///
/// This struct can be cloned and passed around as needed.
#[derive(Clone)]
pub struct DiscordBridge {
    client: Arc<DiscordClient>,
    settings: Arc<BridgeSettings>,
    provider: Arc<dyn ServerProvider>,
}

impl DiscordBridge {
    /// Sets up a Discord client with the given `token`
    ///
    /// The returned `Shard` has to be handed to `run` for events to be
    /// received.
    pub fn new(
        token: String,
        settings: BridgeSettings,
        provider: Arc<dyn ServerProvider>,
    ) -> (Self, Shard) {
        let client = DiscordClient::new(token.clone());
        let shard = Shard::new(ShardId::ONE, token, Intents::GUILDS);

        (
            Self {
                client: Arc::new(client),
                settings: Arc::new(settings),
                provider,
            },
            shard,
        )
    }

    /// Receives events from Discord until the gateway connection fails fatally
    pub async fn run(self, mut shard: Shard, manager: PollManager) {
        loop {
            let event = match shard.next_event().await {
                Ok(event) => event,
                Err(e) => {
                    warn!("Failed to receive Discord event: {}", e);
                    if e.is_fatal() {
                        break;
                    }
                    continue;
                }
            };

            let discord = self.clone();
            let manager = manager.clone();
            tokio::spawn(async move {
                if let Err(e) = discord.handle_discord_event(event, manager).await {
                    warn!("Failed to handle Discord event: {}", e);
                }
            });
        }
    }

    /// Handle an event from Discord
    pub async fn handle_discord_event(
        &self,
        event: Event,
        manager: PollManager,
    ) -> anyhow::Result<()> {
        match event {
            Event::Ready(ready) => {
                info!("Discord bot online as {}", ready.user.name);
                self.register_commands(ready.application.id).await?;
            }
            Event::GuildCreate(guild) => {
                info!("Connected to guild {}", guild.name);
            }
            Event::InteractionCreate(interaction) => {
                self.handle_interaction(&interaction.0, manager).await?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Registers the bot's slash commands
    async fn register_commands(&self, application_id: Id<ApplicationMarker>) -> anyhow::Result<()> {
        let interaction = self.client.interaction(application_id);

        let description = format!(
            "Create a {}-minute poll to temp-ban a player",
            self.settings.poll_duration_mins
        );
        let options = [
            string_option("player", "Minecraft username to temp-ban", true),
            string_option("reason", "Reason for the ban", false),
        ];
        interaction
            .create_global_command()
            .chat_input(TEMPBANVOTE_COMMAND, &description)?
            .command_options(&options)?
            .await?;

        interaction
            .create_global_command()
            .chat_input(STATUS_COMMAND, "Get server status")?
            .await?;

        let options = [string_option("command", "Command to execute", true)];
        interaction
            .create_global_command()
            .chat_input(CONSOLE_COMMAND, "Execute a console command")?
            .command_options(&options)?
            .await?;

        info!(
            "Registered the /{}, /{} and /{} commands",
            TEMPBANVOTE_COMMAND, STATUS_COMMAND, CONSOLE_COMMAND
        );
        Ok(())
    }

    async fn handle_interaction(
        &self,
        interaction: &Interaction,
        manager: PollManager,
    ) -> anyhow::Result<()> {
        match &interaction.data {
            Some(InteractionData::ApplicationCommand(data)) => match data.name.as_str() {
                name if name == TEMPBANVOTE_COMMAND => {
                    self.handle_tempbanvote(interaction, data, manager).await
                }
                name if name == STATUS_COMMAND => self.handle_status(interaction).await,
                name if name == CONSOLE_COMMAND => self.handle_console(interaction, data).await,
                name => {
                    debug!("Ignoring unknown command /{}", name);
                    Ok(())
                }
            },
            Some(InteractionData::MessageComponent(data)) => {
                match parse_custom_id(&data.custom_id) {
                    Some((action, id)) => {
                        self.handle_poll_button(interaction, action, id, manager)
                            .await
                    }
                    None => {
                        debug!("Ignoring unknown component {:?}", data.custom_id);
                        Ok(())
                    }
                }
            }
            _ => Ok(()),
        }
    }

    async fn handle_tempbanvote(
        &self,
        interaction: &Interaction,
        data: &CommandData,
        manager: PollManager,
    ) -> anyhow::Result<()> {
        if !has_role(interaction, self.settings.start_role) {
            let msg = missing_role_msg(self.settings.start_role, "start polls");
            return self.reply_ephemeral(interaction, msg).await;
        }

        let server_id = match &self.settings.server_id {
            Some(server_id) => server_id.clone(),
            None => {
                return self
                    .reply_ephemeral(interaction, "No server id is configured.")
                    .await
            }
        };

        let player = match command_string(data, "player") {
            Some(player) if !player.trim().is_empty() => player,
            _ => {
                return self
                    .reply_ephemeral(interaction, "A player username is required.")
                    .await
            }
        };

        self.respond(
            interaction,
            &InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(InteractionResponseData {
                    content: Some(format!(
                        "Starting a vote to temp-ban **{}**...",
                        sanitize_for_markdown(&player)
                    )),
                    ..Default::default()
                }),
            },
        )
        .await?;

        // The poll lives in the message we just responded with
        let message = self
            .client
            .interaction(interaction.application_id)
            .response(&interaction.token)
            .await?
            .model()
            .await?;

        let new_poll = NewPoll {
            target: player,
            reason: command_string(data, "reason"),
            server_id,
            initiator: requester_name(interaction),
            location: DisplayLocation {
                channel_id: message.channel_id.get(),
                message_id: message.id.get(),
            },
        };

        if let Err(e) = manager.create_poll(new_poll).await {
            let content = format!("Could not start the poll: {}", e);
            self.client
                .interaction(interaction.application_id)
                .update_response(&interaction.token)
                .content(Some(content.as_str()))?
                .await?;
        }

        Ok(())
    }

    /// Shows the status of the configured server
    async fn handle_status(&self, interaction: &Interaction) -> anyhow::Result<()> {
        let server_id = match self.privileged_server(interaction).await? {
            Some(server_id) => server_id,
            None => return Ok(()),
        };
        self.defer(interaction).await?;

        match self.provider.server_status(&server_id).await {
            Ok(status) => {
                let embed = status_embed(&server_id, status, &requester_name(interaction));
                self.update_reply(interaction, None, &[embed]).await
            }
            Err(e) => {
                warn!("Failed to get status of server {}: {}", server_id, e);
                let content = format!("Failed to get server status: {}", e);
                self.update_reply(interaction, Some(content.as_str()), &[]).await
            }
        }
    }

    /// Runs a console command on the configured server if it is online
    async fn handle_console(
        &self,
        interaction: &Interaction,
        data: &CommandData,
    ) -> anyhow::Result<()> {
        let server_id = match self.privileged_server(interaction).await? {
            Some(server_id) => server_id,
            None => return Ok(()),
        };

        let command = match command_string(data, "command") {
            Some(command) if !command.trim().is_empty() => command,
            _ => {
                return self
                    .reply_ephemeral(interaction, "A command is required.")
                    .await
            }
        };
        self.defer(interaction).await?;

        let status = match self.provider.server_status(&server_id).await {
            Ok(status) => status,
            Err(e) => {
                let content = format!("Failed to get server status: {}", e);
                return self.update_reply(interaction, Some(content.as_str()), &[]).await;
            }
        };

        if !status.is_online() {
            let content = format!(
                "Server must be online to execute commands. Current status: {}",
                status
            );
            return self.update_reply(interaction, Some(content.as_str()), &[]).await;
        }

        let name = requester_name(interaction);
        info!("{} is executing `{}` on server {}", name, command, server_id);

        match self.provider.execute_command(&server_id, &command).await {
            Ok(CommandOutcome::Executed) => {
                let embed = console_embed(&server_id, &command, &name);
                self.update_reply(interaction, None, &[embed]).await
            }
            Ok(CommandOutcome::Unconfirmed) => {
                let content = format!(
                    "Sent `{}` but the server could not confirm it ran. \
                    Check the server console.",
                    sanitize_for_markdown(&command)
                );
                self.update_reply(interaction, Some(content.as_str()), &[]).await
            }
            Err(e) => {
                warn!("Console command `{}` failed: {}", command, e);
                let content = format!("Failed to execute command: {}", e);
                self.update_reply(interaction, Some(content.as_str()), &[]).await
            }
        }
    }

    /// Returns the configured server id if the interacting member holds the
    /// required role, replying with why not otherwise
    async fn privileged_server(
        &self,
        interaction: &Interaction,
    ) -> anyhow::Result<Option<String>> {
        if !has_role(interaction, self.settings.required_role) {
            self.reply_ephemeral(
                interaction,
                missing_role_msg(self.settings.required_role, "use this command"),
            )
            .await?;
            return Ok(None);
        }

        match &self.settings.server_id {
            Some(server_id) => Ok(Some(server_id.clone())),
            None => {
                self.reply_ephemeral(interaction, "No server id is configured.")
                    .await?;
                Ok(None)
            }
        }
    }

    async fn handle_poll_button(
        &self,
        interaction: &Interaction,
        action: PollAction,
        id: PollId,
        manager: PollManager,
    ) -> anyhow::Result<()> {
        let requester = match requester(interaction) {
            Some(requester) => requester,
            None => {
                return self
                    .reply_ephemeral(interaction, "Could not tell who pressed this button.")
                    .await
            }
        };

        // Acknowledge right away; the poll message is updated by the display
        self.respond(
            interaction,
            &InteractionResponse {
                kind: InteractionResponseType::DeferredUpdateMessage,
                data: None,
            },
        )
        .await?;

        let res = match action {
            PollAction::Vote(choice) => manager
                .cast_vote(&id, &requester.id, choice)
                .await
                .map(|_| ()),
            PollAction::End => manager.request_end(&id, &requester).await.map(|_| ()),
        };

        let reply = match res {
            Ok(()) => return Ok(()),
            Err(PollError::NotFound(_)) => "Poll not found or expired.".to_string(),
            Err(PollError::PermissionDenied) => {
                missing_role_msg(self.settings.required_role, "end polls")
            }
            Err(e) => e.to_string(),
        };

        self.client
            .interaction(interaction.application_id)
            .create_followup(&interaction.token)
            .content(&reply)?
            .flags(MessageFlags::EPHEMERAL)
            .await?;

        Ok(())
    }

    async fn respond(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> anyhow::Result<()> {
        self.client
            .interaction(interaction.application_id)
            .create_response(interaction.id, &interaction.token, response)
            .await?;

        Ok(())
    }

    async fn defer(&self, interaction: &Interaction) -> anyhow::Result<()> {
        self.respond(
            interaction,
            &InteractionResponse {
                kind: InteractionResponseType::DeferredChannelMessageWithSource,
                data: None,
            },
        )
        .await
    }

    /// Replaces the (deferred) response to the given interaction
    async fn update_reply(
        &self,
        interaction: &Interaction,
        content: Option<&str>,
        embeds: &[Embed],
    ) -> anyhow::Result<()> {
        self.client
            .interaction(interaction.application_id)
            .update_response(&interaction.token)
            .content(content)?
            .embeds(Some(embeds))?
            .await?;

        Ok(())
    }

    async fn reply_ephemeral<T: Into<String>>(
        &self,
        interaction: &Interaction,
        text: T,
    ) -> anyhow::Result<()> {
        self.respond(
            interaction,
            &InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(InteractionResponseData {
                    content: Some(text.into()),
                    flags: Some(MessageFlags::EPHEMERAL),
                    ..Default::default()
                }),
            },
        )
        .await
    }
}

#[async_trait]
impl PollDisplay for DiscordBridge {
    async fn render_poll(&self, view: &PollView) -> Result<(), DisplayError> {
        let channel_id = Id::<ChannelMarker>::new_checked(view.location.channel_id)
            .ok_or_else(|| DisplayError("invalid channel id".into()))?;
        let message_id = Id::<MessageMarker>::new_checked(view.location.message_id)
            .ok_or_else(|| DisplayError("invalid message id".into()))?;

        let embeds = [poll_embed(view, self.settings.poll_duration_mins)];
        let components = poll_components(view);

        self.client
            .update_message(channel_id, message_id)
            .content(None)
            .map_err(display_error)?
            .embeds(Some(embeds.as_slice()))
            .map_err(display_error)?
            .components(Some(components.as_slice()))
            .map_err(display_error)?
            .await
            .map_err(display_error)?;

        Ok(())
    }

    async fn notify(&self, location: &DisplayLocation, text: &str) -> Result<(), DisplayError> {
        let channel_id = Id::<ChannelMarker>::new_checked(location.channel_id)
            .ok_or_else(|| DisplayError("invalid channel id".into()))?;

        self.client
            .create_message(channel_id)
            .content(text)
            .map_err(display_error)?
            .await
            .map_err(display_error)?;

        Ok(())
    }
}

fn display_error<E: fmt::Display>(e: E) -> DisplayError {
    DisplayError(e.to_string())
}

fn string_option(name: &str, description: &str, required: bool) -> CommandOption {
    CommandOption {
        autocomplete: None,
        channel_types: None,
        choices: None,
        description: description.into(),
        description_localizations: None,
        kind: CommandOptionType::String,
        max_length: None,
        max_value: None,
        min_length: None,
        min_value: None,
        name: name.into(),
        name_localizations: None,
        options: None,
        required: Some(required),
    }
}

/// Returns the string value of the named slash command option
fn command_string(data: &CommandData, name: &str) -> Option<String> {
    data.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            CommandOptionValue::String(s) => Some(s.clone()),
            _ => None,
        })
}

fn interaction_user(interaction: &Interaction) -> Option<&User> {
    interaction
        .member
        .as_ref()
        .and_then(|m| m.user.as_ref())
        .or_else(|| interaction.user.as_ref())
}

/// Describes whoever triggered the interaction to the poll core
///
/// Returns `None` if the interaction carries no user.
fn requester(interaction: &Interaction) -> Option<Requester> {
    let roles = interaction
        .member
        .as_ref()
        .map(|m| m.roles.as_slice())
        .unwrap_or_default();

    to_requester(interaction_user(interaction), roles)
}

fn to_requester(user: Option<&User>, roles: &[Id<RoleMarker>]) -> Option<Requester> {
    let user = user?;

    Some(Requester {
        id: user.id.to_string(),
        name: user.name.clone(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    })
}

fn requester_name(interaction: &Interaction) -> String {
    interaction_user(interaction)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| "unknown".into())
}

/// Returns true if no role is required or the interacting member holds it
fn has_role(interaction: &Interaction, role: Option<NonZeroU64>) -> bool {
    match role {
        Some(role) => interaction
            .member
            .as_ref()
            .map_or(false, |m| m.roles.iter().any(|r| r.get() == role.get())),
        None => true,
    }
}

fn missing_role_msg(role: Option<NonZeroU64>, action: &str) -> String {
    match role {
        Some(role) => format!("You need the <@&{}> role to {}.", role, action),
        None => format!("You are not allowed to {}.", action),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_user_means_no_requester() {
        let roles = [Id::<RoleMarker>::new(1234)];
        assert_eq!(to_requester(None, &roles), None);
        assert_eq!(to_requester(None, &[]), None);
    }

    #[test]
    fn role_messages() {
        let role = NonZeroU64::new(1234);
        assert_eq!(
            missing_role_msg(role, "end polls"),
            "You need the <@&1234> role to end polls."
        );
        assert_eq!(
            missing_role_msg(None, "use this command"),
            "You are not allowed to use this command."
        );
    }
}
