use mc_poll_bot_lib::{
    communication::ServerStatus,
    poll::{PollId, PollView},
    tally::Choice,
};
use twilight_model::channel::message::{
    component::{ActionRow, Button, ButtonStyle},
    embed::{EmbedField, EmbedFooter},
    Component, Embed,
};

const VOTE_YES_PREFIX: &str = "tempban_yes";
const VOTE_NO_PREFIX: &str = "tempban_no";
const END_PREFIX: &str = "tempban_end";

const OPEN_COLOR: u32 = 0x4a90e2;
const CLOSED_COLOR: u32 = 0x6c757d;
const ONLINE_COLOR: u32 = 0x5cb85c;

/// What a poll button asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    Vote(Choice),
    End,
}

impl PollAction {
    fn prefix(self) -> &'static str {
        match self {
            PollAction::Vote(Choice::Yes) => VOTE_YES_PREFIX,
            PollAction::Vote(Choice::No) => VOTE_NO_PREFIX,
            PollAction::End => END_PREFIX,
        }
    }
}

/// Builds the custom id of a poll button
pub fn custom_id(action: PollAction, id: &PollId) -> String {
    format!("{}:{}", action.prefix(), id)
}

/// Parses a custom id built by `custom_id`
pub fn parse_custom_id(custom_id: &str) -> Option<(PollAction, PollId)> {
    let (prefix, id) = custom_id.split_once(':')?;
    if id.is_empty() {
        return None;
    }

    let action = match prefix {
        VOTE_YES_PREFIX => PollAction::Vote(Choice::Yes),
        VOTE_NO_PREFIX => PollAction::Vote(Choice::No),
        END_PREFIX => PollAction::End,
        _ => return None,
    };

    Some((action, PollId::from(id)))
}

/// The embed describing a poll
pub fn poll_embed(view: &PollView, duration_mins: u64) -> Embed {
    let target = sanitize_for_markdown(&view.target);

    let (description, footer, color) = if view.finalized {
        (
            format!(
                "Vote to temporarily ban **{}** has ended.\n\n**Server:** {}\n**Reason:** {}",
                target,
                sanitize_for_markdown(&view.server_id),
                sanitize_for_markdown(&view.reason)
            ),
            format!("Poll ended | Initiated by {}", view.initiator),
            CLOSED_COLOR,
        )
    } else {
        (
            format!(
                "A vote has been started to temporarily ban **{}**.\n\n**Server:** {}\n\
                **Reason:** {}\n\nVote now, the poll ends in {} minutes.",
                target,
                sanitize_for_markdown(&view.server_id),
                sanitize_for_markdown(&view.reason),
                duration_mins
            ),
            format!("Poll: {} | Initiated by {}", view.id, view.initiator),
            OPEN_COLOR,
        )
    };

    let fields = vec![
        field("Yes", view.counts.yes.to_string()),
        field("No", view.counts.no.to_string()),
        field("Target", target.clone()),
    ];

    embed(
        format!("Temp-Ban Vote: {}", target),
        Some(description),
        fields,
        footer,
        color,
    )
}

/// The embed answering `/status`
pub fn status_embed(server_id: &str, status: ServerStatus, requested_by: &str) -> Embed {
    let color = if status.is_online() {
        ONLINE_COLOR
    } else {
        CLOSED_COLOR
    };

    embed(
        "Server Status".into(),
        None,
        vec![
            field("Status", status.to_string()),
            field("Server", sanitize_for_markdown(server_id)),
        ],
        format!("Requested by {}", requested_by),
        color,
    )
}

/// The embed answering a `/console` command that ran
pub fn console_embed(server_id: &str, command: &str, executed_by: &str) -> Embed {
    embed(
        "Command Executed".into(),
        Some(format!("```{}```", command.replace('`', "'"))),
        Vec::new(),
        format!("Server: {} | Executed by {}", server_id, executed_by),
        ONLINE_COLOR,
    )
}

fn embed(
    title: String,
    description: Option<String>,
    fields: Vec<EmbedField>,
    footer: String,
    color: u32,
) -> Embed {
    Embed {
        author: None,
        color: Some(color),
        description,
        fields,
        footer: Some(EmbedFooter {
            icon_url: None,
            proxy_icon_url: None,
            text: footer,
        }),
        image: None,
        kind: "rich".into(),
        provider: None,
        thumbnail: None,
        timestamp: None,
        title: Some(title),
        url: None,
        video: None,
    }
}

fn field(name: &str, value: String) -> EmbedField {
    EmbedField {
        inline: true,
        name: name.into(),
        value,
    }
}

/// The button row of a poll
///
/// Buttons are disabled and show the final counts once the poll is finalized.
pub fn poll_components(view: &PollView) -> Vec<Component> {
    let (yes_label, no_label, end_label) = if view.finalized {
        (
            format!("Yes ({})", view.counts.yes),
            format!("No ({})", view.counts.no),
            "Ended".to_string(),
        )
    } else {
        ("Yes".to_string(), "No".to_string(), "End Poll".to_string())
    };

    let button = |action, label, style| {
        Component::Button(Button {
            custom_id: Some(custom_id(action, &view.id)),
            disabled: view.finalized,
            emoji: None,
            label: Some(label),
            style,
            url: None,
        })
    };

    vec![Component::ActionRow(ActionRow {
        components: vec![
            button(PollAction::Vote(Choice::Yes), yes_label, ButtonStyle::Success),
            button(PollAction::Vote(Choice::No), no_label, ButtonStyle::Danger),
            button(PollAction::End, end_label, ButtonStyle::Secondary),
        ],
    })]
}

/// Sanitizes the given text for usage in a markdown context
pub fn sanitize_for_markdown<T: AsRef<str>>(text: T) -> String {
    let text = text.as_ref();

    text.chars().fold(String::new(), |mut s, c| {
        match c {
            '*' | '_' | '~' | '>' | '`' | '|' => {
                s.push('\\');
                s.push(c);
            }
            _ => s.push(c),
        }
        s
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use expect_test::expect;
    use mc_poll_bot_lib::{poll::DisplayLocation, tally::TallyCounts};

    fn view(finalized: bool) -> PollView {
        PollView {
            id: PollId::from("poll_abc_123456"),
            target: "Steve_".into(),
            reason: "griefing".into(),
            server_id: "srv1".into(),
            initiator: "mod#0001".into(),
            location: DisplayLocation {
                channel_id: 1,
                message_id: 2,
            },
            counts: TallyCounts { yes: 3, no: 1 },
            finalized,
        }
    }

    fn buttons(components: &[Component]) -> Vec<&Button> {
        match &components[0] {
            Component::ActionRow(row) => row
                .components
                .iter()
                .filter_map(|c| match c {
                    Component::Button(b) => Some(b),
                    _ => None,
                })
                .collect(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn sanitize_player_names() {
        assert_eq!(sanitize_for_markdown("Steve"), "Steve");
        assert_eq!(sanitize_for_markdown("xX_Griefer_Xx"), "xX\\_Griefer\\_Xx");
        assert_eq!(
            sanitize_for_markdown("**spam** > `tnt` | ~~"),
            "\\*\\*spam\\*\\* \\> \\`tnt\\` \\| \\~\\~"
        );
    }

    #[test]
    fn custom_id_round_trip() {
        let id = PollId::from("poll_abc_123456");

        for action in [
            PollAction::Vote(Choice::Yes),
            PollAction::Vote(Choice::No),
            PollAction::End,
        ] {
            assert_eq!(
                parse_custom_id(&custom_id(action, &id)),
                Some((action, id.clone()))
            );
        }
    }

    #[test]
    fn parse_vote_custom_id() {
        expect![[r#"
            Some(
                (
                    Vote(
                        No,
                    ),
                    PollId(
                        "poll_abc_123456",
                    ),
                ),
            )
        "#]]
        .assert_debug_eq(&parse_custom_id("tempban_no:poll_abc_123456"));
    }

    #[test]
    fn parse_bad_custom_ids() {
        assert_eq!(parse_custom_id("tempban_yes"), None);
        assert_eq!(parse_custom_id("tempban_yes:"), None);
        assert_eq!(parse_custom_id("something_else:poll_abc_123456"), None);
    }

    #[test]
    fn open_poll_embed() {
        let embed = poll_embed(&view(false), 5);

        assert_eq!(embed.title.as_deref(), Some("Temp-Ban Vote: Steve\\_"));
        let fields: Vec<_> = embed
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(fields, [("Yes", "3"), ("No", "1"), ("Target", "Steve\\_")]);
        assert_eq!(
            embed.footer.unwrap().text,
            "Poll: poll_abc_123456 | Initiated by mod#0001"
        );
        assert!(embed.description.unwrap().contains("ends in 5 minutes"));
    }

    #[test]
    fn finalized_poll_embed() {
        let embed = poll_embed(&view(true), 5);
        assert_eq!(
            embed.footer.unwrap().text,
            "Poll ended | Initiated by mod#0001"
        );
    }

    #[test]
    fn open_poll_buttons() {
        let components = poll_components(&view(false));
        let buttons = buttons(&components);

        assert_eq!(buttons.len(), 3);
        assert!(buttons.iter().all(|b| !b.disabled));
        assert_eq!(
            buttons[0].custom_id.as_deref(),
            Some("tempban_yes:poll_abc_123456")
        );
        assert_eq!(
            buttons[2].custom_id.as_deref(),
            Some("tempban_end:poll_abc_123456")
        );
    }

    #[test]
    fn finalized_poll_buttons() {
        let components = poll_components(&view(true));
        let labels: Vec<_> = buttons(&components)
            .iter()
            .map(|b| (b.label.as_deref().unwrap_or_default(), b.disabled))
            .collect();

        assert_eq!(
            labels,
            [("Yes (3)", true), ("No (1)", true), ("Ended", true)]
        );
    }

    #[test]
    fn status_embeds() {
        let online = status_embed("srv1", ServerStatus::Online, "mod#0001");
        assert_eq!(online.color, Some(ONLINE_COLOR));
        assert_eq!(online.fields[0].value, "Online");
        assert_eq!(online.footer.unwrap().text, "Requested by mod#0001");

        let offline = status_embed("srv1", ServerStatus::Offline, "mod#0001");
        assert_eq!(offline.color, Some(CLOSED_COLOR));
        assert_eq!(offline.fields[0].value, "Offline");
    }

    #[test]
    fn console_command_embed() {
        let embed = console_embed("srv1", "say `hi`", "mod#0001");
        assert_eq!(embed.title.as_deref(), Some("Command Executed"));
        assert_eq!(embed.description.as_deref(), Some("```say 'hi'```"));
        assert_eq!(
            embed.footer.unwrap().text,
            "Server: srv1 | Executed by mod#0001"
        );
    }
}
