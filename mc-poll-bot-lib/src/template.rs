use std::fmt;

/// Token replaced with the poll target
pub const PLAYER_TOKEN: &str = "{player}";
/// Token replaced with the poll reason
pub const REASON_TOKEN: &str = "{reason}";

/// The default outcome command: a 30 minute temporary ban
pub const DEFAULT_COMMAND_TEMPLATE: &str = "tempban {player} 30m {reason}";

/// A console command with `{player}` and `{reason}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_player_token(&self) -> bool {
        self.0.contains(PLAYER_TOKEN)
    }

    /// Builds the console command for `player` and `reason`
    ///
    /// The player is substituted first, so a reason containing a literal
    /// `{player}` is left as-is. Line breaks in either value become spaces.
    pub fn render(&self, player: &str, reason: &str) -> String {
        self.0
            .replacen(PLAYER_TOKEN, &single_line(player), 1)
            .replacen(REASON_TOKEN, &single_line(reason), 1)
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TEMPLATE)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn single_line(text: &str) -> String {
    text.replace(|c: char| c == '\r' || c == '\n', " ")
}
