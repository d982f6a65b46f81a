//! Interactive console mode
//!
//! Plays the chat platform: each line is one inbound message.
//!
//! ```text
//! #admin !new falcon            admin command
//! #falcon/intake Bravo-6 here   message in a mission channel
//! hello                         message in the current channel
//! ```

use std::sync::Arc;

use console::{style, Term};
use hq_adapter::ConsoleChannelGateway;
use hq_domain::MissionRepository;
use hq_usecase::game_master::ADMIN_CHANNEL;
use hq_usecase::ports::{ChannelGateway, ChannelRef};
use hq_usecase::{GameMaster, InboundMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Where a line is posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Admin,
    Channel(ChannelRef),
}

impl Target {
    /// `admin` or `category/name`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('#');
        if raw == ADMIN_CHANNEL {
            return Some(Target::Admin);
        }
        let (category, name) = raw.split_once('/')?;
        if category.is_empty() || name.is_empty() {
            return None;
        }
        Some(Target::Channel(ChannelRef::new(
            category.to_lowercase(),
            name.to_lowercase(),
        )))
    }

    fn label(&self) -> String {
        match self {
            Target::Admin => ADMIN_CHANNEL.to_string(),
            Target::Channel(channel) => channel.to_string(),
        }
    }
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Empty,
    Quit,
    Help,
    Channels,
    History(Target),
    Join(Target),
    As(String),
    Say { target: Option<Target>, text: String },
    Invalid(String),
}

impl Line {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Line::Empty;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (cmd, rest) = command.split_once(' ').unwrap_or((command, ""));
            let rest = rest.trim();
            return match cmd {
                "quit" | "exit" | "q" => Line::Quit,
                "help" | "h" => Line::Help,
                "channels" => Line::Channels,
                "history" => Target::parse(rest)
                    .map(Line::History)
                    .unwrap_or_else(|| Line::Invalid("usage: /history <category>/<name>".into())),
                "join" => Target::parse(rest)
                    .map(Line::Join)
                    .unwrap_or_else(|| Line::Invalid("usage: /join admin | <category>/<name>".into())),
                "as" if !rest.is_empty() => Line::As(rest.to_string()),
                "as" => Line::Invalid("usage: /as <player name>".into()),
                _ => Line::Invalid(format!("unknown command: /{}", cmd)),
            };
        }

        if input.starts_with('#') {
            let (raw, text) = input.split_once(' ').unwrap_or((input, ""));
            return match Target::parse(raw) {
                Some(target) if !text.trim().is_empty() => Line::Say {
                    target: Some(target),
                    text: text.trim().to_string(),
                },
                Some(_) => Line::Empty,
                None => Line::Invalid(format!("unknown channel: {}", raw)),
            };
        }

        Line::Say {
            target: None,
            text: input.to_string(),
        }
    }
}

/// Why a player line cannot go to `target`, if it cannot
pub fn refusal(gateway: &ConsoleChannelGateway, target: &Target) -> Option<String> {
    match target {
        Target::Admin => None,
        Target::Channel(channel) if !gateway.contains(channel) => {
            Some(format!("No such channel: {}", channel))
        }
        Target::Channel(channel) if gateway.is_read_only(channel) => {
            Some(format!("#{} is closed. Move on to the current stage.", channel))
        }
        Target::Channel(_) => None,
    }
}

/// Console session for a human playing every participant
pub struct InteractiveCli<R: MissionRepository> {
    game_master: Arc<GameMaster<R>>,
    gateway: Arc<ConsoleChannelGateway>,
    term: Term,
    current: Target,
    sender: String,
}

impl<R: MissionRepository> InteractiveCli<R> {
    pub fn new(game_master: Arc<GameMaster<R>>, gateway: Arc<ConsoleChannelGateway>) -> Self {
        Self {
            game_master,
            gateway,
            term: Term::stdout(),
            current: Target::Admin,
            sender: "player".to_string(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.term.write_line(&style("HQ console").bold().to_string())?;
        self.term
            .write_line("Type /help for commands, /quit to exit")?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.term.write_str(&format!(
                "{} {} > ",
                style(format!("[{}]", self.current.label())).dim(),
                style(&self.sender).green()
            ))?;
            let Some(input) = lines.next_line().await? else {
                break;
            };

            match Line::parse(&input) {
                Line::Empty => {}
                Line::Quit => break,
                Line::Help => self.help()?,
                Line::Channels => {
                    for (channel, read_only) in self.gateway.channels() {
                        let lock = if read_only { " (read-only)" } else { "" };
                        self.term.write_line(&format!("  #{}{}", channel, lock))?;
                    }
                }
                Line::History(Target::Channel(channel)) => {
                    for chunk in self.gateway.history(&channel) {
                        self.term.write_line(&format!("  {}", chunk))?;
                    }
                }
                Line::History(Target::Admin) => {}
                Line::Join(target) => {
                    if self.known(&target) {
                        self.current = target;
                    } else {
                        self.term.write_line(&format!("No such channel: {}", target.label()))?;
                    }
                }
                Line::As(sender) => self.sender = sender,
                Line::Say { target, text } => {
                    let target = target.unwrap_or_else(|| self.current.clone());
                    self.say(target, text).await?;
                }
                Line::Invalid(reason) => self.term.write_line(&style(reason).red().to_string())?,
            }
        }

        self.term.write_line("Goodbye!")?;
        Ok(())
    }

    fn known(&self, target: &Target) -> bool {
        match target {
            Target::Admin => true,
            Target::Channel(channel) => self.gateway.contains(channel),
        }
    }

    async fn say(&self, target: Target, text: String) -> anyhow::Result<()> {
        if let Some(reason) = refusal(&self.gateway, &target) {
            self.term.write_line(&style(reason).red().to_string())?;
            return Ok(());
        }

        let message = match &target {
            Target::Admin => InboundMessage {
                category: None,
                channel: ADMIN_CHANNEL.to_string(),
                sender: self.sender.clone(),
                content: text,
                from_bot: false,
            },
            Target::Channel(channel) => InboundMessage {
                category: Some(channel.category.clone()),
                channel: channel.name.clone(),
                sender: self.sender.clone(),
                content: text,
                from_bot: false,
            },
        };

        let Some(reply) = self.game_master.handle(&message).await else {
            return Ok(());
        };
        match &target {
            Target::Admin => {
                let tag = style(format!("#{}", ADMIN_CHANNEL)).magenta().bold();
                self.term.write_line(&format!("{} {}", tag, reply))?;
            }
            Target::Channel(channel) => {
                if let Err(err) = self.gateway.send_message(channel, &reply).await {
                    warn!(channel = %channel, error = %err, "Failed to deliver reply");
                }
            }
        }
        Ok(())
    }

    fn help(&self) -> anyhow::Result<()> {
        for line in [
            "Commands:",
            "  /join admin | <category>/<name>  - Switch the current channel",
            "  /as <name>                       - Speak as another player",
            "  /channels                        - List channels",
            "  /history <category>/<name>       - Show what a channel received",
            "  /quit                            - Exit",
            "Messages:",
            "  #admin !new <mission>            - Create a mission",
            "  #admin !status <mission>         - Show a mission",
            "  #<mission>/<stage> <text>        - Talk to a stage bot",
        ] {
            self.term.write_line(line)?;
        }
        Ok(())
    }
}
