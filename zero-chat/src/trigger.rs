//! Reply trigger decisions.
//!
//! Decides, for each inbound message, whether the bot answers now:
//! an explicit mention always wins, then the chat command, then a random
//! draw for whitelisted channels.

use crate::message::InboundMessage;
use rand::Rng;
use zero_common::config::{RandomReplyConfig, TriggerConfig};

/// A recognised bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/chat <body>`; the body is what gets recorded
    Chat(&'a str),
    /// `/new`; clears the conversation
    Reset,
}

/// Why a reply was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Mention,
    Command,
    Random,
}

impl TriggerReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Command => "command",
            Self::Random => "random",
        }
    }
}

/// Reply decision logic, configured once per process.
#[derive(Debug, Clone)]
pub struct ReplyTrigger {
    commands: TriggerConfig,
    random: RandomReplyConfig,
}

impl ReplyTrigger {
    pub fn new(commands: TriggerConfig, random: RandomReplyConfig) -> Self {
        Self { commands, random }
    }

    pub fn quote_reply(&self) -> bool {
        self.commands.quote_reply
    }

    /// Recognise `<prefix><name> [body]`. Direct conversations also accept
    /// the bare `chat <body>` form.
    pub fn parse_command<'a>(&self, message: &'a InboundMessage) -> Option<Command<'a>> {
        let text = message.text.trim();

        let prefixed = self
            .commands
            .command_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| text.strip_prefix(p.as_str()));

        let (rest, has_prefix) = match prefixed {
            Some(rest) => (rest, true),
            None if message.is_direct() => (text, false),
            None => return None,
        };

        let (name, body) = match rest.split_once(char::is_whitespace) {
            Some((name, body)) => (name, body.trim()),
            None => (rest, ""),
        };

        if name == self.commands.command_name {
            Some(Command::Chat(body))
        } else if has_prefix && name == self.commands.reset_command && body.is_empty() {
            Some(Command::Reset)
        } else {
            None
        }
    }

    /// Evaluate the triggers in order, stopping at the first that fires.
    ///
    /// `rng` is drawn from only when the message reaches the random trigger
    /// in a whitelisted channel.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        message: &InboundMessage,
        rng: &mut R,
    ) -> Option<TriggerReason> {
        if message.mentions_bot {
            return Some(TriggerReason::Mention);
        }

        if matches!(self.parse_command(message), Some(Command::Chat(_))) {
            return Some(TriggerReason::Command);
        }

        if self.random.enabled {
            for channel in &self.random.channels {
                if *channel == message.channel_id {
                    let draw: f64 = rng.gen();
                    return (draw < self.random.frequency).then_some(TriggerReason::Random);
                }
            }
        }

        None
    }

    pub fn should_reply<R: Rng + ?Sized>(&self, message: &InboundMessage, rng: &mut R) -> bool {
        self.evaluate(message, rng).is_some()
    }
}
