//! stdin/stdout host adapter for local use.
//!
//! Each stdin line is one inbound message. Lines starting with `{` are read
//! as JSON [`InboundMessage`]s, so group traffic can be piped in; any other
//! line is a direct message from the local user addressed to the bot.

use crate::message::{InboundMessage, OutgoingReply};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Sender id used for plain-text lines.
pub const LOCAL_USER: &str = "user";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<InboundMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        return serde_json::from_str(line).map(Some);
    }
    Ok(Some(InboundMessage::direct(LOCAL_USER, line).with_mention()))
}

/// Read stdin until EOF or `/quit`, forwarding parsed messages.
pub async fn listen(inbound: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed == "/quit" || trimmed == "/exit" {
            break;
        }

        match parse_line(trimmed) {
            Ok(Some(message)) => {
                if inbound.send(message).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping malformed JSON input line"),
        }
    }
    Ok(())
}

/// Write replies to stdout until the channel closes.
pub async fn print_replies(mut replies: mpsc::Receiver<OutgoingReply>) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    while let Some(reply) = replies.recv().await {
        let mut rendered = reply.render();
        rendered.push('\n');
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ConversationScope;

    #[test]
    fn plain_line_is_direct_mention() {
        let msg = parse_line("  hello bot  ").unwrap().unwrap();
        assert_eq!(msg.scope, ConversationScope::Direct);
        assert_eq!(msg.sender_id, LOCAL_USER);
        assert_eq!(msg.text, "hello bot");
        assert!(msg.mentions_bot);
    }

    #[test]
    fn json_line_is_inbound_message() {
        let msg = parse_line(
            r#"{"scope":"group","channel_id":"g1","sender_id":"bob","text":"/chat hi","message_id":"7"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(msg.scope, ConversationScope::Group);
        assert_eq!(msg.channel_id, "g1");
        assert_eq!(msg.text, "/chat hi");
        assert!(!msg.mentions_bot);
        assert_eq!(msg.message_id, "7");
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_line("{not json").is_err());
    }
}
