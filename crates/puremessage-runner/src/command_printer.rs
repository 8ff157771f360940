use std::io::Write;

use puremessage_events::BroadcastCommand;
use tokio::sync::mpsc;
use tracing::warn;

/// Render a command the way it would go over the wire, quoting words that
/// contain whitespace.
pub fn format_command(command: &BroadcastCommand) -> String {
    command
        .to_words()
        .iter()
        .map(|word| {
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                format!("\"{}\"", word.replace('"', "\\\""))
            } else {
                word.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write every command from `rx` to `out`, one timestamped line each, until
/// the channel closes. Returns how many were written.
pub async fn print_commands(
    mut rx: mpsc::UnboundedReceiver<BroadcastCommand>,
    mut out: impl Write,
) -> usize {
    let mut count = 0;
    while let Some(command) = rx.recv().await {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        if let Err(e) = writeln!(out, "[{}] {}", stamp, format_command(&command)) {
            warn!(target: "runner", "Failed to write command: {}", e);
            continue;
        }
        let _ = out.flush();
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use puremessage_events::BroadcastScope;

    #[test]
    fn test_format_quotes_text() {
        let cmd = BroadcastCommand::Yell {
            text: "Half the tickets are gone".to_string(),
            duration: 10,
            scope: BroadcastScope::Team(2),
        };
        assert_eq!(
            format_command(&cmd),
            "admin.yell \"Half the tickets are gone\" 10 team 2"
        );
    }

    #[test]
    fn test_format_plain_words() {
        let cmd = BroadcastCommand::Say {
            text: "hi".to_string(),
            scope: BroadcastScope::Player("Alice".to_string()),
        };
        assert_eq!(format_command(&cmd), "admin.say hi player Alice");
    }

    #[tokio::test]
    async fn test_prints_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(BroadcastCommand::Say {
            text: "one".to_string(),
            scope: BroadcastScope::All,
        })
        .unwrap();
        tx.send(BroadcastCommand::Say {
            text: "two words".to_string(),
            scope: BroadcastScope::All,
        })
        .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let count = print_commands(rx, &mut out).await;
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("] admin.say one all"));
        assert!(lines[1].ends_with("] admin.say \"two words\" all"));
    }
}
