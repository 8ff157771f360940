use anyhow::{Context, Result, bail};
use puremessage_events::{GameEvent, parse_replay};

/// One line typed into `puremessage run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Event(GameEvent),
    /// `set <variable>=<value>`
    Setting { variable: String, value: String },
    Blank,
}

/// Parse a line of live input. Events use the replay syntax; an `@offset`
/// prefix is accepted and ignored since live events happen when typed.
pub fn parse_input_line(line: &str) -> Result<InputLine> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("set ") {
        let Some((variable, value)) = rest.split_once('=') else {
            bail!("expected 'set <variable>=<value>'");
        };
        return Ok(InputLine::Setting {
            variable: variable.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    let mut events = parse_replay(trimmed).context("invalid event")?;
    Ok(match events.pop() {
        Some(line) => InputLine::Event(line.event),
        None => InputLine::Blank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events() {
        assert_eq!(
            parse_input_line("join Alice").unwrap(),
            InputLine::Event(GameEvent::joined("Alice"))
        );
        assert_eq!(
            parse_input_line("@12 leave Alice").unwrap(),
            InputLine::Event(GameEvent::left("Alice"))
        );
        assert_eq!(parse_input_line("   # nothing").unwrap(), InputLine::Blank);
        assert!(parse_input_line("teleport Alice").is_err());
    }

    #[test]
    fn test_settings() {
        assert_eq!(
            parse_input_line("set welcome|welcome - Message body = Hi {0}").unwrap(),
            InputLine::Setting {
                variable: "welcome|welcome - Message body".to_string(),
                value: "Hi {0}".to_string(),
            }
        );
        assert!(parse_input_line("set Debug").is_err());
    }
}
