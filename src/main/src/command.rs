use anyhow::{anyhow, bail, Result};
use control::{ParameterKey, ParameterValue};

/// One line of input to the host simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // state <entity> <value>
    State { entity: String, state: String },
    // clear <entity>
    Clear { entity: String },
    // set <key> <value>
    Set { key: ParameterKey, value: ParameterValue },
    Show,
    Remove,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or_else(|| anyhow!("Empty command"))?;
        let mut argument = |name: &str| {
            words
                .next()
                .ok_or_else(|| anyhow!("{} needs a {}", command, name))
        };

        let parsed = match command {
            "state" => Command::State {
                entity: argument("sensor")?.to_string(),
                state: argument("state")?.to_string(),
            },
            "clear" => Command::Clear {
                entity: argument("sensor")?.to_string(),
            },
            "set" => {
                let key: ParameterKey = argument("parameter")?.parse()?;
                let value = ParameterValue::parse(key, argument("value")?)?;
                Command::Set { key, value }
            }
            "show" => Command::Show,
            "remove" => Command::Remove,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command {:?}", other),
        };
        if let Some(extra) = words.next() {
            bail!("Unexpected argument {:?}", extra);
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control::CalculationMode;

    #[test]
    fn test_parse_state() {
        assert_eq!(
            Command::parse("state sensor.outdoor -3.5").unwrap(),
            Command::State {
                entity: "sensor.outdoor".to_string(),
                state: "-3.5".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_clear() {
        assert_eq!(
            Command::parse("clear sensor.living_room").unwrap(),
            Command::Clear {
                entity: "sensor.living_room".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            Command::parse("set curve_slope 1.2").unwrap(),
            Command::Set {
                key: ParameterKey::CurveSlope,
                value: ParameterValue::Number(1.2),
            }
        );
        assert_eq!(
            Command::parse("  set calculation_mode with_room_temp ").unwrap(),
            Command::Set {
                key: ParameterKey::CalculationMode,
                value: ParameterValue::Mode(CalculationMode::WithRoomTemp),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("state sensor.outdoor").is_err());
        assert!(Command::parse("set boost 1").is_err());
        assert!(Command::parse("set curve_slope steep").is_err());
        assert!(Command::parse("show now").is_err());
        assert!(Command::parse("clear").is_err());
        assert!(Command::parse("reboot").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("show").unwrap(), Command::Show);
        assert_eq!(Command::parse("remove").unwrap(), Command::Remove);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }
}
