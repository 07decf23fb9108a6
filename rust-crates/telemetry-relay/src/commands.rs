//! Line protocol: UI commands, master messages and replies

use std::fmt;

use thiserror::Error;

use crate::sessions::Session;

/// UI command verbs, in matching order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    GetSessions,
    StartMeasurement,
    AddSession,
    RemoveSession,
    SetSettings,
}

impl Verb {
    const ALL: [Verb; 5] = [
        Verb::GetSessions,
        Verb::StartMeasurement,
        Verb::AddSession,
        Verb::RemoveSession,
        Verb::SetSettings,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::GetSessions => "GET_MEASUREMENT_SESSIONS",
            Self::StartMeasurement => "START_MEASUREMENT",
            Self::AddSession => "ADD_SESSION",
            Self::RemoveSession => "REMOVE_SESSION",
            Self::SetSettings => "SET_SETTINGS",
        }
    }

    fn matching(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| line.starts_with(verb.keyword()))
    }
}

/// Rejected UI command; `Display` is the wire error line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERROR: {}", .0.keyword())]
    Malformed(Verb),

    #[error("ERROR: UNKNOWN_COMMAND")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    GetSessions,
    StartMeasurement { session_id: String },
    AddSession(Session),
    RemoveSession { session_id: String },
    SetSettings { settings: String },
}

impl UiCommand {
    /// Parse one trimmed, non-empty line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let verb = Verb::matching(line).ok_or(CommandError::Unknown)?;
        let argument = line.split_once(':').map(|(_, rest)| rest.trim());
        let malformed = CommandError::Malformed(verb);

        match verb {
            Verb::GetSessions => Ok(Self::GetSessions),
            Verb::StartMeasurement => match argument {
                Some(id) if !id.is_empty() => Ok(Self::StartMeasurement {
                    session_id: id.to_string(),
                }),
                _ => Err(malformed),
            },
            Verb::AddSession => argument
                .and_then(parse_session_fields)
                .map(Self::AddSession)
                .ok_or(malformed),
            Verb::RemoveSession => argument
                .map(|id| Self::RemoveSession {
                    session_id: id.to_string(),
                })
                .ok_or(malformed),
            Verb::SetSettings => argument
                .map(|settings| Self::SetSettings {
                    settings: settings.to_string(),
                })
                .ok_or(malformed),
        }
    }
}

/// `[id, name, start, last, points]` with exactly five fields
fn parse_session_fields(content: &str) -> Option<Session> {
    let content = content.strip_prefix('[').unwrap_or(content);
    let content = content.strip_suffix(']').unwrap_or(content);

    let fields: Vec<&str> = content.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [id, name, start, last, points] => Some(Session::new(*id, *name, *start, *last, *points)),
        _ => None,
    }
}

/// Messages arriving on the master link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterMessage {
    /// `SLAVER_STATUS ISALIVE`
    SlaverAlive,
    /// `MASTER_STATUS CONNECTED`, sent once by the master after connecting
    MasterAnnounce,
    Other(String),
}

impl MasterMessage {
    /// None for blank lines
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            "SLAVER_STATUS ISALIVE" => Some(Self::SlaverAlive),
            "MASTER_STATUS CONNECTED" => Some(Self::MasterAnnounce),
            other => Some(Self::Other(other.to_string())),
        }
    }
}

/// Response written back to the issuing UI client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Sessions(Vec<Session>),
    MeasurementStarted(String),
    SessionAdded,
    SessionRemoved,
    SessionNotFound,
    SettingsApplied,
    Rejected(CommandError),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sessions(sessions) => {
                f.write_str("SESSIONS:")?;
                for session in sessions {
                    write!(f, " {};", session.to_record())?;
                }
                Ok(())
            }
            Self::MeasurementStarted(id) => write!(f, "MEASUREMENT_STARTED: {}", id),
            Self::SessionAdded => f.write_str("SESSION_ADDED"),
            Self::SessionRemoved => f.write_str("SESSION_REMOVED"),
            Self::SessionNotFound => f.write_str("ERROR: SESSION_NOT_FOUND"),
            Self::SettingsApplied => f.write_str("SETTINGS_APPLIED"),
            Self::Rejected(err) => write!(f, "{}", err),
        }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Self::Rejected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_sessions() {
        assert_eq!(UiCommand::parse("GET_MEASUREMENT_SESSIONS"), Ok(UiCommand::GetSessions));
    }

    #[test]
    fn test_parse_start_measurement() {
        assert_eq!(
            UiCommand::parse("START_MEASUREMENT: X1 "),
            Ok(UiCommand::StartMeasurement {
                session_id: "X1".to_string()
            })
        );
        assert_eq!(
            UiCommand::parse("START_MEASUREMENT"),
            Err(CommandError::Malformed(Verb::StartMeasurement))
        );
        assert_eq!(
            UiCommand::parse("START_MEASUREMENT:   "),
            Err(CommandError::Malformed(Verb::StartMeasurement))
        );
    }

    #[test]
    fn test_parse_add_session() {
        let parsed = UiCommand::parse("ADD_SESSION:[X1, NameA, 2025-01-01, 2025-01-02, 5]").unwrap();
        assert_eq!(
            parsed,
            UiCommand::AddSession(Session::new("X1", "NameA", "2025-01-01", "2025-01-02", "5"))
        );

        // Brackets are optional
        assert!(UiCommand::parse("ADD_SESSION: a,b,c,d,e").is_ok());
    }

    #[test]
    fn test_parse_add_session_wrong_arity() {
        for line in ["ADD_SESSION:[a,b,c]", "ADD_SESSION:[a,b,c,d,e,f]", "ADD_SESSION", "ADD_SESSION:"] {
            assert_eq!(
                UiCommand::parse(line),
                Err(CommandError::Malformed(Verb::AddSession)),
                "{line}"
            );
        }
    }

    #[test]
    fn test_parse_remove_and_settings() {
        assert_eq!(
            UiCommand::parse("REMOVE_SESSION:X1"),
            Ok(UiCommand::RemoveSession {
                session_id: "X1".to_string()
            })
        );
        assert_eq!(
            UiCommand::parse("REMOVE_SESSION"),
            Err(CommandError::Malformed(Verb::RemoveSession))
        );
        assert_eq!(
            UiCommand::parse("SET_SETTINGS: SF=7, TX=14"),
            Ok(UiCommand::SetSettings {
                settings: "SF=7, TX=14".to_string()
            })
        );
        assert_eq!(
            UiCommand::parse("SET_SETTINGS"),
            Err(CommandError::Malformed(Verb::SetSettings))
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(UiCommand::parse("PING"), Err(CommandError::Unknown));
        assert_eq!(UiCommand::parse("get_measurement_sessions"), Err(CommandError::Unknown));
    }

    #[test]
    fn test_error_lines() {
        assert_eq!(
            Reply::from(CommandError::Malformed(Verb::AddSession)).to_string(),
            "ERROR: ADD_SESSION"
        );
        assert_eq!(Reply::from(CommandError::Unknown).to_string(), "ERROR: UNKNOWN_COMMAND");
        assert_eq!(Reply::SessionNotFound.to_string(), "ERROR: SESSION_NOT_FOUND");
    }

    #[test]
    fn test_sessions_reply() {
        let reply = Reply::Sessions(vec![
            Session::new("A", "One", "s1", "l1", "1"),
            Session::new("B", "Two", "s2", "l2", "2").with_settings("SF=7"),
        ]);
        assert_eq!(
            reply.to_string(),
            "SESSIONS: [A, One, s1, l1, 1, -]; [B, Two, s2, l2, 2, SF=7];"
        );
        assert_eq!(Reply::Sessions(Vec::new()).to_string(), "SESSIONS:");
    }

    #[test]
    fn test_master_messages() {
        assert_eq!(MasterMessage::parse("SLAVER_STATUS ISALIVE\r"), Some(MasterMessage::SlaverAlive));
        assert_eq!(MasterMessage::parse("MASTER_STATUS CONNECTED"), Some(MasterMessage::MasterAnnounce));
        assert_eq!(MasterMessage::parse("  "), None);
        assert_eq!(
            MasterMessage::parse("HELLO"),
            Some(MasterMessage::Other("HELLO".to_string()))
        );
    }
}
