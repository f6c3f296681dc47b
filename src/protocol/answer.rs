//! The responder's answer to a request: `OK`, `OK <port>` or `ERROR`.

use std::fmt;

use crate::core::{ANSWER_ERROR, ANSWER_OK, ProtocolError};

/// Negotiation answer sent by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Stream exchange accepted; data follows on the same connection.
    Ok,
    /// Datagram exchange accepted on the given UDP port.
    OkPort(u16),
    /// Request rejected.
    Error,
}

impl Answer {
    /// Serialize as an answer line, terminator included.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }

    /// Parse an answer as read by the initiator.
    ///
    /// Only the `OK` prefix is required; anything else is a protocol error.
    /// The port, when present, follows `"OK "`.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let text = String::from_utf8_lossy(raw);
        let Some(rest) = text.strip_prefix(ANSWER_OK) else {
            return Err(ProtocolError::UnexpectedAnswer(text.into_owned()));
        };
        let port = rest
            .strip_prefix(' ')
            .map(|p| p.trim_end_matches(['\n', '\r', '\0']))
            .filter(|p| !p.is_empty());
        match port {
            None => Ok(Self::Ok),
            Some(p) => p
                .parse()
                .map(Self::OkPort)
                .map_err(|_| ProtocolError::UnexpectedAnswer(text.into_owned())),
        }
    }

    /// Port of a datagram acceptance.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::OkPort(port) => Some(*port),
            _ => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str(ANSWER_OK),
            Self::OkPort(port) => write!(f, "{ANSWER_OK} {port}"),
            Self::Error => f.write_str(ANSWER_ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_lines() {
        assert_eq!(Answer::Ok.to_line(), "OK\n");
        assert_eq!(Answer::OkPort(51000).to_line(), "OK 51000\n");
        assert_eq!(Answer::Error.to_line(), "ERROR\n");
    }

    #[test]
    fn test_parse_ok() {
        assert_eq!(Answer::parse(b"OK\n").unwrap(), Answer::Ok);
        assert_eq!(Answer::parse(b"OK").unwrap(), Answer::Ok);
    }

    #[test]
    fn test_parse_ok_port() {
        let answer = Answer::parse(b"OK 51000\n").unwrap();
        assert_eq!(answer, Answer::OkPort(51000));
        assert_eq!(answer.port(), Some(51000));
    }

    #[test]
    fn test_parse_error_is_unexpected() {
        assert!(matches!(
            Answer::parse(b"ERROR\n"),
            Err(ProtocolError::UnexpectedAnswer(_))
        ));
        assert!(Answer::parse(b"").is_err());
        assert!(Answer::parse(b"OK notaport\n").is_err());
        assert!(Answer::parse(b"OK 70000\n").is_err());
    }
}
