//! The negotiation request: `"<TCP|UDP> <size> <count>\n"`.

use std::fmt;

use crate::core::{
    DEFAULT_REPEATS, MAX_DATAGRAM_SIZE, MAX_REPEATS, MAX_STREAM_SIZE, MIN_REPEATS, MIN_SIZE,
    ProtocolError, TOKEN_TCP, TOKEN_UDP,
};

/// Transport used for the timed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Connection-oriented byte stream (TCP).
    Stream,
    /// Connectionless datagrams (UDP).
    Datagram,
}

impl Transport {
    /// Wire token for this transport.
    pub fn token(self) -> &'static str {
        match self {
            Self::Stream => TOKEN_TCP,
            Self::Datagram => TOKEN_UDP,
        }
    }

    /// Parse a wire token. Matching is exact and case sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            TOKEN_TCP => Some(Self::Stream),
            TOKEN_UDP => Some(Self::Datagram),
            _ => None,
        }
    }

    /// Largest message size this transport allows.
    pub fn max_size(self) -> usize {
        match self {
            Self::Stream => MAX_STREAM_SIZE,
            Self::Datagram => MAX_DATAGRAM_SIZE,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A validated exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    transport: Transport,
    message_size: usize,
    repetitions: u32,
}

impl Request {
    /// Build a request from user input, clamping out-of-range values.
    ///
    /// Size is clamped into `[MIN_SIZE, transport max]` and repetitions into
    /// `[MIN_REPEATS, MAX_REPEATS]`.
    pub fn clamped(transport: Transport, message_size: usize, repetitions: u32) -> Self {
        Self {
            transport,
            message_size: message_size.clamp(MIN_SIZE, transport.max_size()),
            repetitions: repetitions.clamp(MIN_REPEATS, MAX_REPEATS),
        }
    }

    /// Build a request, rejecting out-of-range values the way the responder does.
    pub fn new(
        transport: Transport,
        message_size: usize,
        repetitions: u32,
    ) -> Result<Self, ProtocolError> {
        if message_size < MIN_SIZE || message_size > transport.max_size() {
            return Err(ProtocolError::MalformedRequest(format!(
                "message size {message_size} outside [{MIN_SIZE}, {}] for {transport}",
                transport.max_size()
            )));
        }
        if !(1..=MAX_REPEATS).contains(&repetitions) {
            return Err(ProtocolError::MalformedRequest(format!(
                "repetitions {repetitions} outside [1, {MAX_REPEATS}]"
            )));
        }
        Ok(Self {
            transport,
            message_size,
            repetitions,
        })
    }

    /// Parse and validate a request line as received by the responder.
    ///
    /// Tokens are separated by single spaces; anything after the third token
    /// is ignored. The trailing line terminator is optional.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());

        let (Some(protocol), Some(size), Some(count)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ProtocolError::MalformedRequest(format!(
                "expected 3 tokens in {line:?}"
            )));
        };

        let transport = Transport::from_token(protocol).ok_or_else(|| {
            ProtocolError::MalformedRequest(format!("unknown protocol {protocol:?}"))
        })?;
        let message_size = parse_number(size, "size")?;
        let repetitions = parse_number(count, "count")?;

        let message_size = usize::try_from(message_size)
            .map_err(|_| ProtocolError::MalformedRequest(format!("size {size:?} out of range")))?;
        let repetitions = u32::try_from(repetitions)
            .map_err(|_| ProtocolError::MalformedRequest(format!("count {count:?} out of range")))?;

        Self::new(transport, message_size, repetitions)
    }

    /// Serialize as a request line, terminator included.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }

    /// Negotiated transport.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Negotiated message size in bytes.
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Negotiated number of rounds.
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.transport, self.message_size, self.repetitions
        )
    }
}

/// Interpret a command-line repetition count.
///
/// A missing argument, or one that does not start with a digit `1`-`9`,
/// yields [`DEFAULT_REPEATS`]. Numeric values are later clamped by
/// [`Request::clamped`].
pub fn repetitions_from_arg(arg: Option<&str>) -> u32 {
    let Some(arg) = arg else {
        return DEFAULT_REPEATS;
    };
    if !matches!(arg.as_bytes().first(), Some(b'1'..=b'9')) {
        return DEFAULT_REPEATS;
    }
    let digits: &str = arg
        .find(|c: char| !c.is_ascii_digit())
        .map_or(arg, |end| &arg[..end]);
    // Overlong values saturate and get clamped to MAX_REPEATS later.
    digits.parse().unwrap_or(u32::MAX)
}

fn parse_number(token: &str, what: &str) -> Result<i64, ProtocolError> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| ProtocolError::MalformedRequest(format!("{what} {token:?} is not a number")))
}
