//! Exchange message framing.
//!
//! A message is a buffer of exactly the negotiated size whose first bytes
//! are the ASCII decimal sequence number followed by `'\n'`. The remaining
//! bytes are left untouched and never inspected.

use std::io::Write;

use crate::core::ProtocolError;

/// Write `sequence` followed by a newline at the start of `buf`.
///
/// Bytes past the newline are not modified.
pub fn write_sequence(buf: &mut [u8], sequence: u32) -> Result<(), ProtocolError> {
    let size = buf.len();
    let mut cursor = &mut buf[..];
    writeln!(cursor, "{sequence}").map_err(|_| ProtocolError::SequenceTooWide { sequence, size })
}

/// Parse the leading sequence number of a message.
///
/// Leading ASCII whitespace is skipped and parsing stops at the first
/// non-digit.
pub fn read_sequence(buf: &[u8]) -> Result<u32, ProtocolError> {
    let start = buf
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or(ProtocolError::MissingSequence)?;
    let digits = &buf[start..];
    let len = digits
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if len == 0 {
        return Err(ProtocolError::MissingSequence);
    }
    digits[..len].iter().try_fold(0u32, |acc, d| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u32::from(d - b'0')))
            .ok_or(ProtocolError::MissingSequence)
    })
}

/// Allocate a zeroed message buffer of the negotiated size.
pub fn new_message(size: usize) -> Vec<u8> {
    vec![0u8; size]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut buf = new_message(16);
        write_sequence(&mut buf, 1501).unwrap();
        assert_eq!(&buf[..5], b"1501\n");
        assert!(buf[5..].iter().all(|&b| b == 0));
        assert_eq!(read_sequence(&buf).unwrap(), 1501);
    }

    #[test]
    fn test_write_leaves_padding_untouched() {
        let mut buf = vec![b'x'; 16];
        write_sequence(&mut buf, 7).unwrap();
        assert_eq!(&buf[..2], b"7\n");
        assert_eq!(&buf[2..], &[b'x'; 14]);
    }

    #[test]
    fn test_write_too_wide() {
        let mut buf = [0u8; 3];
        assert!(matches!(
            write_sequence(&mut buf, 1234),
            Err(ProtocolError::SequenceTooWide { sequence: 1234, size: 3 })
        ));
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert_eq!(read_sequence(b"abc\n"), Err(ProtocolError::MissingSequence));
        assert_eq!(read_sequence(b"\0\0\0"), Err(ProtocolError::MissingSequence));
        assert_eq!(read_sequence(b""), Err(ProtocolError::MissingSequence));
        assert_eq!(read_sequence(b"99999999999\n"), Err(ProtocolError::MissingSequence));
    }

    #[test]
    fn test_read_ignores_trailing_bytes() {
        assert_eq!(read_sequence(b" 42\nrest of payload").unwrap(), 42);
    }
}
