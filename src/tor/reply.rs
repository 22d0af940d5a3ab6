//! Control port reply grammar
//!
//! A reply is one or more CRLF-terminated lines. `250-` lines continue the
//! reply, `250+keyword=` opens a data block that runs until a lone `.`, and
//! a line of the form `NNN message` ends it.

use super::error::ControlError;
use std::fmt;

/// Success status code
pub const STATUS_OK: u16 = 250;
/// "Unknown onion service" status for DEL_ONION
pub const STATUS_UNRECOGNIZED_ENTITY: u16 = 552;

/// Position of a line inside a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `NNN-text`
    Mid,
    /// `NNN+text` followed by a data block
    Data,
    /// `NNN text`
    End,
}

/// One status line of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    pub kind: LineKind,
    /// Text after the separator. For data lines the block body is appended,
    /// one `\n`-separated line per data line.
    pub text: String,
}

impl ReplyLine {
    /// Parse a single status line (trailing CRLF optional)
    pub fn parse(line: &str) -> Result<Self, ControlError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let bytes = line.as_bytes();
        if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(ControlError::parse(format!("bad status line {:?}", line)));
        }

        let code = line[..3]
            .parse::<u16>()
            .map_err(|_| ControlError::parse(format!("bad status code in {:?}", line)))?;

        let kind = match bytes[3] {
            b'-' => LineKind::Mid,
            b'+' => LineKind::Data,
            b' ' => LineKind::End,
            other => {
                return Err(ControlError::parse(format!(
                    "unexpected separator {:?} in {:?}",
                    other as char, line
                )))
            },
        };

        Ok(Self {
            code,
            kind,
            text: line[4..].to_string(),
        })
    }

    fn separator(&self) -> char {
        match self.kind {
            LineKind::Mid => '-',
            LineKind::Data => '+',
            LineKind::End => ' ',
        }
    }
}

impl fmt::Display for ReplyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.code, self.separator(), self.text)
    }
}

/// Parsed result of one command exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlReply {
    lines: Vec<ReplyLine>,
}

impl ControlReply {
    /// Parse a complete reply from its raw text
    pub fn parse(raw: &str) -> Result<Self, ControlError> {
        let mut assembler = ReplyAssembler::default();
        let mut lines = raw.lines();

        while let Some(line) = lines.next() {
            if let Some(reply) = assembler.push(line)? {
                if let Some(extra) = lines.find(|l| !l.is_empty()) {
                    return Err(ControlError::parse(format!(
                        "trailing data after final status line: {:?}",
                        extra
                    )));
                }
                return Ok(reply);
            }
        }

        Err(ControlError::parse("reply ended before a final status line"))
    }

    /// All status lines, final line last
    pub fn lines(&self) -> &[ReplyLine] {
        &self.lines
    }

    /// Status lines in wire form, without line terminators
    pub fn status_lines(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }

    fn final_line(&self) -> &ReplyLine {
        // An assembled reply always ends with its final line
        &self.lines[self.lines.len() - 1]
    }

    pub fn final_status_code(&self) -> u16 {
        self.final_line().code
    }

    pub fn final_message(&self) -> &str {
        &self.final_line().text
    }

    pub fn is_success(&self) -> bool {
        self.final_status_code() == STATUS_OK
    }

    /// Exactly `250 OK`
    pub fn is_ok(&self) -> bool {
        self.is_success() && self.final_message() == "OK"
    }

    /// Value of the first `key=value` line, searching non-final lines
    pub fn value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .filter(|line| line.kind != LineKind::End)
            .find_map(|line| {
                line.text
                    .strip_prefix(key)
                    .and_then(|rest| rest.strip_prefix('='))
            })
    }

    /// Reply text as it appeared on the wire (data blocks folded)
    pub fn raw(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push_str("\r\n");
        }
        out
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.status_lines();
        write!(f, "{}", lines.join(" | "))
    }
}

/// Incrementally assembles a reply from lines read off the socket
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    lines: Vec<ReplyLine>,
    data: Option<(ReplyLine, Vec<String>)>,
}

impl ReplyAssembler {
    /// Feed one line. Returns the reply once its final line has been read.
    pub fn push(&mut self, raw: &str) -> Result<Option<ControlReply>, ControlError> {
        let line = raw.trim_end_matches(['\r', '\n']);

        if let Some((mut header, mut body)) = self.data.take() {
            if line == "." {
                if !body.is_empty() {
                    if !header.text.is_empty() && !header.text.ends_with('=') {
                        header.text.push('\n');
                    }
                    header.text.push_str(&body.join("\n"));
                }
                self.lines.push(header);
            } else {
                // Dot-stuffed data line
                let content = line.strip_prefix('.').filter(|rest| rest.starts_with('.'));
                body.push(content.unwrap_or(line).to_string());
                self.data = Some((header, body));
            }
            return Ok(None);
        }

        if line.is_empty() {
            return Ok(None);
        }

        let parsed = ReplyLine::parse(line)?;
        match parsed.kind {
            LineKind::Mid => {
                self.lines.push(parsed);
                Ok(None)
            },
            LineKind::Data => {
                self.data = Some((parsed, Vec::new()));
                Ok(None)
            },
            LineKind::End => {
                self.lines.push(parsed);
                Ok(Some(ControlReply {
                    lines: std::mem::take(&mut self.lines),
                }))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_ok() {
        let reply = ControlReply::parse("250 OK\r\n").unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.final_status_code(), 250);
        assert_eq!(reply.status_lines(), vec!["250 OK".to_string()]);
    }

    #[test]
    fn test_multi_line_values() {
        let reply = ControlReply::parse(
            "250-ServiceID=abc123\r\n250-PrivateKey=ED25519-V3:AAAA\r\n250 OK\r\n",
        )
        .unwrap();

        assert!(reply.is_ok());
        assert_eq!(reply.lines().len(), 3);
        assert_eq!(reply.value("ServiceID"), Some("abc123"));
        assert_eq!(reply.value("PrivateKey"), Some("ED25519-V3:AAAA"));
        assert_eq!(reply.value("ClientAuth"), None);
    }

    #[test]
    fn test_error_reply_is_not_success() {
        let reply = ControlReply::parse("552 Unknown Onion Service id\r\n").unwrap();
        assert!(!reply.is_success());
        assert_eq!(reply.final_status_code(), 552);
        assert_eq!(reply.final_message(), "Unknown Onion Service id");
    }

    #[test]
    fn test_250_with_other_message_is_success_but_not_ok() {
        let reply = ControlReply::parse("250 closing connection\r\n").unwrap();
        assert!(reply.is_success());
        assert!(!reply.is_ok());
    }

    #[test]
    fn test_data_block_is_folded() {
        let reply = ControlReply::parse(
            "250+onions/detached=\r\naaaa\r\n..bbbb\r\n.\r\n250 OK\r\n",
        )
        .unwrap();

        assert_eq!(reply.value("onions/detached"), Some("aaaa\n.bbbb"));
        assert!(reply.is_ok());
    }

    #[test]
    fn test_incomplete_reply_is_parse_error() {
        let err = ControlReply::parse("250-ServiceID=abc\r\n").unwrap_err();
        assert!(matches!(err, ControlError::Parse(_)));
    }

    #[test]
    fn test_trailing_lines_rejected() {
        let err = ControlReply::parse("250 OK\r\n250 OK\r\n").unwrap_err();
        assert!(matches!(err, ControlError::Parse(_)));
    }

    #[test]
    fn test_bad_status_line() {
        assert!(ReplyLine::parse("OK").is_err());
        assert!(ReplyLine::parse("25x OK").is_err());
        assert!(ReplyLine::parse("250*OK").is_err());
        assert!(ReplyLine::parse("250").is_err());
    }

    #[test]
    fn test_assembler_resets_between_replies() {
        let mut assembler = ReplyAssembler::default();
        assert!(assembler.push("250-a=1\r\n").unwrap().is_none());
        let first = assembler.push("250 OK\r\n").unwrap().unwrap();
        assert_eq!(first.lines().len(), 2);

        let second = assembler.push("510 Unrecognized command\r\n").unwrap().unwrap();
        assert_eq!(second.lines().len(), 1);
        assert_eq!(second.final_status_code(), 510);
    }
}
