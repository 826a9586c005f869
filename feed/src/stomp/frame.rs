//! STOMP 1.2 frame codec.
//!
//! One WebSocket message carries one frame (or a bare EOL heart-beat):
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! \n
//! body\0
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("frame is not NUL terminated")]
    MissingNul,

    #[error("malformed header line: {0}")]
    BadHeader(String),

    #[error("invalid escape sequence in: {0}")]
    BadEscape(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "DISCONNECT" => Self::Disconnect,
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Wire order. Repeated headers keep the first occurrence as the value.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Result of decoding one transport message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    Heartbeat,
    Frame(Frame),
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());

        out.push_str(self.command.as_str());
        out.push('\n');

        for (k, v) in &self.headers {
            if escape {
                out.push_str(&escape_header(k));
                out.push(':');
                out.push_str(&escape_header(v));
            } else {
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    pub fn decode(raw: &str) -> Result<Decoded, FrameError> {
        let rest = raw.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(Decoded::Heartbeat);
        }

        let (command_line, mut rest) = split_line(rest).ok_or(FrameError::MissingNul)?;
        let command: Command = command_line.parse()?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            let (line, after) = split_line(rest).ok_or(FrameError::MissingNul)?;
            rest = after;
            if line.is_empty() {
                break;
            }

            let (k, v) = line
                .split_once(':')
                .ok_or_else(|| FrameError::BadHeader(line.to_string()))?;

            if escape {
                headers.push((unescape_header(k)?, unescape_header(v)?));
            } else {
                headers.push((k.to_string(), v.to_string()));
            }
        }

        let declared_len = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| FrameError::BadHeader(format!("content-length:{v}")))
            })
            .transpose()?;

        let body = match declared_len {
            Some(len) => {
                let body = rest
                    .get(..len)
                    .ok_or_else(|| FrameError::BadHeader(format!("content-length:{len}")))?;
                if rest.as_bytes().get(len) != Some(&0) {
                    return Err(FrameError::MissingNul);
                }
                body
            }
            None => {
                let end = rest.find('\0').ok_or(FrameError::MissingNul)?;
                &rest[..end]
            }
        };

        Ok(Decoded::Frame(Frame {
            command,
            headers,
            body: body.to_string(),
        }))
    }
}

/// Splits off one line; accepts `\n` and `\r\n`.
fn split_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    let line = s[..idx].strip_suffix('\r').unwrap_or(&s[..idx]);
    Some((line, &s[idx + 1..]))
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::BadEscape(s.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(raw: &str) -> Frame {
        match Frame::decode(raw).unwrap() {
            Decoded::Frame(f) => f,
            Decoded::Heartbeat => panic!("expected frame"),
        }
    }

    #[test]
    fn encodes_subscribe() {
        let f = Frame::new(Command::Subscribe)
            .header("id", "sub-alerts")
            .header("destination", "/topic/alerts");

        assert_eq!(
            f.encode(),
            "SUBSCRIBE\nid:sub-alerts\ndestination:/topic/alerts\n\n\0"
        );
    }

    #[test]
    fn send_adds_content_length() {
        let f = Frame::new(Command::Send)
            .header("destination", "/app/ping")
            .with_body("{\"a\":1}");

        assert_eq!(
            f.encode(),
            "SEND\ndestination:/app/ping\ncontent-length:7\n\n{\"a\":1}\0"
        );
    }

    #[test]
    fn decodes_message_with_crlf_and_content_length() {
        let f = frame(
            "MESSAGE\r\ndestination:/topic/alerts\r\nsubscription:sub-alerts\r\ncontent-length:2\r\n\r\n{}\0\n",
        );
        assert_eq!(f.command, Command::Message);
        assert_eq!(f.get("destination"), Some("/topic/alerts"));
        assert_eq!(f.body, "{}");
    }

    #[test]
    fn body_may_contain_nul_when_length_is_declared() {
        let f = frame("MESSAGE\ncontent-length:3\n\na\0b\0");
        assert_eq!(f.body, "a\0b");
    }

    #[test]
    fn eol_only_is_a_heartbeat() {
        assert_eq!(Frame::decode("\n").unwrap(), Decoded::Heartbeat);
        assert_eq!(Frame::decode("\r\n\n").unwrap(), Decoded::Heartbeat);
    }

    #[test]
    fn header_escapes_survive_the_wire() {
        let original = Frame::new(Command::Message)
            .header("note", "a:b\\c\nd")
            .with_body("x");
        let wire = original.encode();
        assert!(wire.contains("note:a\\cb\\\\c\\nd\n"));

        let back = frame(&wire);
        assert_eq!(back.get("note"), Some("a:b\\c\nd"));
        assert_eq!(back.body, "x");
    }

    #[test]
    fn connected_headers_are_not_unescaped() {
        let f = frame("CONNECTED\nversion:1.2\nserver:x\\y\n\n\0");
        assert_eq!(f.get("server"), Some("x\\y"));
    }

    #[test]
    fn first_repeated_header_wins() {
        let f = frame("MESSAGE\nfoo:1\nfoo:2\n\n\0");
        assert_eq!(f.get("foo"), Some("1"));
    }

    #[test]
    fn rejects_broken_frames() {
        assert!(matches!(
            Frame::decode("BOGUS\n\n\0"),
            Err(FrameError::UnknownCommand(_))
        ));
        assert_eq!(Frame::decode("MESSAGE\n\nbody"), Err(FrameError::MissingNul));
        assert!(matches!(
            Frame::decode("MESSAGE\nnocolon\n\n\0"),
            Err(FrameError::BadHeader(_))
        ));
        assert!(matches!(
            Frame::decode("MESSAGE\nk:bad\\t\n\n\0"),
            Err(FrameError::BadEscape(_))
        ));
        assert!(matches!(
            Frame::decode("MESSAGE\ncontent-length:99\n\nshort\0"),
            Err(FrameError::BadHeader(_))
        ));
    }
}
