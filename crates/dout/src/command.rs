//! Textual posting commands.
//!
//! One command per line: an operation name followed by its arguments.
//!
//! ```text
//! # session header
//! setChecksum 0
//! setBits 0x40000            # RUN high
//! postString "grating v2" 12
//! postInt32_2x16 -1
//! postFloat 1.5
//! postChecksumTrailer
//! ```
//!
//! Names match case-insensitively with underscores ignored, so
//! `post_int16_wait` and `postInt16Wait` are the same command. A `NoDelay`
//! suffix is accepted for the plain variants (`setBitsNoDelay` is
//! `setBits`). Integers are decimal or `0x` hex and may be negative; any
//! value from `i32::MIN` to `u32::MAX` is taken as its 32-bit pattern.
//! `#` outside quotes starts a comment, even directly after an argument.
//!
//! A line is fully parsed before anything runs, so a malformed line never
//! posts a partial value.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use hal::DigitalOutPort;
use thiserror::Error;

use crate::port::{Delay, PortSession, PostError};
use crate::status::FLOAT_NAN;

/// A parsed posting operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PostInt16 { value: u32, delay: Delay },
    PostInt32 { value: u32, delay: Delay },
    PostInt32Split { value: u32 },
    PostFloat { value: f32 },
    PostString { text: Vec<u8>, declared_len: usize },
    ToggleBitsOnPost { mask: u32 },
    SetBits { mask: u32, delay: Delay },
    ClearBits { mask: u32, delay: Delay },
    ToggleBits { mask: u32, delay: Delay },
    GetChecksum,
    SetChecksum { value: u16 },
    PostChecksumTrailer,
}

/// Errors produced while parsing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` takes {expected} argument(s), found {found}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid integer `{0}`")]
    InvalidInteger(String),
    #[error("integer `{0}` does not fit in 32 bits")]
    OutOfRange(String),
    #[error("invalid float `{0}`")]
    InvalidFloat(String),
    #[error("invalid length `{0}`")]
    InvalidLength(String),
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("unknown escape `\\{0}`")]
    InvalidEscape(char),
}

/// A parse error tagged with its 1-based script line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {source}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub source: ParseError,
}

/// Errors from [`PortSession::execute_line`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Post(#[from] PostError),
}

/// A command together with the script line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

impl Command {
    /// Canonical operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostInt16 { delay: Delay::Wait, .. } => "postInt16Wait",
            Self::PostInt16 { .. } => "postInt16",
            Self::PostInt32 { delay: Delay::Wait, .. } => "postInt32Wait",
            Self::PostInt32 { .. } => "postInt32",
            Self::PostInt32Split { .. } => "postInt32_2x16",
            Self::PostFloat { .. } => "postFloat",
            Self::PostString { .. } => "postString",
            Self::ToggleBitsOnPost { .. } => "toggleBitsOnPost",
            Self::SetBits { delay: Delay::Wait, .. } => "setBitsWait",
            Self::SetBits { .. } => "setBits",
            Self::ClearBits { delay: Delay::Wait, .. } => "clearBitsWait",
            Self::ClearBits { .. } => "clearBits",
            Self::ToggleBits { delay: Delay::Wait, .. } => "toggleBitsWait",
            Self::ToggleBits { .. } => "toggleBits",
            Self::GetChecksum => "getChecksum",
            Self::SetChecksum { .. } => "setChecksum",
            Self::PostChecksumTrailer => "postChecksumTrailer",
        }
    }

    /// Whether the command adds to the checksum.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::PostInt16 { .. }
                | Self::PostInt32 { .. }
                | Self::PostInt32Split { .. }
                | Self::PostFloat { .. }
                | Self::PostString { .. }
        )
    }

    /// Parses one line; `Ok(None)` for blank and comment-only lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ParseError> {
        let tokens = tokenize(line)?;
        if tokens.is_empty() {
            return Ok(None);
        }
        parse_tokens(tokens).map(Some)
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)?.ok_or(ParseError::Empty)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Self::PostInt16 { value, .. }
            | Self::PostInt32 { value, .. }
            | Self::PostInt32Split { value } => write!(f, "{name} {value:#x}"),
            Self::PostFloat { value } => write!(f, "{name} {value:?}"),
            Self::PostString { text, declared_len } => {
                write!(f, "{name} \"")?;
                for c in String::from_utf8_lossy(text).chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\0' => f.write_str("\\0")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "\" {declared_len}")
            }
            Self::ToggleBitsOnPost { mask }
            | Self::SetBits { mask, .. }
            | Self::ClearBits { mask, .. }
            | Self::ToggleBits { mask, .. } => write!(f, "{name} {mask:#x}"),
            Self::SetChecksum { value } => write!(f, "{name} {value:#x}"),
            Self::GetChecksum | Self::PostChecksumTrailer => f.write_str(name),
        }
    }
}

/// Parses a whole script, stopping at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    let mut commands = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        match Command::parse_line(text) {
            Ok(Some(command)) => commands.push(ScriptLine { line, command }),
            Ok(None) => {}
            Err(source) => return Err(ScriptError { line, source }),
        }
    }
    Ok(commands)
}

/// Every parse error in a script, in line order.
pub fn check_script(source: &str) -> Vec<ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, text)| {
            Command::parse_line(text).err().map(|source| ScriptError {
                line: index + 1,
                source,
            })
        })
        .collect()
}

fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        match chars.peek() {
            None | Some('#') => break,
            Some('"') => {
                chars.next();
                let mut token = String::new();
                loop {
                    match chars.next() {
                        None => return Err(ParseError::UnterminatedQuote),
                        Some('"') => break,
                        Some('\\') => {
                            let escaped = match chars.next() {
                                Some('"') => '"',
                                Some('\\') => '\\',
                                Some('0') => '\0',
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some(other) => return Err(ParseError::InvalidEscape(other)),
                                None => return Err(ParseError::UnterminatedQuote),
                            };
                            token.push(escaped);
                        }
                        Some(c) => token.push(c),
                    }
                }
                tokens.push(token);
            }
            Some(_) => {
                let mut token = String::new();
                while let Some(c) = chars.next_if(|&c| !c.is_whitespace() && c != '#') {
                    token.push(c);
                }
                tokens.push(token);
            }
        }
    }

    Ok(tokens)
}

struct Args {
    command: &'static str,
    values: Vec<String>,
}

impl Args {
    fn expect(&self, expected: usize) -> Result<(), ParseError> {
        if self.values.len() != expected {
            return Err(ParseError::ArgumentCount {
                command: self.command,
                expected,
                found: self.values.len(),
            });
        }
        Ok(())
    }

    fn none(self) -> Result<(), ParseError> {
        self.expect(0)
    }

    fn int(self) -> Result<u32, ParseError> {
        self.expect(1)?;
        parse_int(&self.values[0])
    }

    fn float(self) -> Result<f32, ParseError> {
        self.expect(1)?;
        parse_float(&self.values[0])
    }

    fn text(mut self) -> Result<(Vec<u8>, usize), ParseError> {
        self.expect(2)?;
        let len_token = self.values.pop().unwrap_or_default();
        let declared_len = len_token
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidLength(len_token.clone()))?;
        let text = self.values.pop().unwrap_or_default().into_bytes();
        Ok((text, declared_len))
    }
}

fn parse_tokens(tokens: Vec<String>) -> Result<Command, ParseError> {
    let mut tokens = tokens.into_iter();
    let name = tokens.next().ok_or(ParseError::Empty)?;
    let key: String = name
        .chars()
        .filter(|&c| c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    let args = |command: &'static str| Args {
        command,
        values: tokens.collect(),
    };

    use Delay::{NoWait, Wait};
    let command = match key.as_str() {
        "postint16" | "postint16nodelay" => Command::PostInt16 {
            value: args("postInt16").int()?,
            delay: NoWait,
        },
        "postint16wait" => Command::PostInt16 {
            value: args("postInt16Wait").int()?,
            delay: Wait,
        },
        "postint32" | "postint32nodelay" => Command::PostInt32 {
            value: args("postInt32").int()?,
            delay: NoWait,
        },
        "postint32wait" => Command::PostInt32 {
            value: args("postInt32Wait").int()?,
            delay: Wait,
        },
        "postint322x16" => Command::PostInt32Split {
            value: args("postInt32_2x16").int()?,
        },
        "postfloat" => Command::PostFloat {
            value: args("postFloat").float()?,
        },
        "poststring" => {
            let (text, declared_len) = args("postString").text()?;
            Command::PostString { text, declared_len }
        }
        "togglebitsonpost" => Command::ToggleBitsOnPost {
            mask: args("toggleBitsOnPost").int()?,
        },
        "setbits" | "setbitsnodelay" => Command::SetBits {
            mask: args("setBits").int()?,
            delay: NoWait,
        },
        "setbitswait" => Command::SetBits {
            mask: args("setBitsWait").int()?,
            delay: Wait,
        },
        "clearbits" | "clearbitsnodelay" => Command::ClearBits {
            mask: args("clearBits").int()?,
            delay: NoWait,
        },
        "clearbitswait" => Command::ClearBits {
            mask: args("clearBitsWait").int()?,
            delay: Wait,
        },
        "togglebits" | "togglebitsnodelay" => Command::ToggleBits {
            mask: args("toggleBits").int()?,
            delay: NoWait,
        },
        "togglebitswait" => Command::ToggleBits {
            mask: args("toggleBitsWait").int()?,
            delay: Wait,
        },
        "getchecksum" => {
            args("getChecksum").none()?;
            Command::GetChecksum
        }
        "setchecksum" => Command::SetChecksum {
            // wraps like every other checksum update
            value: args("setChecksum").int()? as u16,
        },
        "postchecksumtrailer" => {
            args("postChecksumTrailer").none()?;
            Command::PostChecksumTrailer
        }
        _ => return Err(ParseError::UnknownCommand(name)),
    };
    Ok(command)
}

fn parse_int(token: &str) -> Result<u32, ParseError> {
    let cleaned: String = token.chars().filter(|&c| c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if digits.starts_with(|c: char| c == '+' || c == '-') {
        return Err(ParseError::InvalidInteger(token.to_string()));
    }

    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    };
    let magnitude = parsed.map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            ParseError::OutOfRange(token.to_string())
        }
        _ => ParseError::InvalidInteger(token.to_string()),
    })?;

    let value = if negative { -magnitude } else { magnitude };
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(ParseError::OutOfRange(token.to_string()));
    }
    Ok(value as u32)
}

fn parse_float(token: &str) -> Result<f32, ParseError> {
    if token.eq_ignore_ascii_case("nan") {
        return Ok(f32::from_bits(FLOAT_NAN));
    }
    token
        .parse::<f32>()
        .map_err(|_| ParseError::InvalidFloat(token.to_string()))
}

impl<P: DigitalOutPort> PortSession<P> {
    /// Runs a parsed command. Returns the checksum for
    /// [`Command::GetChecksum`] and [`Command::PostChecksumTrailer`].
    pub fn execute(&mut self, command: &Command) -> Result<Option<u16>, PostError> {
        match command {
            Command::PostInt16 { value, delay } => self.post_int16_with(*value, *delay),
            Command::PostInt32 { value, delay } => self.post_int32_with(*value, *delay)?,
            Command::PostInt32Split { value } => self.post_int32_2x16(*value),
            Command::PostFloat { value } => self.post_float(*value),
            Command::PostString { text, declared_len } => self.post_bytes(text, *declared_len),
            Command::ToggleBitsOnPost { mask } => self.toggle_bits_on_post(*mask),
            Command::SetBits { mask, delay } => self.set_bits_with(*mask, *delay),
            Command::ClearBits { mask, delay } => self.clear_bits_with(*mask, *delay),
            Command::ToggleBits { mask, delay } => self.toggle_bits_with(*mask, *delay),
            Command::GetChecksum => return Ok(Some(self.checksum())),
            Command::SetChecksum { value } => self.set_checksum(*value),
            Command::PostChecksumTrailer => return Ok(Some(self.post_checksum_trailer())),
        }
        Ok(None)
    }

    /// Parses and runs one line. Blank and comment lines do nothing.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<u16>, ExecError> {
        match Command::parse_line(line)? {
            Some(command) => Ok(self.execute(&command)?),
            None => Ok(None),
        }
    }
}
