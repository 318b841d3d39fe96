use crate::syntax::token::Position;

/// Error kinds, one per failure family: syntax, unbound names, wrong types
/// or arities, bad values, and everything else at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Name,
    Type,
    Value,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse   => "parse",
            Self::Name    => "name",
            Self::Type    => "type",
            Self::Value   => "value",
            Self::Runtime => "runtime",
        }
    }
}

/// An error with the source position it occurred at. Rendered as
/// `<kind> error at <line>:<col>: <message>`.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub pos: Position,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, pos: Position, message: impl Into<String>) -> Self {
        Self { kind, pos, message: message.into() }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error at {}: {}", self.kind.as_str(), self.pos, self.message)
    }
}

impl std::error::Error for Error {}

pub fn parse_error(pos: Position, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Parse, pos, message)
}

pub fn name_error(pos: Position, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Name, pos, message)
}

pub fn type_error(pos: Position, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Type, pos, message)
}

pub fn value_error(pos: Position, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Value, pos, message)
}

pub fn runtime_error(pos: Position, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Runtime, pos, message)
}
