/// Line/column a token starts at. 1-based; columns count codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Stop tokens. Illegal carries the reason it was produced.
    Illegal(String),
    Eof,

    // Single-character tokens
    Assign,   // =
    Colon,    // :
    Comma,    // ,
    Divide,   // /
    Dot,      // .
    Gt,       // >
    LBrace,   // {
    LBracket, // [
    LParen,   // (
    Lt,       // <
    Minus,    // -
    Modulo,   // %
    Plus,     // +
    RBrace,   // }
    RBracket, // ]
    RParen,   // )
    Times,    // *

    // Two-character tokens
    Equal,    // ==
    Gte,      // >=
    Lte,      // <=
    NotEqual, // !=

    // Three-character tokens
    Ellipsis, // ...

    // Keywords
    And,
    Else,
    False,
    For,
    Func,
    If,
    In,
    Nil,
    Not,
    Or,
    Return,
    True,
    While,

    // Literals and identifiers. Int keeps the digits as text; the parser
    // decodes them so literal overflow surfaces as a parse error.
    Int(String),
    Name(String),
    Str(String),
}

impl TokenKind {
    /// Display name used in parse error messages ("expected ) and not EOF").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Illegal(_) => "ILLEGAL",
            Self::Eof        => "EOF",
            Self::Assign     => "=",
            Self::Colon      => ":",
            Self::Comma      => ",",
            Self::Divide     => "/",
            Self::Dot        => ".",
            Self::Gt         => ">",
            Self::LBrace     => "{",
            Self::LBracket   => "[",
            Self::LParen     => "(",
            Self::Lt         => "<",
            Self::Minus      => "-",
            Self::Modulo     => "%",
            Self::Plus       => "+",
            Self::RBrace     => "}",
            Self::RBracket   => "]",
            Self::RParen     => ")",
            Self::Times      => "*",
            Self::Equal      => "==",
            Self::Gte        => ">=",
            Self::Lte        => "<=",
            Self::NotEqual   => "!=",
            Self::Ellipsis   => "...",
            Self::And        => "and",
            Self::Else       => "else",
            Self::False      => "false",
            Self::For        => "for",
            Self::Func       => "func",
            Self::If         => "if",
            Self::In         => "in",
            Self::Nil        => "nil",
            Self::Not        => "not",
            Self::Or         => "or",
            Self::Return     => "return",
            Self::True       => "true",
            Self::While      => "while",
            Self::Int(_)     => "int",
            Self::Name(_)    => "name",
            Self::Str(_)     => "str",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an identifier to its keyword token, or returns `Name`.
pub fn keyword_or_name(s: String) -> TokenKind {
    match s.as_str() {
        "and"    => TokenKind::And,
        "else"   => TokenKind::Else,
        "false"  => TokenKind::False,
        "for"    => TokenKind::For,
        "func"   => TokenKind::Func,
        "if"     => TokenKind::If,
        "in"     => TokenKind::In,
        "nil"    => TokenKind::Nil,
        "not"    => TokenKind::Not,
        "or"     => TokenKind::Or,
        "return" => TokenKind::Return,
        "true"   => TokenKind::True,
        "while"  => TokenKind::While,
        _        => TokenKind::Name(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}
