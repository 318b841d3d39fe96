use crate::syntax::token::{keyword_or_name, Position, Token, TokenKind};

/// Streaming tokenizer over raw source bytes. Call `next()` until it yields
/// `Eof` or `Illegal`; an `Illegal` token carries the reason as its payload
/// and terminates the stream.
pub struct Tokenizer<'a> {
    input: &'a [u8],
    offset: usize,
    ch: Option<char>,
    error: Option<String>,
    pos: Position,
    next_pos: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let mut t = Self {
            input,
            offset: 0,
            ch: None,
            error: None,
            pos: Position::new(1, 1),
            next_pos: Position::new(1, 1),
        };
        t.advance();
        t
    }

    pub fn next(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let Some(ch) = self.ch else {
            // Invalid UTF-8 latches an error; everything after it is Illegal.
            if let Some(msg) = &self.error {
                return Token::new(TokenKind::Illegal(msg.clone()), self.pos);
            }
            return Token::new(TokenKind::Eof, self.pos);
        };

        let pos = self.pos;
        self.advance();

        if is_name_start(ch) {
            let mut name = String::new();
            name.push(ch);
            while let Some(c) = self.ch {
                if !is_name_start(c) && !c.is_ascii_digit() {
                    break;
                }
                name.push(c);
                self.advance();
            }
            return Token::new(keyword_or_name(name), pos);
        }

        let kind = match ch {
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '/' => TokenKind::Divide,
            '{' => TokenKind::LBrace,
            '[' => TokenKind::LBracket,
            '(' => TokenKind::LParen,
            '-' => TokenKind::Minus,
            '%' => TokenKind::Modulo,
            '+' => TokenKind::Plus,
            '}' => TokenKind::RBrace,
            ']' => TokenKind::RBracket,
            ')' => TokenKind::RParen,
            '*' => TokenKind::Times,

            '=' => {
                if self.ch == Some('=') {
                    self.advance();
                    TokenKind::Equal
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.ch == Some('=') {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    let got = self.ch.unwrap_or('\u{fffd}');
                    TokenKind::Illegal(format!("expected != instead of !{got}"))
                }
            }
            '<' => {
                if self.ch == Some('=') {
                    self.advance();
                    TokenKind::Lte
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.ch == Some('=') {
                    self.advance();
                    TokenKind::Gte
                } else {
                    TokenKind::Gt
                }
            }

            '.' => {
                if self.ch == Some('.') {
                    self.advance();
                    if self.ch != Some('.') {
                        return Token::new(TokenKind::Illegal("unexpected ..".to_string()), pos);
                    }
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }

            '0'..='9' => {
                let mut digits = String::new();
                digits.push(ch);
                while let Some(c @ '0'..='9') = self.ch {
                    digits.push(c);
                    self.advance();
                }
                TokenKind::Int(digits)
            }

            '"' => match self.read_string() {
                Ok(s) => TokenKind::Str(s),
                Err(msg) => TokenKind::Illegal(msg),
            },

            _ => TokenKind::Illegal(format!("unexpected {ch}")),
        };
        Token::new(kind, pos)
    }

    // The opening quote has already been consumed.
    fn read_string(&mut self) -> Result<String, String> {
        let mut s = String::new();
        loop {
            let mut c = match self.ch {
                None => return Err("didn't find end quote in string".to_string()),
                Some('"') => {
                    self.advance();
                    return Ok(s);
                }
                Some('\r') | Some('\n') => {
                    return Err("can't have newline in string".to_string());
                }
                Some(c) => c,
            };
            if c == '\\' {
                self.advance();
                c = match self.ch {
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('n') => '\n',
                    other => {
                        let got = other.unwrap_or('\u{fffd}');
                        return Err(format!("invalid string escape \\{got}"));
                    }
                };
            }
            s.push(c);
            self.advance();
        }
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) {
        self.pos = self.next_pos;
        let bytes = &self.input[self.offset..];
        if bytes.is_empty() {
            self.ch = None;
            return;
        }
        let Some((ch, size)) = decode_char(bytes) else {
            self.ch = None;
            self.error = Some(format!("invalid UTF-8 byte 0x{:02x}", bytes[0]));
            return;
        };
        if ch == '\n' {
            self.next_pos.line += 1;
            self.next_pos.column = 1;
        } else {
            self.next_pos.column += 1;
        }
        self.ch = Some(ch);
        self.offset += size;
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.ch, Some(' ' | '\t' | '\r' | '\n')) {
                self.advance();
            }
            // `self.offset` already points past the current char, so a
            // comment is the current `/` plus a `/` byte at the offset.
            if !(self.ch == Some('/') && self.input.get(self.offset) == Some(&b'/')) {
                break;
            }
            self.advance();
            self.advance();
            while self.ch.is_some() && self.ch != Some('\n') {
                self.advance();
            }
            self.advance();
        }
    }
}

fn is_name_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

/// Decode the leading codepoint of `bytes`, or None if it isn't valid UTF-8.
/// Also used by the evaluator to step through strings codepoint-wise.
pub(crate) fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let window = &bytes[..bytes.len().min(4)];
    let valid = match std::str::from_utf8(window) {
        Ok(s) => s,
        Err(e) if e.valid_up_to() > 0 => {
            std::str::from_utf8(&window[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    let ch = valid.chars().next()?;
    Some((ch, ch.len_utf8()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        let mut t = Tokenizer::new(src.as_bytes());
        let mut kinds = Vec::new();
        loop {
            let tok = t.next();
            let stop = matches!(tok.kind, TokenKind::Eof | TokenKind::Illegal(_));
            kinds.push(tok.kind);
            if stop {
                break;
            }
        }
        kinds
    }

    fn lex_positions(src: &str) -> Vec<(u32, u32)> {
        let mut t = Tokenizer::new(src.as_bytes());
        let mut positions = Vec::new();
        loop {
            let tok = t.next();
            if matches!(tok.kind, TokenKind::Eof | TokenKind::Illegal(_)) {
                break;
            }
            positions.push((tok.pos.line, tok.pos.column));
        }
        positions
    }

    fn name(s: &str) -> TokenKind {
        TokenKind::Name(s.to_string())
    }

    fn int(s: &str) -> TokenKind {
        TokenKind::Int(s.to_string())
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("  \n  \n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn numbers_and_names() {
        assert_eq!(
            lex("1234 0 42 -42 1234x 0x321"),
            vec![
                int("1234"),
                int("0"),
                int("42"),
                TokenKind::Minus,
                int("42"),
                int("1234"),
                name("x"),
                int("0"),
                name("x321"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(
            lex("and else false for func if in nil not or return true while"),
            vec![
                TokenKind::And,
                TokenKind::Else,
                TokenKind::False,
                TokenKind::For,
                TokenKind::Func,
                TokenKind::If,
                TokenKind::In,
                TokenKind::Nil,
                TokenKind::Not,
                TokenKind::Or,
                TokenKind::Return,
                TokenKind::True,
                TokenKind::While,
                TokenKind::Eof,
            ]
        );
        // keyword prefixes are plain names
        assert_eq!(lex("iff forx _for"), vec![name("iff"), name("forx"), name("_for"), TokenKind::Eof]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            lex("= == < <= > >= != ..."),
            vec![
                TokenKind::Assign,
                TokenKind::Equal,
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::NotEqual,
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            lex("+ - * / % . , : ( ) [ ] { }"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Times,
                TokenKind::Divide,
                TokenKind::Modulo,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            lex(r#""foo" "'" "\"" "x\"y" "\\""#),
            vec![
                TokenKind::Str("foo".to_string()),
                TokenKind::Str("'".to_string()),
                TokenKind::Str("\"".to_string()),
                TokenKind::Str("x\"y".to_string()),
                TokenKind::Str("\\".to_string()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(lex(r#""\t\r\n""#), vec![TokenKind::Str("\t\r\n".to_string()), TokenKind::Eof]);
    }

    #[test]
    fn comments() {
        assert_eq!(lex("//"), vec![TokenKind::Eof]);
        assert_eq!(lex("// foo"), vec![TokenKind::Eof]);
        assert_eq!(lex("// foo\n1"), vec![int("1"), TokenKind::Eof]);
        assert_eq!(lex("/ //\n/"), vec![TokenKind::Divide, TokenKind::Divide, TokenKind::Eof]);
    }

    #[test]
    fn positions() {
        assert_eq!(lex_positions("a\nbc\n  d"), vec![(1, 1), (2, 1), (3, 3)]);
        assert_eq!(lex_positions("1234 0 42"), vec![(1, 1), (1, 6), (1, 8)]);
        // columns count codepoints, not bytes
        assert_eq!(lex_positions("\"“”\" x"), vec![(1, 1), (1, 6)]);
    }

    #[test]
    fn positions_are_monotonic() {
        let src = "x = 1\nfunc f(a) { return a }\nprint(f(x), \"s\")\n";
        let mut t = Tokenizer::new(src.as_bytes());
        let mut last = (0u32, 0u32);
        loop {
            let tok = t.next();
            if tok.kind == TokenKind::Eof {
                break;
            }
            let cur = (tok.pos.line, tok.pos.column);
            assert!(cur > last, "positions went backwards: {last:?} -> {cur:?}");
            last = cur;
        }
    }

    #[test]
    fn illegal_tokens() {
        assert_eq!(lex("# foo"), vec![TokenKind::Illegal("unexpected #".to_string())]);
        assert_eq!(lex("$"), vec![TokenKind::Illegal("unexpected $".to_string())]);
        assert_eq!(lex("!x"), vec![TokenKind::Illegal("expected != instead of !x".to_string())]);
        assert_eq!(lex(".."), vec![TokenKind::Illegal("unexpected ..".to_string())]);
        assert_eq!(lex("..4"), vec![TokenKind::Illegal("unexpected ..".to_string())]);
    }

    #[test]
    fn illegal_strings() {
        assert_eq!(
            lex(" \"foo"),
            vec![TokenKind::Illegal("didn't find end quote in string".to_string())]
        );
        assert_eq!(
            lex("\"a\nb\""),
            vec![TokenKind::Illegal("can't have newline in string".to_string())]
        );
        assert_eq!(
            lex(r#""\z""#),
            vec![TokenKind::Illegal("invalid string escape \\z".to_string())]
        );
    }

    #[test]
    fn invalid_utf8() {
        let mut t = Tokenizer::new(b"\x80");
        let tok = t.next();
        assert_eq!(tok.kind, TokenKind::Illegal("invalid UTF-8 byte 0x80".to_string()));
        assert_eq!((tok.pos.line, tok.pos.column), (1, 1));
        // the error is sticky
        let tok = t.next();
        assert_eq!(tok.kind, TokenKind::Illegal("invalid UTF-8 byte 0x80".to_string()));
    }

    #[test]
    fn invalid_utf8_after_valid_prefix() {
        let mut t = Tokenizer::new(b"ab \xff cd");
        assert_eq!(t.next().kind, TokenKind::Name("ab".to_string()));
        assert_eq!(t.next().kind, TokenKind::Illegal("invalid UTF-8 byte 0xff".to_string()));
    }
}
