//! Lexical Analyzer for the Ember Scripting Language
//!
//! This module implements the tokenization phase of the Ember compiler
//! pipeline. It converts raw source text into a flat stream of tokens that
//! the parser then assembles into an Abstract Syntax Tree.
//!
//! ## Tokenization Process
//!
//! 1. **Character Processing**: single-pass scan with one- and two-character
//!    lookahead.
//! 2. **Token Recognition**: literals, identifiers, keywords, operators and
//!    delimiters, each carrying its source `(line, col)`.
//! 3. **Error Handling**: malformed tokens are reported as an `Error` token
//!    carrying a message; the parser turns these into `ParseError`.
//! 4. **Comment Filtering**: `//` line comments and `/* */` block comments
//!    are both stripped from the token stream entirely.
//!
//! ## Design Notes
//!
//! Newlines are kept as real tokens (`Newline`) because they terminate
//! statements; everything else whitespace is skipped silently. Numeric
//! literals carry their fully decoded value (`Int(i64)` / `Float(f64)`), so
//! the parser never re-parses lexemes.

use crate::error::{EmberError, Location};
use std::fmt;

/// The kind of a token, with any literal value it carries inlined directly
/// into the variant (mirroring the AST's own tagged-union shape).
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,

    // Identifier
    Ident(String),

    // Keywords
    Let,
    Const,
    Fn,
    Return,
    If,
    Then,
    Elif,
    Else,
    End,
    While,
    For,
    In,
    Do,
    And,
    Or,
    Not,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    Assign,
    Arrow,
    Range,

    // Bitwise
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Newline,

    // Special
    Eof,
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single token: its kind plus the source position at which it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize, col: usize) -> Self {
        Self { kind, line, col }
    }

    pub fn loc(&self) -> Location {
        Location::new(self.line, self.col)
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("let", TokenKind::Let),
    ("const", TokenKind::Const),
    ("fn", TokenKind::Fn),
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("then", TokenKind::Then),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("end", TokenKind::End),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("do", TokenKind::Do),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

fn keyword_lookup(text: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(kw, _)| *kw == text)
        .map(|(_, kind)| kind.clone())
}

/// Single-pass tokenizer over the source string.
///
/// Maintains just enough state to scan forward with one-character lookahead:
/// the source as a character vector (for cheap random access), the current
/// position, and the current line/column for diagnostics.
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    length: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let input: Vec<char> = source.chars().collect();
        let length = input.len();
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
            length,
        }
    }

    /// Tokenizes the entire input into a vector ending with `Token::Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> char {
        let idx = self.pos + offset;
        if idx < self.length {
            self.input[idx]
        } else {
            '\0'
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.length
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r') {
            self.advance();
        }
    }

    /// Skips a single `//` or `/* */` comment starting at the current
    /// position. An unterminated block comment is silently tolerated: the
    /// scan simply stops advancing once EOF is reached.
    fn skip_comment(&mut self) {
        if self.peek() == '/' && self.peek_next() == '/' {
            while !matches!(self.peek(), '\n' | '\0') {
                self.advance();
            }
        } else if self.peek() == '/' && self.peek_next() == '*' {
            self.advance();
            self.advance();
            while !(self.peek() == '*' && self.peek_next() == '/') {
                if self.peek() == '\0' {
                    return;
                }
                self.advance();
            }
            self.advance();
            self.advance();
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        while self.peek() == '/' && matches!(self.peek_next(), '/' | '*') {
            self.skip_comment();
            self.skip_whitespace();
        }

        let (line, col) = (self.line, self.col);
        let ch = self.peek();

        if ch == '\0' {
            return Token::new(TokenKind::Eof, line, col);
        }
        if ch == '\n' {
            self.advance();
            return Token::new(TokenKind::Newline, line, col);
        }
        if ch == '"' || ch == '\'' {
            return self.read_string(line, col);
        }
        if ch.is_ascii_digit() {
            return self.read_number(line, col);
        }
        if ch.is_alphabetic() || ch == '_' {
            return self.read_identifier(line, col);
        }

        // Two-character operators: longest match wins.
        let two = (ch, self.peek_next());
        let two_char_kind = match two {
            ('=', '=') => Some(TokenKind::EqEq),
            ('!', '=') => Some(TokenKind::NotEq),
            ('<', '=') => Some(TokenKind::Lte),
            ('>', '=') => Some(TokenKind::Gte),
            ('-', '>') => Some(TokenKind::Arrow),
            ('.', '.') => Some(TokenKind::Range),
            ('<', '<') => Some(TokenKind::Shl),
            ('>', '>') => Some(TokenKind::Shr),
            _ => None,
        };
        if let Some(kind) = two_char_kind {
            self.advance();
            self.advance();
            return Token::new(kind, line, col);
        }

        let single_kind = match ch {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '<' => Some(TokenKind::Lt),
            '>' => Some(TokenKind::Gt),
            '=' => Some(TokenKind::Assign),
            '&' => Some(TokenKind::BAnd),
            '|' => Some(TokenKind::BOr),
            '^' => Some(TokenKind::BXor),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if let Some(kind) = single_kind {
            self.advance();
            return Token::new(kind, line, col);
        }

        self.advance();
        Token::new(
            TokenKind::Error(format!("Unexpected character '{}'", ch)),
            line,
            col,
        )
    }

    fn read_string(&mut self, line: usize, col: usize) -> Token {
        let quote = self.advance();
        let mut out = String::new();

        while self.peek() != quote && self.peek() != '\0' {
            let ch = self.advance();
            if ch == '\\' {
                let escape = self.advance();
                out.push(match escape {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => other,
                });
            } else {
                out.push(ch);
            }
        }

        if self.peek() == '\0' {
            return Token::new(
                TokenKind::Error("Unterminated string".to_string()),
                line,
                col,
            );
        }
        self.advance(); // closing quote
        Token::new(TokenKind::Str(out), line, col)
    }

    /// Parses an integer or float literal. Hex (`0x`), binary (`0b`) and
    /// octal (`0o`) forms are always integers; underscores are permitted
    /// anywhere in the digit run and stripped before parsing.
    fn read_number(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;

        if self.peek() == '0' && matches!(self.peek_next(), 'x' | 'X' | 'b' | 'B' | 'o' | 'O') {
            self.advance(); // 0
            let prefix = self.advance().to_ascii_lowercase();
            let (radix, digits): (u32, &str) = match prefix {
                'x' => (16, "0123456789abcdefABCDEF_"),
                'b' => (2, "01_"),
                'o' => (8, "01234567_"),
                _ => unreachable!(),
            };
            while digits.contains(self.peek()) {
                self.advance();
            }
            let text: String = self.input[start + 2..self.pos]
                .iter()
                .filter(|c| **c != '_')
                .collect();
            return match i64::from_str_radix(&text, radix) {
                Ok(v) => Token::new(TokenKind::Int(v), line, col),
                Err(_) => Token::new(
                    TokenKind::Error(format!("Invalid number literal '{}'", text)),
                    line,
                    col,
                ),
            };
        }

        let mut is_float = false;
        while self.peek().is_ascii_digit() || self.peek() == '_' {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() || self.peek() == '_' {
                self.advance();
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            is_float = true;
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.input[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => Token::new(TokenKind::Float(v), line, col),
                Err(_) => Token::new(
                    TokenKind::Error(format!("Invalid number literal '{}'", text)),
                    line,
                    col,
                ),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => Token::new(TokenKind::Int(v), line, col),
                Err(_) => Token::new(
                    TokenKind::Error(format!("Invalid number literal '{}'", text)),
                    line,
                    col,
                ),
            }
        }
    }

    fn read_identifier(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text: String = self.input[start..self.pos].iter().collect();
        let kind = keyword_lookup(&text).unwrap_or(TokenKind::Ident(text));
        Token::new(kind, line, col)
    }
}

/// Convenience wrapper matching the embedding API's `compile`/`execute`
/// style: tokenize a complete source string, surfacing the first `ERROR`
/// token (if any) as a `ParseError`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, EmberError> {
    let tokens = Lexer::new(source).tokenize();
    for tok in &tokens {
        if let TokenKind::Error(msg) = &tok.kind {
            log::debug!("lex failed at {}: {}", tok.loc(), msg);
            return Err(EmberError::parse(msg.clone(), tok.loc()));
        }
    }
    log::debug!("lexed {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_integer_literal_forms() {
        for src in ["0xff", "0b1111_1111", "0o377", "255", "2_55"] {
            let toks = kinds(src);
            assert_eq!(toks[0], TokenKind::Int(255), "source: {}", src);
        }
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(kinds("3.14")[0], TokenKind::Float(3.14));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
    }

    #[test]
    fn test_two_char_operators_longest_match() {
        assert_eq!(kinds("==")[0], TokenKind::EqEq);
        assert_eq!(kinds("!=")[0], TokenKind::NotEq);
        assert_eq!(kinds("<=")[0], TokenKind::Lte);
        assert_eq!(kinds("..")[0], TokenKind::Range);
        assert_eq!(kinds("<")[0], TokenKind::Lt);
    }

    #[test]
    fn test_keyword_vs_identifier() {
        assert_eq!(kinds("if")[0], TokenKind::If);
        assert_eq!(kinds("iffy")[0], TokenKind::Ident("iffy".to_string()));
    }

    #[test]
    fn test_string_escapes() {
        let toks = kinds(r#""a\nb""#);
        assert_eq!(toks[0], TokenKind::Str("a\nb".to_string()));
    }

    #[test]
    fn test_unterminated_string_is_error_token() {
        let toks = kinds("\"abc");
        assert!(matches!(toks[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_newline_significant() {
        let toks = kinds("let x = 1\nlet y = 2");
        assert!(toks.contains(&TokenKind::Newline));
    }

    #[test]
    fn test_line_comment_stripped() {
        let toks = kinds("1 // comment\n2");
        assert_eq!(toks[0], TokenKind::Int(1));
        assert_eq!(toks[1], TokenKind::Newline);
        assert_eq!(toks[2], TokenKind::Int(2));
    }

    #[test]
    fn test_unterminated_block_comment_tolerated_at_eof() {
        let toks = kinds("1 /* never closes");
        assert_eq!(toks[0], TokenKind::Int(1));
        assert_eq!(*toks.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn test_line_col_tracking_across_newline() {
        let toks = Lexer::new("a\nb").tokenize();
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[2].line, 2);
        assert_eq!(toks[2].col, 1);
    }
}
