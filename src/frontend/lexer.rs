use std::{
    collections::{BTreeMap, VecDeque},
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use super::{ParseError, SourceFile};

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // while
    Identifier,       // counter

    /* Literals */
    BooleanLiteral, // true
    IntegerLiteral, // 1
    FloatLiteral,   // 1.0
    StringLiteral,  // "hello, world"

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Comma,      // ,
    Colon,      // :

    /* Binary Ops */
    Plus,                 // +
    Minus,                // -
    Asterisk,             // *
    Divide,               // /
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals, // =
}

impl TokenKind {
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::NotEquals
                | Self::DoubleEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Keyword(Keyword::Integer | Keyword::Float | Keyword::Boolean | Keyword::String)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Program,
    Var,
    Void,
    Main,
    End,
    If,
    Else,
    While,
    Do,
    Print,
    Integer,
    Float,
    Boolean,
    String,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        (':', TokenKind::Colon),
        ('*', TokenKind::Asterisk),
        ('-', TokenKind::Minus),
        ('=', TokenKind::Equals),
        ('+', TokenKind::Plus),
        ('/', TokenKind::Divide),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Self {
        Self::new(self.start, other.end)
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &SourceFile {
        self.source
    }

    /// Span of the end of input, used to report unexpected EOF
    pub fn eof_span(&self) -> Span {
        let end = self.source.contents.len();
        Span::new(end, end)
    }

    fn error(&self, start: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(Span::new(start, self.position.max(start + 1)), message)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn ignore_whitespace(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_whitespace() {
                break;
            }

            self.bump();
        }
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.bump();
        }
    }

    fn read_string(&mut self) -> Result<Token, ParseError> {
        let start_position = self.position;

        // Consume opening quote
        self.bump();

        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                return Err(self.error(
                    start_position,
                    "Reached end of line while reading string literal",
                ));
            }

            self.bump();

            // If we encountered an escape sequence, keep going
            if c == '\\' && self.chars.peek().is_some_and(|c| *c == '"' || *c == '\\') {
                self.bump();
                continue;
            }

            if c == '"' {
                return Ok(Token {
                    span: self.new_span(start_position),
                    kind: TokenKind::StringLiteral,
                });
            }
        }

        Err(self.error(
            start_position,
            "Reached end of file while reading string literal",
        ))
    }

    // Keyword, identifier, or boolean literal
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.bump();
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = if let Ok(keyword) = value.parse() {
            TokenKind::Keyword(keyword)
        } else {
            match value {
                "true" | "false" => TokenKind::BooleanLiteral,
                _ => TokenKind::Identifier,
            }
        };

        Token { kind, span }
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let start_position = self.position;
        let mut kind = TokenKind::IntegerLiteral;

        while let Some(c) = self.chars.peek().copied() {
            if c == '.' && kind == TokenKind::IntegerLiteral {
                if !self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                    return Err(self.error(start_position, "Expected digits after decimal point"));
                }

                kind = TokenKind::FloatLiteral;
                self.bump();
                continue;
            }

            if !c.is_ascii_digit() {
                break;
            }

            self.bump();
        }

        Ok(Token {
            kind,
            span: self.new_span(start_position),
        })
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;
        self.bump();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_double(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;
        self.bump();
        self.bump();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    pub fn peek(&mut self) -> Result<Option<Token>, ParseError> {
        if self.peek_buffer.is_empty() {
            if let Some(token) = self.lex_token()? {
                self.peek_buffer.push_back(token);
            }
        }

        Ok(self.peek_buffer.front().cloned())
    }

    pub fn next(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(token) = self.peek_buffer.pop_front() {
            return Ok(Some(token));
        }

        self.lex_token()
    }

    fn lex_token(&mut self) -> Result<Option<Token>, ParseError> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.ignore_whitespace();
                    continue;
                }
                // Ignore comments
                '/' if self.chars.peek_nth(1).is_some_and(|c| *c == '/') => {
                    self.ignore_line();
                    continue;
                }

                // String literals
                '"' => self.read_string()?,

                // Integer and float literals
                n if n.is_ascii_digit() => self.read_number()?,

                // Identifiers, keywords, and boolean literals
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Double Equals (==)
                '=' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::DoubleEquals)
                }
                // Not Equals (!=)
                '!' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::NotEquals)
                }
                // Less than or equal (<=)
                '<' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::LessThanOrEqualTo)
                }
                // Greater than or equal (>=)
                '>' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::GreaterThanOrEqualTo)
                }

                s if SINGLE_TOKENS.contains_key(&s) => self.read_single(SINGLE_TOKENS[&s]),
                c => {
                    let start = self.position;
                    self.bump();
                    return Err(self.error(start, format!("Unexpected character in stream: `{c}`")));
                }
            };

            return Ok(Some(token));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source);
        let mut kinds = Vec::new();

        while let Some(token) = lexer.next().unwrap() {
            kinds.push(token.kind);
        }

        kinds
    }

    #[test]
    fn lexes_statements() {
        assert_eq!(
            kinds("while (n <= 5) do { n = n + 1; } // loop"),
            vec![
                TokenKind::Keyword(Keyword::While),
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::LessThanOrEqualTo,
                TokenKind::IntegerLiteral,
                TokenKind::CloseParen,
                TokenKind::Keyword(Keyword::Do),
                TokenKind::OpenBrace,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
                TokenKind::CloseBrace,
            ]
        );
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            kinds(r#"20.5 7 true "say \"hi\"" float"#),
            vec![
                TokenKind::FloatLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::BooleanLiteral,
                TokenKind::StringLiteral,
                TokenKind::Keyword(Keyword::Float),
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters_and_open_strings() {
        let source = SourceFile::from_memory("a # b");
        let mut lexer = Lexer::new(&source);
        assert!(lexer.next().unwrap().is_some());
        assert!(lexer.next().is_err());

        let source = SourceFile::from_memory("\"never closed");
        assert!(Lexer::new(&source).next().is_err());
    }

    #[test]
    fn skips_unicode_whitespace() {
        assert_eq!(kinds("\u{a0}"), vec![]);
        assert_eq!(
            kinds("a\u{a0}b\u{2003}\n"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );

        let source = SourceFile::from_memory("x\u{a0}= 1");
        let mut lexer = Lexer::new(&source);
        lexer.next().unwrap();
        let equals = lexer.next().unwrap().unwrap();
        assert_eq!(source.value_of_span(equals.span), "=");
    }
}
