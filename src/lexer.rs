use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::Token;

/// A token together with the source text it was scanned from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme<'a> {
    pub token: Token,
    /// Exact source slice, quotes included
    pub text: &'a str,
    /// Byte offset of `text` in the source
    pub position: usize,
}

/// Scanner over query text.
///
/// The lexer is a plain cursor value: copying it snapshots the scan
/// position, so a caller can look ahead or backtrack by keeping a copy.
/// Scanning past the end keeps yielding [`Token::Eof`].
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Reads one token starting at byte `offset`, returning it with the
    /// offset just past it.
    ///
    /// An offset inside a multi-byte character yields an error token and
    /// resumes at the next character boundary.
    pub fn read(input: &'a str, offset: usize) -> (Lexeme<'a>, usize) {
        let offset = offset.min(input.len());
        if !input.is_char_boundary(offset) {
            let resume = (offset..input.len())
                .find(|&i| input.is_char_boundary(i))
                .unwrap_or(input.len());
            let lexeme = Lexeme {
                token: Token::Error(format!(
                    "Offset {} is inside a multi-byte character",
                    offset
                )),
                text: "",
                position: offset,
            };
            return (lexeme, resume);
        }

        let mut lexer = Lexer {
            input,
            position: offset,
        };
        let lexeme = lexer.next_token();
        (lexeme, lexer.position)
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.position
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input[self.position..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> &'a str {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.position]
    }

    /// Reads a run delimited by `quote`, where a doubled quote stands for
    /// one literal quote character.
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                if self.current_char() == Some(quote) {
                    result.push(quote);
                    self.advance();
                } else {
                    return Some(result);
                }
            } else {
                result.push(ch);
            }
        }

        None
    }

    fn read_number(&mut self) -> Token {
        let start = self.position;

        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.position];
        match Decimal::from_str(text) {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Error(format!("Numeric literal {} is out of range", text)),
        }
    }

    /// Consumes `second` if it follows the current character.
    fn pair(&mut self, second: char, paired: Token, single: Token) -> Token {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            paired
        } else {
            single
        }
    }

    fn scan(&mut self) -> Token {
        let Some(ch) = self.current_char() else {
            return Token::Eof;
        };

        match ch {
            '.' | ',' | '(' | ')' | '*' | '-' | '+' | '/' | '%' => {
                self.advance();
                match ch {
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '*' => Token::Star,
                    '-' => Token::Minus,
                    '+' => Token::Plus,
                    '/' => Token::Slash,
                    _ => Token::Percent,
                }
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::LtEq
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEq
                    }
                    _ => Token::Lt,
                }
            }
            '>' => self.pair('=', Token::GtEq, Token::Gt),
            '=' => self.pair('=', Token::Eq, Token::Eq),
            '!' => self.pair(
                '=',
                Token::NotEq,
                Token::Error(format!(
                    "Unexpected '!' at position {} (did you mean '!='?)",
                    self.position
                )),
            ),
            '&' => self.pair(
                '&',
                Token::And,
                Token::Error(format!(
                    "Unexpected '&' at position {} (did you mean '&&'?)",
                    self.position
                )),
            ),
            '|' => self.pair(
                '|',
                Token::Concat,
                Token::Error(format!(
                    "Unexpected '|' at position {} (did you mean '||'?)",
                    self.position
                )),
            ),
            '\'' => {
                let start = self.position;
                match self.read_quoted('\'') {
                    Some(s) => Token::String(s),
                    None => Token::Error(format!(
                        "Unterminated string literal starting at position {}",
                        start
                    )),
                }
            }
            '"' => {
                let start = self.position;
                match self.read_quoted('"') {
                    Some(s) => Token::QuotedIdentifier(s),
                    None => Token::Error(format!(
                        "Unterminated quoted identifier starting at position {}",
                        start
                    )),
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.read_word();
                Token::keyword(word).unwrap_or_else(|| Token::Identifier(word.to_string()))
            }
            c if c.is_ascii_digit() => self.read_number(),
            c => {
                let position = self.position;
                self.advance();
                Token::Error(format!(
                    "Unexpected character '{}' at position {}",
                    c, position
                ))
            }
        }
    }

    /// Scans the next token, skipping leading whitespace.
    pub fn next_token(&mut self) -> Lexeme<'a> {
        self.skip_whitespace();
        let start = self.position;
        let token = self.scan();
        Lexeme {
            token,
            text: &self.input[start..self.position],
            position: start,
        }
    }

    /// The token that [`next_token`](Self::next_token) would return, without
    /// moving this cursor.
    pub fn peek_token(&self) -> Lexeme<'a> {
        let mut lookahead = *self;
        lookahead.next_token()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Lexeme<'a>;

    /// Yields every token before end of input.
    fn next(&mut self) -> Option<Self::Item> {
        let lexeme = self.next_token();
        if lexeme.token == Token::Eof {
            None
        } else {
            Some(lexeme)
        }
    }
}

/// Scans the whole input, the final element always being [`Token::Eof`].
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let lexeme = lexer.next_token();
        let done = lexeme.token == Token::Eof;
        tokens.push(lexeme.token);
        if done {
            return tokens;
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("select FROM Where true FALSE null");
    assert_eq!(lexer.next_token().token, Token::Select);
    assert_eq!(lexer.next_token().token, Token::From);
    assert_eq!(lexer.next_token().token, Token::Where);
    assert_eq!(lexer.next_token().token, Token::Boolean(true));
    assert_eq!(lexer.next_token().token, Token::Boolean(false));
    assert_eq!(lexer.next_token().token, Token::Null);
    assert_eq!(lexer.next_token().token, Token::Eof);
}

#[test]
fn test_read_resumes_at_offset() {
    let input = "s.a <> 'x'";
    let (first, next) = Lexer::read(input, 0);
    assert_eq!(first.token, Token::Identifier("s".to_string()));
    assert_eq!(first.text, "s");
    let (second, next) = Lexer::read(input, next);
    assert_eq!(second.token, Token::Dot);
    let (_, next) = Lexer::read(input, next);
    let (op, next) = Lexer::read(input, next);
    assert_eq!(op.token, Token::NotEq);
    assert_eq!(op.position, 4);
    let (literal, next) = Lexer::read(input, next);
    assert_eq!(literal.text, "'x'");
    assert_eq!(Lexer::read(input, next).0.token, Token::Eof);
}

#[test]
fn test_read_inside_multibyte_character() {
    let input = "'é' x";
    let (lexeme, next) = Lexer::read(input, 2);
    assert!(matches!(lexeme.token, Token::Error(_)));
    assert_eq!(lexeme.position, 2);
    assert_eq!(next, 3);
    assert_eq!(
        Lexer::read(input, next).0.token,
        Token::Error("Unterminated string literal starting at position 3".to_string())
    );
    assert_eq!(Lexer::read(input, 100).0.token, Token::Eof);
}
