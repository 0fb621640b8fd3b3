//! FEEL lexer - tokenizes source strings.
//!
//! Converts FEEL expression and unary-test source text into a stream of single-word
//! tokens. Multi-word names are not assembled here (see `token.rs`).

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current();
        if let Some(c) = c {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
        c
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.current() {
                        if c == '*' && self.peek_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(Error::ParseError("unterminated block comment".into()));
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);

        let Some(c) = self.current() else {
            return Ok(Token::new(TokenKind::Eof, line, column));
        };

        if c == '"' {
            return self.read_string(line, column);
        }
        if c == '@' {
            return self.read_temporal_literal(line, column);
        }
        if c.is_ascii_digit() {
            return self.read_number(line, column);
        }
        if is_name_start(c) {
            return self.read_name_or_keyword(line, column);
        }

        self.read_operator(line, column)
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<Token> {
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(other) => s.push(other),
                    None => return Err(Error::ParseError("unterminated string literal".into())),
                },
                Some(other) => s.push(other),
                None => return Err(Error::ParseError("unterminated string literal".into())),
            }
        }
        Ok(Token::new(TokenKind::StringLiteral(s), line, column))
    }

    /// `@"2024-01-15"` and similar: a temporal literal. The lexer captures the raw
    /// quoted text; `crate::temporal` decides whether it is a Date, Time, DateTime, or
    /// Duration by lexical form.
    fn read_temporal_literal(&mut self, line: usize, column: usize) -> Result<Token> {
        self.advance(); // '@'
        if self.current() != Some('"') {
            return Err(Error::ParseError(
                "expected string literal after '@'".into(),
            ));
        }
        match self.read_string(line, column)?.kind {
            TokenKind::StringLiteral(s) => Ok(Token::new(TokenKind::TemporalLiteral(s), line, column)),
            _ => unreachable!(),
        }
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<Token> {
        let mut s = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.current() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(Token::new(TokenKind::Number(s), line, column))
    }

    fn read_name_or_keyword(&mut self, line: usize, column: usize) -> Result<Token> {
        let mut s = String::new();
        while let Some(c) = self.current() {
            if is_name_part(c) {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match s.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "between" => TokenKind::Between,
            "in" => TokenKind::In,
            "instance" => TokenKind::InstanceOf,
            "of" => TokenKind::Of,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "some" => TokenKind::Some,
            "every" => TokenKind::Every,
            "satisfies" => TokenKind::Satisfies,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Name(s),
        };
        Ok(Token::new(kind, line, column))
    }

    fn read_operator(&mut self, line: usize, column: usize) -> Result<Token> {
        let c = self.advance().unwrap();
        let kind = match c {
            '.' => {
                if self.current() == Some('.') {
                    self.advance();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if self.current() == Some('*') {
                    self.advance();
                    TokenKind::Power
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '?' => TokenKind::Question,
            '=' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '|' => {
                if self.current() == Some('|') {
                    self.advance();
                }
                TokenKind::Pipe
            }
            '&' => {
                if self.current() == Some('&') {
                    self.advance();
                }
                TokenKind::And
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            other => {
                return Err(Error::ParseError(format!(
                    "unexpected character '{other}' at line {line}, column {column}"
                )))
            }
        };
        Ok(Token::new(kind, line, column))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '?'
}

fn is_name_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_multi_word_name_as_separate_words() {
        let ks = kinds("Loan Amount");
        assert_eq!(
            ks,
            vec![
                TokenKind::Name("Loan".into()),
                TokenKind::Name("Amount".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_number_and_decimal() {
        let ks = kinds("42 3.5");
        assert_eq!(
            ks,
            vec![
                TokenKind::Number("42".into()),
                TokenKind::Number("3.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_range_dots() {
        let ks = kinds("[1..5]");
        assert_eq!(
            ks,
            vec![
                TokenKind::LBracket,
                TokenKind::Number("1".into()),
                TokenKind::DotDot,
                TokenKind::Number("5".into()),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_temporal_literal() {
        let ks = kinds(r#"@"2024-01-15""#);
        assert_eq!(
            ks,
            vec![TokenKind::TemporalLiteral("2024-01-15".into()), TokenKind::Eof]
        );
    }
}
