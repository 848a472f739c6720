//! # Lexer de SmartScript
//! src/script/lexer.rs
//!
//! Convierte el texto de una plantilla en tokens, uno por llamada a
//! [`Lexer::next_token`]. Trabaja como una máquina de dos estados:
//!
//! ```text
//!  OutTag ──'{' sin escapar──▶ InTag
//!    ▲                          │
//!    └──────── '$}' ────────────┘
//! ```
//!
//! - **OutTag**: acumula texto libre hasta encontrar un `{` sin escapar.
//!   Dentro del texto `\{` produce `{` y `\\` produce `\`.
//! - **InTag**: ignora espacios y clasifica el siguiente token por su
//!   primer carácter.

use super::token::Token;
use thiserror::Error;

/// Estado actual del lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerState {
    /// Texto libre
    OutTag,

    /// Dentro de `{$ ... $}`
    InTag,
}

/// Error de análisis léxico con su posición (1-indexada)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Lexer de plantillas SmartScript
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    state: LexerState,
    /// Posición del último '{$' abierto
    tag_start: usize,
    finished: bool,
}

impl Lexer {
    /// Crea un lexer sobre el texto completo de la plantilla
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            state: LexerState::OutTag,
            tag_start: 0,
            finished: false,
        }
    }

    /// Estado actual (cambia solo al emitir TEXT o CLOSE_TAG)
    pub fn state(&self) -> LexerState {
        self.state
    }

    /// Produce el siguiente token.
    ///
    /// Después de entregar [`Token::Eof`] cualquier llamada adicional falla.
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::script::lexer::Lexer;
    /// use smart_http_server::script::token::Token;
    ///
    /// let mut lexer = Lexer::new("Hola {$= i $}");
    /// assert_eq!(lexer.next_token().unwrap(), Token::Text("Hola ".to_string()));
    /// assert_eq!(lexer.next_token().unwrap(), Token::OpenTag);
    /// assert_eq!(lexer.next_token().unwrap(), Token::Symbol('='));
    /// ```
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if self.finished {
            return Err(self.error_at(self.pos, "no more tokens after end of input"));
        }

        let token = match self.state {
            LexerState::OutTag => self.lex_text()?,
            LexerState::InTag => self.lex_tag()?,
        };

        if token == Token::Eof {
            self.finished = true;
        }

        Ok(token)
    }

    // === Modo OutTag ===

    fn lex_text(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();

        while let Some(c) = self.peek(0) {
            match c {
                '{' => {
                    // El '{' se queda para que InTag lo lea como parte de '{$'
                    self.state = LexerState::InTag;
                    return Ok(Token::Text(text));
                }
                '\\' => match self.peek(1) {
                    Some(escaped @ ('{' | '\\')) => {
                        text.push(escaped);
                        self.pos += 2;
                    }
                    _ => return Err(self.error_at(self.pos, "invalid escape sequence in text")),
                },
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        if text.is_empty() {
            Ok(Token::Eof)
        } else {
            Ok(Token::Text(text))
        }
    }

    // === Modo InTag ===

    fn lex_tag(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let Some(c) = self.peek(0) else {
            return Err(self.error_at(self.tag_start, "unterminated tag"));
        };

        match c {
            '{' => {
                if self.peek(1) != Some('$') {
                    return Err(self.error_at(self.pos, "expected '{$' to open a tag"));
                }
                self.tag_start = self.pos;
                self.pos += 2;
                Ok(Token::OpenTag)
            }
            '$' => {
                if self.peek(1) != Some('}') {
                    return Err(self.error_at(self.pos, "expected '$}' to close a tag"));
                }
                self.pos += 2;
                self.state = LexerState::OutTag;
                Ok(Token::CloseTag)
            }
            '@' => self.lex_function(),
            '"' => self.lex_string(),
            c if c.is_ascii_digit() => self.lex_number(),
            '-' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.lex_number(),
            c if c.is_alphabetic() => Ok(Token::Name(self.read_identifier())),
            _ => {
                self.pos += 1;
                Ok(Token::Symbol(c))
            }
        }
    }

    fn lex_function(&mut self) -> Result<Token, LexError> {
        // Saltar '@'
        self.pos += 1;

        if !self.peek(0).is_some_and(|c| c.is_alphabetic()) {
            return Err(self.error_at(self.pos, "function name must start with a letter"));
        }

        Ok(Token::Function(self.read_identifier()))
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        // Saltar la comilla de apertura
        self.pos += 1;

        let mut value = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error_at(start, "unterminated string"));
            };
            self.pos += 1;

            match c {
                '"' => return Ok(Token::Str(value)),
                '\\' => {
                    let escaped = match self.peek(0) {
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(_) => {
                            return Err(self.error_at(self.pos - 1, "invalid escape sequence in string"))
                        }
                        None => return Err(self.error_at(start, "unterminated string")),
                    };
                    value.push(escaped);
                    self.pos += 1;
                }
                _ => value.push(c),
            }
        }
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;

        if self.peek(0) == Some('-') {
            self.pos += 1;
        }
        self.skip_digits();

        let mut has_decimal_point = false;
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            has_decimal_point = true;
            self.pos += 1;
            self.skip_digits();
        }

        if let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                return Err(self.error_at(
                    self.pos,
                    &format!("unexpected '{}' after numeric literal", c),
                ));
            }
        }

        let literal: String = self.chars[start..self.pos].iter().collect();

        if !has_decimal_point {
            if let Ok(value) = literal.parse::<i64>() {
                return Ok(Token::Integer(value));
            }
        }

        literal
            .parse::<f64>()
            .map(Token::Double)
            .map_err(|_| self.error_at(start, &format!("invalid numeric literal '{}'", literal)))
    }

    // === Utilidades ===

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error_at(&self, pos: usize, message: &str) -> LexError {
        let mut line = 1;
        let mut column = 1;
        for &c in &self.chars[..pos.min(self.chars.len())] {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        LexError {
            message: message.to_string(),
            line,
            column,
        }
    }
}
