//! # Tokens de SmartScript
//! src/script/token.rs
//!
//! Unidades que produce el [`Lexer`](super::lexer::Lexer) una a la vez.

use std::fmt;

/// Token producido por el lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Texto libre fuera de un tag (ya sin escapes)
    Text(String),

    /// String entre comillas dentro de un tag (ya sin escapes)
    Str(String),

    /// Llamada a función: `@nombre` (se guarda sin la arroba)
    Function(String),

    /// Nombre de variable o de tag (`FOR`, `END`, `i`, ...)
    Name(String),

    /// Constante entera
    Integer(i64),

    /// Constante decimal
    Double(f64),

    /// Cualquier otro carácter dentro de un tag (`=`, `+`, `*`, ...)
    Symbol(char),

    /// `{$`
    OpenTag,

    /// `$}`
    CloseTag,

    /// Fin del documento
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => write!(f, "text {:?}", text),
            Token::Str(value) => write!(f, "string {:?}", value),
            Token::Function(name) => write!(f, "function @{}", name),
            Token::Name(name) => write!(f, "name '{}'", name),
            Token::Integer(value) => write!(f, "integer {}", value),
            Token::Double(value) => write!(f, "double {}", value),
            Token::Symbol(c) => write!(f, "symbol '{}'", c),
            Token::OpenTag => write!(f, "'{{$'"),
            Token::CloseTag => write!(f, "'$}}'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
