//! # Parser de SmartScript
//! src/script/parser.rs
//!
//! Construye el [`DocumentNode`] a partir de los tokens del lexer.
//!
//! ## Tags soportados
//!
//! ```text
//! {$ FOR i 1 10 2 $} ... {$ END $}
//! {$= i "texto" 3.5 + @sin $}
//! ```
//!
//! Los nombres de tag no distinguen mayúsculas/minúsculas.

use super::lexer::{LexError, Lexer};
use super::nodes::{DocumentNode, EchoNode, Element, ForLoopNode, Node};
use super::token::Token;
use thiserror::Error;

/// Errores de parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unexpected {found} in {context}")]
    UnexpectedToken { found: String, context: &'static str },

    #[error("FOR expects 3 or 4 arguments, got {0}")]
    ForArgumentCount(usize),

    #[error("END without matching FOR")]
    UnmatchedEnd,

    #[error("{0} FOR tag(s) not closed with END")]
    UnclosedFor(usize),
}

/// Parser de plantillas
pub struct ScriptParser {
    lexer: Lexer,
    /// FORs abiertos, el último es el más interno
    open_loops: Vec<ForLoopNode>,
    document: DocumentNode,
}

impl ScriptParser {
    /// Parsea una plantilla completa
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::script::parser::ScriptParser;
    ///
    /// let document = ScriptParser::parse("{$ FOR i 1 3 $}{$= i $}{$ END $}").unwrap();
    /// assert_eq!(document.children.len(), 1);
    /// ```
    pub fn parse(source: &str) -> Result<DocumentNode, ParseError> {
        let mut parser = Self {
            lexer: Lexer::new(source),
            open_loops: Vec::new(),
            document: DocumentNode::default(),
        };
        parser.parse_document()?;
        Ok(parser.document)
    }

    fn parse_document(&mut self) -> Result<(), ParseError> {
        loop {
            match self.lexer.next_token()? {
                Token::Eof => break,
                Token::Text(text) => {
                    if !text.is_empty() {
                        self.add_node(Node::Text(text));
                    }
                }
                Token::OpenTag => self.parse_tag()?,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.to_string(),
                        context: "document",
                    })
                }
            }
        }

        if !self.open_loops.is_empty() {
            return Err(ParseError::UnclosedFor(self.open_loops.len()));
        }

        Ok(())
    }

    fn parse_tag(&mut self) -> Result<(), ParseError> {
        match self.lexer.next_token()? {
            Token::Name(name) if name.eq_ignore_ascii_case("for") => self.parse_for(),
            Token::Name(name) if name.eq_ignore_ascii_case("end") => self.parse_end(),
            Token::Symbol('=') => self.parse_echo(),
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }

    fn parse_for(&mut self) -> Result<(), ParseError> {
        let variable = match self.lexer.next_token()? {
            Token::Name(name) => name,
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.to_string(),
                    context: "FOR variable",
                })
            }
        };

        let mut arguments = Vec::new();
        loop {
            let element = match self.lexer.next_token()? {
                Token::CloseTag => break,
                Token::Name(name) => Element::Variable(name),
                Token::Integer(value) => Element::ConstantInteger(value),
                Token::Double(value) => Element::ConstantDouble(value),
                Token::Str(value) => Element::String(value),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.to_string(),
                        context: "FOR tag",
                    })
                }
            };
            arguments.push(element);
        }

        if !(2..=3).contains(&arguments.len()) {
            return Err(ParseError::ForArgumentCount(arguments.len() + 1));
        }

        let mut arguments = arguments.into_iter();
        let (Some(start), Some(end)) = (arguments.next(), arguments.next()) else {
            return Err(ParseError::ForArgumentCount(1));
        };
        let step = arguments.next();

        self.open_loops.push(ForLoopNode {
            variable,
            start,
            end,
            step,
            children: Vec::new(),
        });

        Ok(())
    }

    fn parse_end(&mut self) -> Result<(), ParseError> {
        match self.lexer.next_token()? {
            Token::CloseTag => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.to_string(),
                    context: "END tag",
                })
            }
        }

        let finished = self.open_loops.pop().ok_or(ParseError::UnmatchedEnd)?;
        self.add_node(Node::For(finished));
        Ok(())
    }

    fn parse_echo(&mut self) -> Result<(), ParseError> {
        let mut elements = Vec::new();
        loop {
            let element = match self.lexer.next_token()? {
                Token::CloseTag => break,
                Token::Name(name) => Element::Variable(name),
                Token::Integer(value) => Element::ConstantInteger(value),
                Token::Double(value) => Element::ConstantDouble(value),
                Token::Str(value) => Element::String(value),
                Token::Function(name) => Element::Function(name),
                Token::Symbol(op @ ('+' | '-' | '*' | '/')) => Element::Operator(op),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.to_string(),
                        context: "echo tag",
                    })
                }
            };
            elements.push(element);
        }

        self.add_node(Node::Echo(EchoNode { elements }));
        Ok(())
    }

    /// Agrega un nodo al FOR abierto más interno, o a la raíz
    fn add_node(&mut self, node: Node) {
        match self.open_loops.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.document.children.push(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_only() {
        let document = ScriptParser::parse("solo texto").unwrap();
        assert_eq!(document.children, vec![Node::Text("solo texto".to_string())]);
    }

    #[test]
    fn test_parse_nested_for() {
        let source = "{$ FOR i 1 2 $}a{$ for j 1 2 1 $}{$= i j $}{$ END $}{$END$}fin";
        let document = ScriptParser::parse(source).unwrap();

        assert_eq!(document.children.len(), 2);
        let Node::For(outer) = &document.children[0] else {
            panic!("expected FOR node");
        };
        assert_eq!(outer.variable, "i");
        assert_eq!(outer.start, Element::ConstantInteger(1));
        assert_eq!(outer.step, None);
        assert_eq!(outer.children.len(), 2);

        let Node::For(inner) = &outer.children[1] else {
            panic!("expected nested FOR node");
        };
        assert_eq!(inner.step, Some(Element::ConstantInteger(1)));
        assert_eq!(
            inner.children,
            vec![Node::Echo(EchoNode {
                elements: vec![
                    Element::Variable("i".to_string()),
                    Element::Variable("j".to_string()),
                ]
            })]
        );
        assert_eq!(document.children[1], Node::Text("fin".to_string()));
    }

    #[test]
    fn test_parse_echo_elements() {
        let document = ScriptParser::parse("{$= \"x\" 2.5 + @dup $}").unwrap();
        assert_eq!(
            document.children,
            vec![Node::Echo(EchoNode {
                elements: vec![
                    Element::String("x".to_string()),
                    Element::ConstantDouble(2.5),
                    Element::Operator('+'),
                    Element::Function("dup".to_string()),
                ]
            })]
        );
    }

    #[test]
    fn test_for_with_string_bounds() {
        let document = ScriptParser::parse("{$ FOR x \"1\" \"3\" $}{$ END $}").unwrap();
        let Node::For(node) = &document.children[0] else {
            panic!("expected FOR node");
        };
        assert_eq!(node.start, Element::String("1".to_string()));
    }

    #[test]
    fn test_for_wrong_argument_count() {
        assert!(matches!(
            ScriptParser::parse("{$ FOR i 1 $}{$ END $}"),
            Err(ParseError::ForArgumentCount(_))
        ));
        assert!(matches!(
            ScriptParser::parse("{$ FOR i 1 2 3 4 $}{$ END $}"),
            Err(ParseError::ForArgumentCount(_))
        ));
    }

    #[test]
    fn test_for_variable_must_be_name() {
        assert!(matches!(
            ScriptParser::parse("{$ FOR 1 1 2 $}{$ END $}"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unmatched_end() {
        assert_eq!(ScriptParser::parse("{$ END $}"), Err(ParseError::UnmatchedEnd));
    }

    #[test]
    fn test_unclosed_for() {
        assert_eq!(
            ScriptParser::parse("{$ FOR i 1 2 $}cuerpo"),
            Err(ParseError::UnclosedFor(1))
        );
    }

    #[test]
    fn test_unclosed_tag() {
        let Err(ParseError::Lex(err)) = ScriptParser::parse("{$= i ") else {
            panic!("expected lex error");
        };
        assert_eq!(err.message, "unterminated tag");
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            ScriptParser::parse("{$ WHILE $}"),
            Err(ParseError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_lex_error_is_wrapped() {
        assert!(matches!(
            ScriptParser::parse("{$= \"abc $}"),
            Err(ParseError::Lex(_))
        ));
    }
}
