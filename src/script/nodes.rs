//! # Árbol del documento
//! src/script/nodes.rs
//!
//! Árbol que produce el parser y que recorre el motor. Los tipos de nodo
//! forman un enum cerrado: el motor hace `match` sobre ellos en vez de usar
//! un visitor.

use super::value::format_double;

/// Raíz del documento
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentNode {
    pub children: Vec<Node>,
}

/// Nodo hijo de un documento o de un FOR
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Texto literal
    Text(String),

    /// `{$ FOR var start end [step] $} ... {$ END $}`
    For(ForLoopNode),

    /// `{$= elementos... $}`
    Echo(EchoNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoopNode {
    pub variable: String,
    pub start: Element,
    pub end: Element,
    pub step: Option<Element>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoNode {
    pub elements: Vec<Element>,
}

/// Elemento de una expresión dentro de un tag
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Variable(String),
    ConstantInteger(i64),
    ConstantDouble(f64),
    String(String),
    Function(String),
    Operator(char),
}

impl Element {
    /// Forma textual del elemento, la que se apila al evaluar un ECHO
    pub fn as_text(&self) -> String {
        match self {
            Element::Variable(name) => name.clone(),
            Element::ConstantInteger(value) => value.to_string(),
            Element::ConstantDouble(value) => format_double(*value),
            Element::String(value) => value.clone(),
            Element::Function(name) => format!("@{}", name),
            Element::Operator(op) => op.to_string(),
        }
    }
}
