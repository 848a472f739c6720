//! # Motor de ejecución de scripts
//! src/script/engine.rs
//!
//! Recorre el [`DocumentNode`] en profundidad y escribe la salida a través
//! del [`RequestContext`].
//!
//! - **TEXT**: se escribe tal cual.
//! - **FOR**: la variable de control vive en la [`ObjectMultistack`]; al
//!   terminar el ciclo se desapila para no dejar residuos.
//! - **ECHO**: evalúa sus elementos sobre una pila temporal y al final
//!   escribe lo que quede desapilando (el último valor apilado sale primero).

use super::format::FormatError;
use super::functions::FunctionTable;
use super::nodes::{DocumentNode, EchoNode, Element, ForLoopNode, Node};
use super::stack::{ObjectMultistack, StackError};
use super::value::{Value, ValueError, ValueWrapper};
use crate::http::context::ContextError;
use crate::http::RequestContext;
use std::cmp::Ordering;
use thiserror::Error;

/// Errores durante la ejecución de un script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// Una función u operador necesitaba más valores de los que había
    #[error("not enough values on the stack for '{0}'")]
    StackUnderflow(&'static str),

    #[error("unsupported operator '{0}'")]
    UnknownOperator(char),

    #[error("invalid FOR argument: {0}")]
    InvalidLoopArgument(String),
}

/// Motor que ejecuta documentos usando una tabla de funciones compartida
pub struct ScriptEngine<'f> {
    functions: &'f FunctionTable,
    multistack: ObjectMultistack,
}

impl<'f> ScriptEngine<'f> {
    pub fn new(functions: &'f FunctionTable) -> Self {
        Self {
            functions,
            multistack: ObjectMultistack::new(),
        }
    }

    /// Ejecuta el documento completo
    pub fn execute(
        &mut self,
        document: &DocumentNode,
        context: &mut RequestContext<'_>,
    ) -> Result<(), ScriptError> {
        self.visit_all(&document.children, context)
    }

    fn visit_all(&mut self, nodes: &[Node], context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    if !text.is_empty() {
                        context.write_str(text)?;
                    }
                }
                Node::For(for_loop) => self.visit_for(for_loop, context)?,
                Node::Echo(echo) => self.visit_echo(echo, context)?,
            }
        }
        Ok(())
    }

    fn visit_for(&mut self, node: &ForLoopNode, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
        let start = self.evaluate(&node.start)?;
        let end = self.evaluate(&node.end)?;
        let step = match &node.step {
            Some(step) => self.evaluate(step)?,
            None => Value::Int(1),
        };

        let variable = node.variable.as_str();
        self.multistack.push(variable, ValueWrapper::new(start));

        while self.multistack.peek(variable)?.compare(&end)? != Ordering::Greater {
            self.visit_all(&node.children, context)?;

            let mut current = self.multistack.pop(variable)?;
            current.add(&step)?;
            self.multistack.push(variable, current);
        }

        self.multistack.pop(variable)?;
        Ok(())
    }

    fn visit_echo(&mut self, node: &EchoNode, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
        let mut stack: Vec<Value> = Vec::new();

        for element in &node.elements {
            match element {
                Element::ConstantInteger(_) | Element::ConstantDouble(_) | Element::String(_) => {
                    stack.push(Value::Str(element.as_text()));
                }
                Element::Variable(name) => {
                    stack.push(self.multistack.peek(name)?.value().clone());
                }
                Element::Operator(op) => {
                    let symbol = operator_symbol(*op)?;
                    let second = stack.pop().ok_or(ScriptError::StackUnderflow(symbol))?;
                    let first = stack.pop().ok_or(ScriptError::StackUnderflow(symbol))?;

                    let mut result = ValueWrapper::new(first);
                    match op {
                        '+' => result.add(&second)?,
                        '-' => result.subtract(&second)?,
                        '*' => result.multiply(&second)?,
                        _ => result.divide(&second)?,
                    }
                    stack.push(result.into_value());
                }
                Element::Function(name) => {
                    self.functions.execute(name, &mut stack, context)?;
                }
            }
        }

        while let Some(value) = stack.pop() {
            context.write_str(&value.to_string())?;
        }

        Ok(())
    }

    fn evaluate(&self, element: &Element) -> Result<Value, ScriptError> {
        match element {
            Element::Variable(name) => Ok(self.multistack.peek(name)?.value().clone()),
            Element::ConstantInteger(value) => Ok(Value::Int(*value)),
            Element::ConstantDouble(value) => Ok(Value::Double(*value)),
            Element::String(value) => Ok(Value::Str(value.clone())),
            other => Err(ScriptError::InvalidLoopArgument(other.as_text())),
        }
    }
}

fn operator_symbol(op: char) -> Result<&'static str, ScriptError> {
    match op {
        '+' => Ok("+"),
        '-' => Ok("-"),
        '*' => Ok("*"),
        '/' => Ok("/"),
        other => Err(ScriptError::UnknownOperator(other)),
    }
}
