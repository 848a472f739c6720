//! # Pila múltiple por nombre
//! src/script/stack.rs
//!
//! Registro de pilas LIFO independientes indexadas por nombre de variable.
//! El motor guarda aquí las variables de control de los FOR: un FOR anidado
//! con el mismo nombre apila encima y al terminar deja el valor exterior
//! intacto.
//!
//! Una clave sin entradas equivale a una pila vacía; `pop`/`peek` sobre ella
//! es un error, nunca un valor por defecto.

use super::value::ValueWrapper;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// No hay valores para ese nombre (o la variable no está definida)
    #[error("stack '{0}' is empty")]
    Empty(String),
}

/// Pilas independientes por nombre
#[derive(Debug, Default)]
pub struct ObjectMultistack {
    stacks: HashMap<String, Vec<ValueWrapper>>,
}

impl ObjectMultistack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apila `value` en la pila `name`
    pub fn push(&mut self, name: &str, value: ValueWrapper) {
        self.stacks.entry(name.to_string()).or_default().push(value);
    }

    /// Desapila el tope de la pila `name`
    pub fn pop(&mut self, name: &str) -> Result<ValueWrapper, StackError> {
        let stack = self
            .stacks
            .get_mut(name)
            .ok_or_else(|| StackError::Empty(name.to_string()))?;

        let value = stack
            .pop()
            .ok_or_else(|| StackError::Empty(name.to_string()))?;

        // Una pila vaciada se olvida: misma semántica que nunca usada
        if stack.is_empty() {
            self.stacks.remove(name);
        }

        Ok(value)
    }

    /// Tope de la pila `name` sin desapilar
    pub fn peek(&self, name: &str) -> Result<&ValueWrapper, StackError> {
        self.stacks
            .get(name)
            .and_then(|stack| stack.last())
            .ok_or_else(|| StackError::Empty(name.to_string()))
    }

    pub fn is_empty(&self, name: &str) -> bool {
        self.stacks.get(name).map_or(true, Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::value::Value;

    fn int(value: i64) -> ValueWrapper {
        ValueWrapper::new(Value::Int(value))
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut stack = ObjectMultistack::new();
        stack.push("i", int(1));
        stack.push("i", int(2));

        assert_eq!(stack.pop("i").unwrap(), int(2));
        assert_eq!(stack.pop("i").unwrap(), int(1));
        assert!(stack.is_empty("i"));
    }

    #[test]
    fn test_independent_stacks() {
        let mut stack = ObjectMultistack::new();
        stack.push("a", int(1));
        stack.push("b", int(2));

        assert_eq!(stack.peek("a").unwrap(), &int(1));
        assert_eq!(stack.peek("b").unwrap(), &int(2));
        stack.pop("a").unwrap();
        assert!(stack.is_empty("a"));
        assert!(!stack.is_empty("b"));
    }

    #[test]
    fn test_never_pushed_is_error() {
        let mut stack = ObjectMultistack::new();
        assert!(stack.is_empty("x"));
        assert_eq!(stack.peek("x"), Err(StackError::Empty("x".to_string())));
        assert_eq!(stack.pop("x"), Err(StackError::Empty("x".to_string())));
    }

    #[test]
    fn test_fully_popped_is_error() {
        let mut stack = ObjectMultistack::new();
        stack.push("x", int(5));
        stack.pop("x").unwrap();
        assert!(stack.peek("x").is_err());
        assert!(stack.pop("x").is_err());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut stack = ObjectMultistack::new();
        stack.push("x", int(5));
        stack.peek("x").unwrap();
        stack.peek("x").unwrap();
        assert_eq!(stack.pop("x").unwrap(), int(5));
    }
}
