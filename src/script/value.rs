//! # Valores y coerción numérica
//! src/script/value.rs
//!
//! Los scripts manejan valores heterogéneos: enteros, decimales, strings
//! que contienen números y el valor nulo. [`ValueWrapper`] define cómo se
//! combinan en las operaciones aritméticas.
//!
//! ## Reglas de coerción
//!
//! | Valor | Se interpreta como |
//! |---|---|
//! | `Null` | entero `0` |
//! | `Int(n)` | entero `n` |
//! | `Double(d)` | decimal `d` |
//! | `Str(s)` sin `.` que parsea como entero | entero |
//! | cualquier otro `Str(s)` que parsea como decimal | decimal |
//! | `Str(s)` no numérico | [`ValueError::NotANumber`] |
//!
//! El resultado es entero solo si ambos operandos son enteros; en cualquier
//! otro caso es decimal.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Valor escalar manejado por el motor de scripts
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
    Null,
}

/// Errores de coerción y aritmética
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// El operando no puede interpretarse como número
    #[error("value '{0}' is not a number")]
    NotANumber(String),

    /// División por un operando igual a cero
    #[error("division by zero")]
    DivisionByZero,
}

/// Número ya coercionado
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Double(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Value {
    /// Interpreta el valor como decimal (para funciones como `sin`)
    pub fn as_f64(&self) -> Result<f64, ValueError> {
        self.to_number().map(Number::as_f64)
    }

    fn to_number(&self) -> Result<Number, ValueError> {
        match self {
            Value::Null => Ok(Number::Int(0)),
            Value::Int(value) => Ok(Number::Int(*value)),
            Value::Double(value) => Ok(Number::Double(*value)),
            Value::Str(text) => parse_number(text),
        }
    }
}

fn parse_number(text: &str) -> Result<Number, ValueError> {
    let trimmed = text.trim();

    if !trimmed.contains('.') {
        if let Ok(value) = trimmed.parse::<i64>() {
            return Ok(Number::Int(value));
        }
    }

    trimmed
        .parse::<f64>()
        .map(Number::Double)
        .map_err(|_| ValueError::NotANumber(text.to_string()))
}

/// Formatea un decimal siempre con al menos un dígito fraccionario (`5.0`, `0.25`)
pub fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Double(value) => f.write_str(&format_double(*value)),
            Value::Str(text) => f.write_str(text),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// Contenedor mutable de un [`Value`].
///
/// Las operaciones modifican el valor guardado usando un segundo operando.
///
/// # Ejemplo
/// ```
/// use smart_http_server::script::value::{Value, ValueWrapper};
///
/// let mut wrapper = ValueWrapper::new(Value::Int(2));
/// wrapper.add(&Value::Double(3.0)).unwrap();
/// assert_eq!(wrapper.value(), &Value::Double(5.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValueWrapper {
    value: Value,
}

impl ValueWrapper {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn add(&mut self, other: &Value) -> Result<(), ValueError> {
        self.apply(other, Operation::Add)
    }

    pub fn subtract(&mut self, other: &Value) -> Result<(), ValueError> {
        self.apply(other, Operation::Subtract)
    }

    pub fn multiply(&mut self, other: &Value) -> Result<(), ValueError> {
        self.apply(other, Operation::Multiply)
    }

    /// Divide el valor guardado. Falla si el divisor (como decimal) es cero,
    /// sin importar el tipo del resultado.
    pub fn divide(&mut self, other: &Value) -> Result<(), ValueError> {
        self.apply(other, Operation::Divide)
    }

    /// Compara el valor guardado con `other` numéricamente
    pub fn compare(&self, other: &Value) -> Result<Ordering, ValueError> {
        let left = self.value.to_number()?;
        let right = other.to_number()?;

        Ok(match (left, right) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        })
    }

    fn apply(&mut self, other: &Value, operation: Operation) -> Result<(), ValueError> {
        // Ambos operandos se validan antes de operar
        let left = self.value.to_number()?;
        let right = other.to_number()?;

        if operation == Operation::Divide && right.as_f64() == 0.0 {
            return Err(ValueError::DivisionByZero);
        }

        self.value = match (left, right) {
            (Number::Int(a), Number::Int(b)) => Value::Int(match operation {
                Operation::Add => a.wrapping_add(b),
                Operation::Subtract => a.wrapping_sub(b),
                Operation::Multiply => a.wrapping_mul(b),
                Operation::Divide => a.wrapping_div(b),
            }),
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                Value::Double(match operation {
                    Operation::Add => a + b,
                    Operation::Subtract => a - b,
                    Operation::Multiply => a * b,
                    Operation::Divide => a / b,
                })
            }
        };

        Ok(())
    }
}
