//! # Funciones integradas
//! src/script/functions.rs
//!
//! Tabla fija de funciones que un script invoca con `@nombre`. Cada función
//! saca sus argumentos de la pila de evaluación del ECHO y apila sus
//! resultados; algunas leen o modifican el [`RequestContext`].
//!
//! | Función | Pila (antes → después) | Efecto |
//! |---|---|---|
//! | `sin` | `x → sin(x°)` | |
//! | `decfmt` | `x pattern → texto` | |
//! | `dup` | `x → x x` | |
//! | `swap` | `a b → b a` | |
//! | `setMimeType` | `mime →` | cambia el mime type de la respuesta |
//! | `paramGet` / `pparamGet` / `tparamGet` | `default name → valor` | |
//! | `pparamSet` / `tparamSet` | `value name →` | guarda el parámetro |
//! | `pparamDel` / `tparamDel` | `name →` | borra el parámetro |
//!
//! Un nombre que no está en la tabla no hace nada.

use super::engine::ScriptError;
use super::format::DecimalFormat;
use super::value::Value;
use crate::http::RequestContext;
use std::collections::HashMap;
use tracing::debug;

/// Firma de una función integrada
pub type BuiltinFunction = fn(&mut Vec<Value>, &mut RequestContext<'_>) -> Result<(), ScriptError>;

/// Registro nombre → función, construido una vez al arrancar
pub struct FunctionTable {
    functions: HashMap<&'static str, BuiltinFunction>,
}

impl FunctionTable {
    /// Tabla vacía
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Tabla con todas las funciones integradas
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.register("sin", sin);
        table.register("decfmt", decfmt);
        table.register("dup", dup);
        table.register("swap", swap);
        table.register("setMimeType", set_mime_type);
        table.register("paramGet", param_get);
        table.register("pparamGet", pparam_get);
        table.register("pparamSet", pparam_set);
        table.register("pparamDel", pparam_del);
        table.register("tparamGet", tparam_get);
        table.register("tparamSet", tparam_set);
        table.register("tparamDel", tparam_del);
        table
    }

    pub fn register(&mut self, name: &'static str, function: BuiltinFunction) {
        self.functions.insert(name, function);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Ejecuta la función `name` sobre la pila.
    ///
    /// Un nombre desconocido se ignora (no modifica la pila).
    pub fn execute(
        &self,
        name: &str,
        stack: &mut Vec<Value>,
        context: &mut RequestContext<'_>,
    ) -> Result<(), ScriptError> {
        match self.functions.get(name) {
            Some(function) => function(stack, context),
            None => {
                debug!("Función desconocida @{} ignorada", name);
                Ok(())
            }
        }
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn pop(stack: &mut Vec<Value>, function: &'static str) -> Result<Value, ScriptError> {
    stack.pop().ok_or(ScriptError::StackUnderflow(function))
}

fn sin(stack: &mut Vec<Value>, _context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let degrees = pop(stack, "sin")?.as_f64()?;
    stack.push(Value::Double(degrees.to_radians().sin()));
    Ok(())
}

fn decfmt(stack: &mut Vec<Value>, _context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let pattern = pop(stack, "decfmt")?.to_string();
    let number = pop(stack, "decfmt")?.as_f64()?;
    let format = DecimalFormat::parse(&pattern)?;
    stack.push(Value::Str(format.format(number)));
    Ok(())
}

fn dup(stack: &mut Vec<Value>, _context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let top = stack.last().cloned().ok_or(ScriptError::StackUnderflow("dup"))?;
    stack.push(top);
    Ok(())
}

fn swap(stack: &mut Vec<Value>, _context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let a = pop(stack, "swap")?;
    let b = pop(stack, "swap")?;
    stack.push(a);
    stack.push(b);
    Ok(())
}

fn set_mime_type(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let mime = pop(stack, "setMimeType")?;
    context.set_mime_type(&mime.to_string())?;
    Ok(())
}

fn param_get(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "paramGet")?.to_string();
    let default = pop(stack, "paramGet")?;
    let value = context.parameter(&name).map(Value::from);
    stack.push(value.unwrap_or(default));
    Ok(())
}

fn pparam_get(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "pparamGet")?.to_string();
    let default = pop(stack, "pparamGet")?;
    let value = context.persistent_parameter(&name).map(Value::from);
    stack.push(value.unwrap_or(default));
    Ok(())
}

fn pparam_set(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "pparamSet")?.to_string();
    let value = pop(stack, "pparamSet")?.to_string();
    context.set_persistent_parameter(&name, &value);
    Ok(())
}

fn pparam_del(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "pparamDel")?.to_string();
    context.remove_persistent_parameter(&name);
    Ok(())
}

fn tparam_get(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "tparamGet")?.to_string();
    let default = pop(stack, "tparamGet")?;
    let value = context.temporary_parameter(&name).map(Value::from);
    stack.push(value.unwrap_or(default));
    Ok(())
}

fn tparam_set(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "tparamSet")?.to_string();
    let value = pop(stack, "tparamSet")?.to_string();
    context.set_temporary_parameter(&name, &value);
    Ok(())
}

fn tparam_del(stack: &mut Vec<Value>, context: &mut RequestContext<'_>) -> Result<(), ScriptError> {
    let name = pop(stack, "tparamDel")?.to_string();
    context.remove_temporary_parameter(&name);
    Ok(())
}
