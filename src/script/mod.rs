//! # SmartScript
//! src/script/mod.rs
//!
//! Lenguaje de plantillas embebido que el servidor ejecuta para los archivos
//! con extensión de script.
//!
//! ## Sintaxis
//!
//! ```text
//! Texto libre {$ FOR i 1 10 2 $}
//!   valor: {$= i i * "0.00" @decfmt $}
//! {$ END $}
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! texto → Lexer → tokens → ScriptParser → DocumentNode → ScriptEngine → RequestContext
//!                                                            │
//!                                  ValueWrapper, ObjectMultistack, FunctionTable
//! ```

pub mod engine;
pub mod format;
pub mod functions;
pub mod lexer;
pub mod nodes;
pub mod parser;
pub mod stack;
pub mod token;
pub mod value;

pub use engine::{ScriptEngine, ScriptError};
pub use functions::FunctionTable;
pub use nodes::DocumentNode;
pub use parser::{ParseError, ScriptParser};
pub use value::{Value, ValueWrapper};
