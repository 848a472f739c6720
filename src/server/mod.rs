//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto y acepta conexiones (un thread acceptor)
//! 2. Encola cada conexión en un pool fijo de workers (503 si está lleno)
//! 3. Resuelve la sesión del cliente
//! 4. Despacha el path: worker, script o archivo estático
//!
//! Las conexiones se cierran después de cada respuesta (sin keep-alive).

pub mod dispatch;
pub mod pool;
pub mod session;
pub mod tcp;

use std::path::PathBuf;
use thiserror::Error;

pub use dispatch::{DispatchError, Dispatcher, RequestDispatcher};
pub use session::{SessionStore, SessionSweeper};
pub use tcp::{Server, ServerHandle};

/// Errores al construir o arrancar el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("document root {path:?} is not accessible: {source}")]
    DocumentRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path {path} maps to unknown worker {name}")]
    UnknownWorker { path: String, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
