//! # Workers
//! src/workers/mod.rs
//!
//! Un worker produce la respuesta de un path sin pasar por el motor de
//! scripts. Se invocan de dos formas:
//!
//! - por nombre, con el prefijo dinámico: `GET /ext/HelloWorker`
//! - por path, con la tabla `path → nombre` de la configuración
//!
//! ## Arquitectura
//!
//! ```text
//! RequestDispatcher → WorkerRegistry::get(nombre) → Worker::process(ctx)
//!                                                       │
//!                                            forward() ─┘ (opcional)
//! ```
//!
//! El registro se construye una sola vez al arrancar y se comparte con
//! `Arc` entre todas las conexiones.

pub mod demo;

use crate::http::context::ContextError;
use crate::http::RequestContext;
use crate::server::dispatch::DispatchError;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use demo::{BgColorWorker, EchoParams, HelloWorker, Home, SumWorker};

/// Errores de un worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Falló el reenvío interno a otro path
    #[error("forward failed: {0}")]
    Dispatch(Box<DispatchError>),

    /// El contexto no tiene dispatcher para reenviar
    #[error("no dispatcher available to forward to {0}")]
    NoDispatcher(String),
}

impl From<DispatchError> for WorkerError {
    fn from(err: DispatchError) -> Self {
        WorkerError::Dispatch(Box::new(err))
    }
}

/// Handler enchufable que escribe su respuesta en el contexto
pub trait Worker: Send + Sync {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError>;
}

/// Reenvía la petición a otro path usando el dispatcher del contexto.
///
/// El reenvío es interno, así que puede llegar a paths privados.
pub fn forward(context: &mut RequestContext<'_>, path: &str) -> Result<(), WorkerError> {
    let dispatcher = context
        .dispatcher()
        .ok_or_else(|| WorkerError::NoDispatcher(path.to_string()))?;
    dispatcher.forward(path, context)?;
    Ok(())
}

/// Registro nombre → worker
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    /// Registro vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro con los workers de demostración
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::workers::WorkerRegistry;
    ///
    /// let registry = WorkerRegistry::builtin();
    /// assert!(registry.get("HelloWorker").is_some());
    /// assert!(registry.get("NoExiste").is_none());
    /// ```
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("HelloWorker", HelloWorker);
        registry.register("EchoParams", EchoParams);
        registry.register("SumWorker", SumWorker);
        registry.register("BgColorWorker", BgColorWorker);
        registry.register("Home", Home);
        registry
    }

    /// Registra (o reemplaza) un worker con su nombre
    pub fn register<W: Worker + 'static>(&mut self, name: &str, worker: W) {
        self.workers.insert(name.to_string(), Arc::new(worker));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    /// Nombres registrados, ordenados
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
