//! # Dispatch de Requests
//! src/server/dispatch.rs
//!
//! Decide qué produce la respuesta de un path, en este orden:
//!
//! 1. Normalización del path (`.` y `..`); salir del document root → 403
//! 2. Prefijo privado pedido directamente por el cliente → 404
//! 3. Prefijo dinámico (`/ext/Nombre`) → worker por nombre
//! 4. Tabla `path → worker` de la configuración
//! 5. Archivo con la extensión de script → parse + ejecución
//! 6. Cualquier otro archivo → contenido estático con su mime type
//!
//! El mismo dispatcher atiende los reenvíos internos de los workers
//! ([`Dispatcher::forward`]), que sí pueden llegar al área privada.

use super::ServerError;
use crate::config::Config;
use crate::http::context::ContextError;
use crate::http::{MimeTypes, RequestContext, StatusCode};
use crate::script::{FunctionTable, ParseError, ScriptEngine, ScriptError, ScriptParser};
use crate::workers::{WorkerError, WorkerRegistry};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Archivo que se sirve cuando el path apunta a un directorio
const DIRECTORY_INDEX: &str = "index.html";

/// Errores de dispatch
#[derive(Debug, Error)]
pub enum DispatchError {
    /// El path resuelve fuera del document root
    #[error("access outside document root: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("script parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl DispatchError {
    /// Status de la respuesta de error
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Forbidden(_) => StatusCode::Forbidden,
            DispatchError::NotFound(_) => StatusCode::NotFound,
            DispatchError::Worker(WorkerError::Dispatch(inner)) => inner.status(),
            _ => StatusCode::InternalServerError,
        }
    }
}

/// Capacidad de reenviar una petición a otro path
pub trait Dispatcher: Send + Sync {
    fn forward(&self, path: &str, context: &mut RequestContext<'_>) -> Result<(), DispatchError>;
}

/// Dispatcher del servidor
pub struct RequestDispatcher {
    /// Document root canónico
    document_root: PathBuf,
    script_extension: String,
    private_prefix: String,
    ext_prefix: String,
    workers: Arc<WorkerRegistry>,

    /// path → nombre del worker
    worker_paths: HashMap<String, String>,
    mime_types: MimeTypes,
    functions: FunctionTable,
}

impl RequestDispatcher {
    /// Construye el dispatcher a partir de la configuración.
    ///
    /// Falla si el document root no existe o si la tabla de workers nombra
    /// un worker que no está registrado.
    pub fn from_config(config: &Config, workers: Arc<WorkerRegistry>) -> Result<Self, ServerError> {
        let document_root =
            config
                .document_root
                .canonicalize()
                .map_err(|source| ServerError::DocumentRoot {
                    path: config.document_root.clone(),
                    source,
                })?;

        let mut worker_paths = HashMap::new();
        for (path, name) in config.worker_table().map_err(ServerError::Config)? {
            if !workers.contains(&name) {
                return Err(ServerError::UnknownWorker { path, name });
            }
            worker_paths.insert(path, name);
        }

        let mut mime_types = MimeTypes::new();
        for (extension, mime) in config.mime_overrides().map_err(ServerError::Config)? {
            mime_types.insert(&extension, &mime);
        }

        Ok(Self {
            document_root,
            script_extension: config.script_extension.trim_start_matches('.').to_string(),
            private_prefix: config.private_prefix.trim_end_matches('/').to_string(),
            ext_prefix: config.ext_prefix.trim_end_matches('/').to_string(),
            workers,
            worker_paths,
            mime_types,
            functions: FunctionTable::builtin(),
        })
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    /// Produce la respuesta de `path`.
    ///
    /// `direct` indica que el path viene del cliente; los reenvíos internos
    /// usan `false` y pueden llegar al prefijo privado.
    pub fn dispatch(
        &self,
        path: &str,
        context: &mut RequestContext<'_>,
        direct: bool,
    ) -> Result<(), DispatchError> {
        let segments = normalize(path)?;
        let url_path = format!("/{}", segments.join("/"));

        if direct && is_under(&url_path, &self.private_prefix) {
            debug!("Path privado pedido directamente: {}", url_path);
            return Err(DispatchError::NotFound(url_path));
        }

        if let Some(name) = strip_prefix(&url_path, &self.ext_prefix) {
            let worker = self
                .workers
                .get(name)
                .ok_or_else(|| DispatchError::NotFound(url_path.clone()))?;
            debug!("Dispatch {} → worker dinámico {}", url_path, name);
            worker.process(context)?;
            return Ok(());
        }

        if let Some(name) = self.worker_paths.get(&url_path) {
            let worker = self
                .workers
                .get(name)
                .ok_or_else(|| DispatchError::NotFound(url_path.clone()))?;
            debug!("Dispatch {} → worker {}", url_path, name);
            worker.process(context)?;
            return Ok(());
        }

        let file = self.resolve_file(&segments, &url_path)?;
        let is_script = file
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.script_extension);

        if is_script {
            debug!("Dispatch {} → script {}", url_path, file.display());
            self.execute_script(&file, &url_path, context)
        } else {
            debug!("Dispatch {} → archivo {}", url_path, file.display());
            self.serve_static(&file, &url_path, context)
        }
    }

    /// Ubica el archivo dentro del document root (siguiendo symlinks)
    fn resolve_file(&self, segments: &[&str], url_path: &str) -> Result<PathBuf, DispatchError> {
        let mut candidate = self.document_root.clone();
        candidate.extend(segments);

        let mut resolved = candidate
            .canonicalize()
            .map_err(|_| DispatchError::NotFound(url_path.to_string()))?;
        if !resolved.starts_with(&self.document_root) {
            return Err(DispatchError::Forbidden(url_path.to_string()));
        }

        if resolved.is_dir() {
            resolved.push(DIRECTORY_INDEX);
        }
        if !resolved.is_file() {
            return Err(DispatchError::NotFound(url_path.to_string()));
        }
        Ok(resolved)
    }

    fn execute_script(
        &self,
        file: &Path,
        url_path: &str,
        context: &mut RequestContext<'_>,
    ) -> Result<(), DispatchError> {
        let source =
            fs::read_to_string(file).map_err(|_| DispatchError::NotFound(url_path.to_string()))?;
        let document = ScriptParser::parse(&source)?;
        ScriptEngine::new(&self.functions).execute(&document, context)?;
        Ok(())
    }

    fn serve_static(
        &self,
        file: &Path,
        url_path: &str,
        context: &mut RequestContext<'_>,
    ) -> Result<(), DispatchError> {
        let content = fs::read(file).map_err(|_| DispatchError::NotFound(url_path.to_string()))?;
        let extension = file.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        context.set_mime_type(self.mime_types.lookup(extension))?;
        context.set_content_length(Some(content.len() as u64))?;
        context.write(&content)?;
        Ok(())
    }
}

impl Dispatcher for RequestDispatcher {
    fn forward(&self, path: &str, context: &mut RequestContext<'_>) -> Result<(), DispatchError> {
        self.dispatch(path, context, false)
    }
}

/// Resuelve `.` y `..` sin tocar el sistema de archivos.
///
/// Un `..` que sube por encima de la raíz es un intento de escape.
fn normalize(path: &str) -> Result<Vec<&str>, DispatchError> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(DispatchError::Forbidden(path.to_string()));
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments)
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix || strip_prefix(path, prefix).is_some()
}

/// "/ext/Nombre" con prefijo "/ext" → Some("Nombre")
fn strip_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    path.strip_prefix(prefix)?
        .strip_prefix('/')
        .filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::SharedParameters;
    use crate::workers::{Worker, WorkerError};
    use tempfile::TempDir;

    fn webroot() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>inicio</h1>").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(dir.path().join("datos.xyz"), "?").unwrap();
        fs::write(dir.path().join("suma.smscr"), "{$= 1 2 + $}").unwrap();
        fs::write(dir.path().join("roto.smscr"), "{$ FOR i 1 $}").unwrap();
        fs::create_dir_all(dir.path().join("private/pages")).unwrap();
        fs::write(dir.path().join("private/pages/secreto.smscr"), "{$= \"oculto\" $}").unwrap();
        dir
    }

    fn dispatcher(root: &Path) -> RequestDispatcher {
        let config = Config {
            document_root: root.to_path_buf(),
            ..Config::default()
        };
        RequestDispatcher::from_config(&config, Arc::new(WorkerRegistry::builtin())).unwrap()
    }

    fn run(dispatcher: &RequestDispatcher, path: &str, direct: bool) -> Result<String, DispatchError> {
        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, HashMap::new(), SharedParameters::default(), Vec::new());
            dispatcher.dispatch(path, &mut context, direct)?;
            context.write(b"")?;
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/./b/../c").unwrap(), vec!["a", "c"]);
        assert_eq!(normalize("/").unwrap(), Vec::<&str>::new());
        assert!(matches!(normalize("/../etc/passwd"), Err(DispatchError::Forbidden(_))));
        assert!(matches!(normalize("/a/../../x"), Err(DispatchError::Forbidden(_))));
    }

    #[test]
    fn test_prefix_helpers() {
        assert!(is_under("/private", "/private"));
        assert!(is_under("/private/pages/x", "/private"));
        assert!(!is_under("/privateer", "/private"));
        assert_eq!(strip_prefix("/ext/Home", "/ext"), Some("Home"));
        assert_eq!(strip_prefix("/ext", "/ext"), None);
        assert_eq!(strip_prefix("/extra/x", "/ext"), None);
    }

    #[test]
    fn test_static_file_with_length() {
        let root = webroot();
        let text = run(&dispatcher(root.path()), "/index.html", true).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=UTF-8\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.ends_with("<h1>inicio</h1>"));
    }

    #[test]
    fn test_mime_lookup() {
        let root = webroot();
        let dispatcher = dispatcher(root.path());

        assert!(run(&dispatcher, "/logo.png", true).unwrap().contains("Content-Type: image/png\r\n"));
        assert!(run(&dispatcher, "/datos.xyz", true)
            .unwrap()
            .contains("Content-Type: application/octet-stream\r\n"));
    }

    #[test]
    fn test_directory_serves_index() {
        let root = webroot();
        assert!(run(&dispatcher(root.path()), "/", true).unwrap().ends_with("<h1>inicio</h1>"));
    }

    #[test]
    fn test_script_execution() {
        let root = webroot();
        assert!(run(&dispatcher(root.path()), "/suma.smscr", true).unwrap().ends_with("\r\n\r\n3"));
    }

    #[test]
    fn test_broken_script_is_server_error() {
        let root = webroot();
        let err = run(&dispatcher(root.path()), "/roto.smscr", true).unwrap_err();
        assert!(matches!(err, DispatchError::Parse(_)));
        assert_eq!(err.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_traversal_forbidden() {
        let root = webroot();
        let err = run(&dispatcher(root.path()), "/../secret.txt", true).unwrap_err();
        assert_eq!(err.status(), StatusCode::Forbidden);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_forbidden() {
        let root = webroot();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("fuera.txt"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path().join("fuera.txt"), root.path().join("enlace.txt")).unwrap();

        let err = run(&dispatcher(root.path()), "/enlace.txt", true).unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
    }

    #[test]
    fn test_missing_file() {
        let root = webroot();
        let err = run(&dispatcher(root.path()), "/nada.html", true).unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_private_prefix_only_internal() {
        let root = webroot();
        let dispatcher = dispatcher(root.path());

        let err = run(&dispatcher, "/private/pages/secreto.smscr", true).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));

        let text = run(&dispatcher, "/private/pages/secreto.smscr", false).unwrap();
        assert!(text.ends_with("oculto"));
    }

    #[test]
    fn test_ext_prefix_worker() {
        let root = webroot();
        let dispatcher = dispatcher(root.path());

        assert!(run(&dispatcher, "/ext/HelloWorker", true).unwrap().contains("Hello!!!"));
        let err = run(&dispatcher, "/ext/NoExiste", true).unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_worker_table() {
        let root = webroot();
        let config = Config {
            document_root: root.path().to_path_buf(),
            worker_mappings: vec!["/saludo=HelloWorker".to_string()],
            ..Config::default()
        };
        let dispatcher = RequestDispatcher::from_config(&config, Arc::new(WorkerRegistry::builtin())).unwrap();

        assert!(run(&dispatcher, "/saludo", true).unwrap().contains("Hello!!!"));
    }

    #[test]
    fn test_unknown_worker_in_table() {
        let root = webroot();
        let config = Config {
            document_root: root.path().to_path_buf(),
            worker_mappings: vec!["/x=Fantasma".to_string()],
            ..Config::default()
        };
        let result = RequestDispatcher::from_config(&config, Arc::new(WorkerRegistry::builtin()));
        assert!(matches!(result, Err(ServerError::UnknownWorker { .. })));
    }

    #[test]
    fn test_missing_document_root() {
        let config = Config {
            document_root: PathBuf::from("/no/existe/para/nada"),
            ..Config::default()
        };
        let result = RequestDispatcher::from_config(&config, Arc::new(WorkerRegistry::new()));
        assert!(matches!(result, Err(ServerError::DocumentRoot { .. })));
    }

    struct Reenvia(&'static str);

    impl Worker for Reenvia {
        fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
            crate::workers::forward(context, self.0)
        }
    }

    #[test]
    fn test_forward_reaches_private_area() {
        let root = webroot();
        let config = Config {
            document_root: root.path().to_path_buf(),
            worker_mappings: Vec::new(),
            ..Config::default()
        };
        let mut registry = WorkerRegistry::new();
        registry.register("secreto", Reenvia("/private/pages/secreto.smscr"));
        registry.register("perdido", Reenvia("/private/no-existe.smscr"));
        let dispatcher = Arc::new(RequestDispatcher::from_config(&config, Arc::new(registry)).unwrap());

        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, HashMap::new(), SharedParameters::default(), Vec::new())
                    .with_dispatcher(dispatcher.clone());
            dispatcher.dispatch("/ext/secreto", &mut context, true).unwrap();
        }
        assert!(String::from_utf8(output).unwrap().ends_with("oculto"));

        let mut output = Vec::new();
        let mut context =
            RequestContext::new(&mut output, HashMap::new(), SharedParameters::default(), Vec::new())
                .with_dispatcher(dispatcher.clone());
        let err = dispatcher.dispatch("/ext/perdido", &mut context, true).unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
    }
}
