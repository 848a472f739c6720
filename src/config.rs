//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./smart_http_server --port 8080 \
//!   --document-root ./webroot \
//!   --workers 8 \
//!   --worker /calc=SumWorker \
//!   --mime wasm=application/wasm
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 DOCUMENT_ROOT=/srv/www ./smart_http_server
//! ```
//!
//! Si se pasa algún `--worker`, la tabla por defecto se reemplaza completa.

use clap::Parser;
use std::path::PathBuf;

/// Tabla `path=worker` por defecto
const DEFAULT_WORKERS: [&str; 5] = [
    "/hello=HelloWorker",
    "/echo=EchoParams",
    "/calc=SumWorker",
    "/setbgcolor=BgColorWorker",
    "/index2.html=Home",
];

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "smart_http_server")]
#[command(about = "Servidor HTTP concurrente con sesiones, workers y SmartScript")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz de los archivos servidos
    #[arg(long = "document-root", default_value = "./webroot", env = "DOCUMENT_ROOT")]
    pub document_root: PathBuf,

    /// Dominio de la cookie de sesión cuando el request no trae `Host`
    #[arg(long, default_value = "localhost", env = "SERVER_DOMAIN")]
    pub domain: String,

    // === Workers ===

    /// Threads que atienden conexiones
    #[arg(long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Conexiones que pueden esperar en cola (llena → 503)
    #[arg(long = "queue-capacity", default_value = "64", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Sesiones ===

    /// Segundos de inactividad antes de que venza una sesión
    #[arg(long = "session-timeout", default_value = "600", env = "SESSION_TIMEOUT")]
    pub session_timeout_secs: u64,

    /// Segundos entre barridos de sesiones vencidas
    #[arg(long = "sweep-interval", default_value = "300", env = "SWEEP_INTERVAL")]
    pub sweep_interval_secs: u64,

    // === Dispatch ===

    /// Extensión de los archivos que se ejecutan como script
    #[arg(long = "script-extension", default_value = "smscr")]
    pub script_extension: String,

    /// Prefijo solo accesible por reenvío interno
    #[arg(long = "private-prefix", default_value = "/private")]
    pub private_prefix: String,

    /// Prefijo para invocar workers por nombre
    #[arg(long = "ext-prefix", default_value = "/ext")]
    pub ext_prefix: String,

    /// Asociación path → worker (repetible)
    #[arg(long = "worker", value_name = "PATH=NAME", default_values = DEFAULT_WORKERS)]
    pub worker_mappings: Vec<String>,

    /// Mime type adicional por extensión (repetible)
    #[arg(long = "mime", value_name = "EXT=TYPE")]
    pub mime_mappings: Vec<String>,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use smart_http_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tabla `path → nombre de worker`
    pub fn worker_table(&self) -> Result<Vec<(String, String)>, String> {
        self.worker_mappings
            .iter()
            .map(|entry| {
                let (path, name) = split_pair(entry, "--worker")?;
                if !path.starts_with('/') {
                    return Err(format!("--worker path must start with '/': {}", entry));
                }
                Ok((path, name))
            })
            .collect()
    }

    /// Pares `extensión → mime type` que se agregan a la tabla por defecto
    pub fn mime_overrides(&self) -> Result<Vec<(String, String)>, String> {
        self.mime_mappings
            .iter()
            .map(|entry| split_pair(entry, "--mime"))
            .collect()
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("Queue capacity must be >= 1".to_string());
        }

        if self.session_timeout_secs == 0 {
            return Err("Session timeout must be > 0".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("Sweep interval must be > 0".to_string());
        }

        if self.script_extension.trim_start_matches('.').is_empty() {
            return Err("Script extension must not be empty".to_string());
        }
        for (name, prefix) in [("Private", &self.private_prefix), ("Ext", &self.ext_prefix)] {
            if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
                return Err(format!("{} prefix must start with '/' and not be the root", name));
            }
        }

        self.worker_table()?;
        self.mime_overrides()?;

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║             SmartHttpServer Configuration                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:        {}", self.address());
        println!("   Domain:         {}", self.domain);
        println!("   Document root:  {}", self.document_root.display());
        println!();
        println!("👷 Connection Pool:");
        println!("   Workers:        {}", self.workers);
        println!("   Queue capacity: {} (503 when full)", self.queue_capacity);
        println!();
        println!("🍪 Sessions:");
        println!("   Timeout:        {} seconds", self.session_timeout_secs);
        println!("   Sweep every:    {} seconds", self.sweep_interval_secs);
        println!();
        println!("🧭 Dispatch:");
        println!("   Scripts:        *.{}", self.script_extension.trim_start_matches('.'));
        println!("   Private prefix: {}", self.private_prefix);
        println!("   Ext prefix:     {}/<Worker>", self.ext_prefix.trim_end_matches('/'));
        println!("   ┌──────────────────────────┬──────────────────────┐");
        println!("   │ Path                     │ Worker               │");
        println!("   ├──────────────────────────┼──────────────────────┤");
        for (path, name) in self.worker_table().unwrap_or_default() {
            println!("   │ {:<24} │ {:<20} │", path, name);
        }
        println!("   └──────────────────────────┴──────────────────────┘");
        for (ext, mime) in self.mime_overrides().unwrap_or_default() {
            println!("   Mime:           .{} → {}", ext, mime);
        }
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

/// "clave=valor" → ("clave", "valor"), ambos no vacíos
fn split_pair(entry: &str, flag: &str) -> Result<(String, String), String> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("{} expects KEY=VALUE, got '{}'", flag, entry)),
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            document_root: PathBuf::from("./webroot"),
            domain: "localhost".to_string(),
            workers: 4,
            queue_capacity: 64,
            session_timeout_secs: 600,
            sweep_interval_secs: 300,
            script_extension: "smscr".to_string(),
            private_prefix: "/private".to_string(),
            ext_prefix: "/ext".to_string(),
            worker_mappings: DEFAULT_WORKERS.iter().map(|s| s.to_string()).collect(),
            mime_mappings: Vec::new(),
        }
    }
}
