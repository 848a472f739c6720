//! # Smart HTTP Server
//! src/lib.rs
//!
//! Servidor HTTP concurrente que sirve archivos estáticos, ejecuta
//! plantillas SmartScript e invoca workers enchufables, con sesiones
//! basadas en cookies.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `config`: argumentos CLI y variables de entorno
//! - `http`: parsing de requests, contexto de respuesta, cookies y mime types
//! - `script`: lexer, parser y motor de ejecución de SmartScript
//! - `workers`: trait `Worker`, registro y workers de demostración
//! - `server`: acceptor TCP, pool de conexiones, sesiones y dispatch
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use smart_http_server::config::Config;
//! use smart_http_server::server::Server;
//! use smart_http_server::workers::WorkerRegistry;
//!
//! let config = Config::default();
//! let server = Server::new(config, WorkerRegistry::builtin()).expect("configuración inválida");
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod http;
pub mod script;
pub mod server;
pub mod workers;
