//! # Smart HTTP Server - Entry Point
//! src/main.rs
//!
//! Lee la configuración (CLI + entorno), instala el logging y arranca el
//! servidor. El nivel de log se controla con `RUST_LOG` (por defecto `info`).

use smart_http_server::config::Config;
use smart_http_server::server::Server;
use smart_http_server::workers::WorkerRegistry;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let config = Config::new();

    if let Err(e) = config.validate() {
        error!("Configuración inválida: {}", e);
        std::process::exit(2);
    }
    config.print_summary();

    let server = match Server::new(config, WorkerRegistry::builtin()) {
        Ok(server) => server,
        Err(e) => {
            error!("No se pudo crear el servidor: {}", e);
            std::process::exit(1);
        }
    };

    // Bloquea el thread principal
    if let Err(e) = server.run() {
        error!("Error fatal: {}", e);
        std::process::exit(1);
    }
}
