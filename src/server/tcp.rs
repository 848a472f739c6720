//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread acceptor recibe las conexiones y las entrega al pool de
//! workers. Cada conexión sigue la misma secuencia:
//!
//! ```text
//! leer cabecera → parsear → resolver sesión → dispatch → flush → cerrar
//! ```
//!
//! Los errores que ocurren antes de enviar el header se responden con un
//! body JSON `{"error": "..."}` y su status; después del header solo se
//! registran.

use super::dispatch::RequestDispatcher;
use super::pool::{PoolError, TaskHandler, WorkerPool};
use super::session::{SessionStore, SessionSweeper, SESSION_COOKIE};
use super::ServerError;
use crate::config::Config;
use crate::http::context::{ContextError, SharedParameters};
use crate::http::{Cookie, Request, RequestContext, StatusCode};
use crate::workers::WorkerRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufWriter, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tamaño máximo de la cabecera de un request
const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Espera máxima por el request de un cliente que se va a rechazar
const BUSY_DRAIN_TIMEOUT: Duration = Duration::from_millis(50);

/// Estado compartido por todas las conexiones
struct ServerState {
    dispatcher: Arc<RequestDispatcher>,
    sessions: Arc<SessionStore>,

    /// Dominio de la cookie cuando el request no trae `Host`
    domain: String,
}

/// Servidor HTTP concurrente
pub struct Server {
    config: Config,
    state: Arc<ServerState>,
}

impl Server {
    /// Valida la configuración y prepara dispatcher y sesiones
    pub fn new(config: Config, workers: WorkerRegistry) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;

        let dispatcher = RequestDispatcher::from_config(&config, Arc::new(workers))?;
        let sessions = SessionStore::new(Duration::from_secs(config.session_timeout_secs));

        let state = ServerState {
            dispatcher: Arc::new(dispatcher),
            sessions: Arc::new(sessions),
            domain: config.domain.clone(),
        };

        Ok(Self {
            config,
            state: Arc::new(state),
        })
    }

    /// Sesiones del servidor (compartidas con el sweeper)
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.state.sessions)
    }

    /// Hace bind y arranca acceptor, pool y sweeper en segundo plano
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let address = self.config.address();
        info!("Iniciando servidor en {}", address);

        let listener = TcpListener::bind(&address)?;
        let local_addr = listener.local_addr()?;
        info!(
            "Servidor escuchando en {} (document root: {})",
            local_addr,
            self.state.dispatcher.document_root().display()
        );

        let sweeper = SessionSweeper::spawn(
            Arc::clone(&self.state.sessions),
            Duration::from_secs(self.config.sweep_interval_secs),
        )?;

        let handler: TaskHandler<TcpStream> = {
            let state = Arc::clone(&self.state);
            Arc::new(move |stream: TcpStream| {
                let peer = peer_name(&stream);
                if let Err(e) = handle_connection(stream, &state) {
                    warn!("Conexión {} terminó con error: {}", peer, e);
                }
            })
        };
        let pool = WorkerPool::new(self.config.workers, self.config.queue_capacity, handler)?;

        let stop = Arc::new(AtomicBool::new(false));
        let acceptor = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("http-acceptor".to_string())
                .spawn(move || accept_loop(listener, pool, sweeper, stop))?
        };

        Ok(ServerHandle {
            local_addr,
            stop,
            acceptor: Some(acceptor),
        })
    }

    /// Arranca el servidor y bloquea el thread actual
    pub fn run(self) -> Result<(), ServerError> {
        self.start()?.join();
        Ok(())
    }
}

/// Control de un servidor en ejecución
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Detiene el acceptor, vacía el pool y espera a que todo termine
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Espera a que el acceptor termine
    pub fn join(mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                error!("El thread acceptor terminó con panic");
            }
        }
    }

    fn shutdown(&mut self) {
        let Some(acceptor) = self.acceptor.take() else {
            return;
        };
        self.stop.store(true, Ordering::SeqCst);

        // Despertar el accept bloqueante con una conexión local
        let _ = TcpStream::connect_timeout(&wake_address(self.local_addr), Duration::from_secs(1));

        if acceptor.join().is_err() {
            error!("El thread acceptor terminó con panic");
        }
        info!("Servidor detenido");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: TcpListener,
    mut pool: WorkerPool<TcpStream>,
    sweeper: SessionSweeper,
    stop: Arc<AtomicBool>,
) {
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                debug!("Nueva conexión desde {}", peer_name(&stream));
                match pool.submit(stream) {
                    Ok(()) => {}
                    Err((stream, PoolError::Full)) => {
                        warn!("Cola llena, respondiendo 503 a {}", peer_name(&stream));
                        if let Err(e) = reject_busy(stream) {
                            debug!("No se pudo enviar 503: {}", e);
                        }
                    }
                    Err((_, PoolError::Closed)) => break,
                }
            }
            Err(e) => warn!("Error al aceptar conexión: {}", e),
        }
    }

    pool.shutdown();
    drop(sweeper);
}

/// Con un listener en 0.0.0.0 o [::] la conexión de aviso va a loopback
fn wake_address(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port()),
        _ => local,
    }
}

fn peer_name(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Lee hasta el final de la cabecera, EOF o el tamaño máximo
fn read_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::new();
    let mut buffer = [0u8; 4096];

    loop {
        let bytes_read = stream.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        head.extend_from_slice(&buffer[..bytes_read]);

        let complete = head.windows(4).any(|w| w == b"\r\n\r\n") || head.windows(2).any(|w| w == b"\n\n");
        if complete || head.len() >= MAX_HEAD_SIZE {
            break;
        }
    }

    Ok(head)
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) -> Result<(), ContextError> {
    let head = read_head(&mut stream)?;
    if head.is_empty() {
        debug!("Conexión cerrada sin datos");
        return Ok(());
    }

    let request = match Request::parse(&head) {
        Ok(request) => request,
        Err(e) => {
            info!("Request inválido: {}", e);
            let mut writer = BufWriter::new(&stream);
            let mut context = empty_context(&mut writer);
            respond_error(&mut context, e.status(), &e.to_string())?;
            context.flush()?;
            drop(context);
            writer.flush()?;
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(());
        }
    };

    info!("{} {} {}", request.method(), request.path(), request.version());

    let host = request.host().unwrap_or(state.domain.as_str()).to_string();
    let session = state.sessions.resolve(request.cookie(SESSION_COOKIE), &host);

    let mut cookies = Vec::new();
    if session.created {
        cookies.push(
            Cookie::new(SESSION_COOKIE, &session.sid)
                .with_domain(&host)
                .with_path("/")
                .with_http_only(true),
        );
    }

    let mut writer = BufWriter::new(&stream);
    {
        let mut context = RequestContext::new(
            &mut writer,
            request.query_params().clone(),
            session.parameters,
            cookies,
        )
        .with_version(request.version())
        .with_dispatcher(state.dispatcher.clone());

        match state.dispatcher.dispatch(request.path(), &mut context, true) {
            Ok(()) => {
                if !context.is_header_generated() {
                    context.write(b"")?;
                }
            }
            Err(e) if !context.is_header_generated() => {
                let status = e.status();
                if status.is_server_error() {
                    error!("{} {}: {}", status.as_u16(), request.path(), e);
                } else {
                    info!("{} {}: {}", status.as_u16(), request.path(), e);
                }
                respond_error(&mut context, status, &e.to_string())?;
            }
            Err(e) => {
                error!("Falla después de enviar el header en {}: {}", request.path(), e);
            }
        }
        context.flush()?;
    }
    writer.flush()?;
    drop(writer);

    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Contexto para respuestas que no vienen de un request válido
fn empty_context(output: &mut dyn Write) -> RequestContext<'_> {
    RequestContext::new(output, HashMap::new(), SharedParameters::default(), Vec::new())
}

/// Body JSON de las respuestas de error
#[derive(Serialize)]
struct ErrorBody<'m> {
    error: &'m str,
}

/// Respuesta de error con body JSON
fn respond_error(
    context: &mut RequestContext<'_>,
    status: StatusCode,
    message: &str,
) -> Result<(), ContextError> {
    let body = serde_json::to_string(&ErrorBody { error: message })
        .unwrap_or_else(|_| String::from("{}"));

    context.set_status_code(status.as_u16())?;
    context.set_status_text(status.reason_phrase())?;
    context.set_mime_type("application/json")?;
    context.set_content_length(Some(body.len() as u64))?;
    context.write(body.as_bytes())
}

/// 503 inmediato cuando la cola está llena
fn reject_busy(mut stream: TcpStream) -> Result<(), ContextError> {
    // Consumir lo que el cliente ya envió para que el cierre no sea un reset
    stream.set_read_timeout(Some(BUSY_DRAIN_TIMEOUT))?;
    let mut discard = [0u8; 4096];
    let _ = stream.read(&mut discard);

    let mut writer = BufWriter::new(&stream);
    {
        let mut context = empty_context(&mut writer);
        respond_error(&mut context, StatusCode::ServiceUnavailable, "server is busy")?;
    }
    writer.flush()?;
    drop(writer);
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}
