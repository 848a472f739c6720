//! # Sesiones
//! src/server/session.rs
//!
//! Cada cliente se identifica con la cookie `sid`. La sesión guarda los
//! parámetros persistentes y vence si no se usa durante `timeout`.
//!
//! ## Resolución
//!
//! ```text
//! sid recibido ──► ¿existe, no vencida y del mismo host? ──sí──► renovar
//!                                   │
//!                                   no
//!                                   ▼
//!                      crear sesión nueva (sid nuevo)
//! ```
//!
//! Toda la resolución ocurre con el lock del mapa tomado; el barrido
//! periódico ([`SessionSweeper`]) usa el mismo lock.

use crate::http::context::SharedParameters;
use rand::Rng;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Nombre de la cookie de sesión
pub const SESSION_COOKIE: &str = "sid";

/// Largo del identificador de sesión
pub const SID_LENGTH: usize = 20;

/// Genera un identificador de 20 letras mayúsculas
pub fn generate_sid() -> String {
    let mut rng = rand::thread_rng();
    (0..SID_LENGTH)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect()
}

/// Una sesión activa
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub sid: String,
    pub host: String,
    pub valid_until: Instant,
    pub parameters: SharedParameters,
}

/// Resultado de resolver la sesión de una petición
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub sid: String,
    pub parameters: SharedParameters,

    /// La sesión es nueva y hay que enviar la cookie
    pub created: bool,
}

/// Mapa de sesiones compartido entre conexiones
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renueva la sesión `sid` o crea una nueva.
    ///
    /// Una sesión vencida o de otro host se descarta y se reemplaza.
    pub fn resolve(&self, sid: Option<&str>, host: &str) -> ResolvedSession {
        let now = Instant::now();
        let mut sessions = self.lock();

        if let Some(sid) = sid {
            match sessions.get_mut(sid) {
                Some(entry) if entry.host == host && entry.valid_until > now => {
                    entry.valid_until = now + self.timeout;
                    debug!("Sesión {} renovada", sid);
                    return ResolvedSession {
                        sid: entry.sid.clone(),
                        parameters: entry.parameters.clone(),
                        created: false,
                    };
                }
                Some(_) => {
                    sessions.remove(sid);
                    debug!("Sesión {} descartada (vencida u otro host)", sid);
                }
                None => {}
            }
        }

        let mut sid = generate_sid();
        while sessions.contains_key(&sid) {
            sid = generate_sid();
        }

        let entry = SessionEntry {
            sid: sid.clone(),
            host: host.to_string(),
            valid_until: now + self.timeout,
            parameters: SharedParameters::default(),
        };
        let parameters = entry.parameters.clone();
        sessions.insert(sid.clone(), entry);
        debug!("Sesión {} creada para host {}", sid, host);

        ResolvedSession {
            sid,
            parameters,
            created: true,
        }
    }

    /// Elimina las sesiones vencidas; retorna cuántas se eliminaron
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.valid_until > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.lock().contains_key(sid)
    }
}

/// Thread que barre las sesiones vencidas cada `interval`.
///
/// Se detiene al hacer drop (se cierra el canal y se hace join).
pub struct SessionSweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionSweeper {
    pub fn spawn(store: Arc<SessionStore>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("session-sweeper".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = store.sweep();
                        if removed > 0 {
                            info!("Barrido de sesiones: {} eliminadas", removed);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl Drop for SessionSweeper {
    fn drop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
