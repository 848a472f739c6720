//! # Pool de Workers
//! src/server/pool.rs
//!
//! Cola acotada de tareas + número fijo de threads que la consumen.
//!
//! ```text
//! acceptor ──submit──► [ TaskQueue (capacidad N) ] ──► http-worker-0
//!     │                                            ├─► http-worker-1
//!     └─ Err(Full) → 503                           └─► ...
//! ```
//!
//! Un panic dentro de una tarea se atrapa y se registra; el thread sigue
//! atendiendo la cola.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info};

/// Motivo por el que no se aceptó una tarea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("queue is full")]
    Full,

    #[error("pool is shut down")]
    Closed,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Cola FIFO thread-safe con capacidad máxima
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    condvar: Condvar,
    max_capacity: usize,
}

impl<T> TaskQueue<T> {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(max_capacity),
                closed: false,
            }),
            condvar: Condvar::new(),
            max_capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola sin bloquear; devuelve la tarea si no se pudo encolar
    pub fn push(&self, item: T) -> Result<(), (T, PoolError)> {
        let mut state = self.lock();
        if state.closed {
            return Err((item, PoolError::Closed));
        }
        if state.items.len() >= self.max_capacity {
            return Err((item, PoolError::Full));
        }
        state.items.push_back(item);
        self.condvar.notify_one();
        Ok(())
    }

    /// Bloquea hasta que haya una tarea; `None` cuando la cola está cerrada y vacía
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Deja de aceptar tareas; las pendientes se siguen entregando
    pub fn close(&self) {
        self.lock().closed = true;
        self.condvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handler que procesa cada tarea
pub type TaskHandler<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Pool fijo de threads sobre una [`TaskQueue`]
pub struct WorkerPool<T: Send + 'static> {
    queue: Arc<TaskQueue<T>>,
    threads: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(workers: usize, capacity: usize, handler: TaskHandler<T>) -> std::io::Result<Self> {
        let queue = Arc::new(TaskQueue::new(capacity));
        let mut threads = Vec::with_capacity(workers);

        for id in 0..workers {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            let handle = thread::Builder::new()
                .name(format!("http-worker-{}", id))
                .spawn(move || {
                    debug!("Worker {} iniciado", id);
                    while let Some(task) = queue.pop() {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(task)));
                        if result.is_err() {
                            error!("Worker {}: la tarea terminó con panic", id);
                        }
                    }
                    debug!("Worker {} detenido", id);
                })?;
            threads.push(handle);
        }

        info!("Pool iniciado: {} workers, cola de {}", workers, capacity);
        Ok(Self { queue, threads })
    }

    pub fn submit(&self, task: T) -> Result<(), (T, PoolError)> {
        self.queue.push(task)
    }

    /// Cierra la cola, deja terminar lo pendiente y espera a los threads
    pub fn shutdown(&mut self) {
        self.queue.close();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_queue_fifo_and_capacity() {
        let queue = TaskQueue::new(2);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.push(3), Err((3, PoolError::Full)));

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closed_queue_drains_then_ends() {
        let queue = TaskQueue::new(4);
        queue.push("a").unwrap();
        queue.close();

        assert_eq!(queue.push("b"), Err(("b", PoolError::Closed)));
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_pool_processes_all_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handler: TaskHandler<usize> = {
            let counter = Arc::clone(&counter);
            Arc::new(move |n: usize| {
                counter.fetch_add(n, Ordering::SeqCst);
            })
        };

        let mut pool = WorkerPool::new(3, 100, handler).unwrap();
        for n in 1..=10 {
            pool.submit(n).unwrap();
        }
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn test_pool_rejects_when_full() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let started_tx = Arc::new(Mutex::new(started_tx));

        let handler: TaskHandler<u8> = Arc::new(move |_: u8| {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv();
        });

        let mut pool = WorkerPool::new(1, 1, handler).unwrap();
        pool.submit(1).unwrap();
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        // El único worker está ocupado: cabe una tarea en la cola y nada más
        pool.submit(2).unwrap();
        assert_eq!(pool.submit(3), Err((3, PoolError::Full)));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        pool.shutdown();
    }

    #[test]
    fn test_panic_does_not_kill_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handler: TaskHandler<bool> = {
            let counter = Arc::clone(&counter);
            Arc::new(move |explode: bool| {
                if explode {
                    panic!("tarea rota");
                }
                counter.fetch_add(1, Ordering::SeqCst);
            })
        };

        let mut pool = WorkerPool::new(1, 10, handler).unwrap();
        pool.submit(true).unwrap();
        pool.submit(false).unwrap();
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
