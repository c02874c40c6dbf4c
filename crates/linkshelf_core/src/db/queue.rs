//! Serialized access to the single SQLite connection.
//!
//! # Responsibility
//! - Own the one connection on a dedicated worker thread.
//! - Run submitted units of work one at a time, in submission order.
//! - Offer blocking, callback and handle-based submission, each with an
//!   optional transactional wrapper.
//!
//! # Invariants
//! - The connection never leaves the worker thread.
//! - Blocking and non-blocking submissions share one FIFO channel.
//! - Completions never run on the worker thread.
//! - A suspended queue still dequeues work, failing it with `Suspended`.
//! - Submitting from inside a running block is a caller defect and panics.
//! - A panicking block is re-raised on its blocking caller, or reported to
//!   its completion as `Panicked`; the worker survives.

use super::open::{open_connection, ConnectionTarget};
use super::{DbError, DbResult};
use crate::config::StoreConfig;
use log::{debug, error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

const WORKER_THREAD_NAME: &str = "linkshelf-db";
const DELIVERY_THREAD_NAME: &str = "linkshelf-delivery";

type Job = Box<dyn FnOnce(Result<&mut Connection, DbError>) + Send + 'static>;
type Delivery = Box<dyn FnOnce() + Send + 'static>;
type Outcome<T, E> = thread::Result<Result<T, E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecMode {
    Plain,
    Transaction,
}

/// Owner of the serialized execution context.
pub struct SerialQueue {
    jobs: Option<Sender<Job>>,
    deliveries: Option<Sender<Delivery>>,
    suspended: Arc<AtomicBool>,
    worker_id: ThreadId,
    delivery_id: ThreadId,
    worker: Option<JoinHandle<()>>,
    deliverer: Option<JoinHandle<()>>,
}

/// Handle to the result of a non-blocking submission.
///
/// The result is received on whichever thread calls [`Pending::wait`], never
/// on the worker thread.
#[must_use = "dropping a Pending discards the unit of work's result"]
pub struct Pending<T, E = DbError> {
    receiver: Receiver<Outcome<T, E>>,
}

impl<T, E: From<DbError>> Pending<T, E> {
    /// Blocks until the unit of work has run and returns its result.
    pub fn wait(self) -> Result<T, E> {
        match self.receiver.recv() {
            Ok(outcome) => unwrap_outcome(outcome),
            Err(_) => Err(E::from(DbError::Disconnected)),
        }
    }

    /// Returns the result if the unit of work has already finished.
    pub fn try_wait(&self) -> Option<Result<T, E>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(unwrap_outcome(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(E::from(DbError::Disconnected))),
        }
    }
}

impl SerialQueue {
    /// Opens the connection and starts the worker and delivery threads.
    pub fn open(target: &ConnectionTarget, config: &StoreConfig) -> DbResult<Self> {
        let conn = open_connection(target, config)?;
        Self::start(conn)
    }

    /// Starts a queue around an already configured connection.
    pub fn start(conn: Connection) -> DbResult<Self> {
        let suspended = Arc::new(AtomicBool::new(false));
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (delivery_tx, delivery_rx) = mpsc::channel::<Delivery>();

        let deliverer = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_string())
            .spawn(move || delivery_loop(delivery_rx))
            .map_err(DbError::WorkerSpawn)?;

        let worker_flag = Arc::clone(&suspended);
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(conn, job_rx, worker_flag))
            .map_err(DbError::WorkerSpawn)?;

        info!("event=queue_start module=queue status=ok");
        Ok(Self {
            jobs: Some(job_tx),
            deliveries: Some(delivery_tx),
            suspended,
            worker_id: worker.thread().id(),
            delivery_id: deliverer.thread().id(),
            worker: Some(worker),
            deliverer: Some(deliverer),
        })
    }

    /// Runs `block` with exclusive connection access and waits for its result.
    pub fn run_sync<T, E, F>(&self, block: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        self.dispatch(ExecMode::Plain, block).wait()
    }

    /// Like [`run_sync`](Self::run_sync), inside an immediate transaction.
    ///
    /// Commits when `block` returns `Ok`, rolls back when it returns `Err`.
    pub fn run_sync_in_transaction<T, E, F>(&self, block: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        self.dispatch(ExecMode::Transaction, block).wait()
    }

    /// Enqueues `block` and returns a handle for its result.
    pub fn submit<T, E, F>(&self, block: F) -> Pending<T, E>
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        self.dispatch(ExecMode::Plain, block)
    }

    pub fn submit_in_transaction<T, E, F>(&self, block: F) -> Pending<T, E>
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        self.dispatch(ExecMode::Transaction, block)
    }

    /// Enqueues `block`; `completion` receives its result on the delivery
    /// thread.
    pub fn run_async<T, E, F, C>(&self, block: F, completion: C)
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        C: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.dispatch_with_completion(ExecMode::Plain, block, completion);
    }

    pub fn run_async_in_transaction<T, E, F, C>(&self, block: F, completion: C)
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        C: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.dispatch_with_completion(ExecMode::Transaction, block, completion);
    }

    /// Makes every unit of work that starts from now on fail with `Suspended`.
    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
        info!("event=queue_suspend module=queue status=ok");
    }

    pub fn resume(&self) {
        self.suspended.store(false, Ordering::Release);
        info!("event=queue_resume module=queue status=ok");
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    fn dispatch<T, E, F>(&self, mode: ExecMode, block: F) -> Pending<T, E>
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        self.assert_not_reentrant();
        let (response_tx, response_rx) = mpsc::channel();
        self.enqueue(Box::new(move |conn| {
            let outcome = execute_guarded(conn, mode, block);
            // The caller may have dropped its handle; nothing left to notify.
            let _ = response_tx.send(outcome);
        }));
        Pending {
            receiver: response_rx,
        }
    }

    fn dispatch_with_completion<T, E, F, C>(&self, mode: ExecMode, block: F, completion: C)
    where
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        C: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.assert_not_reentrant();
        let Some(deliveries) = self.deliveries.clone() else {
            completion(Err(E::from(DbError::Disconnected)));
            return;
        };

        self.enqueue(Box::new(move |conn| {
            let delivery: Delivery = match execute_guarded(conn, mode, block) {
                Ok(result) => Box::new(move || completion(result)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("event=queue_block_panic module=queue status=error payload={message}");
                    Box::new(move || completion(Err(E::from(DbError::Panicked(message)))))
                }
            };
            if deliveries.send(delivery).is_err() {
                warn!("event=queue_delivery module=queue status=error error_code=delivery_closed");
            }
        }));
    }

    fn enqueue(&self, job: Job) {
        let Some(jobs) = self.jobs.as_ref() else {
            job(Err(DbError::Disconnected));
            return;
        };
        // On send failure the job comes back and reports the closed worker.
        if let Err(mpsc::SendError(job)) = jobs.send(job) {
            job(Err(DbError::Disconnected));
        }
    }

    fn assert_not_reentrant(&self) {
        assert!(
            thread::current().id() != self.worker_id,
            "re-entrant submission from inside a running unit of work would deadlock the serial queue"
        );
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.jobs.take();
        let current = thread::current().id();
        if let Some(worker) = self.worker.take() {
            if current != self.worker_id && worker.join().is_err() {
                error!("event=queue_stop module=queue status=error error_code=worker_panicked");
            }
        }
        self.deliveries.take();
        if let Some(deliverer) = self.deliverer.take() {
            if current != self.delivery_id && deliverer.join().is_err() {
                error!("event=queue_stop module=queue status=error error_code=delivery_panicked");
            }
        }
        info!("event=queue_stop module=queue status=ok");
    }
}

fn worker_loop(mut conn: Connection, jobs: Receiver<Job>, suspended: Arc<AtomicBool>) {
    while let Ok(job) = jobs.recv() {
        if suspended.load(Ordering::Acquire) {
            debug!("event=queue_job module=queue status=rejected reason=suspended");
            job(Err(DbError::Suspended));
        } else {
            job(Ok(&mut conn));
        }
    }

    if let Err((_, err)) = conn.close() {
        warn!("event=db_close module=db status=error error={err}");
    }
}

fn delivery_loop(deliveries: Receiver<Delivery>) {
    while let Ok(delivery) = deliveries.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(delivery)) {
            error!(
                "event=queue_delivery module=queue status=error error_code=completion_panicked payload={}",
                panic_message(payload.as_ref())
            );
        }
    }
}

fn execute_guarded<T, E, F>(
    conn: Result<&mut Connection, DbError>,
    mode: ExecMode,
    block: F,
) -> Outcome<T, E>
where
    E: From<DbError>,
    F: FnOnce(&Connection) -> Result<T, E>,
{
    panic::catch_unwind(AssertUnwindSafe(move || execute(conn, mode, block)))
}

fn execute<T, E, F>(conn: Result<&mut Connection, DbError>, mode: ExecMode, block: F) -> Result<T, E>
where
    E: From<DbError>,
    F: FnOnce(&Connection) -> Result<T, E>,
{
    let conn = conn.map_err(E::from)?;
    match mode {
        ExecMode::Plain => block(conn),
        ExecMode::Transaction => {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|err| E::from(DbError::from(err)))?;
            match block(&tx) {
                Ok(value) => {
                    tx.commit().map_err(|err| E::from(DbError::from(err)))?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!(
                            "event=queue_rollback module=queue status=error error={rollback_err}"
                        );
                    }
                    Err(err)
                }
            }
        }
    }
}

fn unwrap_outcome<T, E>(outcome: Outcome<T, E>) -> Result<T, E> {
    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::SerialQueue;
    use crate::db::DbError;
    use rusqlite::Connection;
    use std::sync::mpsc;
    use std::thread;

    fn queue() -> SerialQueue {
        SerialQueue::start(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn run_sync_executes_on_worker_thread() {
        let queue = queue();
        let name = queue
            .run_sync(|_conn| Ok::<_, DbError>(thread::current().name().map(str::to_string)))
            .unwrap();
        assert_eq!(name.as_deref(), Some("linkshelf-db"));
    }

    #[test]
    fn completion_runs_on_delivery_thread() {
        let queue = queue();
        let (tx, rx) = mpsc::channel();
        queue.run_async(
            |conn| {
                conn.query_row("SELECT 41 + 1", [], |row| row.get::<_, i64>(0))
                    .map_err(DbError::from)
            },
            move |result| {
                let thread_name = thread::current().name().map(str::to_string);
                tx.send((result.unwrap(), thread_name)).unwrap();
            },
        );

        let (value, thread_name) = rx.recv().unwrap();
        assert_eq!(value, 42);
        assert_eq!(thread_name.as_deref(), Some("linkshelf-delivery"));
    }

    #[test]
    fn panicking_block_is_reraised_and_worker_survives() {
        let queue = queue();
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            queue.run_sync(|_conn| -> Result<(), DbError> { panic!("boom") })
        }));
        assert!(caught.is_err());

        let value = queue
            .run_sync(|conn| {
                conn.query_row("SELECT 7", [], |row| row.get::<_, i64>(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn panicking_async_block_reports_to_completion() {
        let queue = queue();
        let (tx, rx) = mpsc::channel();
        queue.run_async(
            |_conn| -> Result<(), DbError> { panic!("boom") },
            move |result| {
                let thread_name = thread::current().name().map(str::to_string);
                tx.send((result, thread_name)).unwrap();
            },
        );

        let (result, thread_name) = rx.recv().unwrap();
        assert!(matches!(result, Err(DbError::Panicked(message)) if message == "boom"));
        assert_eq!(thread_name.as_deref(), Some("linkshelf-delivery"));
    }

    #[test]
    fn pending_try_wait_eventually_yields() {
        let queue = queue();
        let pending = queue.submit(|_conn| Ok::<_, DbError>(5_u8));
        loop {
            if let Some(result) = pending.try_wait() {
                assert_eq!(result.unwrap(), 5);
                break;
            }
            thread::yield_now();
        }
    }
}
