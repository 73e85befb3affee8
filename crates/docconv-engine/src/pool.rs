//! Bounded pool of conversion workers.
//!
//! At most `size` conversions run at once. Jobs beyond that queue in FIFO
//! order on a semaphore. Callers hold a [`PoolTicket`] and wait for it with
//! an upper bound; a job whose caller gives up is cancelled, including its
//! external process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docconv_common::{ConversionLog, Error, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::job::ConversionJob;
use crate::plan::Planner;
use crate::supervisor::Supervisor;

/// Pool sizing and wait bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum concurrent conversions (at least 1).
    pub size: usize,
    /// How long a caller waits for its job, queueing included.
    pub wait_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: 5,
            wait_timeout: Duration::from_secs(60),
        }
    }
}

/// Fixed-size conversion pool.
///
/// Cloning is cheap and clones share the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    wait_timeout: Duration,
    planner: Arc<Planner>,
    supervisor: Arc<Supervisor>,
    shutdown: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(settings: PoolSettings, planner: Planner, supervisor: Supervisor) -> Self {
        let size = settings.size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            wait_timeout: settings.wait_timeout,
            planner: Arc::new(planner),
            supervisor: Arc::new(supervisor),
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Conversions currently holding a worker.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Queue `job` for execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] once [`close`](Self::close) was called.
    pub fn submit(&self, job: ConversionJob) -> Result<PoolTicket> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(execute(
            job,
            Arc::clone(&self.permits),
            Arc::clone(&self.planner),
            Arc::clone(&self.supervisor),
            Arc::clone(&self.in_flight),
            cancel.clone(),
        ));

        Ok(PoolTicket {
            handle,
            guard: cancel.clone().drop_guard(),
            cancel,
            wait_timeout: self.wait_timeout,
        })
    }

    /// Stop accepting jobs and cancel everything queued or running.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("Closing worker pool ({} in flight)", self.in_flight());
        }
        self.permits.close();
        self.shutdown.cancel();
    }
}

async fn execute(
    job: ConversionJob,
    permits: Arc<Semaphore>,
    planner: Arc<Planner>,
    supervisor: Arc<Supervisor>,
    in_flight: Arc<AtomicUsize>,
    cancel: CancellationToken,
) -> Result<ConversionLog> {
    let _permit = tokio::select! {
        permit = permits.acquire_owned() => permit.map_err(|_| Error::PoolClosed)?,
        _ = cancel.cancelled() => return Err(Error::PoolClosed),
    };

    in_flight.fetch_add(1, Ordering::SeqCst);
    let _guard = InFlight(in_flight);

    let plan = planner.plan(&job);
    Ok(supervisor.run(&plan, &cancel).await)
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a submitted job.
///
/// Dropping the ticket without waiting cancels the job.
#[derive(Debug)]
pub struct PoolTicket {
    handle: JoinHandle<Result<ConversionLog>>,
    cancel: CancellationToken,
    guard: DropGuard,
    wait_timeout: Duration,
}

impl PoolTicket {
    /// Wait for the job, up to the pool's wait timeout.
    ///
    /// On timeout the job is cancelled and its process killed before
    /// [`Error::PoolTimeout`] is returned, so the workspace is no longer in
    /// use when this returns. Dropping the returned future early cancels the
    /// job as well.
    pub async fn wait(self) -> Result<ConversionLog> {
        let Self {
            mut handle,
            cancel,
            guard,
            wait_timeout,
        } = self;

        match tokio::time::timeout(wait_timeout, &mut handle).await {
            Ok(joined) => {
                let _ = guard.disarm();
                joined.map_err(|e| Error::internal(format!("worker failed: {e}")))?
            }
            Err(_) => {
                warn!(
                    "Conversion did not finish within {}s, cancelling",
                    wait_timeout.as_secs()
                );
                cancel.cancel();
                let _ = handle.await;
                drop(guard);
                Err(Error::PoolTimeout {
                    waited: wait_timeout,
                })
            }
        }
    }
}
