//! Small shared utilities: timestamps and worker-thread supervision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Wall-clock milliseconds since the Unix epoch.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Nanoseconds elapsed since `epoch`. Used for receive-time stamping in
/// the FIFO sequencer; only ordering matters, not the absolute value.
#[inline]
pub fn nanos_since(epoch: Instant) -> u64 {
    epoch.elapsed().as_nanos() as u64
}

/// A long-running busy-wait worker thread with cooperative shutdown.
///
/// Each pipeline component moves itself into a worker; [`Worker::stop`]
/// flips the shared running flag, waits briefly for in-flight messages to
/// drain, and joins the thread.
pub struct Worker {
    name: &'static str,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a named thread running `body`. The body is expected to loop
    /// while `running` holds true.
    pub fn spawn<F>(name: &'static str, running: Arc<AtomicBool>, body: F) -> Worker
    where
        F: FnOnce() + Send + 'static,
    {
        running.store(true, Ordering::Release);
        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .unwrap_or_else(|e| panic!("failed to spawn {name} thread: {e}"));
        info!(thread = name, "worker started");
        Worker { name, running, join: Some(join) }
    }

    /// True while the worker has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Requests shutdown, gives in-flight messages a moment to drain, and
    /// joins the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            self.running.store(false, Ordering::Release);
            std::thread::sleep(Duration::from_millis(50));
            if join.join().is_err() {
                warn!(thread = self.name, "worker panicked before shutdown");
            } else {
                info!(thread = self.name, "worker stopped");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
