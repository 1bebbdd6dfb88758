//! A fixed-interval tick source on a dedicated thread.
//!
//! The engine itself never sleeps or spawns; hosts that have no frame loop of
//! their own can drive [`PlaybackFacade::tick`](crate::PlaybackFacade::tick)
//! from a `Ticker`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

pub struct Ticker {
    receiver: Receiver<Instant>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut next = Instant::now() + interval;
            while thread_running.load(Ordering::Relaxed) {
                let now = Instant::now();
                if next > now {
                    std::thread::sleep(next - now);
                }
                next += interval;

                if sender.send(Instant::now()).is_err() {
                    break;
                }
            }
            debug!("ticker stopped");
        });

        Self {
            receiver,
            running,
            handle: Some(handle),
        }
    }

    /// Blocks until the next tick. Returns `None` once the ticker thread is gone.
    pub fn recv(&self) -> Option<Instant> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Instant> {
        match self.receiver.recv_timeout(timeout) {
            Ok(instant) => Some(instant),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Collapses every tick queued so far into one, keeping the latest.
    pub fn try_recv_latest(&self) -> Option<Instant> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(instant) => latest = Some(instant),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Ticker;

    #[test]
    fn delivers_ticks_in_order() {
        let ticker = Ticker::spawn(Duration::from_millis(2));

        let first = ticker.recv().expect("first tick");
        let second = ticker.recv().expect("second tick");

        assert!(second >= first);
    }

    #[test]
    fn drop_stops_the_thread() {
        let ticker = Ticker::spawn(Duration::from_millis(1));
        ticker.recv_timeout(Duration::from_secs(1)).expect("tick");
        drop(ticker);
    }
}
