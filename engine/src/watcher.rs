//! Presence watcher: a background thread that samples presence and keeps the
//! latest label readable without locking.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use thiserror::Error;

use pclock_core::PresenceTracker;
use pclock_types::PresenceLabel;

/// Upper bound on one sleep slice so `stop` is honoured promptly.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read presence file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse presence file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("presence source unavailable: {0}")]
    Unavailable(String),
}

/// Source of presence samples: display name to label.
///
/// A failed sample is treated like an empty one by the tracker.
pub trait PresenceSampler: Send {
    fn sample(&mut self) -> Result<HashMap<String, PresenceLabel>, SampleError>;
}

/// Reads a JSON object `{"name": "status", ...}` from a file on every poll.
///
/// Status strings go through [`PresenceLabel::parse_lenient`], so values like
/// `"Do Not Disturb"` or `"online (mobile)"` are accepted.
#[derive(Debug, Clone)]
pub struct JsonFileSampler {
    path: PathBuf,
}

impl JsonFileSampler {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl PresenceSampler for JsonFileSampler {
    fn sample(&mut self) -> Result<HashMap<String, PresenceLabel>, SampleError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SampleError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let raw: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|source| SampleError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(raw
            .into_iter()
            .map(|(name, status)| (name, PresenceLabel::parse_lenient(&status)))
            .collect())
    }
}

struct Shared {
    label: AtomicU8,
    stop: AtomicBool,
    poll_ms: AtomicU64,
    grace_ms: AtomicU64,
}

/// Owns the sampling thread. Dropping the watcher signals it to stop.
pub struct PresenceWatcher {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

impl PresenceWatcher {
    /// Start sampling for `target`. The label reads offline until the first
    /// sample lands.
    pub fn spawn(
        target: &str,
        sampler: Box<dyn PresenceSampler>,
        poll_interval: Duration,
        grace: Duration,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            label: AtomicU8::new(PresenceLabel::Offline.to_u8()),
            stop: AtomicBool::new(false),
            poll_ms: AtomicU64::new(duration_ms(poll_interval)),
            grace_ms: AtomicU64::new(duration_ms(grace)),
        });
        let tracker = PresenceTracker::new(target, grace);
        let thread_shared = Arc::clone(&shared);
        let join = std::thread::Builder::new()
            .name("pclock-presence".to_string())
            .spawn(move || watch_loop(&thread_shared, tracker, sampler))?;
        tracing::info!(watching = target, "Presence watcher started");
        Ok(Self {
            shared,
            join: Some(join),
        })
    }

    /// Latest stable label.
    #[must_use]
    pub fn label(&self) -> PresenceLabel {
        PresenceLabel::from_u8(self.shared.label.load(Ordering::Acquire))
    }

    pub fn set_poll_interval(&self, poll_interval: Duration) {
        self.shared
            .poll_ms
            .store(duration_ms(poll_interval), Ordering::Release);
    }

    pub fn set_grace(&self, grace: Duration) {
        self.shared.grace_ms.store(duration_ms(grace), Ordering::Release);
    }

    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::warn!("Presence watcher thread panicked");
        }
    }
}

impl Drop for PresenceWatcher {
    fn drop(&mut self) {
        // Do not block in Drop.
        self.stop();
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn watch_loop(
    shared: &Shared,
    mut tracker: PresenceTracker,
    mut sampler: Box<dyn PresenceSampler>,
) {
    let mut last_error: Option<String> = None;
    while !shared.stop.load(Ordering::Acquire) {
        tracker.set_grace(Duration::from_millis(shared.grace_ms.load(Ordering::Acquire)));

        let members = match sampler.sample() {
            Ok(members) => {
                last_error = None;
                members
            }
            Err(err) => {
                // Log each distinct failure once.
                let msg = err.to_string();
                if last_error.as_deref() != Some(msg.as_str()) {
                    tracing::warn!("Presence sample failed: {msg}");
                    last_error = Some(msg);
                }
                HashMap::new()
            }
        };

        let label = tracker.observe(Instant::now(), &members);
        shared.label.store(label.to_u8(), Ordering::Release);

        let poll = Duration::from_millis(shared.poll_ms.load(Ordering::Acquire));
        sleep_unless_stopped(shared, tracker.next_delay(poll));
    }
    tracing::debug!("Presence watcher stopped");
}

fn sleep_unless_stopped(shared: &Shared, delay: Duration) {
    let deadline = Instant::now() + delay;
    loop {
        if shared.stop.load(Ordering::Acquire) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(STOP_CHECK_SLICE));
    }
}
