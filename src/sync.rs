use crate::state::ParticipantState;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use url::Url;

/// Debounce/coalesce state machine for remote saves.
///
/// A dirty mark arms a quiet-interval deadline, re-arming on every mark so
/// rapid changes collapse into one send. A deadline that comes due while a
/// send is in flight sets a single deferred flag; completing that send with
/// the flag set triggers exactly one follow-up. Suppression covers the
/// window in which a push snapshot is being applied, so remote state is
/// never echoed back to the endpoint it came from.
pub struct SaveScheduler {
    quiet: Duration,
    deadline: Option<Instant>,
    deferred: bool,
    suppressed: bool,
}

impl SaveScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            deferred: false,
            suppressed: false,
        }
    }

    /// Arm (or re-arm) the send deadline. No-op while suppressed.
    pub fn schedule(&mut self, now: Instant) {
        if self.suppressed {
            return;
        }
        self.deadline = Some(now + self.quiet);
    }

    /// Check whether a send should start. A due deadline while `inflight`
    /// defers instead, keeping at most one queued follow-up.
    pub fn poll(&mut self, now: Instant, inflight: bool) -> bool {
        if self.suppressed {
            return false;
        }
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                if inflight {
                    self.deferred = true;
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    /// Called when an in-flight send completes. Returns whether a deferred
    /// follow-up should start immediately.
    pub fn finish(&mut self) -> bool {
        std::mem::take(&mut self.deferred)
    }

    /// Drop the armed deadline and any deferred follow-up. Used when a
    /// remote snapshot replaces local state: the stale send must not
    /// overwrite it.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.deferred = false;
    }

    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub fn release(&mut self) {
        self.suppressed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some() || self.deferred
    }
}

/// Destination for full-state updates.
pub trait RemoteSink: Send + Sync {
    fn push_state(&self, state: &ParticipantState) -> Result<()>;
}

/// POSTs `{"participant": <state>}` to the tracker update endpoint.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    url: Url,
}

impl HttpSink {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid update url {url}"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("restream-tracker")
            .build()?;
        Ok(Self { client, url })
    }
}

impl RemoteSink for HttpSink {
    fn push_state(&self, state: &ParticipantState) -> Result<()> {
        let body = serde_json::to_string(&serde_json::json!({ "participant": state }))?;
        let response = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .context("send tracker update")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            bail!("update endpoint returned {status}: {text}");
        }
        Ok(())
    }
}

/// Bridges local state changes to a remote sink.
///
/// Sends run on a worker thread, fire-and-forget relative to the caller;
/// `tick` reaps completions and starts due or deferred sends with the state
/// current at that moment. Failures are logged, never retried on their own:
/// the next state change arms the next attempt.
pub struct RemoteBridge {
    sink: Option<Arc<dyn RemoteSink>>,
    can_edit: bool,
    scheduler: SaveScheduler,
    inflight: Option<JoinHandle<Result<()>>>,
}

impl RemoteBridge {
    pub fn new(sink: Option<Arc<dyn RemoteSink>>, can_edit: bool, quiet: Duration) -> Self {
        Self {
            sink,
            can_edit,
            scheduler: SaveScheduler::new(quiet),
            inflight: None,
        }
    }

    /// Record that local state changed. Viewers and sink-less instances
    /// never arm a send.
    pub fn mark_dirty(&mut self, now: Instant) {
        if self.sink.is_none() || !self.can_edit {
            return;
        }
        self.scheduler.schedule(now);
    }

    pub fn suppress(&mut self) {
        self.scheduler.suppress();
    }

    pub fn release(&mut self) {
        self.scheduler.release();
    }

    /// Drop any pending or deferred send. The in-flight one, if any, cannot
    /// be recalled; it completes without a follow-up.
    pub fn cancel_pending(&mut self) {
        self.scheduler.cancel();
    }

    /// Whether a send is armed, deferred or currently in flight.
    pub fn is_busy(&self) -> bool {
        self.scheduler.is_armed() || self.inflight.is_some()
    }

    /// Drive the bridge: reap a finished send (starting the deferred
    /// follow-up if one is queued), then start a due send.
    pub fn tick(&mut self, now: Instant, state: &ParticipantState) {
        if self
            .inflight
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(false)
        {
            if let Some(handle) = self.inflight.take() {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::warn!(error = %err, "tracker update failed"),
                    Err(_) => tracing::error!("tracker update worker panicked"),
                }
            }
            if self.scheduler.finish() {
                self.start_send(state);
            }
        }

        if self.scheduler.poll(now, self.inflight.is_some()) {
            self.start_send(state);
        }
    }

    fn start_send(&mut self, state: &ParticipantState) {
        let Some(sink) = &self.sink else {
            return;
        };
        let sink = Arc::clone(sink);
        let snapshot = state.clone();
        self.inflight = Some(std::thread::spawn(move || sink.push_state(&snapshot)));
    }
}
