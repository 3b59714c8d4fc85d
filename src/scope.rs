//! Display state for the waveform scope.
//!
//! Every parameter edit issues a new render request tagged with a
//! monotonically increasing generation. A finished render is applied only
//! when its generation is still the newest one issued; anything older is
//! dropped. All state changes happen on the thread that owns the scope, so
//! no locking is involved.
//!
//! The selection always refers to the sample currently shown and is
//! cleared whenever that sample is replaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, warn};

use crate::error::Result;
use crate::inspector;
use crate::params::SynthParameters;
use crate::sampler::{OfflineSampler, WaveformSample};

/// Identifies one render request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    pub generation: u64,
    pub params: SynthParameters,
}

/// What happened to a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Newest request; now on display.
    Applied,
    /// Superseded by a later request; discarded.
    Stale,
    /// Newest request, but rendering failed; the previous sample stays.
    Failed,
}

#[derive(Debug, Default)]
pub struct WaveformScope {
    latest: u64,
    current: Option<WaveformSample>,
    current_generation: u64,
    selection: Option<usize>,
}

impl WaveformScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request. Any request still in flight becomes stale.
    pub fn request(&mut self, params: SynthParameters) -> RenderTicket {
        self.latest += 1;
        debug!("render request gen={} {params:?}", self.latest);
        RenderTicket {
            generation: self.latest,
            params,
        }
    }

    /// Hand back a finished render.
    pub fn complete(&mut self, ticket: RenderTicket, result: Result<WaveformSample>) -> Completion {
        if ticket.generation != self.latest {
            debug!(
                "discarding stale render gen={} (latest {})",
                ticket.generation, self.latest
            );
            return Completion::Stale;
        }
        match result {
            Ok(sample) => {
                self.current = Some(sample);
                self.current_generation = ticket.generation;
                self.selection = None;
                Completion::Applied
            }
            Err(e) => {
                warn!("offline render gen={} failed: {e}", ticket.generation);
                Completion::Failed
            }
        }
    }

    /// Newest generation issued so far (0 before the first request).
    pub fn latest_generation(&self) -> u64 {
        self.latest
    }

    /// Generation of the sample on display (0 if nothing shown yet).
    pub fn current_generation(&self) -> u64 {
        self.current_generation
    }

    /// True while the newest request has not been applied.
    pub fn is_pending(&self) -> bool {
        self.current_generation != self.latest
    }

    pub fn current(&self) -> Option<&WaveformSample> {
        self.current.as_ref()
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Select a sample by index. Out-of-range indices, or nothing on
    /// display, clear the selection instead. Returns the new selection.
    pub fn select(&mut self, index: usize) -> Option<usize> {
        self.selection = match &self.current {
            Some(sample) if index < sample.len() => Some(index),
            _ => None,
        };
        self.selection
    }

    /// Select the sample nearest a horizontal pointer position given as a
    /// fraction of the display width.
    pub fn select_at(&mut self, fraction: f64) -> Option<usize> {
        let len = self.current.as_ref().map_or(0, WaveformSample::len);
        match inspector::nearest_index(fraction, len) {
            Some(index) => self.select(index),
            None => {
                self.selection = None;
                None
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}

/// Where offline renders run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// One long-lived background thread that skips superseded requests.
    Threaded,
    /// Render on the calling thread; for hosts without threads (wasm32).
    Inline,
}

type Finished = (RenderTicket, Result<WaveformSample>);

/// Runs offline renders and queues their results for the scope's thread.
#[derive(Debug)]
pub struct RenderWorker {
    sampler: OfflineSampler,
    mode: WorkerMode,
    /// Newest generation submitted; shared with the render thread.
    latest: Arc<AtomicU64>,
    jobs: Option<Sender<RenderTicket>>,
    tx: Sender<Finished>,
    rx: Receiver<Finished>,
}

impl RenderWorker {
    pub fn new(sampler: OfflineSampler, mode: WorkerMode) -> Self {
        let (tx, rx) = unbounded();
        let latest = Arc::new(AtomicU64::new(0));
        let mut worker = RenderWorker {
            sampler,
            mode: WorkerMode::Inline,
            latest,
            jobs: None,
            tx,
            rx,
        };
        if mode == WorkerMode::Threaded {
            worker.spawn_thread();
        }
        worker
    }

    fn spawn_thread(&mut self) {
        let (jobs_tx, jobs_rx) = unbounded();
        let sampler = self.sampler;
        let latest = Arc::clone(&self.latest);
        let done = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("waveform-render".into())
            .spawn(move || render_loop(sampler, &jobs_rx, &latest, &done));
        match spawned {
            Ok(_) => {
                self.jobs = Some(jobs_tx);
                self.mode = WorkerMode::Threaded;
            }
            Err(e) => warn!("render thread unavailable ({e}), rendering inline"),
        }
    }

    pub fn sampler(&self) -> &OfflineSampler {
        &self.sampler
    }

    /// Mode actually in use; `Inline` if the render thread could not start.
    pub fn mode(&self) -> WorkerMode {
        self.mode
    }

    /// Start rendering `ticket`. Never blocks on the render in threaded mode.
    /// Queued requests older than `ticket` are skipped without rendering.
    pub fn submit(&self, ticket: RenderTicket) {
        self.latest.fetch_max(ticket.generation, Ordering::AcqRel);

        if let Some(jobs) = &self.jobs {
            match jobs.send(ticket) {
                Ok(()) => return,
                Err(e) => warn!("render thread gone, rendering gen={} inline", e.0.generation),
            }
        }
        let result = self.sampler.sample(&ticket.params);
        let _ = self.tx.send((ticket, result));
    }

    /// Apply every finished render to `scope`. Returns true if the
    /// displayed sample changed.
    pub fn poll(&self, scope: &mut WaveformScope) -> bool {
        let mut changed = false;
        while let Ok((ticket, result)) = self.rx.try_recv() {
            changed |= scope.complete(ticket, result) == Completion::Applied;
        }
        changed
    }

    /// Block until the newest request has resolved (applied or failed), or
    /// `timeout` elapses. Returns true if the newest request was applied.
    pub fn wait_latest(&self, scope: &mut WaveformScope, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok((ticket, result)) => {
                    let latest = ticket.generation == scope.latest_generation();
                    match scope.complete(ticket, result) {
                        Completion::Applied => return true,
                        Completion::Failed if latest => return false,
                        _ => {}
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
    }
}

/// Body of the render thread. Exits once the worker drops its job sender
/// or the result receiver is gone.
fn render_loop(
    sampler: OfflineSampler,
    jobs: &Receiver<RenderTicket>,
    latest: &AtomicU64,
    done: &Sender<Finished>,
) {
    while let Ok(mut ticket) = jobs.recv() {
        // Only the newest queued request is worth rendering.
        while let Ok(next) = jobs.try_recv() {
            ticket = next;
        }
        if ticket.generation < latest.load(Ordering::Acquire) {
            debug!("skipping superseded render gen={}", ticket.generation);
            continue;
        }
        let result = sampler.sample(&ticket.params);
        if done.send((ticket, result)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormantError;
    use crate::sampler::Anchor;
    use std::time::Duration;

    fn fake_sample(params: SynthParameters, len: usize) -> WaveformSample {
        WaveformSample::new(vec![params.pitch as f32; len], params, Anchor::ZeroCrossing)
    }

    #[test]
    fn stale_result_never_applied() {
        let mut scope = WaveformScope::new();
        let slow = scope.request(SynthParameters::new(100.0, 730.0, 1090.0));
        let fast = scope.request(SynthParameters::new(200.0, 730.0, 1090.0));

        // Newer finishes first, older arrives late.
        assert_eq!(scope.complete(fast, Ok(fake_sample(fast.params, 20))), Completion::Applied);
        assert_eq!(scope.complete(slow, Ok(fake_sample(slow.params, 20))), Completion::Stale);
        assert_eq!(scope.current().unwrap().params().pitch, 200.0);
    }

    #[test]
    fn superseded_result_does_not_flash() {
        let mut scope = WaveformScope::new();
        let first = scope.request(SynthParameters::new(100.0, 730.0, 1090.0));
        let _second = scope.request(SynthParameters::new(200.0, 730.0, 1090.0));

        // The 100 Hz render lands before the 200 Hz one is done.
        assert_eq!(scope.complete(first, Ok(fake_sample(first.params, 20))), Completion::Stale);
        assert!(scope.current().is_none(), "stale 100 Hz window must not be shown");
        assert!(scope.is_pending());
    }

    #[test]
    fn failure_keeps_previous_sample() {
        let mut scope = WaveformScope::new();
        let ok = scope.request(SynthParameters::new(150.0, 730.0, 1090.0));
        scope.complete(ok, Ok(fake_sample(ok.params, 20)));
        scope.select(3);

        let bad = scope.request(SynthParameters::new(160.0, 730.0, 1090.0));
        let err = FormantError::RenderTooShort { needed: 10, available: 5 };
        assert_eq!(scope.complete(bad, Err(err)), Completion::Failed);
        assert_eq!(scope.current().unwrap().params().pitch, 150.0);
        assert_eq!(scope.selection(), Some(3));
    }

    #[test]
    fn nothing_shown_before_first_success() {
        let mut scope = WaveformScope::new();
        let bad = scope.request(SynthParameters::new(150.0, 730.0, 1090.0));
        let err = FormantError::RenderTooShort { needed: 10, available: 5 };
        scope.complete(bad, Err(err));
        assert!(scope.current().is_none());
    }

    #[test]
    fn replacement_clears_selection() {
        let mut scope = WaveformScope::new();
        let a = scope.request(SynthParameters::new(150.0, 730.0, 1090.0));
        scope.complete(a, Ok(fake_sample(a.params, 20)));
        assert_eq!(scope.select(7), Some(7));

        let b = scope.request(SynthParameters::new(151.0, 730.0, 1090.0));
        scope.complete(b, Ok(fake_sample(b.params, 20)));
        assert_eq!(scope.selection(), None);
    }

    #[test]
    fn selection_stays_in_range() {
        let mut scope = WaveformScope::new();
        assert_eq!(scope.select(0), None, "nothing to select before first sample");

        let a = scope.request(SynthParameters::new(150.0, 730.0, 1090.0));
        scope.complete(a, Ok(fake_sample(a.params, 20)));
        assert_eq!(scope.select(19), Some(19));
        assert_eq!(scope.select(20), None);
        assert_eq!(scope.select_at(0.5), Some(10));
        assert_eq!(scope.select_at(2.0), Some(19));
    }

    #[test]
    fn inline_worker_applies_latest_only() {
        let worker = RenderWorker::new(OfflineSampler::default(), WorkerMode::Inline);
        let mut scope = WaveformScope::new();
        let old = scope.request(SynthParameters::new(100.0, 730.0, 1090.0));
        let new = scope.request(SynthParameters::new(200.0, 730.0, 1090.0));
        worker.submit(old);
        worker.submit(new);
        assert!(worker.poll(&mut scope));
        assert_eq!(scope.current().unwrap().params().pitch, 200.0);
        assert!(!scope.is_pending());
    }

    #[test]
    fn threaded_worker_resolves_latest() {
        let worker = RenderWorker::new(OfflineSampler::default(), WorkerMode::Threaded);
        let mut scope = WaveformScope::new();
        for pitch in [100.0, 120.0, 140.0, 200.0] {
            let ticket = scope.request(SynthParameters::new(pitch, 730.0, 1090.0));
            worker.submit(ticket);
        }
        assert!(worker.wait_latest(&mut scope, Duration::from_secs(30)));
        assert_eq!(scope.current().unwrap().params().pitch, 200.0);
        assert_eq!(scope.current_generation(), 4);
        assert_eq!(worker.mode(), WorkerMode::Threaded);
    }

    #[test]
    fn queued_requests_collapse_to_newest() {
        let (jobs_tx, jobs_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let latest = AtomicU64::new(3);
        for generation in 1..=3 {
            let params = SynthParameters::new(100.0 + generation as f64, 730.0, 1090.0);
            jobs_tx.send(RenderTicket { generation, params }).unwrap();
        }
        drop(jobs_tx);

        render_loop(OfflineSampler::default(), &jobs_rx, &latest, &done_tx);

        let finished: Vec<u64> = done_rx.try_iter().map(|(t, _)| t.generation).collect();
        assert_eq!(finished, vec![3]);
    }

    #[test]
    fn superseded_request_is_not_rendered() {
        let (jobs_tx, jobs_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        // A newer request was submitted but has not reached the queue yet.
        let latest = AtomicU64::new(2);
        let params = SynthParameters::new(100.0, 730.0, 1090.0);
        jobs_tx.send(RenderTicket { generation: 1, params }).unwrap();
        drop(jobs_tx);

        render_loop(OfflineSampler::default(), &jobs_rx, &latest, &done_tx);

        assert!(done_rx.try_recv().is_err());
    }
}
