//! Worker pool for long-running offline operations.
//!
//! Spectral analysis and time-stretch rendering never touch the render
//! thread: jobs run on worker threads, carry a cancellation token, and
//! deliver results asynchronously. Submitting a new job for a source that
//! already has one in flight cancels the old job; its result, and any
//! result that arrives after being superseded, is discarded, so callers
//! only ever observe the newest request per source.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use tracing::{debug, info};

use pulso_analysis::{AnalysisReport, analyze};
use pulso_core::PcmBuffer;
use pulso_stretch::{QualityTier, StretchError, TimeStretcher};

/// Completed job output.
#[derive(Debug)]
pub enum JobOutput {
    /// An analysis finished (possibly with `analyzed: false`).
    Analysis(AnalysisReport),
    /// A stretch finished or failed with a specific reason.
    Stretch(Result<PcmBuffer, StretchError>),
}

/// A delivered result, tagged with its source identity.
#[derive(Debug)]
pub struct JobResult {
    /// Source identity the job was submitted under.
    pub source: String,
    /// The output.
    pub output: JobOutput,
}

struct ActiveJob {
    cancel: Arc<AtomicBool>,
    generation: u64,
}

struct Delivery {
    source: String,
    generation: u64,
    output: JobOutput,
}

/// Offline job pool with per-source supersession.
pub struct OfflinePool {
    results_tx: Sender<Delivery>,
    results_rx: Receiver<Delivery>,
    active: HashMap<String, ActiveJob>,
    next_generation: u64,
}

impl Default for OfflinePool {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflinePool {
    /// Create an empty pool. Threads are spawned per job.
    pub fn new() -> Self {
        let (results_tx, results_rx) = channel();
        Self {
            results_tx,
            results_rx,
            active: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Submit an analysis of `buffer` under a source identity.
    ///
    /// Cancels and supersedes any job already in flight for that source.
    pub fn submit_analysis(&mut self, source: impl Into<String>, buffer: PcmBuffer) {
        let source = source.into();
        let (cancel, generation) = self.register(&source);
        let tx = self.results_tx.clone();
        let thread_source = source.clone();

        thread::spawn(move || {
            // Analysis is not incrementally cancellable; a cancelled job
            // simply has its result dropped on delivery.
            let report = if cancel.load(Ordering::Relaxed) {
                AnalysisReport::failed("cancelled")
            } else {
                analyze(&buffer)
            };
            let _ = tx.send(Delivery {
                source: thread_source,
                generation,
                output: JobOutput::Analysis(report),
            });
        });
        debug!(source, "analysis job submitted");
    }

    /// Submit a stretch/shift render of `buffer` under a source identity.
    pub fn submit_stretch(
        &mut self,
        source: impl Into<String>,
        buffer: PcmBuffer,
        stretch_ratio: f32,
        pitch_ratio: f32,
        quality: QualityTier,
    ) {
        let source = source.into();
        let (cancel, generation) = self.register(&source);
        let tx = self.results_tx.clone();
        let thread_source = source.clone();

        thread::spawn(move || {
            let mut stretcher = TimeStretcher::with_quality(buffer.sample_rate, quality);
            let result = (|| -> Result<PcmBuffer, StretchError> {
                let mut channels = Vec::with_capacity(buffer.channel_count());
                for channel in &buffer.channels {
                    channels.push(stretcher.process_cancellable(
                        channel,
                        stretch_ratio,
                        pitch_ratio,
                        &cancel,
                    )?);
                }
                Ok(PcmBuffer::new(buffer.sample_rate, channels))
            })();
            let _ = tx.send(Delivery {
                source: thread_source,
                generation,
                output: JobOutput::Stretch(result),
            });
        });
        debug!(source, stretch_ratio, pitch_ratio, "stretch job submitted");
    }

    /// Cancel the in-flight job for a source, if any.
    pub fn cancel(&mut self, source: &str) -> bool {
        if let Some(job) = self.active.remove(source) {
            job.cancel.store(true, Ordering::Relaxed);
            info!(source, "job cancelled");
            true
        } else {
            false
        }
    }

    /// Number of jobs believed in flight.
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Collect finished results, discarding superseded or cancelled ones.
    pub fn poll(&mut self) -> Vec<JobResult> {
        let mut results = Vec::new();
        while let Ok(delivery) = self.results_rx.try_recv() {
            let current = self.active.get(&delivery.source).map(|j| j.generation);
            if current == Some(delivery.generation) {
                self.active.remove(&delivery.source);
                results.push(JobResult {
                    source: delivery.source,
                    output: delivery.output,
                });
            } else {
                debug!(source = delivery.source, "superseded result discarded");
            }
        }
        results
    }

    /// Block until the current job for `source` delivers, then return its
    /// result. Superseded deliveries for other generations are discarded.
    pub fn wait_for(&mut self, source: &str) -> Option<JobResult> {
        let expected = self.active.get(source)?.generation;
        while let Ok(delivery) = self.results_rx.recv() {
            let matches = delivery.source == source && delivery.generation == expected;
            if matches {
                self.active.remove(source);
                return Some(JobResult {
                    source: delivery.source,
                    output: delivery.output,
                });
            }
            // A result for some other source: keep it deliverable via poll.
            let current = self.active.get(&delivery.source).map(|j| j.generation);
            if current == Some(delivery.generation) {
                self.active.remove(&delivery.source);
                return Some(JobResult {
                    source: delivery.source,
                    output: delivery.output,
                });
            }
        }
        None
    }

    fn register(&mut self, source: &str) -> (Arc<AtomicBool>, u64) {
        // Latest wins: cancel whatever was running for this source.
        if let Some(previous) = self.active.get(source) {
            previous.cancel.store(true, Ordering::Relaxed);
        }
        let cancel = Arc::new(AtomicBool::new(false));
        let generation = self.next_generation;
        self.next_generation += 1;
        self.active.insert(
            source.to_string(),
            ActiveJob {
                cancel: Arc::clone(&cancel),
                generation,
            },
        );
        (cancel, generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn short_buffer() -> PcmBuffer {
        let samples: Vec<f32> = (0..44100).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        PcmBuffer::mono(44100.0, samples)
    }

    #[test]
    fn analysis_job_delivers() {
        let mut pool = OfflinePool::new();
        pool.submit_analysis("track-1", short_buffer());
        let result = pool.wait_for("track-1").expect("delivery");
        assert_eq!(result.source, "track-1");
        match result.output {
            JobOutput::Analysis(report) => assert!(report.analyzed),
            JobOutput::Stretch(_) => panic!("wrong output kind"),
        }
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn stretch_job_delivers() {
        let mut pool = OfflinePool::new();
        pool.submit_stretch("track-2", short_buffer(), 1.5, 1.0, QualityTier::Low);
        let result = pool.wait_for("track-2").expect("delivery");
        match result.output {
            JobOutput::Stretch(Ok(buffer)) => {
                assert_eq!(buffer.len(), (44100.0f32 * 1.5).ceil() as usize);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn resubmission_supersedes() {
        let mut pool = OfflinePool::new();
        pool.submit_analysis("track-3", short_buffer());
        pool.submit_analysis("track-3", short_buffer());
        // Exactly one result survives; the superseded one is discarded.
        let result = pool.wait_for("track-3").expect("delivery");
        assert_eq!(result.source, "track-3");

        // Let the superseded thread deliver, then confirm poll drops it.
        std::thread::sleep(Duration::from_millis(400));
        assert!(pool.poll().is_empty());
    }

    #[test]
    fn cancelled_job_result_is_discarded() {
        let mut pool = OfflinePool::new();
        pool.submit_stretch("track-4", short_buffer(), 2.0, 1.0, QualityTier::Low);
        assert!(pool.cancel("track-4"));
        assert!(!pool.cancel("track-4"));

        std::thread::sleep(Duration::from_millis(600));
        assert!(pool.poll().is_empty());
    }
}
