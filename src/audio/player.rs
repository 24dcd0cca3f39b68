use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use super::output::{OutputContext, PlaybackError, Voice};
use super::processing;
use super::sample::AudioSample;
use super::timeline::Timeline;

/// Roughly display refresh cadence.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// One progress notification, pushed to the presentation layer on every tick
/// while playback is active.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackProgress {
    pub fraction: f64,
    pub position_secs: f64,
    pub is_active: bool,
}

/// Invoked from the controller and from the ticker thread, in one case while
/// the session lock is held; a sink must not call back into the controller.
pub type ProgressSink = Arc<dyn Fn(PlaybackProgress) + Send + Sync>;

struct Session {
    sample: Option<Arc<AudioSample>>,
    timeline: Timeline,
    voice: Option<Voice>,
    ticker: Option<TickerHandle>,
}

impl Session {
    fn idle() -> Self {
        Self {
            sample: None,
            timeline: Timeline::new(0.0),
            voice: None,
            ticker: None,
        }
    }
}

/// Transport controls over a single loaded sample: play, pause, reset, with
/// resumable offset tracking and push-style progress reporting. Owns the
/// output context for its whole lifetime; at most one voice and one progress
/// ticker exist at any time, enforced by tearing down before every start.
pub struct PlaybackController {
    output: OutputContext,
    volume: Arc<parking_lot::Mutex<f32>>,
    session: Arc<Mutex<Session>>,
    sink: ProgressSink,
}

impl PlaybackController {
    pub fn new(output: OutputContext, sink: ProgressSink) -> Self {
        Self {
            output,
            volume: Arc::new(parking_lot::Mutex::new(1.0)),
            session: Arc::new(Mutex::new(Session::idle())),
            sink,
        }
    }

    /// Adopt a freshly synthesized sample, replacing any previous one. The
    /// old session is fully reset first so no timing state leaks across
    /// samples. The buffer is resampled to the device rate here, once.
    pub fn load(&self, sample: AudioSample) -> Result<()> {
        let sample = processing::resample(&sample, self.output.sample_rate())?;
        tracing::info!(
            "Loaded sample: {:.1}s at {}Hz, {} channel(s)",
            sample.duration_secs(),
            sample.sample_rate(),
            sample.channels()
        );
        Self::adopt_sample(&self.session, &self.sink, sample);
        Ok(())
    }

    /// Start or resume playback from the stored offset. A no-op when no
    /// sample is loaded or playback is already active. Any stale voice and
    /// ticker are stopped first, so at most one stream is ever audible.
    pub fn play(&self) -> Result<(), PlaybackError> {
        let stale = {
            let mut session = self.session.lock().unwrap();
            if session.sample.is_none() {
                tracing::debug!("Play requested with no sample loaded");
                return Ok(());
            }
            if session.timeline.is_active() {
                return Ok(());
            }
            session.voice = None;
            session.ticker.take()
        };
        if let Some(ticker) = stale {
            ticker.stop();
        }

        let mut session = self.session.lock().unwrap();
        if session.timeline.is_active() {
            // Lost the race to a concurrent play
            return Ok(());
        }
        let sample = match session.sample.clone() {
            Some(sample) => sample,
            None => return Ok(()),
        };

        let now = Instant::now();
        let offset = session.timeline.position(now);
        let voice = self.output.start_voice(sample, offset, self.volume.clone())?;
        session.voice = Some(voice);
        session.timeline.begin(now);
        session.ticker = Some(TickerHandle::spawn(self.session.clone(), self.sink.clone()));

        tracing::info!("Playback started at {:.2}s", offset);
        Ok(())
    }

    /// Freeze the offset and stop rendering. The last published progress
    /// stays visible. A no-op when not active.
    pub fn pause(&self) {
        let ticker = {
            let mut session = self.session.lock().unwrap();
            if !session.timeline.is_active() {
                return;
            }
            session.timeline.pause(Instant::now());
            session.voice = None;
            session.ticker.take()
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }
        let offset = self.session.lock().unwrap().timeline.position(Instant::now());
        tracing::info!("Playback paused at {:.2}s", offset);
    }

    /// Stop rendering and force the offset and progress back to zero,
    /// whether or not the session was active.
    pub fn reset(&self) {
        Self::reset_session(&self.session, &self.sink);
    }

    fn reset_session(session: &Arc<Mutex<Session>>, sink: &ProgressSink) {
        let ticker = {
            let mut session = session.lock().unwrap();
            session.timeline.reset();
            session.voice = None;
            session.ticker.take()
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }
        sink(PlaybackProgress {
            fraction: 0.0,
            position_secs: 0.0,
            is_active: false,
        });
    }

    /// Reset first, then swap the sample in, so no voice, ticker, or timing
    /// state from the previous sample survives the replacement.
    fn adopt_sample(session: &Arc<Mutex<Session>>, sink: &ProgressSink, sample: AudioSample) {
        Self::reset_session(session, sink);
        let mut session = session.lock().unwrap();
        session.timeline = Timeline::new(sample.duration_secs());
        session.sample = Some(Arc::new(sample));
    }

    pub fn is_active(&self) -> bool {
        self.session.lock().unwrap().timeline.is_active()
    }

    pub fn has_sample(&self) -> bool {
        self.session.lock().unwrap().sample.is_some()
    }

    pub fn position_secs(&self) -> f64 {
        self.session.lock().unwrap().timeline.position(Instant::now())
    }

    pub fn progress(&self) -> f64 {
        self.session.lock().unwrap().timeline.progress(Instant::now())
    }

    pub fn duration_secs(&self) -> f64 {
        self.session.lock().unwrap().timeline.duration()
    }

    pub fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let ticker = self.session.lock().unwrap().ticker.take();
        if let Some(ticker) = ticker {
            ticker.stop();
        }
    }
}

/// The single handle that stops a progress loop: cancel flag plus the thread
/// it drives. Every teardown path takes the handle out of the session and
/// calls `stop`, so two overlapping loops cannot exist.
struct TickerHandle {
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TickerHandle {
    fn spawn(session: Arc<Mutex<Session>>, sink: ProgressSink) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let thread = std::thread::spawn(move || Self::run(session, sink, flag));
        Self {
            cancel,
            thread: Some(thread),
        }
    }

    fn stop(mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn run(session: Arc<Mutex<Session>>, sink: ProgressSink, cancel: Arc<AtomicBool>) {
        loop {
            if cancel.load(Ordering::SeqCst) {
                break;
            }

            let progress = {
                let mut session = session.lock().unwrap();
                if !session.timeline.is_active() {
                    break;
                }
                let now = Instant::now();
                if session.timeline.is_complete(now) {
                    let duration = session.timeline.duration();
                    // Natural completion: same teardown as pause, plus the
                    // offset clears so the next play starts from the top.
                    session.voice = None;
                    session.timeline.finish();
                    session.ticker = None;
                    // Published before the lock drops, so a racing play
                    // cannot slip a newer tick in ahead of this terminal one.
                    sink(PlaybackProgress {
                        fraction: 1.0,
                        position_secs: duration,
                        is_active: false,
                    });
                    break;
                }
                PlaybackProgress {
                    fraction: session.timeline.progress(now),
                    position_secs: session.timeline.position(now),
                    is_active: true,
                }
            };

            sink(progress);
            std::thread::sleep(TICK_INTERVAL);
        }
    }
}
