//! Receiver Handle - fixed-rate runtime around the receiver pipeline
//!
//! Moves a [`Receiver`] onto its own tokio task and clocks it at the
//! configured loop rate. Other tasks never touch the pipeline; they only see
//! copies through a `watch` channel (latest snapshot) and an `mpsc` channel
//! (stick events).
//!
//! ```text
//! interval tick ──► Receiver::update ──► ReceiverOutput ─[watch]→ consumers
//!                         │
//!                         └─ changed() ──► StickEvent ─[mpsc]→ mode manager
//! ```

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pipeline::Receiver;
use super::shaper::CommandFrame;
use super::source::ChannelSource;
use super::sticks::StickCombination;
use crate::config::{ConfigError, RuntimeSettings};

/// Snapshot of one pipeline cycle, published after every tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReceiverOutput {
    pub frame: CommandFrame,
    pub combination: StickCombination,
    /// True on the single cycle the combination stabilized
    pub stick_event: bool,
    pub throttle_down: bool,
    pub lost_signal: bool,
    /// Cycles run so far, starting at 1
    pub cycle: u64,
}

/// A stick combination held long enough to act on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StickEvent {
    pub combination: StickCombination,
    pub cycle: u64,
}

/// Errors from starting or joining the receiver task
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The runtime settings were rejected before the task was spawned
    #[error("Invalid runtime settings: {0}")]
    Config(#[from] ConfigError),

    /// The task panicked or was aborted
    ///
    /// Carries the join error message.
    #[error("Receiver task failed: {0}")]
    TaskFailed(String),
}

/// Handle to a running receiver task
///
/// # Examples
///
/// ```rust
/// use rc_receiver::receiver::{Receiver, ReceiverHandle, StaticSource};
/// use rc_receiver::ReceiverConfig;
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let receiver = Receiver::new(StaticSource::<5>::new(true), ReceiverConfig::default());
/// let (events, _event_rx) = mpsc::channel(16);
/// let handle = ReceiverHandle::spawn(receiver, None, events).unwrap();
///
/// let outputs = handle.subscribe();
/// # drop(outputs);
/// handle.shutdown();
/// handle.join().await.unwrap();
/// # }
/// ```
pub struct ReceiverHandle {
    state_receiver: watch::Receiver<ReceiverOutput>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    /// Spawn the receiver loop.
    ///
    /// Must be called from within a tokio runtime. Stick events go to
    /// `event_sender` with `try_send`; a full channel drops the event rather
    /// than stalling the loop.
    pub fn spawn<S, const N: usize>(
        receiver: Receiver<S, N>,
        settings: Option<RuntimeSettings>,
        event_sender: mpsc::Sender<StickEvent>,
    ) -> Result<Self, RuntimeError>
    where
        S: ChannelSource + Send + 'static,
    {
        let settings = settings.unwrap_or_default();
        settings.validate()?;
        info!("Initializing receiver runtime with settings: {:?}", settings);

        let (state_sender, state_receiver) = watch::channel(ReceiverOutput::default());
        debug!("Created watch channel for receiver output");

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            info!("Receiver task started");
            run_receiver_loop(receiver, settings, state_sender, event_sender, loop_cancel).await;
            info!("Receiver task finished");
        });

        Ok(Self {
            state_receiver,
            cancel,
            task,
        })
    }

    /// Get a receiver for the per-cycle snapshots
    pub fn subscribe(&self) -> watch::Receiver<ReceiverOutput> {
        debug!("New subscriber to receiver output");
        self.state_receiver.clone()
    }

    /// Most recent snapshot
    pub fn latest(&self) -> ReceiverOutput {
        *self.state_receiver.borrow()
    }

    /// Token that stops the loop when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the loop to stop after the cycle in progress
    pub fn shutdown(&self) {
        info!("Receiver shutdown requested");
        self.cancel.cancel();
    }

    /// Wait for the task to finish
    pub async fn join(self) -> Result<(), RuntimeError> {
        self.task.await.map_err(|e| {
            error!("Receiver task terminated abnormally: {}", e);
            RuntimeError::TaskFailed(e.to_string())
        })
    }
}

async fn run_receiver_loop<S: ChannelSource, const N: usize>(
    mut receiver: Receiver<S, N>,
    settings: RuntimeSettings,
    state_sender: watch::Sender<ReceiverOutput>,
    event_sender: mpsc::Sender<StickEvent>,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs_f64(1.0 / f64::from(settings.loop_rate_hz));
    info!(
        "Starting receiver loop at {} Hz ({:?} period)",
        settings.loop_rate_hz, period
    );

    let mut interval_timer = tokio::time::interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Stats for performance monitoring
    let stats_interval = Duration::from_secs(settings.stats_interval_s.max(1));
    let mut last_stats_time = Instant::now();
    let mut stats_cycles: u64 = 0;
    let mut stats_events: u64 = 0;
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Receiver loop cancelled after {} cycles", cycle);
                break;
            }
            _ = interval_timer.tick() => {}
        }

        cycle += 1;
        receiver.update();
        let stick_event = receiver.changed();

        let output = ReceiverOutput {
            frame: receiver.compute_expo(),
            combination: receiver.stick_combination(),
            stick_event,
            throttle_down: receiver.throttle_is_down(),
            lost_signal: receiver.lost_signal(),
            cycle,
        };

        if stick_event {
            stats_events += 1;
            let event = StickEvent {
                combination: output.combination,
                cycle,
            };
            match event_sender.try_send(event) {
                Ok(()) => info!(
                    "Stick combination {} held, event sent at cycle {}",
                    event.combination, cycle
                ),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Stick event channel full, dropping event {:?}", event)
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("No stick event listener, dropping event {:?}", event)
                }
            }
        }

        state_sender.send_replace(output);
        stats_cycles += 1;

        let now = Instant::now();
        if now - last_stats_time >= stats_interval {
            let elapsed = (now - last_stats_time).as_secs_f64();
            info!(
                "Receiver stats: {} cycles, {} stick events in {:.1} s ({:.1} cycles/sec)",
                stats_cycles,
                stats_events,
                elapsed,
                stats_cycles as f64 / elapsed
            );
            stats_cycles = 0;
            stats_events = 0;
            last_stats_time = now;
        }
    }
}
