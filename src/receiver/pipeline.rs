//! Per-cycle receiver pipeline

use tracing::{debug, info, trace};

use super::sampler::ChannelSampler;
use super::shaper::{self, AuxState, CommandFrame, CommandShaper};
use super::source::ChannelSource;
use super::sticks::{StickCombination, StickStateMachine};
use super::{ChannelRole, CHANNEL_COUNT, DEMAND_COUNT};
use crate::config::ReceiverConfig;

/// RC receiver: sampling, stick-combination debounce and command shaping.
///
/// Call [`update`](Self::update) once per control-loop tick, then read
/// [`changed`](Self::changed) and [`compute_expo`](Self::compute_expo) for
/// that cycle. The per-cycle methods never allocate or block.
///
/// `N` is the number of channels read per cycle and must be at least
/// [`CHANNEL_COUNT`].
#[derive(Debug)]
pub struct Receiver<S: ChannelSource, const N: usize = CHANNEL_COUNT> {
    source: S,
    config: ReceiverConfig,
    sampler: ChannelSampler<N>,
    sticks: StickStateMachine,
    shaper: CommandShaper,
}

impl<S: ChannelSource> Receiver<S> {
    /// Initialize the source hardware and take a copy of the configuration
    pub fn new(source: S, config: ReceiverConfig) -> Self {
        Self::with_channel_count(source, config)
    }
}

impl<S: ChannelSource, const N: usize> Receiver<S, N> {
    const ENOUGH_CHANNELS: () = assert!(
        N >= CHANNEL_COUNT,
        "receiver needs at least the five standard channels"
    );

    /// Like [`new`](Receiver::new) but reading `N` channels per cycle
    pub fn with_channel_count(mut source: S, config: ReceiverConfig) -> Self {
        let () = Self::ENOUGH_CHANNELS;

        source.begin();
        info!(
            "Receiver initialized with {} channels ({} mode): {:?}",
            N,
            if source.provides_filtered_data() {
                "direct"
            } else {
                "filtered"
            },
            config
        );

        Self {
            source,
            config,
            sampler: ChannelSampler::new(),
            sticks: StickStateMachine::new(config.margin),
            shaper: CommandShaper::new(&config),
        }
    }

    /// Sample every channel and advance the stick debounce by one cycle
    pub fn update(&mut self) {
        let values = self.sampler.update(&mut self.source);
        self.sticks.update(&values[..DEMAND_COUNT]);
        trace!(
            "Receiver cycle: raw={:?} sticks={} stable={}",
            values,
            self.sticks.combination(),
            self.sticks.stable_cycles()
        );
    }

    /// One-shot stabilization event: true only on the 20th unchanged cycle
    pub fn changed(&self) -> bool {
        let fired = self.sticks.changed();
        if fired {
            debug!(
                "Stick combination {} stabilized",
                self.sticks.combination()
            );
        }
        fired
    }

    /// Shape the current smoothed values into flight commands
    pub fn compute_expo(&self) -> CommandFrame {
        self.shaper.shape(self.sampler.values())
    }

    /// Alias of [`compute_expo`](Self::compute_expo)
    pub fn shape(&self) -> CommandFrame {
        self.compute_expo()
    }

    /// Aux switch position from the current smoothed value
    pub fn aux_state(&self) -> AuxState {
        AuxState::from_raw(self.raw(ChannelRole::Aux))
    }

    /// Throttle stick within `margin` of its bottom end
    pub fn throttle_is_down(&self) -> bool {
        self.raw(ChannelRole::Throttle) < -1.0 + self.config.margin
    }

    /// Advisory link-loss flag from the source; does not affect shaping
    pub fn lost_signal(&self) -> bool {
        self.source.lost_signal()
    }

    /// Latest stick combination, stable or not
    pub fn stick_combination(&self) -> StickCombination {
        self.sticks.combination()
    }

    pub fn stable_cycles(&self) -> u8 {
        self.sticks.stable_cycles()
    }

    /// Smoothed (or direct) values from the last update, in [-1, 1] by convention
    pub fn raw_values(&self) -> &[f32; N] {
        self.sampler.values()
    }

    /// Smoothed value of one standard channel
    pub fn raw(&self, role: ChannelRole) -> f32 {
        self.sampler.values()[role.index()]
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the injected source, e.g. to feed a simulator
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Linear range mapping into integer actuator or protocol units
    pub fn scale_up(&self, x: f32, in_min: f32, in_max: f32, out_min: i16, out_max: i16) -> i16 {
        shaper::scale(x, in_min, in_max, out_min, out_max)
    }
}
