//! Raw channel sources
//!
//! A [`ChannelSource`] is the transport seam of the receiver: serial decoders,
//! PWM/PPM capture and simulator bridges all implement it, and the pipeline
//! only ever holds one as an injected value.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use tracing::{debug, info};

use super::{ChannelRole, CHANNEL_COUNT};

/// Capability contract for anything that can supply raw stick values.
///
/// Values are expected in `[-1.0, +1.0]`. Nothing downstream clamps or
/// rejects values outside that range.
pub trait ChannelSource {
    /// Hardware initialization, called once when the pipeline is built
    fn begin(&mut self) {}

    /// True for sources that already deliver clean data (serial receivers).
    /// Such sources bypass the smoothing buffer.
    fn provides_filtered_data(&self) -> bool;

    /// Read the current raw value of one channel
    fn read_channel(&mut self, channel: usize) -> f32;

    /// Override if the transport can detect a weak or lost link
    fn lost_signal(&self) -> bool {
        false
    }
}

impl<S: ChannelSource + ?Sized> ChannelSource for &mut S {
    fn begin(&mut self) {
        (**self).begin()
    }

    fn provides_filtered_data(&self) -> bool {
        (**self).provides_filtered_data()
    }

    fn read_channel(&mut self, channel: usize) -> f32 {
        (**self).read_channel(channel)
    }

    fn lost_signal(&self) -> bool {
        (**self).lost_signal()
    }
}

impl<S: ChannelSource + ?Sized> ChannelSource for Box<S> {
    fn begin(&mut self) {
        (**self).begin()
    }

    fn provides_filtered_data(&self) -> bool {
        (**self).provides_filtered_data()
    }

    fn read_channel(&mut self, channel: usize) -> f32 {
        (**self).read_channel(channel)
    }

    fn lost_signal(&self) -> bool {
        (**self).lost_signal()
    }
}

/// Source holding fixed values that the owner sets between cycles
#[derive(Debug, Clone)]
pub struct StaticSource<const N: usize = CHANNEL_COUNT> {
    values: [f32; N],
    filtered: bool,
    lost_signal: bool,
    begun: bool,
}

impl<const N: usize> StaticSource<N> {
    /// Centered sticks on every channel
    pub fn new(filtered: bool) -> Self {
        Self::with_values([0.0; N], filtered)
    }

    /// Start from `values`; `filtered` selects direct mode in the sampler
    pub fn with_values(values: [f32; N], filtered: bool) -> Self {
        Self {
            values,
            filtered,
            lost_signal: false,
            begun: false,
        }
    }

    /// Value returned for `channel` from the next read on
    pub fn set(&mut self, channel: usize, value: f32) {
        self.values[channel] = value;
    }

    pub fn set_role(&mut self, role: ChannelRole, value: f32) {
        self.set(role.index(), value);
    }

    pub fn values(&self) -> &[f32; N] {
        &self.values
    }

    pub fn set_lost_signal(&mut self, lost: bool) {
        self.lost_signal = lost;
    }

    /// Whether `begin()` has been called
    pub fn has_begun(&self) -> bool {
        self.begun
    }
}

impl<const N: usize> ChannelSource for StaticSource<N> {
    fn begin(&mut self) {
        self.begun = true;
    }

    fn provides_filtered_data(&self) -> bool {
        self.filtered
    }

    fn read_channel(&mut self, channel: usize) -> f32 {
        self.values[channel]
    }

    fn lost_signal(&self) -> bool {
        self.lost_signal
    }
}

/// Simulator bridge producing slow, deterministic stick motion.
///
/// Roll, pitch and yaw follow sine sweeps with different periods, throttle
/// ramps up and down, and aux steps through its three switch positions. A
/// small pseudo-random jitter imitates analog noise, so the source reports
/// itself as unfiltered. Reading channel 0 starts a new frame.
///
/// The jitter generator is seeded, so two sources built with the same seed
/// produce identical streams.
///
/// # Examples
///
/// ```
/// use rc_receiver::receiver::{ChannelSource, SweepSource};
///
/// let mut source = SweepSource::new(500, 0.02);
/// let roll = source.read_channel(0);
/// assert!((-1.0..=1.0).contains(&roll));
/// assert_eq!(source.frame(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SweepSource {
    frame: u64,
    rate_hz: f64,
    jitter: f32,
    rng: StdRng,
}

impl SweepSource {
    const ROLL_PERIOD_S: f64 = 4.0;
    const PITCH_PERIOD_S: f64 = 5.0;
    const YAW_PERIOD_S: f64 = 7.0;
    const THROTTLE_PERIOD_S: f64 = 10.0;
    const AUX_STEP_S: f64 = 3.0;
    const AMPLITUDE: f32 = 0.9;
    const DEFAULT_SEED: u64 = 0x00C0_FFEE;

    /// Sweep clocked at `rate_hz` frames per second with `jitter` peak noise
    pub fn new(rate_hz: u32, jitter: f32) -> Self {
        Self::with_seed(rate_hz, jitter, Self::DEFAULT_SEED)
    }

    /// Like [`new`](Self::new) with an explicit seed for the jitter generator
    pub fn with_seed(rate_hz: u32, jitter: f32, seed: u64) -> Self {
        Self {
            frame: 0,
            rate_hz: f64::from(rate_hz.max(1)),
            jitter: jitter.abs(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Frames started so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn seconds(&self) -> f64 {
        self.frame as f64 / self.rate_hz
    }

    /// Position within the current period, in [0, 1)
    fn phase(&self, period_s: f64) -> f32 {
        (self.seconds() / period_s).fract() as f32
    }

    fn noise(&mut self) -> f32 {
        if self.jitter == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-1.0..=1.0)
    }

    fn sine(&self, period_s: f64) -> f32 {
        Self::AMPLITUDE * (TAU * self.phase(period_s)).sin()
    }

    fn triangle(&self, period_s: f64) -> f32 {
        let phase = self.phase(period_s);
        let up = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
        up * 2.0 - 1.0
    }

    fn aux(&self) -> f32 {
        match (self.seconds() / Self::AUX_STEP_S) as u64 % 3 {
            0 => -0.5,
            1 => 0.2,
            _ => 0.8,
        }
    }
}

impl ChannelSource for SweepSource {
    fn begin(&mut self) {
        info!(
            "Starting sweep source at {} Hz with jitter {}",
            self.rate_hz, self.jitter
        );
    }

    fn provides_filtered_data(&self) -> bool {
        false
    }

    fn read_channel(&mut self, channel: usize) -> f32 {
        if channel == 0 {
            self.frame += 1;
        }

        let clean = match channel {
            c if c == ChannelRole::Roll.index() => self.sine(Self::ROLL_PERIOD_S),
            c if c == ChannelRole::Pitch.index() => self.sine(Self::PITCH_PERIOD_S),
            c if c == ChannelRole::Yaw.index() => self.sine(Self::YAW_PERIOD_S),
            c if c == ChannelRole::Throttle.index() => self.triangle(Self::THROTTLE_PERIOD_S),
            c if c == ChannelRole::Aux.index() => self.aux(),
            _ => {
                debug!("Sweep source has no signal for channel {}", channel);
                0.0
            }
        };

        let noisy = clean + self.jitter * self.noise();
        noisy.clamp(-1.0, 1.0)
    }
}
