//! Channel acquisition with a short moving average

use super::source::ChannelSource;
use super::CHANNEL_COUNT;

/// Depth of the per-channel smoothing history
pub const SMOOTHING_DEPTH: usize = 4;

/// Circular history of the last four raw samples of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothingBuffer {
    slots: [f32; SMOOTHING_DEPTH],
}

impl SmoothingBuffer {
    /// Overwrite `slot` (taken modulo the depth) and return the mean of all slots
    pub fn push(&mut self, slot: usize, value: f32) -> f32 {
        self.slots[slot % SMOOTHING_DEPTH] = value;
        self.mean()
    }

    // Pairwise sum keeps the mean of four equal samples exact.
    pub fn mean(&self) -> f32 {
        let [a, b, c, d] = self.slots;
        ((a + b) + (c + d)) / SMOOTHING_DEPTH as f32
    }
}

/// Produces one smoothed sample per channel per cycle.
///
/// Sources that report clean data are passed through unchanged. All other
/// sources are averaged over the last [`SMOOTHING_DEPTH`] cycles. The history
/// starts zeroed, so the first three filtered cycles are pulled toward zero.
#[derive(Debug, Clone)]
pub struct ChannelSampler<const N: usize = CHANNEL_COUNT> {
    history: [SmoothingBuffer; N],
    values: [f32; N],
    cycle_index: u32,
}

impl<const N: usize> Default for ChannelSampler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ChannelSampler<N> {
    /// Empty sampler with zeroed history
    pub fn new() -> Self {
        Self {
            history: [SmoothingBuffer::default(); N],
            values: [0.0; N],
            cycle_index: 0,
        }
    }

    /// Read every channel once and return the smoothed (or direct) values
    pub fn update<S: ChannelSource + ?Sized>(&mut self, source: &mut S) -> &[f32; N] {
        if source.provides_filtered_data() {
            for (channel, value) in self.values.iter_mut().enumerate() {
                *value = source.read_channel(channel);
            }
        } else {
            let slot = (self.cycle_index % SMOOTHING_DEPTH as u32) as usize;
            for (channel, (value, buffer)) in
                self.values.iter_mut().zip(self.history.iter_mut()).enumerate()
            {
                *value = buffer.push(slot, source.read_channel(channel));
            }
            self.cycle_index = self.cycle_index.wrapping_add(1);
        }

        &self.values
    }

    /// Values produced by the most recent update
    pub fn values(&self) -> &[f32; N] {
        &self.values
    }

    /// Filtered-mode cycles seen so far
    pub fn cycle_index(&self) -> u32 {
        self.cycle_index
    }
}
