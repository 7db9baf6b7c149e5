//! Debounced stick-combination detection
//!
//! Pilots trigger discrete actions (arming, mode cycling) by holding the
//! sticks at their extremes. Each flight-demand channel contributes two bits
//! to a [`StickCombination`]; the [`StickStateMachine`] counts how long the
//! combination has stayed unchanged and fires a one-shot event once it has
//! been held long enough.

use std::fmt;
use tracing::debug;

use super::{ChannelRole, DEMAND_COUNT};

/// Consecutive unchanged cycles after which [`StickStateMachine::changed`] fires
pub const STABLE_CYCLES: u8 = 20;

/// Saturation limit of the debounce counter
pub const MAX_STABLE_CYCLES: u8 = 250;

const HIGH_BIT: u8 = 0b10;
const LOW_BIT: u8 = 0b01;

/// Where a single stick sits relative to its extremes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickPosition {
    Low,
    Centered,
    High,
}

/// Packed stick positions of the four flight-demand channels.
///
/// Two bits per channel, roll in the most significant pair. Within a pair the
/// high bit marks the positive extreme and the low bit the negative extreme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StickCombination(u8);

impl StickCombination {
    /// All sticks away from their extremes
    pub const CENTERED: StickCombination = StickCombination(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a combination from positions in roll, pitch, yaw, throttle order
    pub fn from_positions(positions: [StickPosition; DEMAND_COUNT]) -> Self {
        let bits = positions.iter().fold(0u8, |code, position| {
            let pair = match position {
                StickPosition::Low => LOW_BIT,
                StickPosition::Centered => 0,
                StickPosition::High => HIGH_BIT,
            };
            (code << 2) | pair
        });
        Self(bits)
    }

    /// Classify raw demand values against the extreme `margin`
    pub fn classify(demands: &[f32], margin: f32) -> Self {
        let bits = demands
            .iter()
            .take(DEMAND_COUNT)
            .fold(0u8, |code, &raw| {
                let mut pair = 0;
                if raw > 1.0 - margin {
                    pair |= HIGH_BIT;
                }
                if raw < -1.0 + margin {
                    pair |= LOW_BIT;
                }
                (code << 2) | pair
            });
        Self(bits)
    }

    fn pair(self, role: ChannelRole) -> u8 {
        let shift = 2 * (DEMAND_COUNT - 1 - role.index());
        (self.0 >> shift) & 0b11
    }

    /// Position of one flight-demand stick. Aux is never part of a combination.
    pub fn position(self, role: ChannelRole) -> StickPosition {
        if role == ChannelRole::Aux {
            return StickPosition::Centered;
        }
        match self.pair(role) {
            HIGH_BIT => StickPosition::High,
            LOW_BIT => StickPosition::Low,
            _ => StickPosition::Centered,
        }
    }
}

impl fmt::Display for StickCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

/// Debounce state for stick combinations
#[derive(Debug, Clone, Default)]
pub struct StickStateMachine {
    margin: f32,
    combination: StickCombination,
    stable_cycles: u8,
}

impl StickStateMachine {
    /// `margin` must lie in (0, 1)
    pub fn new(margin: f32) -> Self {
        Self {
            margin,
            combination: StickCombination::CENTERED,
            stable_cycles: 0,
        }
    }

    /// Classify this cycle's demands and advance the debounce counter
    pub fn update(&mut self, demands: &[f32]) {
        let next = StickCombination::classify(demands, self.margin);

        if next == self.combination {
            if self.stable_cycles < MAX_STABLE_CYCLES {
                self.stable_cycles += 1;
            }
        } else {
            debug!(
                "Stick combination {} -> {} after {} stable cycles",
                self.combination, next, self.stable_cycles
            );
            self.stable_cycles = 0;
            self.combination = next;
        }
    }

    /// True on exactly one cycle: the 20th consecutive one with an unchanged combination
    pub fn changed(&self) -> bool {
        self.stable_cycles == STABLE_CYCLES
    }

    /// Combination seen on the most recent update
    pub fn combination(&self) -> StickCombination {
        self.combination
    }

    /// Unchanged cycles since the last change, saturating at 250
    pub fn stable_cycles(&self) -> u8 {
        self.stable_cycles
    }
}
