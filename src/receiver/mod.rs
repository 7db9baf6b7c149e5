//! Receiver subsystem for RC channel processing
//!
//! Implements a three-stage per-cycle pipeline:
//!
//! 1. [`sampler`] - Raw channel acquisition with optional 4-sample smoothing
//! 2. [`sticks`] - Debounced stick-combination detection
//! 3. [`shaper`] - Expo/rate shaping into flight commands
//!
//! # Architecture
//!
//! ```text
//! ChannelSource ──► Sampler ──► StickStateMachine
//!                      │
//!                      └──────► CommandShaper ──► CommandFrame
//! ```
//!
//! [`pipeline::Receiver`] owns all three stages and is driven once per control
//! loop tick. [`receiver_handle::ReceiverHandle`] runs it on a tokio task for
//! callers that need snapshots from other tasks.

pub mod pipeline;
pub mod receiver_handle;
pub mod sampler;
pub mod shaper;
pub mod source;
pub mod sticks;

pub use pipeline::Receiver;
pub use receiver_handle::{ReceiverHandle, ReceiverOutput, RuntimeError, StickEvent};
pub use sampler::ChannelSampler;
pub use shaper::{scale, scale_inverse, AuxState, CommandFrame, CommandShaper};
pub use source::{ChannelSource, StaticSource, SweepSource};
pub use sticks::{StickCombination, StickPosition, StickStateMachine};

/// Number of channels the pipeline needs: four flight demands plus one aux.
pub const CHANNEL_COUNT: usize = 5;

/// Number of flight-demand channels taking part in stick combinations.
pub const DEMAND_COUNT: usize = 4;

/// Channel roles in receiver order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Roll = 0,
    Pitch = 1,
    Yaw = 2,
    Throttle = 3,
    Aux = 4,
}

impl ChannelRole {
    /// Flight-demand channels in the order they are packed into a stick code
    pub const DEMANDS: [ChannelRole; DEMAND_COUNT] = [
        ChannelRole::Roll,
        ChannelRole::Pitch,
        ChannelRole::Yaw,
        ChannelRole::Throttle,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl From<ChannelRole> for usize {
    fn from(role: ChannelRole) -> Self {
        role.index()
    }
}
