//! RC receiver command pipeline
//!
//! Turns raw receiver channel samples into shaped flight commands:
//! smoothing, debounced stick-combination detection and expo/rate curves.
//! See [`receiver`] for the pipeline and [`config`] for the settings file.

pub mod config;
pub mod receiver;

pub use config::{ConfigError, ReceiverConfig, RuntimeSettings, Settings};
pub use receiver::{
    AuxState, ChannelRole, ChannelSource, CommandFrame, Receiver, ReceiverHandle, ReceiverOutput,
    StickCombination, StickEvent,
};
