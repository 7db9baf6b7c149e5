//! Response shaping for stick demands
//!
//! Roll and pitch go through an expo/rate curve, yaw keeps a linear response,
//! and throttle uses its own curve pinned at the configured midpoint. All three
//! cyclic axes end up in `[-0.5, +0.5]`; throttle ends up in `[0, 1]`.

use super::ChannelRole;
use crate::config::ReceiverConfig;

/// Aux values below this are [`AuxState::Low`]
const AUX_MID_FROM: f32 = 0.0;
/// Aux values from here on are [`AuxState::High`]
const AUX_HIGH_FROM: f32 = 0.4;

/// Three-position switch state of the aux channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuxState {
    #[default]
    Low,
    Mid,
    High,
}

impl AuxState {
    /// Quantize a raw aux value: below 0.0 is low, from 0.4 on is high
    pub fn from_raw(aux: f32) -> Self {
        if aux < AUX_MID_FROM {
            AuxState::Low
        } else if aux < AUX_HIGH_FROM {
            AuxState::Mid
        } else {
            AuxState::High
        }
    }

    /// Numeric switch position, 0 to 2
    pub const fn code(self) -> u8 {
        match self {
            AuxState::Low => 0,
            AuxState::Mid => 1,
            AuxState::High => 2,
        }
    }
}

impl From<AuxState> for u8 {
    fn from(state: AuxState) -> Self {
        state.code()
    }
}

/// Shaped commands for one control cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommandFrame {
    /// Roll command in [-0.5, 0.5] at rates up to 1.0
    pub roll: f32,
    pub pitch: f32,
    /// Yaw command, inverted relative to the stick
    pub yaw: f32,
    /// Throttle in [0, 1]
    pub throttle: f32,
    pub aux: AuxState,
}

/// Applies the configured curves to smoothed channel values
#[derive(Debug, Clone, Copy)]
pub struct CommandShaper {
    pitch_roll_expo: f32,
    pitch_roll_rate: f32,
    throttle_expo: f32,
    throttle_mid: f32,
}

impl CommandShaper {
    /// Take the curve parameters from `config`
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            pitch_roll_expo: config.pitch_roll_expo,
            pitch_roll_rate: config.pitch_roll_rate,
            throttle_expo: config.throttle_expo,
            throttle_mid: config.throttle_mid,
        }
    }

    /// Shape one cycle of raw values. `raw` must hold at least the five
    /// standard channels.
    pub fn shape(&self, raw: &[f32]) -> CommandFrame {
        let roll = raw[ChannelRole::Roll.index()];
        let pitch = raw[ChannelRole::Pitch.index()];
        let yaw = raw[ChannelRole::Yaw.index()];
        let throttle = raw[ChannelRole::Throttle.index()];

        CommandFrame {
            roll: self.shape_cyclic(roll),
            pitch: self.shape_cyclic(pitch),
            // yaw polarity is reversed relative to the stick
            yaw: -restore_sign(yaw.abs(), yaw),
            throttle: self.shape_throttle(throttle),
            aux: AuxState::from_raw(raw[ChannelRole::Aux.index()]),
        }
    }

    /// Roll/pitch: magnitude, expo/rate curve, halve, sign back
    pub fn shape_cyclic(&self, raw: f32) -> f32 {
        let command = rc_curve(raw.abs(), self.pitch_roll_expo, self.pitch_roll_rate);
        restore_sign(command, raw)
    }

    /// Throttle: [-1, 1] to [0, 1], then the midpoint curve
    pub fn shape_throttle(&self, raw: f32) -> f32 {
        let t = (raw + 1.0) / 2.0;
        throttle_curve(t, self.throttle_expo, self.throttle_mid)
    }
}

fn restore_sign(magnitude: f32, raw: f32) -> f32 {
    let half = magnitude / 2.0;
    if raw < 0.0 {
        -half
    } else {
        half
    }
}

/// Expo/rate curve on a stick magnitude in [0, 1].
///
/// Full stick maps to `rate` whatever the expo; larger expo softens the
/// response around center.
pub fn rc_curve(x: f32, expo: f32, rate: f32) -> f32 {
    (1.0 + expo * (x * x - 1.0)) * x * rate
}

/// Throttle curve on `x` in [0, 1], pinned at `mid`.
///
/// Each side of the midpoint is normalized by its own span so expo shapes the
/// low and high halves independently.
pub fn throttle_curve(x: f32, expo: f32, mid: f32) -> f32 {
    let d = x - mid;
    let span = if d > 0.0 {
        1.0 - mid
    } else if d < 0.0 {
        mid
    } else {
        1.0
    };
    mid + d * (1.0 - expo + expo * (d * d) / (span * span))
}

/// Map `x` from `[in_min, in_max]` onto the integer range `[out_min, out_max]`.
///
/// The result is truncated toward zero. `in_min == in_max` is a caller bug.
pub fn scale(x: f32, in_min: f32, in_max: f32, out_min: i16, out_max: i16) -> i16 {
    debug_assert!(in_min != in_max, "degenerate input range");
    let out_span = out_max as f32 - out_min as f32;
    ((x - in_min) * out_span / (in_max - in_min) + out_min as f32) as i16
}

/// Inverse of [`scale`]: map `y` from `[out_min, out_max]` back onto `[in_min, in_max]`
pub fn scale_inverse(y: i16, out_min: i16, out_max: i16, in_min: f32, in_max: f32) -> f32 {
    debug_assert!(out_min != out_max, "degenerate output range");
    let out_span = out_max as f32 - out_min as f32;
    (y as f32 - out_min as f32) * (in_max - in_min) / out_span + in_min
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn shaper(
        pitch_roll_expo: f32,
        pitch_roll_rate: f32,
        throttle_expo: f32,
        throttle_mid: f32,
    ) -> CommandShaper {
        CommandShaper::new(&ReceiverConfig {
            margin: 0.1,
            pitch_roll_expo,
            pitch_roll_rate,
            throttle_expo,
            throttle_mid,
        })
    }

    #[test]
    fn test_rc_curve_full_stick_equals_rate() {
        for expo in [0.0, 0.3, 0.65, 1.0] {
            for rate in [0.5, 0.9, 1.0, 1.4] {
                assert_eq!(rc_curve(1.0, expo, rate), rate);
            }
        }
    }

    #[test]
    fn test_rc_curve_center_is_zero() {
        for expo in [0.0, 0.5, 1.0] {
            assert_eq!(rc_curve(0.0, expo, 0.9), 0.0);
        }
    }

    #[test]
    fn test_expo_softens_mid_stick() {
        let linear = rc_curve(0.5, 0.0, 1.0);
        let soft = rc_curve(0.5, 0.5, 1.0);
        let softest = rc_curve(0.5, 1.0, 1.0);
        assert!((linear - 0.5).abs() < EPS);
        assert!(soft < linear);
        assert!(softest < soft);
        assert!((softest - 0.125).abs() < EPS);
    }

    #[test]
    fn test_cyclic_full_stick_is_half_rate() {
        let s = shaper(0.65, 0.9, 0.2, 0.5);
        assert!((s.shape_cyclic(1.0) - 0.45).abs() < EPS);
        assert!((s.shape_cyclic(-1.0) + 0.45).abs() < EPS);
        assert_eq!(s.shape_cyclic(0.0), 0.0);
    }

    #[test]
    fn test_sign_symmetry() {
        let s = shaper(0.65, 0.9, 0.2, 0.5);
        for r in [0.0, 0.05, 0.3, 0.6, 0.999, 1.0] {
            let pos = s.shape(&[r, r, r, 0.0, 0.0]);
            let neg = s.shape(&[-r, -r, -r, 0.0, 0.0]);
            assert_eq!(pos.roll, -neg.roll, "roll at {r}");
            assert_eq!(pos.pitch, -neg.pitch, "pitch at {r}");
            assert_eq!(pos.yaw, -neg.yaw, "yaw at {r}");
        }
    }

    #[test]
    fn test_yaw_is_linear_halved_and_inverted() {
        let s = shaper(1.0, 2.0, 0.2, 0.5);
        let frame = s.shape(&[0.0, 0.0, 0.3, 0.0, 0.0]);
        assert!((frame.yaw + 0.15).abs() < EPS);

        let frame = s.shape(&[0.0, 0.0, -1.0, 0.0, 0.0]);
        assert!((frame.yaw - 0.5).abs() < EPS);
    }

    #[test]
    fn test_nan_passes_through_cyclic_axes() {
        let s = shaper(0.65, 0.9, 0.2, 0.5);
        let frame = s.shape(&[f32::NAN, 0.3, f32::NAN, 0.0, 0.0]);

        assert!(frame.roll.is_nan());
        assert!(frame.yaw.is_nan());
        assert!(!frame.pitch.is_nan());
        assert_eq!(frame.throttle, 0.5);
    }

    #[test]
    fn test_throttle_midpoint_pin() {
        for mid in [0.25, 0.5, 0.75] {
            for expo in [0.0, 0.2, 0.5, 1.0] {
                let s = shaper(0.65, 0.9, expo, mid);
                let raw = 2.0 * mid - 1.0;
                assert_eq!(s.shape_throttle(raw), mid, "mid {mid} expo {expo}");
            }
        }
    }

    #[test]
    fn test_throttle_endpoints() {
        for mid in [0.25, 0.5, 0.75] {
            for expo in [0.0, 0.2, 1.0] {
                let s = shaper(0.65, 0.9, expo, mid);
                assert!(s.shape_throttle(-1.0).abs() < EPS);
                assert!((s.shape_throttle(1.0) - 1.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_throttle_expo_flattens_around_mid() {
        let linear = shaper(0.65, 0.9, 0.0, 0.5);
        let cubic = shaper(0.65, 0.9, 1.0, 0.5);
        // t = 0.75, d = 0.25
        assert!((linear.shape_throttle(0.5) - 0.75).abs() < EPS);
        assert!((cubic.shape_throttle(0.5) - 0.5625).abs() < EPS);
        // t = 0.25, d = -0.25
        assert!((cubic.shape_throttle(-0.5) - 0.4375).abs() < EPS);
    }

    #[test]
    fn test_aux_boundaries() {
        assert_eq!(AuxState::from_raw(-0.0001), AuxState::Low);
        assert_eq!(AuxState::from_raw(-1.0), AuxState::Low);
        assert_eq!(AuxState::from_raw(0.0), AuxState::Mid);
        assert_eq!(AuxState::from_raw(0.399999), AuxState::Mid);
        assert_eq!(AuxState::from_raw(0.4), AuxState::High);
        assert_eq!(AuxState::from_raw(1.0), AuxState::High);
    }

    #[test]
    fn test_aux_codes() {
        assert_eq!(u8::from(AuxState::Low), 0);
        assert_eq!(u8::from(AuxState::Mid), 1);
        assert_eq!(u8::from(AuxState::High), 2);
    }

    #[test]
    fn test_scale_maps_to_pulse_range() {
        assert_eq!(scale(-1.0, -1.0, 1.0, 1000, 2000), 1000);
        assert_eq!(scale(0.0, -1.0, 1.0, 1000, 2000), 1500);
        assert_eq!(scale(1.0, -1.0, 1.0, 1000, 2000), 2000);
        assert_eq!(scale(0.5, 0.0, 1.0, 0, 100), 50);
    }

    #[test]
    fn test_scale_truncates_toward_zero() {
        assert_eq!(scale(0.999, 0.0, 1.0, 0, 10), 9);
        assert_eq!(scale(-0.999, -1.0, 0.0, -10, 0), -9);
    }

    #[test]
    fn test_scale_round_trip() {
        for y in [1000i16, 1234, 1500, 1777, 2000] {
            let x = scale_inverse(y, 1000, 2000, -1.0, 1.0);
            let back = scale(x, -1.0, 1.0, 1000, 2000);
            assert!((back - y).abs() <= 1, "{y} came back as {back}");
        }

        for y in [-500i16, 0, 250, 500] {
            let x = scale_inverse(y, -500, 500, 0.0, 1.0);
            let back = scale(x, 0.0, 1.0, -500, 500);
            assert!((back - y).abs() <= 1, "{y} came back as {back}");
        }
    }

    #[test]
    fn test_end_to_end_direct_mode_values() {
        let s = shaper(0.5, 1.0, 0.3, 0.5);
        let frame = s.shape(&[0.6, -0.6, 0.3, 0.0, 0.5]);

        let expected_roll = ((1.0 + 0.5 * (0.36 - 1.0)) * 0.6 * 1.0) / 2.0;
        assert!((frame.roll - expected_roll).abs() < EPS);
        assert!((frame.roll - 0.204).abs() < EPS);
        assert_eq!(frame.pitch, -frame.roll);
        assert!((frame.yaw + 0.15).abs() < EPS);
        assert_eq!(frame.throttle, 0.5);
        assert_eq!(frame.aux, AuxState::High);
    }
}
