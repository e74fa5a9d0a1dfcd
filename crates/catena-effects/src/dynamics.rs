//! Dynamics processors: a sample-following compressor, a stereo gain-riding
//! compressor with a peak limiter, and a five-phase noise gate.

use std::borrow::Cow;

use catena_core::{
    ChainOperator, MAX_AMPLITUDE, Operator, ParamDescriptor, SampleBuffer, param_names,
};

/// Per-channel follower memory of [`Compress`].
#[derive(Debug, Clone, Copy, Default)]
struct FollowerState {
    last_in: f32,
    last_out: f32,
    primed: bool,
}

/// Sample-following compressor.
///
/// Above the threshold each sample moves towards the new input by only
/// `1 / 2^(rate / 6)` of the difference, and the previous output is scaled by
/// the resulting relative change. Below the threshold samples pass through
/// unchanged and reset the follower.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | compression-rate-dB | ≥ 0 | 1.0 |
/// | 2 | threshold-% | 0.0–100.0 | 10.0 |
#[derive(Debug, Clone)]
pub struct Compress {
    rate_db: f32,
    threshold_percent: f32,
    channels: Vec<FollowerState>,
}

impl Compress {
    /// Creates a compressor.
    pub fn new(rate_db: f32, threshold_percent: f32) -> Self {
        Self {
            rate_db,
            threshold_percent,
            channels: Vec::new(),
        }
    }

    fn divisor(&self) -> f32 {
        libm::powf(2.0, self.rate_db / 6.0)
    }
}

impl Default for Compress {
    fn default() -> Self {
        Self::new(1.0, 10.0)
    }
}

impl Operator for Compress {
    fn name(&self) -> &str {
        "Compressor"
    }

    fn description(&self) -> &str {
        "Slows down level changes above a threshold."
    }

    fn keyword(&self) -> &str {
        "ec"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("compression-rate-dB,threshold-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.rate_db = value,
            2 => self.threshold_percent = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.rate_db,
            2 => self.threshold_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(1.0).with_lower_bound(0.0),
            2 => *desc = desc.with_default(10.0).bounded(0.0, 100.0),
            _ => {}
        }
    }
}

impl ChainOperator for Compress {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.channels = vec![FollowerState::default(); buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.channels.len() < buffer.channel_count() {
            self.channels.resize(buffer.channel_count(), FollowerState::default());
        }
        let divisor = self.divisor();
        let threshold = MAX_AMPLITUDE * self.threshold_percent / 100.0;

        for (channel, state) in buffer.channels_mut().zip(self.channels.iter_mut()) {
            for sample in channel.iter_mut() {
                let input = *sample;
                if !state.primed {
                    state.primed = true;
                    state.last_in = input;
                    state.last_out = input;
                    continue;
                }

                if input.abs() > threshold {
                    let mut out = state.last_in + (input - state.last_in) / divisor;
                    if state.last_in != 0.0 {
                        out = state.last_out * (out / state.last_in);
                    }
                    out = out.clamp(-MAX_AMPLITUDE, MAX_AMPLITUDE);
                    state.last_in = input;
                    state.last_out = out;
                    *sample = out;
                } else {
                    state.last_in = input;
                    state.last_out = input;
                }
            }
        }
    }

    fn release(&mut self) {
        self.channels.clear();
    }
}

/// Slow gain never rises above this.
const MAX_SLOW_GAIN: f64 = 9.0;

/// Levels below this are treated as this, so silence is not boosted forever.
const FLOOR_LEVEL: f64 = 0.01;

/// The gain rider aims the RMS level at this fraction of the peak limit.
const TARGET_FRACTION: f64 = 0.5;

/// The limiter's soft knee starts at this fraction of the peak limit.
const KNEE_FRACTION: f64 = 0.8;

/// The peak follower releases this many times faster than the gain rider.
const FAST_RELEASE_DIVISOR: f64 = 10.0;

/// Soft limiter: identity below `knee`, then a `tanh` curve that approaches
/// but never reaches `limit`.
fn hard_limit(value: f64, knee: f64, limit: f64) -> f64 {
    let magnitude = value.abs();
    if magnitude <= knee || limit <= knee {
        return value.clamp(-limit, limit);
    }
    let span = limit - knee;
    let shaped = knee + span * libm::tanh((magnitude - knee) / span);
    shaped.copysign(value)
}

/// Gain-riding state shared by both channels of [`AdvancedCompressor`].
#[derive(Debug, Clone, Copy)]
struct RiderState {
    peak: f64,
    mean_square: f64,
    gain: f64,
}

impl Default for RiderState {
    fn default() -> Self {
        Self {
            peak: 0.0,
            mean_square: 0.0,
            gain: 1.0,
        }
    }
}

/// Stereo compressor in the style of John Dyson's design.
///
/// Two detectors share one gain for both channels:
///
/// - a slow RMS rider pulls the level towards half the peak limit with
///   `overall-crate` as the ratio exponent (0.5 is 2:1, 1.0 is infinite),
///   boosting quiet passages up to 9x;
/// - a fast peak follower, releasing ten times quicker, pulls peaks that
///   would exceed the limit back by `fast-crate`.
///
/// Gain drops immediately and recovers over `release-time-sec`. The result
/// passes a soft limiter, so output never exceeds `peak-limit-%` of full
/// scale. Always produces two channels; a mono input is copied to both.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | peak-limit-% | 0.0–100.0 | 69.0 |
/// | 2 | release-time-sec | > 0 | 0.5 |
/// | 3 | fast-crate | 0.0–1.0 | 0.5 |
/// | 4 | overall-crate | 0.0–1.0 | 1.0 |
#[derive(Debug, Clone)]
pub struct AdvancedCompressor {
    peak_limit_percent: f32,
    release_time: f32,
    fast_ratio: f32,
    ratio: f32,
    sample_rate: u32,
    mono_input: bool,
    state: RiderState,
}

impl AdvancedCompressor {
    /// Creates a compressor.
    pub fn new(peak_limit_percent: f32, release_time: f32, fast_ratio: f32, ratio: f32) -> Self {
        Self {
            peak_limit_percent,
            release_time,
            fast_ratio,
            ratio,
            sample_rate: 48000,
            mono_input: false,
            state: RiderState::default(),
        }
    }

    /// Gain applied to the most recent frame.
    pub fn current_gain(&self) -> f32 {
        self.state.gain as f32
    }

    fn limit(&self) -> f64 {
        (f64::from(self.peak_limit_percent) / 100.0).clamp(0.001, 1.0)
    }

    /// Per-sample decay of a one-pole with time constant `seconds`.
    fn coefficient(&self, seconds: f64) -> f64 {
        let samples = seconds.max(1e-6) * f64::from(self.sample_rate);
        libm::exp(-1.0 / samples)
    }
}

impl Default for AdvancedCompressor {
    fn default() -> Self {
        Self::new(69.0, 0.5, 0.5, 1.0)
    }
}

impl Operator for AdvancedCompressor {
    fn name(&self) -> &str {
        "Advanced compressor"
    }

    fn description(&self) -> &str {
        "Stereo gain rider with a fast peak stage and a soft limiter."
    }

    fn keyword(&self) -> &str {
        "eca"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("peak-limit-%,release-time-sec,fast-crate,overall-crate")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.peak_limit_percent = value,
            2 => self.release_time = value,
            3 => self.fast_ratio = value,
            4 => self.ratio = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.peak_limit_percent,
            2 => self.release_time,
            3 => self.fast_ratio,
            4 => self.ratio,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(69.0).bounded(0.0, 100.0),
            2 => *desc = desc.with_default(0.5).with_lower_bound(0.0),
            3 => *desc = desc.with_default(0.5).bounded(0.0, 1.0),
            4 => *desc = desc.with_default(1.0).bounded(0.0, 1.0),
            _ => {}
        }
    }
}

impl ChainOperator for AdvancedCompressor {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.mono_input = buffer.channel_count() < 2;
        self.state = RiderState::default();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let mono_input = self.mono_input;
        let Some((left, right)) = buffer.channel_pair_mut(0, 1) else {
            return;
        };
        if mono_input {
            right.copy_from_slice(left);
        }

        let limit = self.limit();
        let target = limit * TARGET_FRACTION;
        let knee = limit * KNEE_FRACTION;
        let release = f64::from(self.release_time);
        let slow_coef = self.coefficient(release);
        let fast_coef = self.coefficient(release / FAST_RELEASE_DIVISOR);
        let ratio = f64::from(self.ratio.clamp(0.0, 1.0));
        let fast_ratio = f64::from(self.fast_ratio.clamp(0.0, 1.0));
        let st = &mut self.state;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (x_l, x_r) = (f64::from(*l), f64::from(*r));
            let level = x_l.abs().max(x_r.abs());

            st.peak = if level > st.peak {
                level
            } else {
                level + (st.peak - level) * fast_coef
            };
            st.mean_square = slow_coef * st.mean_square + (1.0 - slow_coef) * level * level;

            let rms = libm::sqrt(st.mean_square).max(FLOOR_LEVEL);
            let slow_gain = libm::pow(target / rms, ratio).min(MAX_SLOW_GAIN);
            let peak_out = st.peak * slow_gain;
            let fast_gain = if peak_out > limit {
                libm::pow(limit / peak_out, fast_ratio)
            } else {
                1.0
            };
            let desired = slow_gain * fast_gain;
            st.gain = if desired < st.gain {
                desired
            } else {
                desired + (st.gain - desired) * slow_coef
            };

            *l = hard_limit(x_l * st.gain, knee, limit) as f32;
            *r = hard_limit(x_r * st.gain, knee, limit) as f32;
        }
    }

    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }

    fn release(&mut self) {
        self.state = RiderState::default();
    }
}

/// Noise gate phases, tracked per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePhase {
    /// Passing audio, counting consecutive quiet samples
    #[default]
    Waiting,
    /// Fading out while the signal stays quiet
    Attacking,
    /// Fully closed
    Active,
    /// Closed, counting loud samples before reopening
    Holding,
    /// Fading back in
    Releasing,
}

#[derive(Debug, Clone, Copy, Default)]
struct GateChannel {
    phase: GatePhase,
    counter: f32,
    gain: f32,
}

/// Noise gate with pre-hold, attack, post-hold and release phases.
///
/// A sample is "quiet" when its magnitude is at or below the threshold. The
/// gate closes after `pre-hold-time` of continuous quiet plus an attack fade,
/// and opens again after `post-hold-time` worth of loud samples followed by a
/// release fade.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | threshold-level-% | 0.0–100.0 | 100.0 |
/// | 2 | pre-hold-time-msec | ≥ 0 | 50.0 |
/// | 3 | attack-time-msec | ≥ 0 | 50.0 |
/// | 4 | post-hold-time-msec | ≥ 0 | 50.0 |
/// | 5 | release-time-msec | ≥ 0 | 50.0 |
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold_percent: f32,
    pre_hold_ms: f32,
    attack_ms: f32,
    post_hold_ms: f32,
    release_ms: f32,
    sample_rate: u32,
    channels: Vec<GateChannel>,
}

impl NoiseGate {
    /// Creates a noise gate. Times are in milliseconds.
    pub fn new(
        threshold_percent: f32,
        pre_hold_ms: f32,
        attack_ms: f32,
        post_hold_ms: f32,
        release_ms: f32,
    ) -> Self {
        Self {
            threshold_percent,
            pre_hold_ms,
            attack_ms,
            post_hold_ms,
            release_ms,
            sample_rate: 48000,
            channels: Vec::new(),
        }
    }

    /// Current phase of `channel`, if initialised.
    pub fn phase(&self, channel: usize) -> Option<GatePhase> {
        self.channels.get(channel).map(|c| c.phase)
    }

    fn samples(&self, ms: f32) -> f32 {
        ms * self.sample_rate as f32 / 1000.0
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new(100.0, 50.0, 50.0, 50.0, 50.0)
    }
}

impl Operator for NoiseGate {
    fn name(&self) -> &str {
        "Noisegate"
    }

    fn description(&self) -> &str {
        "Silences the signal after it stays below a threshold."
    }

    fn keyword(&self) -> &str {
        "enm"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names(
            "threshold-level-%,pre-hold-time-msec,attack-time-msec,post-hold-time-msec,release-time-msec",
        )
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.threshold_percent = value,
            2 => self.pre_hold_ms = value,
            3 => self.attack_ms = value,
            4 => self.post_hold_ms = value,
            5 => self.release_ms = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.threshold_percent,
            2 => self.pre_hold_ms,
            3 => self.attack_ms,
            4 => self.post_hold_ms,
            5 => self.release_ms,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(100.0).bounded(0.0, 100.0),
            2..=5 => *desc = desc.with_default(50.0).with_lower_bound(0.0),
            _ => {}
        }
    }
}

impl ChainOperator for NoiseGate {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.channels = vec![GateChannel::default(); buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.channels.len() < buffer.channel_count() {
            self.channels.resize(buffer.channel_count(), GateChannel::default());
        }
        let threshold = MAX_AMPLITUDE * self.threshold_percent / 100.0;
        let pre_hold = self.samples(self.pre_hold_ms);
        let attack = self.samples(self.attack_ms);
        let post_hold = self.samples(self.post_hold_ms);
        let release = self.samples(self.release_ms);

        for (channel, gate) in buffer.channels_mut().zip(self.channels.iter_mut()) {
            for sample in channel.iter_mut() {
                let quiet = sample.abs() <= threshold;
                #[cfg(feature = "tracing")]
                let from = gate.phase;
                match gate.phase {
                    GatePhase::Waiting => {
                        if quiet {
                            gate.counter += 1.0;
                            if gate.counter >= pre_hold {
                                gate.counter = 0.0;
                                gate.phase = GatePhase::Attacking;
                            }
                        } else {
                            gate.counter = 0.0;
                        }
                    }
                    GatePhase::Attacking => {
                        if quiet {
                            gate.counter += 1.0;
                            gate.gain = if attack > 0.0 {
                                1.0 - gate.counter / attack
                            } else {
                                0.0
                            };
                            if gate.counter >= attack {
                                gate.counter = 0.0;
                                gate.gain = 0.0;
                                gate.phase = GatePhase::Active;
                            }
                            *sample *= gate.gain;
                        } else {
                            gate.counter = 0.0;
                            gate.phase = GatePhase::Waiting;
                        }
                    }
                    GatePhase::Active => {
                        if !quiet {
                            gate.phase = GatePhase::Holding;
                        }
                        *sample = 0.0;
                    }
                    GatePhase::Holding => {
                        if !quiet {
                            gate.counter += 1.0;
                            if gate.counter >= post_hold {
                                gate.counter = 0.0;
                                gate.phase = GatePhase::Releasing;
                            }
                        }
                        *sample = 0.0;
                    }
                    GatePhase::Releasing => {
                        gate.counter += 1.0;
                        gate.gain = if release > 0.0 {
                            gate.counter / release
                        } else {
                            1.0
                        };
                        if gate.counter >= release {
                            gate.counter = 0.0;
                            gate.phase = GatePhase::Waiting;
                        }
                        *sample *= gate.gain;
                    }
                }

                #[cfg(feature = "tracing")]
                if from != gate.phase {
                    tracing::trace!(?from, to = ?gate.phase, "noise gate transition");
                }
            }
        }
    }

    fn release(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(data: &[f32]) -> SampleBuffer {
        let mut buf = SampleBuffer::new(1, data.len(), 1000);
        buf.channel_mut(0).copy_from_slice(data);
        buf
    }

    #[test]
    fn test_compress_passes_quiet_signal() {
        let mut comp = Compress::new(6.0, 50.0);
        let mut buf = mono(&[0.1, 0.2, -0.3, 0.4]);
        comp.init(&buf);
        comp.process(&mut buf);
        assert_eq!(buf.channel(0), &[0.1, 0.2, -0.3, 0.4]);
    }

    #[test]
    fn test_compress_slows_rising_edge() {
        // rate 6 dB halves each step above threshold.
        let mut comp = Compress::new(6.0, 10.0);
        let mut buf = mono(&[0.2, 0.8]);
        comp.init(&buf);
        comp.process(&mut buf);
        let out = buf.channel(0);
        assert_eq!(out[0], 0.2);
        // follower: 0.2 + (0.8 - 0.2) / 2 = 0.5, scaled by 0.2 * (0.5 / 0.2)
        assert!((out[1] - 0.5).abs() < 1e-6, "{}", out[1]);
    }

    #[test]
    fn test_compress_zero_history_is_finite() {
        let mut comp = Compress::default();
        let mut buf = mono(&[0.0, 0.9, 0.9]);
        comp.init(&buf);
        comp.process(&mut buf);
        assert!(buf.channel(0).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_noise_gate_closes_after_quiet_stretch() {
        // At 1 kHz each ms is one sample.
        let mut gate = NoiseGate::new(10.0, 2.0, 2.0, 2.0, 2.0);
        let mut buf = mono(&[0.01; 8]);
        gate.init(&buf);
        gate.process(&mut buf);

        let out = buf.channel(0);
        // Two waiting samples pass untouched.
        assert_eq!(&out[..2], &[0.01, 0.01]);
        // Attack fades: gain 0.5 then 0.
        assert!((out[2] - 0.005).abs() < 1e-7);
        assert_eq!(out[3], 0.0);
        assert!(out[4..].iter().all(|&s| s == 0.0));
        assert_eq!(gate.phase(0), Some(GatePhase::Active));
    }

    #[test]
    fn test_noise_gate_reopens_through_hold_and_release() {
        let mut gate = NoiseGate::new(10.0, 1.0, 1.0, 2.0, 2.0);
        let mut buf = mono(&[0.01, 0.01, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        gate.init(&buf);
        gate.process(&mut buf);

        let out = buf.channel(0);
        // waiting -> attacking, attacking -> active, then loud samples hold.
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[4], 0.0);
        // Release ramps 0.5, 1.0 and then waits again.
        assert!((out[5] - 0.25).abs() < 1e-6, "{out:?}");
        assert!((out[6] - 0.5).abs() < 1e-6, "{out:?}");
        assert_eq!(out[7], 0.5);
        assert_eq!(gate.phase(0), Some(GatePhase::Waiting));
    }

    #[test]
    fn test_noise_gate_loud_signal_never_gates() {
        let mut gate = NoiseGate::default();
        gate.set_parameter(1, 5.0);
        let mut buf = mono(&[0.5; 64]);
        gate.init(&buf);
        gate.process(&mut buf);
        assert!(buf.channel(0).iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_noise_gate_stores_milliseconds() {
        let mut gate = NoiseGate::default();
        gate.set_parameter(3, 12.5);
        assert_eq!(gate.get_parameter(3), 12.5);
        assert_eq!(gate.number_of_params(), 5);
    }

    fn sine(frames: usize, rate: u32, freq: f32, amplitude: f32) -> SampleBuffer {
        let mut buf = SampleBuffer::new(2, frames, rate);
        for ch in buf.channels_mut() {
            for (n, s) in ch.iter_mut().enumerate() {
                *s = amplitude * libm::sinf(std::f32::consts::TAU * freq * n as f32 / rate as f32);
            }
        }
        buf
    }

    #[test]
    fn test_hard_limit_shape() {
        assert_eq!(hard_limit(0.3, 0.4, 0.5), 0.3);
        let squeezed = hard_limit(5.0, 0.4, 0.5);
        assert!(squeezed > 0.49 && squeezed <= 0.5, "{squeezed}");
        assert_eq!(hard_limit(-5.0, 0.4, 0.5), -squeezed);
    }

    #[test]
    fn test_advanced_compressor_never_exceeds_limit() {
        let mut comp = AdvancedCompressor::new(50.0, 0.2, 0.5, 1.0);
        let mut buf = sine(8000, 8000, 220.0, 1.0);
        comp.init(&buf);
        comp.process(&mut buf);
        let peak = buf.peak_amplitude();
        assert!(peak <= 0.5, "{peak}");
        assert!(peak > 0.2, "{peak}");
    }

    #[test]
    fn test_advanced_compressor_rides_quiet_signal_up() {
        // Target RMS is half of the 69% limit.
        let mut comp = AdvancedCompressor::default();
        let mut buf = sine(32000, 8000, 100.0, 0.1);
        comp.init(&buf);
        comp.process(&mut buf);
        let tail = &buf.channel(0)[28000..];
        let rms = libm::sqrtf(tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32);
        assert!((rms - 0.345).abs() < 0.05, "{rms}");
        assert!(comp.current_gain() > 4.0);
    }

    #[test]
    fn test_advanced_compressor_copies_mono_to_both_channels() {
        let mut comp = AdvancedCompressor::default();
        assert_eq!(comp.output_channels(1), 2);
        assert_eq!(comp.output_channels(6), 2);

        let mut buf = SampleBuffer::new(1, 64, 8000);
        buf.channel_mut(0).fill(0.2);
        comp.init(&buf);
        buf.set_channel_count(2);
        comp.process(&mut buf);
        assert_eq!(buf.channel(0), buf.channel(1));
        assert!(buf.channel(1)[10] > 0.0);
    }

    #[test]
    fn test_advanced_compressor_parameters() {
        let comp = AdvancedCompressor::default();
        assert_eq!(comp.parameter_values(), vec![69.0, 0.5, 0.5, 1.0]);
        assert_eq!(comp.describe_parameter(4).unwrap().upper_bound, Some(1.0));
    }
}
