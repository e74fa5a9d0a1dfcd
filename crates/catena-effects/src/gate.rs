//! Block gates.
//!
//! A gate looks at each block and either lets it through untouched or drops
//! it entirely by setting the buffer's frame count to zero. Gates never fade;
//! they crop.

use std::borrow::Cow;

use catena_core::{ChainOperator, Operator, ParamDescriptor, ParamFlags, SampleBuffer, param_names};

/// Open / closed state shared by the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Blocks are dropped
    #[default]
    Closed,
    /// Blocks pass
    Open,
}

fn apply(state: GateState, buffer: &mut SampleBuffer) {
    if state == GateState::Closed {
        buffer.set_frame_count(0);
    }
}

/// Passes audio only inside a time window.
///
/// The window opens `open-at-sec` seconds after init and stays open for
/// `duration-sec`. A zero duration keeps the gate open forever once reached.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | open-at-sec | ≥ 0 | 0.0 |
/// | 2 | duration-sec | ≥ 0 | 0.0 |
#[derive(Debug, Clone, Default)]
pub struct TimeCropGate {
    open_at: f64,
    duration: f64,
    elapsed: f64,
    state: GateState,
}

impl TimeCropGate {
    /// Creates a time window gate.
    pub fn new(open_at: f64, duration: f64) -> Self {
        Self {
            open_at,
            duration,
            ..Self::default()
        }
    }

    /// State after the last processed block.
    pub fn state(&self) -> GateState {
        self.state
    }

    fn analyze(&mut self, buffer: &SampleBuffer) {
        let end = self.open_at + self.duration;
        let open = self.elapsed >= self.open_at && (self.duration == 0.0 || self.elapsed < end);
        let next = if open { GateState::Open } else { GateState::Closed };

        #[cfg(feature = "tracing")]
        if next != self.state {
            tracing::debug!(elapsed = self.elapsed, state = ?next, "time crop gate");
        }

        self.state = next;
        self.elapsed += buffer.length_in_seconds();
    }
}

impl Operator for TimeCropGate {
    fn name(&self) -> &str {
        "Time crop gate"
    }

    fn description(&self) -> &str {
        "Passes audio only between two points in time."
    }

    fn keyword(&self) -> &str {
        "gc"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("open-at-sec,duration-sec")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => {
                self.open_at = f64::from(value);
                self.elapsed = 0.0;
            }
            2 => self.duration = f64::from(value),
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.open_at as f32,
            2 => self.duration as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if (1..=2).contains(&index) {
            *desc = desc.with_default(0.0).with_lower_bound(0.0);
        }
    }
}

impl ChainOperator for TimeCropGate {
    fn init(&mut self, _buffer: &SampleBuffer) {
        self.elapsed = 0.0;
        self.state = GateState::Closed;
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.analyze(buffer);
        apply(self.state, buffer);
    }
}

/// Opens once the level rises above one threshold and closes for good once
/// it falls below another.
///
/// The level of a block is its RMS or its average absolute amplitude across
/// all channels, as a percentage of full scale.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | threshold-openlevel-% | 0.0–100.0 | 0.0 |
/// | 2 | threshold-closelevel-% | 0.0–100.0 | 0.0 |
/// | 3 | rms-enabled | toggle | 0 |
#[derive(Debug, Clone, Default)]
pub struct ThresholdGate {
    open_percent: f32,
    close_percent: f32,
    rms: bool,
    has_opened: bool,
    has_closed: bool,
    state: GateState,
}

impl ThresholdGate {
    /// Creates a threshold gate.
    pub fn new(open_percent: f32, close_percent: f32, rms: bool) -> Self {
        Self {
            open_percent,
            close_percent,
            rms,
            ..Self::default()
        }
    }

    /// State after the last processed block.
    pub fn state(&self) -> GateState {
        self.state
    }

    fn level(&self, buffer: &SampleBuffer) -> f32 {
        let count = buffer.channel_count() * buffer.frame_count();
        if count == 0 {
            return 0.0;
        }
        let samples = buffer.channels().flatten();
        let level = if self.rms {
            libm::sqrtf(samples.map(|s| s * s).sum::<f32>() / count as f32)
        } else {
            samples.map(|s| s.abs()).sum::<f32>() / count as f32
        };
        level * 100.0
    }

    fn analyze(&mut self, buffer: &SampleBuffer) {
        let level = self.level(buffer);
        if !self.has_opened {
            if level > self.open_percent {
                self.has_opened = true;
                self.state = GateState::Open;
                #[cfg(feature = "tracing")]
                tracing::debug!(level, "threshold gate opened");
            }
        } else if !self.has_closed && level < self.close_percent {
            self.has_closed = true;
            self.state = GateState::Closed;
            #[cfg(feature = "tracing")]
            tracing::debug!(level, "threshold gate closed");
        }
    }
}

impl Operator for ThresholdGate {
    fn name(&self) -> &str {
        "Threshold gate"
    }

    fn description(&self) -> &str {
        "Starts passing audio above one level and stops below another."
    }

    fn keyword(&self) -> &str {
        "ge"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("threshold-openlevel-%,threshold-closelevel-%,rms-enabled")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.open_percent = value,
            2 => self.close_percent = value,
            3 => self.rms = value != 0.0,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.open_percent,
            2 => self.close_percent,
            3 => f32::from(u8::from(self.rms)),
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 | 2 => *desc = desc.with_default(0.0).bounded(0.0, 100.0),
            3 => {
                *desc = desc
                    .with_default(0.0)
                    .bounded(0.0, 1.0)
                    .with_flags(ParamFlags::TOGGLED.union(ParamFlags::INTEGER));
            }
            _ => {}
        }
    }
}

impl ChainOperator for ThresholdGate {
    fn init(&mut self, _buffer: &SampleBuffer) {
        self.has_opened = false;
        self.has_closed = false;
        self.state = GateState::Closed;
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.analyze(buffer);
        apply(self.state, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 25 frames at 100 Hz: each block is a quarter second.
    fn block(level: f32) -> SampleBuffer {
        let mut buf = SampleBuffer::new(1, 25, 100);
        buf.channel_mut(0).fill(level);
        buf
    }

    #[test]
    fn test_time_crop_window() {
        let mut gate = TimeCropGate::new(0.5, 0.5);
        gate.init(&block(0.0));
        let mut frames = Vec::new();
        for _ in 0..6 {
            let mut buf = block(0.5);
            gate.process(&mut buf);
            frames.push(buf.frame_count());
        }
        assert_eq!(frames, vec![0, 0, 25, 25, 0, 0]);
    }

    #[test]
    fn test_time_crop_zero_duration_stays_open() {
        let mut gate = TimeCropGate::new(0.1, 0.0);
        gate.init(&block(0.0));
        let mut buf = block(0.5);
        gate.process(&mut buf);
        assert_eq!(buf.frame_count(), 0);
        for _ in 0..5 {
            let mut buf = block(0.5);
            gate.process(&mut buf);
            assert_eq!(buf.frame_count(), 25);
        }
        assert_eq!(gate.state(), GateState::Open);
    }

    #[test]
    fn test_threshold_gate_opens_then_closes_for_good() {
        let mut gate = ThresholdGate::new(20.0, 10.0, false);
        gate.init(&block(0.0));

        let levels = [0.05, 0.5, 0.3, 0.05, 0.5];
        let frames: Vec<usize> = levels
            .iter()
            .map(|&l| {
                let mut buf = block(l);
                gate.process(&mut buf);
                buf.frame_count()
            })
            .collect();
        assert_eq!(frames, vec![0, 25, 25, 0, 0]);
    }

    #[test]
    fn test_threshold_gate_rms_level() {
        let gate = ThresholdGate::new(0.0, 0.0, true);
        let mut buf = SampleBuffer::new(1, 2, 100);
        buf.channel_mut(0).copy_from_slice(&[0.6, -0.8]);
        let rms = gate.level(&buf);
        assert!((rms - libm::sqrtf(0.5) * 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_threshold_gate_reinit_resets() {
        let mut gate = ThresholdGate::new(20.0, 10.0, false);
        gate.init(&block(0.0));
        gate.process(&mut block(0.5));
        gate.process(&mut block(0.0));
        assert_eq!(gate.state(), GateState::Closed);
        gate.init(&block(0.0));
        let mut buf = block(0.5);
        gate.process(&mut buf);
        assert_eq!(buf.frame_count(), 25);
    }
}
