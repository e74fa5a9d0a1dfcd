//! Signal analysers and DC offset tools.
//!
//! Analysers pass audio through untouched and expose their findings as
//! output parameters and through [`ChainOperator::status`].

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt::Write as _;

use catena_core::{
    ChainOperator, MAX_AMPLITUDE, Operator, ParamDescriptor, ParamFlags, SampleBuffer, param_names,
};

/// Level at which a sample counts as clipped: one 16-bit step below full scale.
pub const CLIP_AMPLITUDE: f32 = MAX_AMPLITUDE - MAX_AMPLITUDE / 16384.0;

/// Number of amplitude buckets, eight per polarity.
pub const BUCKET_COUNT: usize = 16;

/// Lower edges of the positive buckets as a fraction of full scale:
/// -1, -2, -4, -8, -16, -32 and -64 dB. Anything quieter lands in the last
/// bucket.
const BUCKET_EDGES: [f32; 7] = [0.891, 0.794, 0.631, 0.398, 0.158, 0.025, 0.001];

const BUCKET_LABELS: [&str; BUCKET_COUNT] = [
    "Pos   -1.0 dB",
    "Pos   -2.0 dB",
    "Pos   -4.0 dB",
    "Pos   -8.0 dB",
    "Pos  -16.0 dB",
    "Pos  -32.0 dB",
    "Pos  -64.0 dB",
    "Pos -inf.0 dB",
    "Neg -inf.0 dB",
    "Neg  -64.0 dB",
    "Neg  -32.0 dB",
    "Neg  -16.0 dB",
    "Neg   -8.0 dB",
    "Neg   -4.0 dB",
    "Neg   -2.0 dB",
    "Neg   -1.0 dB",
];

/// Bucket index of one sample. Positive buckets run loud to quiet (0..8),
/// negative buckets quiet to loud (8..16).
fn bucket_of(sample: f32) -> usize {
    let magnitude = sample.abs() / MAX_AMPLITUDE;
    let rank = BUCKET_EDGES
        .iter()
        .position(|&edge| magnitude > edge)
        .unwrap_or(BUCKET_EDGES.len());
    if sample >= 0.0 { rank } else { BUCKET_COUNT - 1 - rank }
}

/// Peak and clip counters over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakStats {
    /// Largest positive sample.
    pub max_positive: f32,
    /// Largest negative sample magnitude.
    pub max_negative: f32,
    /// Samples at or above [`CLIP_AMPLITUDE`].
    pub clipped_positive: u64,
    /// Samples at or below `-CLIP_AMPLITUDE`.
    pub clipped_negative: u64,
}

impl PeakStats {
    fn record(&mut self, sample: f32) {
        if sample >= 0.0 {
            self.max_positive = self.max_positive.max(sample);
            if sample >= CLIP_AMPLITUDE {
                self.clipped_positive += 1;
            }
        } else {
            self.max_negative = self.max_negative.max(-sample);
            if sample <= -CLIP_AMPLITUDE {
                self.clipped_negative += 1;
            }
        }
    }
}

/// Amplitude histogram with peak and clip statistics.
///
/// Counts every sample into one of 16 buckets per channel and tracks peaks
/// and clipped samples both for the whole run and for the current reporting
/// period. [`report`](Self::report) formats the statistics and, unless
/// cumulative mode is on, starts a new period.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | cumulative-mode | toggle | 0 |
/// | 2 | result-max-multiplier | output | 1.0 |
#[derive(Debug, Clone, Default)]
pub struct VolumeBuckets {
    cumulative: bool,
    buckets: Vec<[u64; BUCKET_COUNT]>,
    samples: Vec<u64>,
    total: PeakStats,
    period: PeakStats,
}

impl VolumeBuckets {
    /// Creates an analyser in periodic mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket counts of `channel` for the current period.
    pub fn buckets(&self, channel: usize) -> Option<&[u64; BUCKET_COUNT]> {
        self.buckets.get(channel)
    }

    /// Statistics since init.
    pub fn total(&self) -> PeakStats {
        self.total
    }

    /// Statistics of the current period.
    pub fn period(&self) -> PeakStats {
        self.period
    }

    /// Largest gain that would not clip the loudest sample seen so far.
    ///
    /// Never below 1.0; 0.0 if nothing but silence has been seen.
    pub fn max_multiplier(&self) -> f32 {
        let peak = self.total.max_positive.max(self.total.max_negative);
        if peak == 0.0 {
            return 0.0;
        }
        (MAX_AMPLITUDE / peak).max(1.0)
    }

    /// Formats the statistics and, in periodic mode, resets the period.
    pub fn report(&mut self) -> String {
        let text = self.status();
        if !self.cumulative {
            self.reset_period();
        }
        text
    }

    fn reset_period(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = [0; BUCKET_COUNT]);
        self.samples.iter_mut().for_each(|n| *n = 0);
        self.period = PeakStats::default();
    }
}

impl Operator for VolumeBuckets {
    fn name(&self) -> &str {
        "Volume analysis"
    }

    fn description(&self) -> &str {
        "Amplitude histogram, peaks and clipped sample counts."
    }

    fn keyword(&self) -> &str {
        "ev"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("cumulative-mode,result-max-multiplier")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.cumulative = value != 0.0;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => f32::from(u8::from(self.cumulative)),
            2 => self.max_multiplier(),
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => {
                *desc = desc
                    .with_default(0.0)
                    .bounded(0.0, 1.0)
                    .with_flags(ParamFlags::TOGGLED.union(ParamFlags::INTEGER));
            }
            2 => *desc = desc.with_default(1.0).with_flags(ParamFlags::OUTPUT),
            _ => {}
        }
    }
}

impl ChainOperator for VolumeBuckets {
    fn init(&mut self, buffer: &SampleBuffer) {
        let channels = buffer.channel_count();
        self.buckets.resize(channels, [0; BUCKET_COUNT]);
        self.samples.resize(channels, 0);
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.buckets.len() < buffer.channel_count() {
            self.buckets.resize(buffer.channel_count(), [0; BUCKET_COUNT]);
            self.samples.resize(buffer.channel_count(), 0);
        }
        for (ch, samples) in buffer.channels().enumerate() {
            self.samples[ch] += samples.len() as u64;
            for &s in samples {
                self.buckets[ch][bucket_of(s)] += 1;
                self.total.record(s);
                self.period.record(s);
            }
        }
    }

    fn status(&self) -> String {
        let mut out = String::from("-- Amplitude statistics --\nRange, count (%), ch1...n");
        for (bucket, label) in BUCKET_LABELS.iter().enumerate() {
            let _ = write!(out, "\n{label}:");
            for (counts, &n) in self.buckets.iter().zip(&self.samples) {
                let _ = write!(out, "\t{}", counts[bucket]);
                if self.cumulative && n > 0 {
                    let _ = write!(out, ",{:.3}%", 100.0 * counts[bucket] as f64 / n as f64);
                }
            }
        }
        let _ = write!(
            out,
            "\nPeak amplitude, period: pos={:.5} neg={:.5}\
             \nPeak amplitude, all   : pos={:.5} neg={:.5}\
             \nClipped samples, period: pos={} neg={}\
             \nClipped samples, all   : pos={} neg={}\
             \nMax gain without clipping, all: {:.5}",
            self.period.max_positive,
            self.period.max_negative,
            self.total.max_positive,
            self.total.max_negative,
            self.period.clipped_positive,
            self.period.clipped_negative,
            self.total.clipped_positive,
            self.total.clipped_negative,
            self.max_multiplier(),
        );
        out
    }
}

/// Measures the DC offset of each channel.
///
/// Has one output parameter per channel, `result-offset-chN`, holding the
/// value that would center that channel around zero. The parameter list is
/// empty until the operator has been initialised.
#[derive(Debug, Clone, Default)]
pub struct DcFind {
    positive: Vec<f64>,
    negative: Vec<f64>,
    samples: Vec<u64>,
}

impl DcFind {
    /// Creates a DC analyser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset that would remove the DC component of `channel`.
    pub fn offset(&self, channel: usize) -> f32 {
        let (Some(&pos), Some(&neg), Some(&n)) = (
            self.positive.get(channel),
            self.negative.get(channel),
            self.samples.get(channel),
        ) else {
            return 0.0;
        };
        if n == 0 {
            return 0.0;
        }
        ((neg - pos) / n as f64) as f32
    }
}

impl Operator for DcFind {
    fn name(&self) -> &str {
        "DC-Find"
    }

    fn description(&self) -> &str {
        "Finds the offset that removes DC from each channel."
    }

    fn keyword(&self) -> &str {
        "ezf"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        (1..=self.samples.len())
            .map(|ch| Cow::Owned(format!("result-offset-ch{ch}")))
            .collect()
    }

    fn number_of_params(&self) -> usize {
        self.samples.len()
    }

    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn get_parameter(&self, index: usize) -> f32 {
        if self.is_parameter_index(index) {
            self.offset(index - 1)
        } else {
            0.0
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if self.is_parameter_index(index) {
            *desc = desc.with_default(0.0).with_flags(ParamFlags::OUTPUT);
        }
    }
}

impl ChainOperator for DcFind {
    fn init(&mut self, buffer: &SampleBuffer) {
        let channels = buffer.channel_count();
        self.positive = vec![0.0; channels];
        self.negative = vec![0.0; channels];
        self.samples = vec![0; channels];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let tracked = self.samples.len();
        for (ch, samples) in buffer.channels().enumerate().take(tracked) {
            for &s in samples {
                if s > 0.0 {
                    self.positive[ch] += f64::from(s);
                } else {
                    self.negative[ch] += f64::from(s.abs());
                }
            }
            self.samples[ch] += samples.len() as u64;
        }
    }

    fn status(&self) -> String {
        format!(
            "Optimal value for DC-adjust: {:.5} (left), {:.5} (right).",
            self.offset(0),
            self.offset(1)
        )
    }
}

/// Adds a constant offset to the first two channels.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delta-value-left | any | 0.0 |
/// | 2 | delta-value-right | any | 0.0 |
#[derive(Debug, Clone, Default)]
pub struct DcFix {
    deltas: [f32; 2],
}

impl DcFix {
    /// Creates a DC adjuster.
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            deltas: [left, right],
        }
    }
}

impl Operator for DcFix {
    fn name(&self) -> &str {
        "DC-Fix"
    }

    fn description(&self) -> &str {
        "Adds a fixed DC offset to the left and right channels."
    }

    fn keyword(&self) -> &str {
        "ezx"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delta-value-left,delta-value-right")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if let Some(delta) = index.checked_sub(1).and_then(|i| self.deltas.get_mut(i)) {
            *delta = value;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        index
            .checked_sub(1)
            .and_then(|i| self.deltas.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if (1..=2).contains(&index) {
            *desc = desc.with_default(0.0);
        }
    }
}

impl ChainOperator for DcFix {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        for (channel, &delta) in buffer.channels_mut().zip(&self.deltas) {
            channel.iter_mut().for_each(|s| *s += delta);
        }
    }
}

/// Peak amplitude watcher.
///
/// Tracks the largest absolute sample of each channel. Its output
/// parameters, `peak-amplitude-chN`, read and reset the peak: every read
/// returns the loudest sample since the previous read of that channel, so a
/// controller or meter polling once per block sees block peaks. The
/// parameter list is empty until the operator has been initialised.
#[derive(Debug, Clone, Default)]
pub struct VolumePeak {
    peaks: Vec<Cell<f32>>,
}

impl VolumePeak {
    /// Creates a peak watcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Peak of `channel` since its last read, without resetting it.
    pub fn peak(&self, channel: usize) -> f32 {
        self.peaks.get(channel).map_or(0.0, Cell::get)
    }

    /// Peak of `channel` since its last read, resetting it to zero.
    pub fn take_peak(&self, channel: usize) -> f32 {
        self.peaks.get(channel).map_or(0.0, |p| p.replace(0.0))
    }
}

impl Operator for VolumePeak {
    fn name(&self) -> &str {
        "Peak amplitude watcher"
    }

    fn description(&self) -> &str {
        "Reports the peak amplitude of each channel since the last read."
    }

    fn keyword(&self) -> &str {
        "evp"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        (1..=self.peaks.len())
            .map(|ch| Cow::Owned(format!("peak-amplitude-ch{ch}")))
            .collect()
    }

    fn number_of_params(&self) -> usize {
        self.peaks.len()
    }

    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn get_parameter(&self, index: usize) -> f32 {
        match index.checked_sub(1) {
            Some(ch) => self.take_peak(ch),
            None => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if self.is_parameter_index(index) {
            *desc = desc
                .with_default(0.0)
                .with_lower_bound(0.0)
                .with_flags(ParamFlags::OUTPUT);
        }
    }
}

impl ChainOperator for VolumePeak {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.peaks = vec![Cell::new(0.0); buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        for (samples, peak) in buffer.channels().zip(&self.peaks) {
            let block = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            if block > peak.get() {
                peak.set(block);
            }
        }
    }

    fn status(&self) -> String {
        let mut out = String::from("Peak amplitude:");
        for (ch, peak) in self.peaks.iter().enumerate() {
            let _ = write!(out, " ch{}={:.5}", ch + 1, peak.get());
        }
        out
    }
}
