use super::graph::AudioGraphManager;
use super::nodes::AnalyserConfig;

/// One render tick worth of analyser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySample {
    /// Byte magnitude per frequency bin.
    pub bins: Vec<u8>,
    /// Most recent time-domain samples, 128 = silence.
    pub waveform: Vec<u8>,
}

impl FrequencySample {
    pub fn silent(bin_count: usize, waveform_len: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
            waveform: vec![128; waveform_len],
        }
    }

    #[cfg(test)]
    pub(crate) fn is_silent(&self) -> bool {
        self.bins.iter().all(|&b| b == 0)
    }
}

/// Mean magnitude of the low, mid and high thirds of the bin axis, in [0, 1].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct BandSummary {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

/// Pulls analyser buffers into a scratch sample sized once from the graph
/// configuration.
#[derive(Debug)]
pub struct FrequencySampler {
    scratch: FrequencySample,
}

impl FrequencySampler {
    pub fn new(config: &AnalyserConfig) -> Self {
        Self {
            scratch: FrequencySample::silent(config.bin_count(), config.fft_size),
        }
    }

    /// Latest sample, or a zero-filled one when no running graph is bound.
    pub fn sample(&mut self, graph: &AudioGraphManager) -> &FrequencySample {
        match graph.analyser() {
            Some(analyser) => {
                analyser.byte_frequency_data(&mut self.scratch.bins);
                analyser.byte_time_domain_data(&mut self.scratch.waveform);
            }
            None => {
                self.scratch.bins.fill(0);
                self.scratch.waveform.fill(128);
            }
        }
        &self.scratch
    }
}

/// Split the bins into three contiguous thirds and average each.
///
/// Remainders go to the upper bands, so with fewer than three bins the bass
/// band may be empty and reads as zero.
pub fn band_summary(sample: &FrequencySample) -> BandSummary {
    let n = sample.bins.len();
    let low_end = n / 3;
    let mid_end = 2 * n / 3;
    BandSummary {
        bass: mean_level(&sample.bins[..low_end]),
        mid: mean_level(&sample.bins[low_end..mid_end]),
        treble: mean_level(&sample.bins[mid_end..]),
    }
}

/// Mean of all bins, normalized to [0, 1].
pub fn average_level(sample: &FrequencySample) -> f32 {
    mean_level(&sample.bins)
}

fn mean_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
    sum as f32 / (bins.len() as f32 * 255.0)
}
