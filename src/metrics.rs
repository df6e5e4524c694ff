//! Metrics describing a vocabulary build.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Aggregate statistics captured while scanning a corpus into a vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildMetrics {
    /// Number of captions scanned.
    pub captions: usize,
    /// Total token occurrences observed across the corpus.
    pub tokens: usize,
    /// Count of distinct words seen before thresholding.
    pub distinct_words: usize,
    /// Words retained at or above the frequency threshold.
    pub kept_words: usize,
    /// Words dropped for falling below the threshold.
    pub dropped_words: usize,
    /// Fraction of token occurrences the finished vocabulary resolves without
    /// the unknown marker.
    pub coverage: f64,
    /// Total duration of the build.
    pub total_duration: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

impl BuildMetrics {
    /// Creates a zeroed metrics container, used when a vocabulary is reloaded
    /// from disk instead of rebuilt.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            captions: 0,
            tokens: 0,
            distinct_words: 0,
            kept_words: 0,
            dropped_words: 0,
            coverage: 0.0,
            total_duration: Duration::ZERO,
            rss_kb: None,
        }
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let vm_rss = status.lines().find_map(|line| line.strip_prefix("VmRSS:"))?;
    vm_rss
        .split_whitespace()
        .find_map(|part| part.parse::<usize>().ok())
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the process resident set size in kilobytes where available.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
