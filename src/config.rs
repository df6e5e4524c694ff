//! Configuration builders controlling vocabulary builds, corpus ingestion, and
//! batch sampling.

use crate::error::{CocapError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for caption vocabulary construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VocabConfig {
    /// Minimum number of corpus occurrences required before a word is kept.
    pub threshold: usize,
    /// Marker token prepended to every encoded caption (id 0).
    pub start_token: String,
    /// Marker token appended to every encoded caption (id 1).
    pub end_token: String,
    /// Marker token substituted for out-of-vocabulary words (id 2).
    pub unk_token: String,
    /// Lowercases captions before tokenization.
    pub lowercase: bool,
    /// Enables phase-level logging through the `log` facade.
    pub show_progress: bool,
}

impl VocabConfig {
    /// Returns a builder initialised with [`VocabConfig::default`].
    #[must_use]
    pub fn builder() -> VocabConfigBuilder {
        VocabConfigBuilder::default()
    }

    /// Validates the invariants required for building a vocabulary.
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(CocapError::InvalidConfig(
                "threshold must be greater than zero".into(),
            ));
        }
        for (name, token) in [
            ("start_token", &self.start_token),
            ("end_token", &self.end_token),
            ("unk_token", &self.unk_token),
        ] {
            if token.is_empty() {
                return Err(CocapError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
        }
        if self.start_token == self.end_token
            || self.start_token == self.unk_token
            || self.end_token == self.unk_token
        {
            return Err(CocapError::InvalidConfig(format!(
                "marker tokens must be pairwise distinct (start={:?}, end={:?}, unk={:?})",
                self.start_token, self.end_token, self.unk_token
            )));
        }
        Ok(())
    }
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            start_token: "<start>".into(),
            end_token: "<end>".into(),
            unk_token: "<unk>".into(),
            lowercase: true,
            show_progress: true,
        }
    }
}

/// Builder for [`VocabConfig`].
#[derive(Debug, Default, Clone)]
pub struct VocabConfigBuilder {
    cfg: VocabConfig,
}

impl VocabConfigBuilder {
    /// Creates a builder with [`VocabConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum word frequency.
    #[must_use]
    pub fn threshold(mut self, value: usize) -> Self {
        self.cfg.threshold = value;
        self
    }

    /// Overrides the start marker token.
    #[must_use]
    pub fn start_token<S: Into<String>>(mut self, token: S) -> Self {
        self.cfg.start_token = token.into();
        self
    }

    /// Overrides the end marker token.
    #[must_use]
    pub fn end_token<S: Into<String>>(mut self, token: S) -> Self {
        self.cfg.end_token = token.into();
        self
    }

    /// Overrides the unknown marker token.
    #[must_use]
    pub fn unk_token<S: Into<String>>(mut self, token: S) -> Self {
        self.cfg.unk_token = token.into();
        self
    }

    /// Enables or disables lowercasing of captions before tokenization.
    #[must_use]
    pub fn lowercase(mut self, enabled: bool) -> Self {
        self.cfg.lowercase = enabled;
        self
    }

    /// Enables or disables phase-level logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`VocabConfig`].
    pub fn build(self) -> Result<VocabConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how caption corpora are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Hard cap on loaded captions; `None` loads everything.
    pub max_captions: Option<usize>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            max_captions: None,
        }
    }
}

impl CorpusConfig {
    /// Returns a builder initialised with [`CorpusConfig::default`].
    #[must_use]
    pub fn builder() -> CorpusConfigBuilder {
        CorpusConfigBuilder::default()
    }

    /// Validates the invariants required for corpus loading.
    pub fn validate(&self) -> Result<()> {
        if self.max_captions == Some(0) {
            return Err(CocapError::InvalidConfig(
                "max_captions must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`CorpusConfig`].
#[derive(Debug, Default, Clone)]
pub struct CorpusConfigBuilder {
    cfg: CorpusConfig,
}

impl CorpusConfigBuilder {
    /// Creates a new builder with [`CorpusConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Caps the number of captions loaded from the corpus.
    #[must_use]
    pub fn max_captions(mut self, value: Option<usize>) -> Self {
        self.cfg.max_captions = value;
        self
    }

    /// Finalises the builder, returning a validated [`CorpusConfig`].
    pub fn build(self) -> Result<CorpusConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration for length-stratified batch sampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplerConfig {
    /// Number of caption indices drawn per batch.
    pub batch_size: usize,
    /// Seed for the sampler RNG; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            seed: None,
        }
    }
}

impl SamplerConfig {
    /// Returns a builder initialised with [`SamplerConfig::default`].
    #[must_use]
    pub fn builder() -> SamplerConfigBuilder {
        SamplerConfigBuilder::default()
    }

    /// Validates the invariants required for sampling.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CocapError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`SamplerConfig`].
#[derive(Debug, Default, Clone)]
pub struct SamplerConfigBuilder {
    cfg: SamplerConfig,
}

impl SamplerConfigBuilder {
    /// Creates a new builder with [`SamplerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of indices drawn per batch.
    #[must_use]
    pub fn batch_size(mut self, value: usize) -> Self {
        self.cfg.batch_size = value;
        self
    }

    /// Seeds the sampler RNG for reproducible draws.
    #[must_use]
    pub fn seed(mut self, value: Option<u64>) -> Self {
        self.cfg.seed = value;
        self
    }

    /// Finalises the builder, returning a validated [`SamplerConfig`].
    pub fn build(self) -> Result<SamplerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocab_builder_overrides_defaults() {
        let cfg = VocabConfig::builder()
            .threshold(2)
            .start_token("<s>")
            .end_token("</s>")
            .lowercase(false)
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.threshold, 2);
        assert_eq!(cfg.start_token, "<s>");
        assert_eq!(cfg.end_token, "</s>");
        assert_eq!(cfg.unk_token, "<unk>");
        assert!(!cfg.lowercase);
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let cfg = VocabConfig {
            threshold: 0,
            ..VocabConfig::default()
        };
        let err = cfg.validate().expect_err("validation should fail");
        assert!(matches!(
            err,
            CocapError::InvalidConfig(message) if message.contains("threshold")
        ));
    }

    #[test]
    fn validate_rejects_colliding_markers() {
        let err = VocabConfig::builder()
            .end_token("<start>")
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            CocapError::InvalidConfig(message) if message.contains("pairwise distinct")
        ));
    }

    #[test]
    fn corpus_builder_overrides_defaults() {
        let cfg = CorpusConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .max_captions(Some(128))
            .build()
            .expect("config should be valid");
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
        assert_eq!(cfg.max_captions, Some(128));
    }

    #[test]
    fn corpus_rejects_zero_cap() {
        let err = CorpusConfig::builder()
            .max_captions(Some(0))
            .build()
            .expect_err("validation should fail");
        assert!(matches!(err, CocapError::InvalidConfig(_)));
    }

    #[test]
    fn sampler_rejects_zero_batch_size() {
        let err = SamplerConfig::builder()
            .batch_size(0)
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            CocapError::InvalidConfig(message) if message.contains("batch_size")
        ));
    }
}
