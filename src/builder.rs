//! Corpus scanning pass responsible for producing [`Vocab`] artefacts.

use std::time::Instant;
use std::{fmt, path::Path};

use log::{info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::{CorpusConfig, VocabConfig, VocabConfigBuilder};
use crate::corpus::load_captions;
use crate::error::{CocapError, Result};
use crate::metrics::{sample_rss_kb, BuildMetrics};
use crate::serialization::{load_vocab, save_vocab};
use crate::tokenize::tokenize;
use crate::vocab::{SpecialTokens, Vocab};

/// High-level façade configuring and executing vocabulary builds.
#[derive(Debug, Clone)]
pub struct VocabBuilder {
    cfg: VocabConfig,
}

/// Artifacts returned after a build completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct BuildArtifacts {
    /// Finished vocabulary.
    pub vocab: Vocab,
    /// Statistics captured while scanning the corpus.
    pub metrics: BuildMetrics,
}

impl VocabBuilder {
    /// Creates a new builder for the supplied configuration.
    #[must_use]
    pub fn new(cfg: VocabConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`VocabConfigBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> VocabConfigBuilder {
        VocabConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &VocabConfig {
        &self.cfg
    }

    /// Builds a vocabulary by loading caption files according to [`CorpusConfig`].
    pub fn build_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        corpus: &CorpusConfig,
    ) -> Result<BuildArtifacts> {
        let records = load_captions(inputs, corpus)?;
        if self.cfg.show_progress {
            info!("loaded {} captions from {} inputs", records.len(), inputs.len());
        }
        let captions: Vec<String> = records.into_iter().map(|record| record.caption).collect();
        self.build_from_captions(&captions)
    }

    /// Builds a vocabulary from in-memory captions.
    ///
    /// The corpus is scanned exactly once: captions are tokenized in parallel,
    /// then word frequencies and first-occurrence order are accumulated in a
    /// sequential pass so rebuilds over the same corpus assign identical ids.
    pub fn build_from_captions<S: AsRef<str> + Sync>(
        &self,
        captions: &[S],
    ) -> Result<BuildArtifacts> {
        if captions.is_empty() {
            return Err(CocapError::Corpus(
                "building requires at least one caption".into(),
            ));
        }
        self.cfg.validate()?;

        let build_start = Instant::now();
        let tokenized: Vec<Vec<String>> = captions
            .par_iter()
            .map(|caption| tokenize(caption.as_ref(), self.cfg.lowercase))
            .collect();
        let total_tokens: usize = tokenized.iter().map(Vec::len).sum();
        if self.cfg.show_progress {
            info!(
                "tokenized {} captions into {} tokens",
                captions.len(),
                total_tokens
            );
        }

        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();
        for tokens in &tokenized {
            for token in tokens {
                match counts.get_mut(token) {
                    Some(count) => *count += 1,
                    None => {
                        counts.insert(token.clone(), 1);
                        order.push(token.clone());
                    }
                }
            }
        }
        let distinct_words = order.len();

        let specials = SpecialTokens {
            start: self.cfg.start_token.clone(),
            end: self.cfg.end_token.clone(),
            unk: self.cfg.unk_token.clone(),
        };
        let mut vocab = Vocab::new(specials, self.cfg.threshold, self.cfg.lowercase)?;
        let mut kept_occurrences = 0usize;
        for word in order {
            let count = counts.get(&word).copied().unwrap_or(0);
            if count < self.cfg.threshold {
                continue;
            }
            if vocab.specials().contains(&word) {
                warn!("corpus word {word:?} collides with a reserved marker and was skipped");
                continue;
            }
            if vocab.push_word(word)?.is_some() {
                kept_occurrences += count;
            }
        }

        let kept_words = vocab.corpus_len();
        if kept_words == 0 {
            warn!(
                "threshold {} retained no corpus words; every caption word will encode as the unknown marker",
                self.cfg.threshold
            );
        }
        let coverage = if total_tokens == 0 {
            0.0
        } else {
            kept_occurrences as f64 / total_tokens as f64
        };
        let total_duration = build_start.elapsed();
        let metrics = BuildMetrics {
            captions: captions.len(),
            tokens: total_tokens,
            distinct_words,
            kept_words,
            dropped_words: distinct_words - kept_words,
            coverage,
            total_duration,
            rss_kb: sample_rss_kb(),
        };

        if self.cfg.show_progress {
            info!(
                "kept {} of {} distinct words (threshold {}) covering {:.2}% of tokens in {:.2?}",
                kept_words,
                distinct_words,
                self.cfg.threshold,
                coverage * 100.0,
                total_duration
            );
        }

        Ok(BuildArtifacts { vocab, metrics })
    }

    /// Reloads a previously saved vocabulary, or builds and saves a fresh one.
    ///
    /// When `vocab_path` exists it is loaded as-is and the returned metrics are
    /// zeroed; otherwise the corpus at `inputs` is scanned and the result is
    /// persisted to `vocab_path` before returning.
    pub fn load_or_build<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        vocab_path: Q,
        inputs: &[P],
        corpus: &CorpusConfig,
    ) -> Result<BuildArtifacts> {
        let vocab_path = vocab_path.as_ref();
        if vocab_path.exists() {
            let vocab = load_vocab(vocab_path)?;
            if self.cfg.show_progress {
                info!(
                    "reusing vocabulary with {} entries from {}",
                    vocab.len(),
                    vocab_path.display()
                );
            }
            return Ok(BuildArtifacts {
                vocab,
                metrics: BuildMetrics::empty(),
            });
        }
        let artifacts = self.build_from_paths(inputs, corpus)?;
        save_vocab(&artifacts.vocab, vocab_path, false)?;
        Ok(artifacts)
    }
}

impl fmt::Display for BuildArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "word vocabulary with {} entries ({} corpus words)",
            self.vocab.len(),
            self.vocab.corpus_len()
        )?;
        writeln!(f, "Coverage: {:.2}%", self.metrics.coverage * 100.0)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
