//! Length-stratified batch sampling over caption corpora.
//!
//! Training batches for caption decoders want captions of identical token
//! count so no padding is required. The sampler groups caption indices into
//! per-length buckets, draws a length with probability proportional to how
//! often it occurs in the corpus, then draws `batch_size` indices uniformly
//! (with replacement) from that bucket.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::SamplerConfig;
use crate::error::{CocapError, Result};
use crate::tokenize::token_count;

/// Caption indices sharing one exact token count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthBucket {
    /// Token count shared by every caption in the bucket.
    pub length: usize,
    /// Corpus indices of those captions, in corpus order.
    pub indices: Vec<usize>,
}

/// One sampled batch of same-length caption indices.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Batch {
    /// Token count shared by every index in the batch.
    pub length: usize,
    /// Sampled corpus indices, drawn with replacement.
    pub indices: Vec<usize>,
}

/// Draws same-length caption batches whose lengths follow the corpus
/// distribution.
#[must_use]
#[derive(Debug, Clone)]
pub struct LengthSampler {
    lengths: Vec<usize>,
    buckets: Vec<LengthBucket>,
    by_length: WeightedIndex<usize>,
    rng: StdRng,
    batch_size: usize,
}

impl LengthSampler {
    /// Builds a sampler over precomputed caption token counts.
    ///
    /// `lengths[i]` is the token count of the caption at corpus index `i`.
    /// The RNG is seeded from [`SamplerConfig::seed`] when set, otherwise
    /// from OS entropy.
    pub fn new(lengths: Vec<usize>, cfg: &SamplerConfig) -> Result<Self> {
        cfg.validate()?;
        if lengths.is_empty() {
            return Err(CocapError::Corpus(
                "sampling requires at least one caption length".into(),
            ));
        }
        let mut grouped: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (index, &length) in lengths.iter().enumerate() {
            grouped.entry(length).or_default().push(index);
        }
        let mut buckets: Vec<LengthBucket> = grouped
            .into_iter()
            .map(|(length, indices)| LengthBucket { length, indices })
            .collect();
        buckets.sort_by_key(|bucket| bucket.length);
        let by_length = WeightedIndex::new(buckets.iter().map(|bucket| bucket.indices.len()))
            .map_err(|err| CocapError::Internal(format!("length weights rejected: {err}")))?;
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            lengths,
            buckets,
            by_length,
            rng,
            batch_size: cfg.batch_size,
        })
    }

    /// Tokenizes `captions` in parallel and builds a sampler over their token
    /// counts.
    pub fn from_captions<S: AsRef<str> + Sync>(
        captions: &[S],
        cfg: &SamplerConfig,
    ) -> Result<Self> {
        let lengths: Vec<usize> = captions
            .par_iter()
            .map(|caption| token_count(caption.as_ref()))
            .collect();
        Self::new(lengths, cfg)
    }

    /// Draws a caption length with probability proportional to its corpus
    /// frequency.
    pub fn sample_length(&mut self) -> usize {
        self.buckets[self.by_length.sample(&mut self.rng)].length
    }

    /// Draws one batch: a length, then `batch_size` indices uniformly with
    /// replacement from that length's bucket.
    pub fn sample_batch(&mut self) -> Batch {
        let choice = self.by_length.sample(&mut self.rng);
        let bucket = &self.buckets[choice];
        let mut indices = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let pick = self.rng.gen_range(0..bucket.indices.len());
            indices.push(bucket.indices[pick]);
        }
        Batch {
            length: bucket.length,
            indices,
        }
    }

    /// Returns the token count of every caption, indexed by corpus position.
    #[must_use]
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Returns the per-length buckets in ascending length order.
    #[must_use]
    pub fn buckets(&self) -> &[LengthBucket] {
        &self.buckets
    }

    /// Returns the number of captions the sampler was built over.
    #[must_use]
    pub fn num_captions(&self) -> usize {
        self.lengths.len()
    }

    /// Returns the number of distinct caption lengths in the corpus.
    #[must_use]
    pub fn distinct_lengths(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the configured batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sampler(lengths: &[usize], batch_size: usize, seed: u64) -> LengthSampler {
        let cfg = SamplerConfig::builder()
            .batch_size(batch_size)
            .seed(Some(seed))
            .build()
            .unwrap();
        LengthSampler::new(lengths.to_vec(), &cfg).unwrap()
    }

    #[test]
    fn batches_are_length_uniform() {
        let lengths = [3, 5, 3, 7, 5, 3, 9, 1];
        let mut sampler = sampler(&lengths, 16, 11);
        for _ in 0..50 {
            let batch = sampler.sample_batch();
            assert_eq!(batch.indices.len(), 16);
            for &index in &batch.indices {
                assert_eq!(lengths[index], batch.length);
            }
        }
    }

    #[test]
    fn same_seed_reproduces_draws() {
        let lengths = [2, 4, 2, 6, 4, 2, 8];
        let mut first = sampler(&lengths, 5, 42);
        let mut second = sampler(&lengths, 5, 42);
        for _ in 0..10 {
            assert_eq!(first.sample_batch(), second.sample_batch());
        }
    }

    #[test]
    fn length_frequencies_track_the_corpus() {
        let mut lengths = vec![2; 800];
        lengths.extend(std::iter::repeat(5).take(200));
        let mut sampler = sampler(&lengths, 4, 7);
        let draws = 2_000;
        let shorts = (0..draws)
            .filter(|_| sampler.sample_length() == 2)
            .count();
        let observed = shorts as f64 / draws as f64;
        assert!(
            (observed - 0.8).abs() < 0.05,
            "observed frequency {observed} strays from the corpus distribution"
        );
    }

    #[test]
    fn small_buckets_sample_with_replacement() {
        let lengths = [4, 4, 7];
        let mut sampler = sampler(&lengths, 8, 3);
        let batch = sampler.sample_batch();
        assert_eq!(batch.indices.len(), 8);
        let distinct: HashSet<usize> = batch.indices.iter().copied().collect();
        assert!(distinct.len() < batch.indices.len());
    }

    #[test]
    fn single_caption_corpus_repeats_it() {
        let mut sampler = sampler(&[6], 4, 9);
        let batch = sampler.sample_batch();
        assert_eq!(batch.length, 6);
        assert_eq!(batch.indices, vec![0, 0, 0, 0]);
    }

    #[test]
    fn buckets_partition_the_corpus_in_length_order() {
        let sampler = sampler(&[5, 2, 9, 2], 1, 0);
        let buckets = sampler.buckets();
        let lengths: Vec<usize> = buckets.iter().map(|bucket| bucket.length).collect();
        assert_eq!(lengths, vec![2, 5, 9]);
        assert_eq!(buckets[0].indices, vec![1, 3]);
        assert_eq!(buckets[1].indices, vec![0]);
        assert_eq!(buckets[2].indices, vec![2]);
        let total: usize = buckets.iter().map(|bucket| bucket.indices.len()).sum();
        assert_eq!(total, sampler.num_captions());
    }

    #[test]
    fn from_captions_counts_tokens() {
        let captions = ["a dog runs.", "two dogs!", "a cat"];
        let cfg = SamplerConfig::builder()
            .batch_size(2)
            .seed(Some(1))
            .build()
            .unwrap();
        let sampler = LengthSampler::from_captions(&captions, &cfg).unwrap();
        assert_eq!(sampler.lengths(), &[4, 3, 2]);
    }

    #[test]
    fn blank_captions_form_a_drawable_zero_length_bucket() {
        let captions = ["", "   ", "a dog"];
        let cfg = SamplerConfig::builder()
            .batch_size(4)
            .seed(Some(11))
            .build()
            .unwrap();
        let mut sampler = LengthSampler::from_captions(&captions, &cfg).unwrap();

        assert_eq!(sampler.distinct_lengths(), 2);
        assert_eq!(sampler.buckets()[0].length, 0);
        assert_eq!(sampler.buckets()[0].indices, vec![0, 1]);

        let mut zero_batches = 0;
        for _ in 0..50 {
            let batch = sampler.sample_batch();
            assert_eq!(batch.indices.len(), 4);
            for &index in &batch.indices {
                assert_eq!(sampler.lengths()[index], batch.length);
            }
            if batch.length == 0 {
                zero_batches += 1;
            }
        }
        assert!(zero_batches > 0, "the empty-caption bucket was never drawn");
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let cfg = SamplerConfig::builder()
            .batch_size(4)
            .seed(Some(0))
            .build()
            .unwrap();
        let err = LengthSampler::new(Vec::new(), &cfg).expect_err("empty corpus should fail");
        assert!(matches!(err, CocapError::Corpus(_)));
    }
}
