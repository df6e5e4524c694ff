//! Caption vocabulary construction and length-stratified batch sampling.
//!
//! The crate exposes both a library API and a `cocap` command line interface
//! for preparing COCO-style caption corpora for captioning pipelines.  Typical
//! usage scans an annotation corpus once to build a [`Vocab`] with reserved
//! start/end/unknown markers, persists the mapping as JSON, and then draws
//! reproducible same-length training batches whose caption lengths follow the
//! empirical corpus distribution.
//!
//! ```no_run
//! use cocap::{CorpusConfig, LengthSampler, SamplerConfig, VocabBuilder, VocabConfig};
//!
//! # fn main() -> cocap::Result<()> {
//! let vocab_cfg = VocabConfig::builder()
//!     .threshold(5)
//!     .show_progress(false)
//!     .build()?;
//! let builder = VocabBuilder::new(vocab_cfg);
//! let corpus_cfg = CorpusConfig::default();
//! let artifacts =
//!     builder.build_from_paths(&["annotations/captions_train2014.json"], &corpus_cfg)?;
//! artifacts.vocab.save("vocab.json")?;
//! let ids = artifacts.vocab.encode("a dog chases a ball");
//! # let _ = ids;
//!
//! let sampler_cfg = SamplerConfig::builder().batch_size(64).seed(Some(7)).build()?;
//! let captions = ["a dog chases a ball", "two dogs play in the park"];
//! let mut sampler = LengthSampler::from_captions(&captions, &sampler_cfg)?;
//! let batch = sampler.sample_batch();
//! # let _ = batch;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `cocap = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod sampler;
pub mod serialization;
pub mod tokenize;
pub mod vocab;

pub use builder::{BuildArtifacts, VocabBuilder};
pub use config::{CorpusConfig, SamplerConfig, VocabConfig, VocabConfigBuilder};
pub use error::{CocapError, Result};
pub use metrics::BuildMetrics;
pub use sampler::{Batch, LengthBucket, LengthSampler};
pub use vocab::{SpecialTokens, TokenId, Vocab};
