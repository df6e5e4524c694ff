//! Native JSON persistence for vocabularies.
//!
//! The on-disk layout stores the build settings, the reserved markers, and the
//! corpus words in id order. Reloading replays the word list through the same
//! id assignment used during the build, so a round trip reproduces the mapping
//! exactly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CocapError, Result};
use crate::vocab::{SpecialTokens, Vocab};

/// On-disk layout of a persisted vocabulary. `words` holds only the corpus
/// words; ids 0..3 always belong to the markers.
#[derive(Debug, Serialize, Deserialize)]
struct VocabFile {
    threshold: usize,
    lowercase: bool,
    specials: SpecialTokens,
    words: Vec<String>,
}

/// Serialises the vocabulary to a JSON string.
pub fn vocab_json(vocab: &Vocab, pretty: bool) -> Result<String> {
    let file = VocabFile {
        threshold: vocab.threshold(),
        lowercase: vocab.lowercase(),
        specials: vocab.specials().clone(),
        words: vocab.corpus_words().to_vec(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(json)
}

/// Persists the vocabulary as JSON at `path`.
pub fn save_vocab<P: AsRef<Path>>(vocab: &Vocab, path: P, pretty: bool) -> Result<()> {
    let json = vocab_json(vocab, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| CocapError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a vocabulary persisted by [`save_vocab`], revalidating its invariants.
///
/// Marker collisions, duplicate words, and empty words are rejected rather
/// than silently renumbered.
pub fn load_vocab<P: AsRef<Path>>(path: P) -> Result<Vocab> {
    let data = fs::read_to_string(path.as_ref())
        .map_err(|err| CocapError::io(err, Some(path.as_ref().to_path_buf())))?;
    let file: VocabFile = serde_json::from_str(&data)
        .map_err(|err| CocapError::Serialization(format!("{}: {err}", path.as_ref().display())))?;

    let mut vocab = Vocab::new(file.specials, file.threshold, file.lowercase)?;
    for word in file.words {
        if word.is_empty() {
            return Err(CocapError::Serialization(
                "vocabulary file contains an empty word".into(),
            ));
        }
        if vocab.lookup(&word).is_some() {
            return Err(CocapError::Serialization(format!(
                "duplicate word {word:?} in vocabulary file"
            )));
        }
        vocab.push_word(word)?;
    }
    Ok(vocab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::VocabBuilder;
    use crate::config::VocabConfig;
    use tempfile::tempdir;

    fn sample_vocab() -> Vocab {
        let cfg = VocabConfig::builder()
            .threshold(1)
            .show_progress(false)
            .build()
            .expect("valid config");
        let captions = ["a dog runs.", "a cat sleeps."];
        VocabBuilder::new(cfg)
            .build_from_captions(&captions)
            .expect("build")
            .vocab
    }

    #[test]
    fn vocab_round_trips_through_json() {
        let vocab = sample_vocab();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        save_vocab(&vocab, &path, true).expect("save");

        let reloaded = load_vocab(&path).expect("load");
        assert_eq!(reloaded, vocab);
        assert_eq!(reloaded.lookup("dog"), vocab.lookup("dog"));
    }

    #[test]
    fn duplicate_words_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(
            &path,
            r#"{"threshold":1,"lowercase":true,"specials":{"start":"<start>","end":"<end>","unk":"<unk>"},"words":["dog","dog"]}"#,
        )
        .expect("write fixture");

        let err = load_vocab(&path).expect_err("duplicate should fail");
        assert!(matches!(
            err,
            CocapError::Serialization(message) if message.contains("duplicate word")
        ));
    }

    #[test]
    fn words_shadowing_markers_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(
            &path,
            r#"{"threshold":1,"lowercase":true,"specials":{"start":"<start>","end":"<end>","unk":"<unk>"},"words":["<unk>"]}"#,
        )
        .expect("write fixture");

        let err = load_vocab(&path).expect_err("marker shadowing should fail");
        assert!(matches!(err, CocapError::Serialization(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_vocab("/definitely/not/here.json").expect_err("missing file should fail");
        assert!(matches!(err, CocapError::Io { .. }));
    }
}
