//! Hugging Face compatible serialisation helpers built on top of `tokenizers`.
//!
//! The vocabulary exports as a `WordLevel` model with a `Whitespace`
//! pre-tokenizer (and a `Lowercase` normalizer when the vocabulary was built
//! lowercased), so the resulting `tokenizer.json` can be consumed by any
//! Hugging Face tooling. The reserved markers are listed as special added
//! tokens at ids `[0, 3)`.

use std::fs;
use std::path::Path;

use serde_json::{self, json, Map, Value};
use tokenizers::Tokenizer;

use crate::error::{CocapError, Result};
use crate::vocab::Vocab;

/// Serialises the vocabulary to a JSON string compatible with Hugging Face.
pub fn tokenizer_json(vocab: &Vocab, pretty: bool) -> Result<String> {
    let mut vocab_map = Map::new();
    for (id, word) in vocab.iter() {
        vocab_map.insert(word.to_string(), Value::from(id));
    }

    let mut added_tokens = Vec::new();
    for (idx, token) in vocab.specials().as_array().iter().enumerate() {
        added_tokens.push(json!({
            "id": idx as u32,
            "content": token,
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true
        }));
    }

    let normalizer = if vocab.lowercase() {
        json!({"type": "Lowercase"})
    } else {
        Value::Null
    };

    let value = json!({
        "version": "1.0",
        "truncation": Value::Null,
        "padding": Value::Null,
        "added_tokens": added_tokens,
        "normalizer": normalizer,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": Value::Null,
        "decoder": Value::Null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab_map,
            "unk_token": vocab.specials().unk,
        }
    });

    if pretty {
        serde_json::to_string_pretty(&value).map_err(|err| CocapError::Tokenizers(err.to_string()))
    } else {
        serde_json::to_string(&value).map_err(|err| CocapError::Tokenizers(err.to_string()))
    }
}

/// Builds a Hugging Face [`Tokenizer`] over the vocabulary.
pub fn as_tokenizer(vocab: &Vocab) -> Result<Tokenizer> {
    let json = tokenizer_json(vocab, false)?;
    Tokenizer::from_bytes(json.as_bytes()).map_err(|err| CocapError::Tokenizers(err.to_string()))
}

/// Persists the vocabulary as `tokenizer.json` compatible with Hugging Face tooling.
pub fn save_huggingface_tokenizer<P: AsRef<Path>>(
    vocab: &Vocab,
    path: P,
    pretty: bool,
) -> Result<()> {
    let json = tokenizer_json(vocab, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| CocapError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a tokenizer.json file via the Hugging Face `tokenizers` crate.
pub fn load_tokenizer<P: AsRef<Path>>(path: P) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(|err| CocapError::Tokenizers(err.to_string()))
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
        let captions = ["a dog runs", "a cat naps"];
        VocabBuilder::new(cfg)
            .build_from_captions(&captions)
            .expect("build")
            .vocab
    }

    #[test]
    fn tokenizer_json_is_well_formed() {
        let vocab = sample_vocab();
        let json = tokenizer_json(&vocab, true).expect("serialization should work");
        let value: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["model"]["type"], "WordLevel");
        assert_eq!(value["model"]["unk_token"], "<unk>");
        assert_eq!(value["model"]["vocab"]["<start>"], 0);
        assert_eq!(value["added_tokens"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["pre_tokenizer"]["type"], "Whitespace");
        assert_eq!(value["normalizer"]["type"], "Lowercase");
    }

    #[test]
    fn exported_tokenizer_preserves_ids() {
        let vocab = sample_vocab();
        let tokenizer = as_tokenizer(&vocab).expect("tokenizer");
        assert_eq!(tokenizer.token_to_id("<unk>"), Some(vocab.unk_id()));
        assert_eq!(tokenizer.token_to_id("dog"), vocab.lookup("dog"));
        assert_eq!(tokenizer.get_vocab_size(false), vocab.len());
    }

    #[test]
    fn saved_tokenizer_loads_through_the_crate() {
        let vocab = sample_vocab();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tokenizer.json");
        vocab.save_huggingface(&path).expect("save");

        let tokenizer = load_tokenizer(&path).expect("load");
        assert_eq!(tokenizer.get_vocab_size(false), vocab.len());
        assert_eq!(tokenizer.token_to_id("cat"), vocab.lookup("cat"));
    }
}
