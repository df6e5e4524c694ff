//! Vocabulary types mapping caption words to dense token identifiers.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CocapError, Result};
use crate::tokenize::tokenize;

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// Number of reserved marker ids at the front of every vocabulary.
pub const RESERVED_TOKENS: usize = 3;

/// Reserved marker tokens occupying the first three vocabulary ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialTokens {
    /// Token at id 0, prepended to encoded captions.
    pub start: String,
    /// Token at id 1, appended to encoded captions.
    pub end: String,
    /// Token at id 2, substituted for out-of-vocabulary words.
    pub unk: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            start: "<start>".into(),
            end: "<end>".into(),
            unk: "<unk>".into(),
        }
    }
}

impl SpecialTokens {
    /// Returns the markers in id order.
    #[must_use]
    pub fn as_array(&self) -> [&str; 3] {
        [&self.start, &self.end, &self.unk]
    }

    /// Returns true when `word` matches one of the markers.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        word == self.start || word == self.end || word == self.unk
    }
}

/// Word vocabulary with three reserved marker ids followed by densely numbered
/// corpus words.
///
/// Ids are assigned in the order words are pushed, so two vocabularies built
/// from the same corpus with the same settings assign identical ids.
#[must_use]
#[derive(Debug, Clone)]
pub struct Vocab {
    words: Vec<String>,
    index: AHashMap<String, TokenId>,
    specials: SpecialTokens,
    threshold: usize,
    lowercase: bool,
}

impl PartialEq for Vocab {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
            && self.specials == other.specials
            && self.threshold == other.threshold
            && self.lowercase == other.lowercase
    }
}

impl Eq for Vocab {}

impl Vocab {
    /// Creates a vocabulary containing only the reserved markers.
    ///
    /// The markers must be non-empty and pairwise distinct; they receive ids
    /// 0, 1, and 2 in `start`, `end`, `unk` order.
    pub fn new(specials: SpecialTokens, threshold: usize, lowercase: bool) -> Result<Self> {
        for token in specials.as_array() {
            if token.is_empty() {
                return Err(CocapError::InvalidConfig(
                    "marker tokens must not be empty".into(),
                ));
            }
        }
        if specials.start == specials.end
            || specials.start == specials.unk
            || specials.end == specials.unk
        {
            return Err(CocapError::InvalidConfig(format!(
                "marker tokens must be pairwise distinct (start={:?}, end={:?}, unk={:?})",
                specials.start, specials.end, specials.unk
            )));
        }
        let words: Vec<String> = specials
            .as_array()
            .iter()
            .map(|token| (*token).to_string())
            .collect();
        let mut index = AHashMap::with_capacity(words.len());
        for (id, word) in words.iter().enumerate() {
            index.insert(word.clone(), id as TokenId);
        }
        Ok(Self {
            words,
            index,
            specials,
            threshold,
            lowercase,
        })
    }

    /// Appends a corpus word, assigning it the next dense id.
    ///
    /// Returns `Ok(None)` when the word (or a marker spelled the same way) is
    /// already present, leaving the vocabulary unchanged.
    pub(crate) fn push_word(&mut self, word: String) -> Result<Option<TokenId>> {
        if self.index.contains_key(&word) {
            return Ok(None);
        }
        let id = TokenId::try_from(self.words.len())
            .map_err(|_| CocapError::Internal("vocabulary grew past the token id range".into()))?;
        self.index.insert(word.clone(), id);
        self.words.push(word);
        Ok(Some(id))
    }

    /// Returns the total number of entries including the reserved markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true when the vocabulary holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the number of corpus words beyond the reserved markers.
    #[must_use]
    pub fn corpus_len(&self) -> usize {
        self.words.len() - RESERVED_TOKENS
    }

    /// Returns the frequency threshold the vocabulary was built with.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns whether captions are lowercased before lookup.
    #[must_use]
    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    /// Returns the reserved marker tokens.
    #[must_use]
    pub fn specials(&self) -> &SpecialTokens {
        &self.specials
    }

    /// Id of the start marker.
    #[must_use]
    pub fn start_id(&self) -> TokenId {
        0
    }

    /// Id of the end marker.
    #[must_use]
    pub fn end_id(&self) -> TokenId {
        1
    }

    /// Id of the unknown marker.
    #[must_use]
    pub fn unk_id(&self) -> TokenId {
        2
    }

    /// Returns true when `id` addresses one of the reserved markers.
    #[must_use]
    pub fn is_special_id(&self, id: TokenId) -> bool {
        (id as usize) < RESERVED_TOKENS
    }

    /// Looks up the id assigned to `word`, if any.
    #[must_use]
    pub fn lookup(&self, word: &str) -> Option<TokenId> {
        self.index.get(word).copied()
    }

    /// Resolves `word` to its id, falling back to the unknown marker.
    #[must_use]
    pub fn id_of(&self, word: &str) -> TokenId {
        self.lookup(word).unwrap_or_else(|| self.unk_id())
    }

    /// Returns the word stored at `id`, if the id is in range.
    #[must_use]
    pub fn word_of(&self, id: TokenId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    /// Returns the corpus words beyond the reserved markers, in id order.
    #[must_use]
    pub fn corpus_words(&self) -> &[String] {
        &self.words[RESERVED_TOKENS..]
    }

    /// Iterates over every entry as `(id, word)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> {
        self.words
            .iter()
            .enumerate()
            .map(|(id, word)| (id as TokenId, word.as_str()))
    }

    /// Encodes a caption as `[start, word ids..., end]`.
    ///
    /// The caption is tokenized with the same lowercasing the vocabulary was
    /// built with, and out-of-vocabulary words resolve to the unknown marker.
    #[must_use]
    pub fn encode(&self, caption: &str) -> Vec<TokenId> {
        let tokens = tokenize(caption, self.lowercase);
        let mut ids = Vec::with_capacity(tokens.len() + 2);
        ids.push(self.start_id());
        ids.extend(tokens.iter().map(|word| self.id_of(word)));
        ids.push(self.end_id());
        ids
    }

    /// Decodes token identifiers back into words.
    pub fn decode(&self, ids: &[TokenId], skip_special_tokens: bool) -> Result<Vec<&str>> {
        let mut words = Vec::with_capacity(ids.len());
        for &id in ids {
            let idx = id as usize;
            if idx >= self.words.len() {
                return Err(CocapError::Internal(format!(
                    "token id {} exceeds vocab size {}",
                    id,
                    self.words.len()
                )));
            }
            if skip_special_tokens && self.is_special_id(id) {
                continue;
            }
            words.push(self.words[idx].as_str());
        }
        Ok(words)
    }

    /// Persists the vocabulary as native JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::serialization::save_vocab(self, path, false)
    }

    /// Serialises the vocabulary to a native JSON string.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        crate::serialization::vocab_json(self, pretty)
    }

    /// Persists the vocabulary as a Hugging Face `tokenizer.json`.
    pub fn save_huggingface<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::serialization::save_huggingface_tokenizer(self, path, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vocab() -> Vocab {
        let mut vocab = Vocab::new(SpecialTokens::default(), 1, true).expect("valid markers");
        for word in ["a", "dog", "runs"] {
            vocab.push_word(word.to_string()).expect("push");
        }
        vocab
    }

    #[test]
    fn markers_occupy_the_first_three_ids() {
        let vocab = sample_vocab();
        assert_eq!(vocab.lookup("<start>"), Some(0));
        assert_eq!(vocab.lookup("<end>"), Some(1));
        assert_eq!(vocab.lookup("<unk>"), Some(2));
        assert_eq!(vocab.word_of(0), Some("<start>"));
        assert_eq!(vocab.word_of(2), Some("<unk>"));
    }

    #[test]
    fn corpus_words_get_dense_ids_from_three() {
        let vocab = sample_vocab();
        assert_eq!(vocab.lookup("a"), Some(3));
        assert_eq!(vocab.lookup("dog"), Some(4));
        assert_eq!(vocab.lookup("runs"), Some(5));
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.corpus_len(), 3);
    }

    #[test]
    fn duplicate_push_is_rejected() {
        let mut vocab = sample_vocab();
        assert_eq!(vocab.push_word("dog".to_string()).expect("push"), None);
        assert_eq!(vocab.push_word("<unk>".to_string()).expect("push"), None);
        assert_eq!(vocab.len(), 6);
    }

    #[test]
    fn push_word_returns_the_assigned_id() {
        let mut vocab = Vocab::new(SpecialTokens::default(), 1, true).expect("valid markers");
        assert_eq!(vocab.push_word("dog".to_string()).expect("push"), Some(3));
        assert_eq!(vocab.push_word("runs".to_string()).expect("push"), Some(4));
        assert_eq!(vocab.push_word("dog".to_string()).expect("push"), None);
    }

    #[test]
    fn unknown_words_resolve_to_the_unk_marker() {
        let vocab = sample_vocab();
        assert_eq!(vocab.id_of("zebra"), vocab.unk_id());
        assert_eq!(vocab.lookup("zebra"), None);
    }

    #[test]
    fn encode_wraps_captions_in_markers() {
        let vocab = sample_vocab();
        let ids = vocab.encode("A dog runs");
        assert_eq!(ids, vec![0, 3, 4, 5, 1]);
    }

    #[test]
    fn encode_substitutes_unk_for_unseen_words() {
        let vocab = sample_vocab();
        let ids = vocab.encode("a zebra runs");
        assert_eq!(ids, vec![0, 3, 2, 5, 1]);
    }

    #[test]
    fn decode_optionally_skips_markers() {
        let vocab = sample_vocab();
        let ids = vocab.encode("a dog");
        let with_markers = vocab.decode(&ids, false).expect("decode");
        assert_eq!(with_markers, vec!["<start>", "a", "dog", "<end>"]);
        let without = vocab.decode(&ids, true).expect("decode");
        assert_eq!(without, vec!["a", "dog"]);
    }

    #[test]
    fn decode_rejects_out_of_range_ids() {
        let vocab = sample_vocab();
        let err = vocab
            .decode(&[0, 99, 1], false)
            .expect_err("out of range id should fail");
        assert!(matches!(err, CocapError::Internal(_)));
    }

    #[test]
    fn colliding_markers_are_rejected() {
        let specials = SpecialTokens {
            start: "<s>".into(),
            end: "<s>".into(),
            unk: "<unk>".into(),
        };
        let err = Vocab::new(specials, 1, true).expect_err("collision should fail");
        assert!(matches!(err, CocapError::InvalidConfig(_)));
    }
}
