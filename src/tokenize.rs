//! Caption tokenization shared by the vocabulary builder and the length sampler.
//!
//! Captions are split into word tokens (alphanumeric runs, keeping interior
//! apostrophes so contractions survive) and single-character punctuation
//! tokens. Whitespace only separates and never produces a token. Both the
//! vocabulary build and the length precomputation go through this module, so a
//! caption always resolves to the same token count in both places.

/// Splits a caption into word and punctuation tokens.
///
/// When `lowercase` is set, word characters are lowercased as they are
/// accumulated; token boundaries are unaffected by the flag.
#[must_use]
pub fn tokenize(caption: &str, lowercase: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in caption.chars() {
        if ch.is_alphanumeric() || (ch == '\'' && !word.is_empty()) {
            if lowercase {
                word.extend(ch.to_lowercase());
            } else {
                word.push(ch);
            }
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !ch.is_whitespace() {
                tokens.push(ch.to_string());
            }
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

/// Returns the number of tokens [`tokenize`] would produce for `caption`.
///
/// Counting walks the same character classes without allocating, and the
/// result is independent of the `lowercase` flag.
#[must_use]
pub fn token_count(caption: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for ch in caption.chars() {
        if ch.is_alphanumeric() || (ch == '\'' && in_word) {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if !ch.is_whitespace() {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_words_and_punctuation() {
        let tokens = tokenize("A man riding a wave.", true);
        assert_eq!(tokens, vec!["a", "man", "riding", "a", "wave", "."]);
    }

    #[test]
    fn keeps_contractions_whole() {
        let tokens = tokenize("the dog isn't wet", true);
        assert_eq!(tokens, vec!["the", "dog", "isn't", "wet"]);
    }

    #[test]
    fn leading_quote_is_its_own_token() {
        let tokens = tokenize("'hello there", true);
        assert_eq!(tokens, vec!["'", "hello", "there"]);
    }

    #[test]
    fn lowercase_flag_preserves_case_when_disabled() {
        let tokens = tokenize("A Dog!", false);
        assert_eq!(tokens, vec!["A", "Dog", "!"]);
    }

    #[test]
    fn whitespace_only_produces_no_tokens() {
        assert!(tokenize("", true).is_empty());
        assert!(tokenize("   \t\n ", true).is_empty());
        assert_eq!(token_count("   \t\n "), 0);
    }

    #[test]
    fn token_count_matches_tokenize() {
        let captions = [
            "A man riding a wave on top of a surfboard.",
            "two dogs, one frisbee!",
            "it isn't over 'til it's over",
            "semi-truck on a highway",
            "Ünïcödé çaption with Ümlauts",
            "",
        ];
        for caption in captions {
            assert_eq!(
                token_count(caption),
                tokenize(caption, true).len(),
                "count mismatch for {caption:?}"
            );
            assert_eq!(token_count(caption), tokenize(caption, false).len());
        }
    }

    #[test]
    fn hyphenated_words_split_on_the_hyphen() {
        let tokens = tokenize("a semi-truck", true);
        assert_eq!(tokens, vec!["a", "semi", "-", "truck"]);
    }
}
