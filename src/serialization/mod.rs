//! Helpers for persisting vocabularies, natively and in Hugging Face formats.

pub mod huggingface;
pub mod native;

pub use huggingface::{as_tokenizer, load_tokenizer, save_huggingface_tokenizer, tokenizer_json};
pub use native::{load_vocab, save_vocab, vocab_json};
