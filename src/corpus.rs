//! Facilities for discovering annotation files and loading caption corpora.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{CocapError, Result};

/// File extensions considered caption sources during directory scans.
const CAPTION_EXTENSIONS: &[&str] = &["json", "jsonl", "txt"];

/// One caption together with its annotation identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptionRecord {
    /// Annotation id from the source file (synthetic for plain-text sources).
    pub id: u64,
    /// Image the caption describes (synthetic for plain-text sources).
    pub image_id: u64,
    /// Raw caption text as it appears in the corpus.
    pub caption: String,
}

/// COCO-style annotation file: only the `annotations` array is consumed, the
/// `images`, `info`, and `licenses` sections are ignored.
#[derive(Debug, Deserialize)]
struct AnnotationFile {
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    id: u64,
    image_id: u64,
    caption: String,
}

fn has_caption_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CAPTION_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Discovers caption files rooted at the provided input paths.
///
/// Directories are traversed recursively by default; set
/// [`CorpusConfig::recursive`] to `false` to limit discovery to the first
/// level. Directory scans keep only files with a recognised caption extension
/// (`.json`, `.jsonl`, `.txt`), while explicitly listed files are always
/// accepted. Traversal is sorted by file name so repeated runs see the corpus
/// in the same order.
pub fn collect_caption_paths<P: AsRef<Path>>(
    inputs: &[P],
    cfg: &CorpusConfig,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(CocapError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| CocapError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            if cfg.recursive {
                let walker = WalkDir::new(path)
                    .follow_links(cfg.follow_symlinks)
                    .sort_by_file_name();
                for entry in walker {
                    let entry = entry.map_err(|err| CocapError::Internal(err.to_string()))?;
                    if entry.file_type().is_file() && has_caption_extension(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                let mut children = Vec::new();
                for entry in fs::read_dir(path)
                    .map_err(|err| CocapError::io(err, Some(path.to_path_buf())))?
                {
                    let entry =
                        entry.map_err(|err| CocapError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file() && has_caption_extension(&entry_path) {
                        children.push(entry_path);
                    }
                }
                children.sort();
                files.extend(children);
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(CocapError::Corpus(
            "no caption files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads caption records from every discovered file.
///
/// Files are parsed according to their extension: `.json` as a COCO-style
/// annotation file, `.jsonl` as one annotation object per line, and anything
/// else as plain text with one caption per line (blank lines skipped,
/// annotation ids synthesised). Records keep corpus order, and
/// [`CorpusConfig::max_captions`] caps the total across all files.
pub fn load_captions<P: AsRef<Path>>(
    inputs: &[P],
    cfg: &CorpusConfig,
) -> Result<Vec<CaptionRecord>> {
    cfg.validate()?;
    let file_paths = collect_caption_paths(inputs, cfg)?;
    let mut records = Vec::new();
    let mut synthetic_id = 0u64;
    for file_path in file_paths {
        let data = fs::read_to_string(&file_path)
            .map_err(|err| CocapError::io(err, Some(file_path.clone())))?;
        match file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => {
                let parsed: AnnotationFile = serde_json::from_str(&data).map_err(|err| {
                    CocapError::Serialization(format!("{}: {err}", file_path.display()))
                })?;
                records.extend(parsed.annotations.into_iter().map(|record| CaptionRecord {
                    id: record.id,
                    image_id: record.image_id,
                    caption: record.caption,
                }));
            }
            Some("jsonl") => {
                for (line_no, line) in data.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: Annotation = serde_json::from_str(line).map_err(|err| {
                        CocapError::Serialization(format!(
                            "{}:{}: {err}",
                            file_path.display(),
                            line_no + 1
                        ))
                    })?;
                    records.push(CaptionRecord {
                        id: record.id,
                        image_id: record.image_id,
                        caption: record.caption,
                    });
                }
            }
            _ => {
                for line in data.lines() {
                    let caption = line.trim();
                    if caption.is_empty() {
                        continue;
                    }
                    records.push(CaptionRecord {
                        id: synthetic_id,
                        image_id: synthetic_id,
                        caption: caption.to_string(),
                    });
                    synthetic_id += 1;
                }
            }
        }
        if let Some(cap) = cfg.max_captions {
            if records.len() >= cap {
                records.truncate(cap);
                break;
            }
        }
    }
    if records.is_empty() {
        return Err(CocapError::Corpus(
            "no captions could be loaded from inputs".into(),
        ));
    }
    Ok(records)
}
