use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use cocap::config::{CorpusConfig, SamplerConfig, VocabConfig};
use cocap::corpus::load_captions;
use cocap::sampler::LengthSampler;
use cocap::serialization;
use cocap::{TokenId, VocabBuilder};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::ThreadPoolBuilder;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_OUTPUT: &str = "vocab.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Caption vocabulary toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a vocabulary from caption corpora
    Build(BuildArgs),
    /// Encode captions into token ids with a saved vocabulary
    Encode(EncodeArgs),
    /// Decode token ids back into caption words
    Decode(DecodeArgs),
    /// Draw same-length batches of caption indices
    Sample(SampleArgs),
    /// Inspect vocabulary metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Caption files or directories to scan
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the vocabulary JSON
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Minimum word frequency
    #[arg(long, value_name = "COUNT")]
    threshold: Option<usize>,

    /// Override the start marker token
    #[arg(long, value_name = "TOKEN")]
    start_token: Option<String>,

    /// Override the end marker token
    #[arg(long, value_name = "TOKEN")]
    end_token: Option<String>,

    /// Override the unknown marker token
    #[arg(long, value_name = "TOKEN")]
    unk_token: Option<String>,

    /// Keep caption casing instead of lowercasing
    #[arg(long)]
    keep_case: bool,

    /// Cap on captions loaded from the corpus
    #[arg(long, value_name = "COUNT")]
    max_captions: Option<usize>,

    /// Reuse an existing vocabulary at the output path instead of rebuilding
    #[arg(long)]
    reuse: bool,

    /// Also export a Hugging Face tokenizer.json
    #[arg(long = "hf-tokenizer", value_name = "PATH")]
    hf_tokenizer: Option<PathBuf>,

    /// Disable phase logging/progress
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Vocabulary JSON to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Captions to encode when --input is omitted
    #[arg(value_name = "CAPTION", required_unless_present = "input")]
    captions: Vec<String>,

    /// Path to a file with one caption per line
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Omit the start/end markers from the output
    #[arg(long)]
    no_markers: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Vocabulary JSON to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Token ids to decode when --input is omitted
    #[arg(value_name = "ID", required_unless_present = "input")]
    ids: Vec<TokenId>,

    /// Path to whitespace separated token ids
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Skip marker tokens while decoding
    #[arg(long)]
    skip_special_tokens: bool,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Caption files or directories to scan
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Indices drawn per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Number of batches to draw
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    batches: usize,

    /// Seed for reproducible draws
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Print the per-length caption histogram before sampling
    #[arg(long)]
    histogram: bool,

    /// Cap on captions loaded from the corpus
    #[arg(long, value_name = "COUNT")]
    max_captions: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Vocabulary JSON to inspect
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
struct VocabFile {
    threshold: usize,
    #[serde(default)]
    lowercase: bool,
    specials: SpecialsSection,
    words: Vec<String>,
}

#[derive(Deserialize)]
struct SpecialsSection {
    start: String,
    end: String,
    unk: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Sample(args) => run_sample(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            0 => LevelFilter::Info,
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_build(args: BuildArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let mut cfg = VocabConfig::builder();
    if let Some(threshold) = args.threshold {
        cfg = cfg.threshold(threshold);
    }
    if let Some(token) = &args.start_token {
        cfg = cfg.start_token(token.clone());
    }
    if let Some(token) = &args.end_token {
        cfg = cfg.end_token(token.clone());
    }
    if let Some(token) = &args.unk_token {
        cfg = cfg.unk_token(token.clone());
    }
    cfg = cfg.lowercase(!args.keep_case);
    cfg = cfg.show_progress(!args.no_progress);
    let vocab_cfg = cfg.build()?;

    let corpus_cfg = CorpusConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
        max_captions: args.max_captions,
    };

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} scanning captions... {elapsed}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let builder = VocabBuilder::new(vocab_cfg);
    let start = Instant::now();
    let artifacts = if args.reuse {
        builder.load_or_build(&args.output, &args.inputs, &corpus_cfg)?
    } else {
        let artifacts = builder
            .build_from_paths(&args.inputs, &corpus_cfg)
            .context("failed to build vocabulary")?;
        artifacts
            .vocab
            .save(&args.output)
            .with_context(|| format!("failed to save vocabulary to {}", args.output.display()))?;
        artifacts
    };
    if let Some(pb) = spinner {
        pb.finish_with_message("scan complete");
    }

    if args.pretty {
        let pretty = artifacts.vocab.to_json(true)?;
        fs::write(&args.output, pretty)
            .with_context(|| format!("failed to pretty print {}", args.output.display()))?;
    }
    if let Some(path) = &args.hf_tokenizer {
        serialization::save_huggingface_tokenizer(&artifacts.vocab, path, args.pretty)
            .with_context(|| format!("failed to export tokenizer to {}", path.display()))?;
    }

    let elapsed = start.elapsed();
    let entries = artifacts.vocab.len();
    let corpus_words = artifacts.vocab.corpus_len();
    let throughput = if elapsed.as_secs_f64() > 0.0 {
        artifacts.metrics.captions as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    info!(
        "build complete: entries={entries} coverage={:.2}% duration={elapsed:.2?}",
        artifacts.metrics.coverage * 100.0
    );
    println!(
        "✅ wrote vocabulary with {} entries ({} corpus words) to {}",
        entries,
        corpus_words,
        args.output.display()
    );
    println!(
        "   captions {} | duration {:.2?} | {:.0} captions/s",
        artifacts.metrics.captions, elapsed, throughput
    );

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let vocab = serialization::load_vocab(&args.vocab)
        .with_context(|| format!("failed to load vocabulary from {}", args.vocab.display()))?;

    let captions: Vec<String> = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        args.captions
    };

    for caption in &captions {
        let ids = vocab.encode(caption);
        let ids = if args.no_markers {
            &ids[1..ids.len() - 1]
        } else {
            &ids[..]
        };
        if args.json {
            let record = json!({
                "caption": caption,
                "ids": ids
            });
            println!("{}", serde_json::to_string(&record)?);
        } else {
            print!("{caption}:\t");
            for (idx, id) in ids.iter().enumerate() {
                if idx > 0 {
                    print!(" ");
                }
                print!("{id}");
            }
            println!();
        }
    }

    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let vocab = serialization::load_vocab(&args.vocab)
        .with_context(|| format!("failed to load vocabulary from {}", args.vocab.display()))?;

    let ids = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        parse_token_list(&contents)?
    } else {
        args.ids
    };

    let words = vocab.decode(&ids, args.skip_special_tokens)?;
    println!("{}", words.join(" "));

    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<()> {
    let corpus_cfg = CorpusConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
        max_captions: args.max_captions,
    };
    let records =
        load_captions(&args.inputs, &corpus_cfg).context("failed to load caption corpus")?;
    let captions: Vec<String> = records.into_iter().map(|record| record.caption).collect();

    let mut cfg = SamplerConfig::builder();
    if let Some(batch_size) = args.batch_size {
        cfg = cfg.batch_size(batch_size);
    }
    cfg = cfg.seed(args.seed);
    let sampler_cfg = cfg.build()?;

    let mut sampler = LengthSampler::from_captions(&captions, &sampler_cfg)?;
    info!(
        "bucketed {} captions into {} distinct lengths",
        sampler.num_captions(),
        sampler.distinct_lengths()
    );

    if args.histogram {
        for bucket in sampler.buckets() {
            println!("length {:>3}: {:>7} captions", bucket.length, bucket.indices.len());
        }
    }

    for _ in 0..args.batches {
        let batch = sampler.sample_batch();
        if args.json {
            println!("{}", serde_json::to_string(&batch)?);
        } else {
            print!("len {:>3} |", batch.length);
            for index in &batch.indices {
                print!(" {index}");
            }
            println!();
        }
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let data = fs::read_to_string(&args.vocab)
        .with_context(|| format!("failed to read {}", args.vocab.display()))?;
    let parsed: VocabFile = serde_json::from_str(&data).context("failed to parse vocabulary JSON")?;

    let corpus_words = parsed.words.len();
    let entries = corpus_words + 3;
    let preview: Vec<&str> = parsed.words.iter().take(8).map(String::as_str).collect();
    let summary = json!({
        "path": args.vocab.display().to_string(),
        "entries": entries,
        "corpus_words": corpus_words,
        "threshold": parsed.threshold,
        "lowercase": parsed.lowercase,
        "specials": [&parsed.specials.start, &parsed.specials.end, &parsed.specials.unk],
        "preview": preview,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Entries      : {entries}");
        println!("Corpus words : {corpus_words}");
        println!("Threshold    : {}", parsed.threshold);
        println!("Lowercase    : {}", parsed.lowercase);
        println!(
            "Specials     : {}, {}, {}",
            parsed.specials.start, parsed.specials.end, parsed.specials.unk
        );
        if preview.is_empty() {
            println!("Preview      : (none)");
        } else {
            println!("Preview      : {}", preview.join(", "));
        }
    }

    Ok(())
}

fn parse_token_list(text: &str) -> Result<Vec<TokenId>> {
    text.split_whitespace()
        .map(|part| {
            part.parse::<TokenId>()
                .map_err(|err| anyhow!("invalid token id `{part}`: {err}"))
        })
        .collect()
}
