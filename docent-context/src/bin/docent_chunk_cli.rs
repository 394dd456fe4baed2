use clap::Parser;
use docent_context::text::{
    Chunker, ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_SEPARATOR,
};
use std::fs;
use std::io::{self, Read};
use std::process;

/// A CLI tool to chunk extracted document text into JSON output using docent-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum length for each chunk, in characters.
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    max_chunk_size: usize,

    /// Characters carried over from each chunk into the next.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,

    /// Regex pattern separating tokens.
    #[arg(short, long, default_value = DEFAULT_SEPARATOR)]
    separator: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunker = Chunker::new(
        ChunkerConfig::new(args.max_chunk_size, args.overlap).with_separator(args.separator),
    )?;
    let chunks = chunker.chunk(&content)?;

    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}
