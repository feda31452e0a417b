//! Reel CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use reel::storage::{read_cassette, CASSETTE_EXTENSION, COMPRESSED_EXTENSION};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Reel v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: reel <command> <path>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  inspect   Show the episodes of a cassette file");
        eprintln!("  list      List the cassettes in a fixtures directory");
        process::exit(1);
    }

    let command = &args[1];
    let path = PathBuf::from(&args[2]);

    let result = match command.as_str() {
        "inspect" => inspect(&path),
        "list" => list(&path),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'reel' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(COMPRESSED_EXTENSION)
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let document = read_cassette(path, is_compressed(path))
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!("Cassette: {}", path.display());
    println!("Episodes: {}", document.episodes.len());
    println!();

    for (i, episode) in document.episodes.iter().enumerate() {
        println!(
            "{:>4}  {:<7} {}  ->  {}  (request {} B, response {} B)",
            i,
            episode.request.method,
            episode.request.url,
            episode.response.status,
            episode.request.body.len(),
            episode.response.body.len()
        );
    }

    Ok(())
}

fn list(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        let compressed_suffix = format!(".{CASSETTE_EXTENSION}.{COMPRESSED_EXTENSION}");
        let plain_suffix = format!(".{CASSETTE_EXTENSION}");
        if let Some(name) = file_name.strip_suffix(&compressed_suffix) {
            names.push(format!("{name} (gzip)"));
        } else if let Some(name) = file_name.strip_suffix(&plain_suffix) {
            names.push(name.to_string());
        }
    }

    names.sort();
    println!("Fixtures directory: {}", dir.display());
    for name in &names {
        println!("  {name}");
    }
    println!("{} cassette(s)", names.len());

    Ok(())
}
