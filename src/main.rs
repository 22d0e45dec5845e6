//! hytale-region-parser: dump Hytale region files to JSON.
//!
//! Accepts a single `.region.bin` file, a flat folder of region files, a
//! `chunks/` folder, or a universe folder whose worlds each contain a
//! `chunks/` subfolder.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value as JsonValue};

use hytale_region_parser::export::{export_region, export_summary};
use hytale_region_parser::{FailureMode, RegionReader};

#[derive(Parser)]
#[command(
    name = "hytale-region-parser",
    about = "Parser for Hytale .region.bin files (IndexedStorage format)",
    version
)]
struct Args {
    /// Path to a .region.bin file or a folder containing region files
    input_path: PathBuf,

    /// Output file path (overrides default naming)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write JSON to stdout instead of a file
    #[arg(long)]
    stdout: bool,

    /// Compact JSON without indentation
    #[arg(long)]
    compact: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,

    /// Block count summary only (no per-voxel positions - much faster)
    #[arg(short = 's', long)]
    summary_only: bool,

    /// Exclude terrain voxels; keep containers and block components
    #[arg(long)]
    no_blocks: bool,
}

/// How the input folder is organized.
enum FolderLayout {
    /// `<input>/*.region.bin`
    Flat(Vec<PathBuf>),
    /// `<world>/chunks/*.region.bin`, world name from the parent folder
    Chunks(String, Vec<PathBuf>),
    /// `<input>/<world>/chunks/*.region.bin` per world
    Universe(Vec<(String, Vec<PathBuf>)>),
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.input_path.exists() {
        bail!("path not found: {}", args.input_path.display());
    }

    if args.input_path.is_file() {
        let data = parse_one(&args.input_path, &args)?;
        let default_name = default_output_name(&args.input_path);
        write_output(&data, &args, default_name)?;
    } else {
        match detect_layout(&args.input_path)? {
            FolderLayout::Flat(files) => {
                progress(&args, format!("Processing {} region file(s)", files.len()));
                let data = parse_many(&files, &args);
                write_output(&data, &args, PathBuf::from("regions.json"))?;
            }
            FolderLayout::Chunks(world, files) => {
                progress(&args, format!("Processing world: {world} ({} files)", files.len()));
                let data = parse_many(&files, &args);
                write_output(&data, &args, PathBuf::from(format!("{world}.json")))?;
            }
            FolderLayout::Universe(worlds) => {
                let single_world = worlds.len() == 1;
                for (world, files) in worlds {
                    progress(&args, format!("Processing world: {world} ({} files)", files.len()));
                    let data = parse_many(&files, &args);
                    let default_name = PathBuf::from(format!("{world}.json"));
                    if args.stdout || single_world {
                        write_output(&data, &args, default_name)?;
                    } else {
                        // One file per world; explicit -o only applies when
                        // there is exactly one world to write.
                        write_json_file(&data, &args, &default_name)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn find_region_files(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(folder) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".region.bin"))
        })
        .collect();
    files.sort();
    files
}

fn detect_layout(input: &Path) -> Result<FolderLayout> {
    if input.file_name().and_then(|n| n.to_str()) == Some("chunks") {
        let files = find_region_files(input);
        if !files.is_empty() {
            let world = input
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("world")
                .to_string();
            return Ok(FolderLayout::Chunks(world, files));
        }
    }

    let mut worlds = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("reading {}", input.display()))? {
        let entry = entry?;
        let chunks = entry.path().join("chunks");
        if chunks.is_dir() {
            let files = find_region_files(&chunks);
            if !files.is_empty() {
                worlds.push((entry.file_name().to_string_lossy().into_owned(), files));
            }
        }
    }
    if !worlds.is_empty() {
        worlds.sort_by(|a, b| a.0.cmp(&b.0));
        return Ok(FolderLayout::Universe(worlds));
    }

    let files = find_region_files(input);
    if files.is_empty() {
        bail!("no .region.bin files found in {}", input.display());
    }
    Ok(FolderLayout::Flat(files))
}

fn parse_one(path: &Path, args: &Args) -> Result<JsonValue> {
    let mut reader = RegionReader::open(path)?.with_mode(FailureMode::Lenient);
    let data = if args.summary_only {
        export_summary(&reader.summarize()?)
    } else {
        export_region(&mut reader, !args.no_blocks)?
    };
    Ok(data)
}

/// Merge several region files into one document; failed files are logged
/// and skipped rather than aborting the whole run.
fn parse_many(files: &[PathBuf], args: &Args) -> JsonValue {
    let mut total_chunks = 0u64;
    let mut block_summary: Map<String, JsonValue> = Map::new();
    let mut blocks: Map<String, JsonValue> = Map::new();
    let mut containers = Vec::new();
    let mut container_count = 0u64;

    for path in files {
        progress(args, format!("Parsing {}...", path.display()));
        let data = match parse_one(path, args) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("failed to parse {}: {e}", path.display());
                continue;
            }
        };

        let meta = &data["metadata"];
        total_chunks += meta["chunk_count"].as_u64().unwrap_or(0);
        if let Some(summary) = data["block_summary"]
            .as_object()
            .or_else(|| meta["block_summary"].as_object())
        {
            for (name, count) in summary {
                let merged =
                    block_summary.get(name).and_then(JsonValue::as_u64).unwrap_or(0)
                        + count.as_u64().unwrap_or(0);
                block_summary.insert(name.clone(), merged.into());
            }
        }
        if let Some(file_blocks) = data["blocks"].as_object() {
            blocks.extend(file_blocks.clone());
        }
        if let Some(file_containers) = data["containers"].as_array() {
            containers.extend(file_containers.clone());
        }
        container_count += data["container_count"].as_u64().unwrap_or(0);
    }

    if args.summary_only {
        json!({
            "metadata": {
                "total_chunks": total_chunks,
                "total_region_files": files.len(),
            },
            "block_summary": block_summary,
            "container_count": container_count,
        })
    } else {
        json!({
            "metadata": {
                "total_chunks": total_chunks,
                "total_region_files": files.len(),
                "block_summary": block_summary,
            },
            "blocks": blocks,
            "containers": containers,
        })
    }
}

/// Default output name for a single file: `0.0.region.bin` -> `0.0.region.json`.
fn default_output_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("region");
    PathBuf::from(format!("{stem}.json"))
}

fn render(data: &JsonValue, args: &Args) -> Result<String> {
    Ok(if args.compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    })
}

fn write_output(data: &JsonValue, args: &Args, default_name: PathBuf) -> Result<()> {
    if args.stdout {
        println!("{}", render(data, args)?);
        Ok(())
    } else {
        let path = args.output.clone().unwrap_or(default_name);
        write_json_file(data, args, &path)
    }
}

fn write_json_file(data: &JsonValue, args: &Args, path: &Path) -> Result<()> {
    fs::write(path, render(data, args)?)
        .with_context(|| format!("writing {}", path.display()))?;
    progress(args, format!("Output written to {}", path.display()));
    Ok(())
}

fn progress(args: &Args, message: String) {
    if !args.quiet {
        eprintln!("{message}");
    }
}
