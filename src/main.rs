use clap::{Parser, Subcommand};
use regex::Regex;
use rogrf::{FilenameEncoding, FindCriteria, GrfArchive, GrfError, OpenOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rogrf", version = "1.0.0", about = "GRF archive reader CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List archive contents in directory order
    List {
        input: PathBuf,
        /// Filename encoding: auto (default), utf-8, cp949, euc-kr, latin-1
        #[arg(short, long, default_value = "auto")]
        encoding: String,
    },
    /// Show archive metadata and statistics
    Info {
        input: PathBuf,
        #[arg(short, long, default_value = "auto")]
        encoding: String,
        /// Emit the statistics snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract one or more entries (or everything)
    Extract {
        input: PathBuf,
        /// Entry names; resolved case-insensitively
        #[arg(required_unless_present = "all")]
        names: Vec<String>,
        /// Extract every entry
        #[arg(short, long)]
        all: bool,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long, default_value = "auto")]
        encoding: String,
    },
    /// Search entries with conjunctive filters
    Find {
        input: PathBuf,
        /// Extension without the dot (fast path, no scan)
        #[arg(long)]
        ext: Option<String>,
        /// Case-insensitive substring over normalized names
        #[arg(long)]
        contains: Option<String>,
        /// Case-insensitive suffix over normalized names
        #[arg(long)]
        suffix: Option<String>,
        /// Regular expression over exact names
        #[arg(long)]
        regex: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(short, long, default_value = "auto")]
        encoding: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, encoding } => {
            let grf = open_archive(&input, &encoding)?;
            println!("{:<56} {:>12} {:>12}  Type", "Name", "Size", "Compressed");
            for name in grf.list_files() {
                let entry = grf.get_entry(name).expect("listed name resolves");
                println!(
                    "{:<56} {:>12} {:>12}  {}",
                    name,
                    entry.real_size,
                    entry.compressed_size,
                    describe_type(entry.entry_type),
                );
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, encoding, json } => {
            let grf = open_archive(&input, &encoding)?;
            let stats = grf.get_stats().expect("archive is loaded");

            if json {
                println!("{}", serde_json::to_string_pretty(stats)?);
                return Ok(());
            }

            let file_size = std::fs::metadata(&input)?.len();
            println!("── GRF archive ──────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  File size      {} B ({:.2} MiB)", file_size, file_size as f64 / 1048576.0);
            println!("  Version        {}", grf.version().expect("archive is loaded"));
            println!("  Encoding       {}", stats.encoding.name());
            println!("  Declared       {}", stats.declared_count);
            println!("  Retained       {}", stats.retained_count);
            println!("  Bad names      {}", stats.bad_name_count);
            println!("  Collisions     {}", stats.collision_count);
            println!("  Extensions ({}):", stats.extension_counts.len());
            for (ext, count) in &stats.extension_counts {
                println!("    {:<10} {}", ext, count);
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, names, all, output_dir, encoding } => {
            let grf = open_archive(&input, &encoding)?;
            let targets: Vec<String> = if all {
                grf.list_files().to_vec()
            } else {
                names
            };
            if !output_dir.exists() {
                std::fs::create_dir_all(&output_dir)?;
            }

            let results = extract_many(&grf, &targets);

            let mut written = 0usize;
            for (name, result) in targets.iter().zip(results) {
                match result {
                    Ok(data) => {
                        let dest = output_dir.join(sanitize_name(name));
                        if let Some(parent) = dest.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(&dest, &data)?;
                        written += 1;
                        println!("  extracted  {} ({} B)", name, data.len());
                    }
                    // Per-entry failures are reported and skipped.
                    Err(err) => eprintln!("  FAILED     {} — {err}", name),
                }
            }
            println!("Extracted {written}/{} entries → {}", targets.len(), output_dir.display());
        }

        // ── Find ─────────────────────────────────────────────────────────────
        Commands::Find { input, ext, contains, suffix, regex, limit, encoding } => {
            let grf = open_archive(&input, &encoding)?;
            let mut criteria = FindCriteria::new();
            if let Some(ext) = ext {
                criteria = criteria.extension(ext);
            }
            if let Some(needle) = contains {
                criteria = criteria.substring(needle);
            }
            if let Some(suffix) = suffix {
                criteria = criteria.suffix(suffix);
            }
            if let Some(pattern) = regex {
                criteria = criteria.pattern(Regex::new(&pattern)?);
            }
            if let Some(limit) = limit {
                criteria = criteria.limit(limit);
            }

            let matches = grf.find(&criteria);
            for name in &matches {
                println!("{name}");
            }
            eprintln!("{} match(es)", matches.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_archive(
    path: &PathBuf,
    encoding: &str,
) -> Result<GrfArchive<rogrf::FileSource>, Box<dyn std::error::Error>> {
    let encoding = FilenameEncoding::from_name(encoding)
        .ok_or_else(|| format!("unknown encoding '{encoding}'"))?;
    let options = OpenOptions { filename_encoding: encoding, ..OpenOptions::default() };
    let mut grf = GrfArchive::open_path(path, options)?;
    grf.load()?;
    Ok(grf)
}

#[cfg(feature = "parallel")]
fn extract_many(
    grf: &GrfArchive<rogrf::FileSource>,
    targets: &[String],
) -> Vec<Result<Vec<u8>, GrfError>> {
    use rayon::prelude::*;
    targets.par_iter().map(|name| grf.get_file(name)).collect()
}

#[cfg(not(feature = "parallel"))]
fn extract_many(
    grf: &GrfArchive<rogrf::FileSource>,
    targets: &[String],
) -> Vec<Result<Vec<u8>, GrfError>> {
    targets.iter().map(|name| grf.get_file(name)).collect()
}

fn describe_type(entry_type: u8) -> &'static str {
    match entry_type & 0x06 {
        0x02 => "des-mixed",
        0x04 => "des-header",
        0x06 => "des-mixed", // bit 1 wins when both are set
        _ => "plain",
    }
}

/// Archive paths use backslashes; map them onto the host separator and
/// drop any leading separators so the destination stays inside output_dir.
fn sanitize_name(name: &str) -> PathBuf {
    name.split(['\\', '/'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect()
}
