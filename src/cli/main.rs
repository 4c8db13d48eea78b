use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use exif_bridge::config::ToolConfig;
use exif_bridge::handler::ExifToolHandler;
use exif_bridge::metadata;

/// Extensions the CLI expands directories into.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "tif", "tiff", "heic", "heif",
];

#[derive(Parser, Debug)]
#[command(
    name = "exif-bridge",
    version,
    about = "Image metadata via the exiftool command line — read and write capture timestamps"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: exif-bridge.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default exif-bridge.json and exit
    #[arg(long)]
    init: bool,

    /// Write this capture timestamp (YYYY:mm:dd HH:MM:SS) to the image(s)
    #[arg(long = "set-date", value_name = "TIMESTAMP")]
    set_date: Option<String>,

    /// Copy all metadata from this file onto the image(s)
    #[arg(long = "copy-from", value_name = "SRC")]
    copy_from: Option<PathBuf>,

    /// Treat each path as a folder and print per-file capture timestamps
    #[arg(long = "folder-dates")]
    folder_dates: bool,

    /// Print the external tool's version and exit
    #[arg(long = "tool-version")]
    tool_version: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = ToolConfig::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => ToolConfig::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let config = ToolConfig::load(cli.config.as_deref())?;
    let handler = ExifToolHandler::new(config);

    // Handle --tool-version
    if cli.tool_version {
        match handler.version() {
            Some(version) => println!("exiftool {version}"),
            None => anyhow::bail!(
                "External tool not available at {}",
                handler.config().executable().display()
            ),
        }
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Handle --set-date
    if let Some(ref raw) = cli.set_date {
        let Some(ts) = metadata::parse_exif_timestamp(raw) else {
            anyhow::bail!("Invalid timestamp `{raw}` — expected YYYY:mm:dd HH:MM:SS");
        };
        let mut failures = 0usize;
        for path in &cli.paths {
            if handler.set_capture_timestamp(path, ts) {
                println!("Updated: {}", path.display());
            } else {
                failures += 1;
                eprintln!("Failed:  {}", path.display());
            }
        }
        if failures > 0 {
            anyhow::bail!("{failures} file(s) not updated");
        }
        return Ok(());
    }

    // Handle --copy-from
    if let Some(ref src) = cli.copy_from {
        let mut failures = 0usize;
        for path in &cli.paths {
            if handler.copy_metadata(src, path) {
                println!("Copied metadata: {} -> {}", src.display(), path.display());
            } else {
                failures += 1;
                eprintln!("Failed:  {}", path.display());
            }
        }
        if failures > 0 {
            anyhow::bail!("{failures} file(s) not updated");
        }
        return Ok(());
    }

    // Handle --folder-dates
    if cli.folder_dates {
        for folder in &cli.paths {
            match handler.capture_timestamps_for_folder(folder) {
                Some(dates) => {
                    let mut entries: Vec<_> = dates.into_iter().collect();
                    entries.sort();
                    for (file, taken) in entries {
                        println!("{}\t{taken}", file.display());
                    }
                }
                None => eprintln!("Query failed for {}", folder.display()),
            }
        }
        return Ok(());
    }

    // Default: print the metadata record for each image
    let images = collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    for image in &images {
        let meta = handler.metadata(image);
        if cli.json {
            println!("{}", serde_json::to_string(&meta)?);
        } else {
            println!("{}", image.display());
            match meta.capture_timestamp {
                Some(taken) => println!("  Taken: {taken}"),
                None => println!("  Taken: -"),
            }
            match (meta.width, meta.height) {
                (Some(w), Some(h)) => println!("  Size:  {w}x{h}"),
                _ => println!("  Size:  -"),
            }
        }
    }

    Ok(())
}

/// Collect image files from the given paths; directories are walked
/// recursively (following symlinks).
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            images.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
