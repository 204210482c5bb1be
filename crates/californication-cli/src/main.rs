//! Californication - browse California points of interest from the terminal.
//!
//! Fetches places from the document store and the places service, keeps
//! the last result for offline use, and caches place images on disk.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use californication_core::models::sort_places;
use californication_core::utils::{format_optional, star_bar, truncate_string};
use californication_core::{CacheManager, Config, ImageCache, Place, PlaceDirector, PlaceSortColumn};

// ============================================================================
// Constants
// ============================================================================

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "californication.log";

/// Column widths for the place table
const NAME_WIDTH: usize = 32;
const SUMMARY_WIDTH: usize = 48;

const USAGE: &str = "\
Usage: californication <command>

Commands:
  refresh                      Fetch places from both sources and cache them
  list [--sort name|rating]    Show the cached places
  show <place-id>              Show one cached place in detail
  image <url> [--out <file>]   Fetch an image through the image cache
  clear-cache                  Remove cached places and images

Configuration is read from ~/.config/californication/config.json, a .env
file, and the CALIFORNICATION_DATABASE_URL, CALIFORNICATION_DATABASE_AUTH,
GOOGLE_PLACES_API_KEY and CALIFORNICATION_PLACES_BASE_URL variables.
Set RUST_LOG (e.g. RUST_LOG=debug) to control logging.";

#[derive(Debug, PartialEq)]
enum Command {
    Refresh,
    List { sort: PlaceSortColumn },
    Show { id: String },
    Image { url: String, out: Option<PathBuf> },
    ClearCache,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "refresh" => Ok(Command::Refresh),
        "list" => {
            let sort = match flag_value(&args[1..], "--sort")? {
                Some(value) => PlaceSortColumn::parse(value)
                    .ok_or_else(|| anyhow!("Unknown sort column: {} (expected name or rating)", value))?,
                None => PlaceSortColumn::default(),
            };
            Ok(Command::List { sort })
        }
        "show" => {
            let id = args.get(1).ok_or_else(|| anyhow!("show requires a place id"))?;
            Ok(Command::Show { id: id.clone() })
        }
        "image" => {
            let url = args.get(1).ok_or_else(|| anyhow!("image requires a URL"))?;
            let out = flag_value(&args[2..], "--out")?.map(PathBuf::from);
            Ok(Command::Image { url: url.clone(), out })
        }
        "clear-cache" => Ok(Command::ClearCache),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

/// Value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|v| Some(v.as_str()))
            .ok_or_else(|| anyhow!("{} requires a value", flag)),
        None => Ok(None),
    }
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr and, when a directory is given, to a daily log file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let log_dir = std::fs::create_dir_all(&cache_dir).ok().map(|_| cache_dir.as_path());
    let _guard = init_tracing(log_dir);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    info!(?command, "Californication starting");

    match command {
        Command::Refresh => refresh(&config, &cache_dir).await,
        Command::List { sort } => list(&cache_dir, sort),
        Command::Show { id } => show(&cache_dir, &id),
        Command::Image { url, out } => image(&config, &url, out.as_deref()).await,
        Command::ClearCache => clear_cache(&config, &cache_dir),
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

async fn refresh(config: &Config, cache_dir: &Path) -> Result<()> {
    let client = Arc::new(config.api_client()?);
    let cache = Arc::new(CacheManager::new(cache_dir.to_path_buf())?);
    let director = PlaceDirector::new(client.clone(), client, cache);

    eprintln!("Fetching places...");
    let mut places = director.refresh().await.context("Failed to refresh places")?;
    if places.is_empty() {
        eprintln!("No places returned; the cached list was left unchanged.");
        return Ok(());
    }

    sort_places(&mut places, PlaceSortColumn::default());
    print_table(&places);
    eprintln!("\n{} places cached.", places.len());
    Ok(())
}

fn list(cache_dir: &Path, sort: PlaceSortColumn) -> Result<()> {
    let cache = CacheManager::new(cache_dir.to_path_buf())?;
    let Some(cached) = cache.load_cached_places() else {
        eprintln!("No cached places. Run `californication refresh` first.");
        return Ok(());
    };

    let age = cached.age_display();
    let mut places = cached.data;
    sort_places(&mut places, sort);
    print_table(&places);
    eprintln!("\n{} places, updated {}.", places.len(), age);
    Ok(())
}

fn show(cache_dir: &Path, id: &str) -> Result<()> {
    let cache = CacheManager::new(cache_dir.to_path_buf())?;
    let places = cache
        .load_places()
        .ok_or_else(|| anyhow!("No cached places. Run `californication refresh` first."))?;
    let place = places
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow!("No cached place with id {}", id))?;

    print_details(place);
    Ok(())
}

async fn image(config: &Config, url: &str, out: Option<&Path>) -> Result<()> {
    let fetcher = Arc::new(config.image_client()?);
    let images = ImageCache::new(config.image_cache_dir()?, fetcher)?;

    let cached = images.contains(url);
    let bytes = images
        .image(url)
        .await
        .with_context(|| format!("Failed to load image {}", url))?;

    if let Some(path) = out {
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!(
        "{} bytes ({})",
        bytes.len(),
        if cached { "from cache" } else { "downloaded" }
    );
    Ok(())
}

fn clear_cache(config: &Config, cache_dir: &Path) -> Result<()> {
    let cache = CacheManager::new(cache_dir.to_path_buf())?;
    cache.clear_places()?;

    let images = ImageCache::new(config.image_cache_dir()?, Arc::new(config.image_client()?))?;
    let removed = images.clear()?;
    println!("Cleared cached places and {} images.", removed);
    Ok(())
}

fn print_table(places: &[Place]) {
    println!(
        "{:<name$}  {:<6}  {:<5}  {:<sum$}  {}",
        "NAME",
        "RATING",
        "PRICE",
        "SUMMARY",
        "ID",
        name = NAME_WIDTH,
        sum = SUMMARY_WIDTH
    );
    for place in places {
        println!(
            "{:<name$}  {:<6}  {:<5}  {:<sum$}  {}",
            truncate_string(&place.name, NAME_WIDTH),
            place.rating_display(),
            place.price_level.symbol(),
            truncate_string(&place.summary, SUMMARY_WIDTH),
            place.id,
            name = NAME_WIDTH,
            sum = SUMMARY_WIDTH
        );
    }
}

fn print_details(place: &Place) {
    println!("{}", place.name);
    println!("{}", "=".repeat(place.name.chars().count()));
    println!("Types:       {}", place.types_display());
    println!("Summary:     {}", place.summary);
    println!("Description: {}", place.description);
    println!("Address:     {}", format_optional(&place.address, "-"));
    println!("Phone:       {}", format_optional(&place.phone_number, "-"));
    println!("Website:     {}", format_optional(&place.website, "-"));
    println!("Rating:      {} {}", star_bar(place.rating), place.rating_display());
    println!("Price:       {}", place.price_level.symbol());
    println!("Location:    {}", place.coordinate);
    println!("Image:       {}", place.image.large);
}
