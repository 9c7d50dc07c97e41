use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ghgallery::cache::{GalleryCache, KvStore, MemoryStore, SqliteStore};
use ghgallery::config::{GalleryConfig, Settings};
use ghgallery::github::GitHubClient;
use ghgallery::render::render_hydration;
use ghgallery::types::RepoKey;
use ghgallery::{Gallery, Hydration};

#[derive(Parser)]
#[command(
    name = "ghgallery",
    about = "Browse image galleries stored in GitHub repositories"
)]
struct Cli {
    /// Settings file [default: <config dir>/ghgallery/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one page of a gallery
    Show(ShowArgs),

    /// Manage the listing cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check settings, cache and API access
    Doctor,
}

#[derive(Args)]
struct ShowArgs {
    /// Gallery name from the settings file
    name: Option<String>,

    /// Repository in owner/repo format
    #[arg(long)]
    repo: Option<String>,

    /// Branch, tag or commit to list
    #[arg(long)]
    branch: Option<String>,

    /// Directory inside the repository
    #[arg(long)]
    path: Option<String>,

    /// Include images in subdirectories
    #[arg(long)]
    recursive: bool,

    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Images per page (0 shows everything)
    #[arg(long)]
    page_size: Option<usize>,

    /// name-asc, name-desc, path-asc or path-desc
    #[arg(long)]
    sort: Option<String>,

    /// Print a caption under each image
    #[arg(long)]
    captions: bool,

    /// Keep the listing in memory only
    #[arg(long)]
    no_cache: bool,

    /// Ignore any cached listing
    #[arg(long)]
    refresh: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached listing
    Clear,
    /// Remove expired and unreadable listings
    Prune,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = load_settings(cli.config.clone()).and_then(|settings| match cli.command {
        Commands::Show(args) => cmd_show(&settings, args),
        Commands::Cache {
            action: CacheAction::Clear,
        } => cmd_cache_clear(&settings),
        Commands::Cache {
            action: CacheAction::Prune,
        } => cmd_cache_prune(&settings),
        Commands::Doctor => cmd_doctor(&settings, cli.config.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.to_string().contains("not configured") {
            eprintln!();
            eprintln!("Hint: ghgallery show --repo owner/repo --path images");
        }
        std::process::exit(1);
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match path.or_else(Settings::default_path) {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    Ok(settings.with_env())
}

/// Open the persistent store, falling back to memory so that a broken
/// cache never blocks showing a gallery.
fn open_store(settings: &Settings, no_cache: bool) -> Box<dyn KvStore> {
    if no_cache {
        return Box::new(MemoryStore::new());
    }
    let path = settings.cache_paths().database();
    match SqliteStore::open(&path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!(
                "Cache unavailable at {} ({}), continuing without it",
                path.display(),
                e
            );
            Box::new(MemoryStore::new())
        }
    }
}

fn cmd_show(settings: &Settings, args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = match &args.name {
        Some(name) => settings.gallery(name)?.clone(),
        None => GalleryConfig::default(),
    };

    let (owner, repo) = match &args.repo {
        Some(repo) => {
            let key: RepoKey = repo
                .parse()
                .map_err(|e| format!("Invalid repo format: {}", e))?;
            (
                Some(key.owner.as_str().to_string()),
                Some(key.repo.as_str().to_string()),
            )
        }
        None => (None, None),
    };

    let config = base.merge(GalleryConfig {
        owner,
        repo,
        branch: args.branch,
        path: args.path,
        recursive: args.recursive.then_some(true),
        page_size: args.page_size,
        sort: args.sort,
        captions: args.captions.then_some(true),
    });

    let client = GitHubClient::with_timeout(settings.timeout()).with_token(settings.token.clone());
    let cache = GalleryCache::new(open_store(settings, args.no_cache)).with_ttl(settings.ttl());
    let gallery = Gallery::from_config(&config, &settings.host, client, cache);

    let hydration = if args.refresh {
        gallery.refresh(args.page)
    } else {
        gallery.hydrate(args.page)
    };

    if let Hydration::Failed { message, .. } = hydration {
        return Err(message.into());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_hydration(&hydration, config.captions(), &mut out)?;
    out.flush()?;

    Ok(())
}

fn cmd_cache_clear(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&settings.cache_paths().database())?;
    let removed = GalleryCache::new(store).clear();
    println!("Removed {} cached listing(s)", removed);
    Ok(())
}

fn cmd_cache_prune(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&settings.cache_paths().database())?;
    let stats = GalleryCache::new(store).with_ttl(settings.ttl()).prune();
    println!(
        "Scanned {} cached listing(s), removed {}",
        stats.scanned, stats.removed
    );
    Ok(())
}

fn cmd_doctor(
    settings: &Settings,
    config_path: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("ghgallery System Check\n");

    let config_path = config_path.map(PathBuf::from).or_else(Settings::default_path);
    let config_ok = config_path.as_ref().map(|p| p.exists()).unwrap_or(false);
    println!(
        "[{}] Settings: {}",
        if config_ok { "OK" } else { "INFO" },
        config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or("unknown".into())
    );
    println!(
        "[INFO] Galleries: {}",
        if settings.galleries.is_empty() {
            "none configured".to_string()
        } else {
            settings
                .galleries
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        }
    );

    let db_path = settings.cache_paths().database();
    let cache_ok = SqliteStore::open(&db_path).is_ok();
    println!(
        "[{}] Cache: {}",
        if cache_ok { "OK" } else { "FAIL" },
        db_path.display()
    );

    let client = GitHubClient::with_timeout(settings.timeout()).with_token(settings.token.clone());
    let api_ok = match client.rate_limit(&settings.host) {
        Ok(rate) => {
            println!(
                "[{}] API {}: {}/{} requests left{}",
                if rate.remaining > 0 { "OK" } else { "FAIL" },
                settings.host,
                rate.remaining,
                rate.limit,
                if settings.token.is_some() {
                    " (authenticated)"
                } else {
                    ""
                }
            );
            rate.remaining > 0
        }
        Err(e) => {
            println!("[FAIL] API {}: {}", settings.host, e);
            false
        }
    };

    if !cache_ok || !api_ok {
        std::process::exit(1);
    }

    Ok(())
}
