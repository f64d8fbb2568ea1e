mod cli;
mod error;

use clap::Parser;
use exn::ResultExt;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zimview_archive::Archive;
use zimview_archive::archive::DirectoryArchive;
use zimview_cache::{CacheService, Detector, Preferences};
use zimview_config::Config;
use zimview_render::{HeadlessSurface, Reader, RenderSurface};

use crate::cli::{CacheCommand, Cli, Command, log_filter};
use crate::error::{ErrorKind, Result};

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, cli.quiet)));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn open_cache(config: &Config) -> Result<CacheService> {
    let preferences = match &config.preferences {
        Some(path) => Preferences::load(path).or_raise(|| ErrorKind::Preferences)?,
        None => Preferences::in_memory(),
    };
    Ok(CacheService::new(Detector::new(config.cache.detector_options()), preferences))
}

async fn open(cache: Arc<CacheService>, root: &Path, title: Option<&str>) -> Result<()> {
    let archive = DirectoryArchive::new(root).or_raise(|| ErrorKind::Archive(root.to_path_buf()))?;
    let identifier = archive.identifier().to_string();
    let surface = Arc::new(HeadlessSurface::new());
    let reader = Reader::new(Arc::new(archive), cache, surface.clone());
    let handle = match title {
        Some(title) => reader.open(title).await.or_raise(|| ErrorKind::Render)?,
        None => match reader.resume().await.or_raise(|| ErrorKind::Render)? {
            Some(handle) => handle,
            None => exn::bail!(ErrorKind::NothingToResume(identifier)),
        },
    };
    let page = handle.finished().await.or_raise(|| ErrorKind::Render)?;
    info!(css = ?page.css.counts(), images = ?page.images.counts(), scripts = ?page.scripts.counts(), "rendered");
    println!("{}", surface.content().await);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let cache = Arc::new(open_cache(&config)?);
    match cli.command {
        Command::Open { archive, title } => open(cache, &archive, title.as_deref()).await?,
        Command::Cache { command: CacheCommand::Status } => println!("{}", cache.count().await),
        Command::Cache { command: CacheCommand::Clear { scope } } => {
            let removed = cache.clear(scope).await;
            println!("Removed {removed} items ({scope})");
        },
        Command::Prefs { cache_assets, remember_last_page } => {
            if let Some(switch) = cache_assets {
                cache.set_cache_assets(switch.into());
            }
            if let Some(switch) = remember_last_page {
                cache.set_remember_last_page(switch.into()).await;
            }
            let preferences = cache.preferences();
            println!("cache-assets: {}", preferences.cache_assets());
            println!("remember-last-page: {}", preferences.remember_last_page());
            for (archive, path) in preferences.last_pages() {
                println!("last page in {archive}: {path}");
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "command failed");
            ExitCode::FAILURE
        },
    }
}
