mod api;
mod cli;
mod config;
mod downloader;
mod duplicates;
mod errors;
mod fetcher;
mod orchestrator;
mod prompt;
mod selector;
mod tags;
mod template;
mod track;

use crate::api::ApiClient;
use crate::cli::Cli;
use crate::config::{AppConfig, BatchEntry, FileType};
use crate::downloader::{make_downloader, Backend, DownloadTask};
use crate::duplicates::{DuplicatePolicy, DuplicateState};
use crate::errors::{AppError, Result};
use crate::orchestrator::{FailedTask, Orchestrator};
use crate::prompt::{is_yes, Prompter, StdinPrompter};
use crate::tags::LoftyTagWriter;
use crate::track::{Collection, CollectionKind, Track};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use url::Url;

/// Bounded retry offered after an interactive run.
const INTERACTIVE_RETRY_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() {
    // No arguments at all means interactive mode.
    let interactive = std::env::args().len() <= 1;
    let cli = Cli::parse();

    // A user-set RUST_LOG takes precedence over the built-in default.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_level(cli.debug)),
    )
    .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };

    match run(cli, config, interactive).await {
        Ok(failures) if failures.is_empty() => {}
        Ok(failures) => {
            error!("The following tracks could not be downloaded:");
            for failure in &failures {
                error!("  * {} ({})", failure.task.track.title, failure.reason);
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn default_log_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

async fn run(cli: Cli, config: AppConfig, interactive: bool) -> Result<Vec<FailedTask>> {
    let mut prompter = StdinPrompter;

    if interactive {
        return run_interactive(&config, &mut prompter).await;
    }

    let settings = RunSettings::from_cli(&cli, &config);

    if let Some(path) = &cli.config_file {
        let entries = config::load_batch_config(path)?;
        let mut permanent = Vec::new();
        for entry in &entries {
            let entry_settings = settings.for_entry(entry);
            permanent.extend(
                run_urls(
                    std::slice::from_ref(&entry.url),
                    &entry_settings,
                    false,
                    &mut prompter,
                )
                .await?,
            );
        }
        return Ok(permanent);
    }

    if cli.urls.is_empty() {
        return Err(AppError::InvalidConfig(
            "the '-u'/'--urls' argument must be supplied if not using a config file".to_string(),
        ));
    }

    run_urls(&cli.urls, &settings, false, &mut prompter).await
}

async fn run_interactive(
    config: &AppConfig,
    prompter: &mut StdinPrompter,
) -> Result<Vec<FailedTask>> {
    println!("{}", "=".repeat(48));
    println!("||            Spotify Downloader              ||");
    println!("{}\n", "=".repeat(48));

    let mut urls = Vec::new();
    loop {
        let url = prompter.read_line(
            "Enter URL for a Spotify track/album/playlist, or leave blank and press [ENTER] when done.\n---URL: ",
        )?;
        if url.is_empty() {
            break;
        }
        urls.push(url);
    }

    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let mut settings = RunSettings::from_config(config);
    settings.output_dir = prompt_output_dir(prompter, &settings.output_dir)?;

    run_urls(&urls, &settings, true, prompter).await
}

/// Resolves the given URLs into tasks, runs the batch, and applies retries.
/// Returns the permanent failures.
async fn run_urls(
    urls: &[String],
    settings: &RunSettings,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<Vec<FailedTask>> {
    // Template and directory problems surface before any network activity.
    template::validate(&settings.template)?;
    ensure_output_dir(settings)?;

    let api = ApiClient::new();
    let mut tasks = Vec::new();
    for url in urls {
        match tasks_for_url(&api, url, settings, interactive, prompter).await {
            Ok(resolved) => tasks.extend(resolved),
            // Missing collections and tracks skip that input, never the run.
            Err(AppError::NotFound(msg)) => warn!("{}", msg),
            Err(e) => return Err(e),
        }
    }

    if tasks.is_empty() {
        info!("Nothing to download.");
        return Ok(Vec::new());
    }

    info!(
        "Downloading {} track(s) to '{}'.",
        tasks.len(),
        settings.output_dir.display()
    );

    let orchestrator = Orchestrator::new(
        make_downloader(settings.backend),
        Box::new(LoftyTagWriter),
        settings.file_type.extension().to_string(),
    );
    let mut state = DuplicateState::configured(settings.duplicate_policy);
    let report = orchestrator
        .run_batch(tasks, &mut state, interactive, prompter)
        .await;

    let mut failures = report.failures;
    if !failures.is_empty() {
        let attempts = if interactive {
            warn!("{} track(s) failed to download.", failures.len());
            let answer = prompter.read_line("Retry failed downloads? [Y/n]: ")?;
            if is_yes(&answer, true) {
                INTERACTIVE_RETRY_ATTEMPTS
            } else {
                0
            }
        } else {
            settings.retry_count
        };

        if attempts > 0 {
            failures = orchestrator.retry_failures(failures, attempts).await;
        }
    }

    Ok(failures)
}

/// Turns one input URL into download tasks. A URL that points at nothing is
/// a `NotFound`; an unparseable URL is only warned about.
async fn tasks_for_url(
    api: &ApiClient,
    raw_url: &str,
    settings: &RunSettings,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<Vec<DownloadTask>> {
    let input = match classify_url(raw_url) {
        Some(input) => input,
        None => {
            warn!("Invalid URL: {}", raw_url);
            return Ok(Vec::new());
        }
    };

    match input {
        InputUrl::Track { id } => {
            let track = fetcher::fetch_track(api, &id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Song not found at {}", raw_url)))?;
            info!("  {}", template::render(&settings.template, &track));
            Ok(vec![make_task(track, settings)])
        }
        InputUrl::Collection { kind, id, selector } => {
            let collection = fetcher::fetch_collection(api, kind, &id).await?.ok_or_else(|| {
                let private_hint = match kind {
                    CollectionKind::Playlist => " or it is set to private",
                    CollectionKind::Album => "",
                };
                AppError::NotFound(format!(
                    "{} not found at {}{}",
                    kind, raw_url, private_hint
                ))
            })?;

            info!(
                "{} - {} ({} tracks)",
                collection.title,
                collection.owner,
                collection.tracks.len()
            );

            let indices = select_indices(&collection, selector.as_deref(), interactive, prompter)?;

            Ok(indices
                .into_iter()
                .map(|i| make_task(collection.tracks[i].clone(), settings))
                .collect())
        }
    }
}

/// Applies the `|selector` suffix, or `*` when absent. An empty resolution
/// is fatal non-interactively and a re-prompt interactively.
fn select_indices(
    collection: &Collection,
    selector_suffix: Option<&str>,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<Vec<usize>> {
    let len = collection.tracks.len();

    if let Some(raw) = selector_suffix {
        let ranges = selector::parse_selector(raw, len);
        if !ranges.is_empty() {
            return Ok(selector::resolve(&ranges, len));
        }
        if !interactive {
            return Err(AppError::InvalidSelector(format!(
                "no valid track numbers in '{}'",
                raw
            )));
        }
        warn!("No valid track numbers in '{}'.", raw);
    } else if !interactive {
        let ranges = selector::parse_selector("*", len);
        return Ok(selector::resolve(&ranges, len));
    }

    prompt_selector(prompter, collection)
}

fn prompt_selector(prompter: &mut dyn Prompter, collection: &Collection) -> Result<Vec<usize>> {
    let len = collection.tracks.len();
    loop {
        let answer = prompter.read_line(&format!(
            "\n    Enter 'show' to list the {} tracks, the track numbers to download, or '*' for all:\n      Example: '1, 4, 15-' for the first, fourth, and fifteenth to the end\n  > ",
            collection.kind
        ))?;

        if answer.eq_ignore_ascii_case("show") {
            for (i, track) in collection.tracks.iter().enumerate() {
                println!("    {:>4}| {} - {}", i + 1, track.title, track.artist);
            }
            continue;
        }

        let ranges = selector::parse_selector(&answer, len);
        if ranges.is_empty() {
            warn!("No valid input received: '{}'. Try again.", answer);
            continue;
        }
        return Ok(selector::resolve(&ranges, len));
    }
}

fn make_task(track: Track, settings: &RunSettings) -> DownloadTask {
    DownloadTask {
        filename: template::render(&settings.template, &track),
        track,
        output_dir: settings.output_dir.clone(),
    }
}

fn ensure_output_dir(settings: &RunSettings) -> Result<()> {
    if settings.output_dir.is_dir() {
        return Ok(());
    }

    if settings.create_dir {
        std::fs::create_dir_all(&settings.output_dir).map_err(|e| {
            AppError::Filesystem(format!(
                "cannot create '{}': {}",
                settings.output_dir.display(),
                e
            ))
        })?;
        info!("Created output directory {}", settings.output_dir.display());
        Ok(())
    } else {
        Err(AppError::Filesystem(format!(
            "'{}' is not a directory (pass --create-dir to create it)",
            settings.output_dir.display()
        )))
    }
}

fn prompt_output_dir(prompter: &mut dyn Prompter, default: &std::path::Path) -> Result<PathBuf> {
    let answer = prompter.read_line(&format!(
        "Downloads will go to {}. Enter a new location or press [ENTER] to keep it: ",
        default.display()
    ))?;

    let mut dir = if answer.is_empty() {
        default.to_path_buf()
    } else {
        PathBuf::from(answer)
    };

    loop {
        if dir.is_dir() {
            return Ok(dir);
        }

        let create = prompter.read_line(&format!(
            "The directory '{}' does not exist. Create it? [y/n]: ",
            dir.display()
        ))?;
        if is_yes(&create, false) {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Filesystem(format!("cannot create '{}': {}", dir.display(), e))
            })?;
            return Ok(dir);
        }

        dir = PathBuf::from(prompter.read_line("New download location: ")?);
    }
}

/// Effective options for one batch: user config overridden by CLI flags,
/// optionally overridden again by a batch config entry.
#[derive(Debug, Clone)]
struct RunSettings {
    output_dir: PathBuf,
    create_dir: bool,
    template: String,
    backend: Backend,
    file_type: FileType,
    duplicate_policy: Option<DuplicatePolicy>,
    retry_count: u32,
}

impl RunSettings {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.default_output_dir.clone(),
            create_dir: false,
            template: config.filename_template.clone(),
            backend: config.backend,
            file_type: config.file_type,
            duplicate_policy: config.duplicate_download_handling,
            retry_count: config.retry_count,
        }
    }

    fn from_cli(cli: &Cli, config: &AppConfig) -> Self {
        let base = Self::from_config(config);
        Self {
            output_dir: cli.output.clone().unwrap_or(base.output_dir),
            create_dir: cli.create_dir || base.create_dir,
            template: cli.filename.clone().unwrap_or(base.template),
            backend: cli.backend.unwrap_or(base.backend),
            file_type: cli.file_type.unwrap_or(base.file_type),
            duplicate_policy: cli.duplicates.or(base.duplicate_policy),
            retry_count: cli.retry_failed_downloads.unwrap_or(base.retry_count),
        }
    }

    fn for_entry(&self, entry: &BatchEntry) -> Self {
        Self {
            output_dir: entry.output_dir.clone().unwrap_or_else(|| self.output_dir.clone()),
            create_dir: entry.create_dir.unwrap_or(self.create_dir),
            template: entry
                .filename_template
                .clone()
                .unwrap_or_else(|| self.template.clone()),
            backend: self.backend,
            file_type: entry.file_type.unwrap_or(self.file_type),
            duplicate_policy: entry.duplicate_download_handling.or(self.duplicate_policy),
            retry_count: self.retry_count,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum InputUrl {
    Track {
        id: String,
    },
    Collection {
        kind: CollectionKind,
        id: String,
        /// Trailing `|<selector>` suffix, when present.
        selector: Option<String>,
    },
}

/// Classifies an input URL. The selector micro-syntax rides after a `|`:
/// `https://open.spotify.com/playlist/<id>|1,4,15-`.
fn classify_url(raw: &str) -> Option<InputUrl> {
    let (base, selector) = match raw.split_once('|') {
        Some((base, selector)) => (base, Some(selector.to_string())),
        None => (raw, None),
    };

    let parsed = Url::parse(base).ok()?;
    if parsed.host_str() != Some("open.spotify.com") {
        return None;
    }

    let mut segments = parsed.path_segments()?;
    let kind = segments.next()?;
    let id = segments.next()?.to_string();
    if id.is_empty() {
        return None;
    }

    match kind {
        "track" => Some(InputUrl::Track { id }),
        "album" => Some(InputUrl::Collection {
            kind: CollectionKind::Album,
            id,
            selector,
        }),
        "playlist" => Some(InputUrl::Collection {
            kind: CollectionKind::Playlist,
            id,
            selector,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    #[test]
    fn debug_flag_raises_the_default_log_level() {
        assert_eq!(default_log_level(false), "info");
        assert_eq!(default_log_level(true), "debug");
    }

    #[test]
    fn classifies_track_urls() {
        let input = classify_url("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(
            input,
            Some(InputUrl::Track {
                id: "4uLU6hMCjMI75M1A2tKUQC".to_string()
            })
        );
    }

    #[test]
    fn query_strings_are_stripped_from_ids() {
        let input = classify_url("https://open.spotify.com/track/abc123?si=xyz&utm_source=copy");
        assert_eq!(
            input,
            Some(InputUrl::Track {
                id: "abc123".to_string()
            })
        );
    }

    #[test]
    fn classifies_collections_with_selector_suffix() {
        let input = classify_url("https://open.spotify.com/playlist/mYpl4YLi5T|1,4,15-");
        assert_eq!(
            input,
            Some(InputUrl::Collection {
                kind: CollectionKind::Playlist,
                id: "mYpl4YLi5T".to_string(),
                selector: Some("1,4,15-".to_string()),
            })
        );

        let input = classify_url("https://open.spotify.com/album/alb42?si=x|2-5");
        assert_eq!(
            input,
            Some(InputUrl::Collection {
                kind: CollectionKind::Album,
                id: "alb42".to_string(),
                selector: Some("2-5".to_string()),
            })
        );
    }

    #[test]
    fn absent_selector_means_everything() {
        let input = classify_url("https://open.spotify.com/album/alb42");
        assert_eq!(
            input,
            Some(InputUrl::Collection {
                kind: CollectionKind::Album,
                id: "alb42".to_string(),
                selector: None,
            })
        );
    }

    #[test]
    fn foreign_and_malformed_urls_are_rejected() {
        assert_eq!(classify_url("https://example.com/track/abc"), None);
        assert_eq!(classify_url("https://open.spotify.com/artist/abc"), None);
        assert_eq!(classify_url("not a url"), None);
        assert_eq!(classify_url("https://open.spotify.com/"), None);
    }

    fn collection(n: usize) -> Collection {
        Collection {
            id: "c".to_string(),
            kind: CollectionKind::Playlist,
            title: "List".to_string(),
            owner: "Owner".to_string(),
            tracks: (1..=n)
                .map(|i| Track {
                    id: format!("t{}", i),
                    title: format!("Track {}", i),
                    artist: "A".to_string(),
                    album: "B".to_string(),
                    track_num: format!("{}", i),
                    cover_url: None,
                    release_date: None,
                    url: Track::canonical_url(&format!("t{}", i)),
                })
                .collect(),
            cover_url: None,
        }
    }

    #[test]
    fn invalid_selector_is_fatal_non_interactively() {
        let mut prompter = ScriptedPrompter::new(&[]);
        let err = select_indices(&collection(5), Some("banana"), false, &mut prompter)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSelector(_)));
    }

    #[test]
    fn invalid_selector_reprompts_interactively() {
        let mut prompter = ScriptedPrompter::new(&["still bad", "2-3"]);
        let indices = select_indices(&collection(5), Some("banana"), true, &mut prompter)
            .expect("selection");
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(prompter.asked, 2);
    }

    #[test]
    fn absent_selector_selects_everything_non_interactively() {
        let mut prompter = ScriptedPrompter::new(&[]);
        let indices =
            select_indices(&collection(3), None, false, &mut prompter).expect("selection");
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn valid_suffix_is_used_without_prompting_even_interactively() {
        let mut prompter = ScriptedPrompter::new(&[]);
        let indices =
            select_indices(&collection(10), Some("8-"), true, &mut prompter).expect("selection");
        assert_eq!(indices, vec![7, 8, 9]);
        assert_eq!(prompter.asked, 0);
    }

    #[test]
    fn batch_entry_overrides_settings() {
        let config = AppConfig::default();
        let base = RunSettings::from_config(&config);
        let entry = BatchEntry {
            url: "https://open.spotify.com/track/x".to_string(),
            output_dir: Some(PathBuf::from("/elsewhere")),
            create_dir: Some(true),
            duplicate_download_handling: Some(DuplicatePolicy::Overwrite),
            filename_template: Some("{track_num} {title}".to_string()),
            file_type: Some(FileType::M4a),
        };

        let merged = base.for_entry(&entry);
        assert_eq!(merged.output_dir, PathBuf::from("/elsewhere"));
        assert!(merged.create_dir);
        assert_eq!(merged.duplicate_policy, Some(DuplicatePolicy::Overwrite));
        assert_eq!(merged.template, "{track_num} {title}");
        assert_eq!(merged.file_type, FileType::M4a);
        // Backend and retry count are not per-entry options.
        assert_eq!(merged.backend, base.backend);
        assert_eq!(merged.retry_count, base.retry_count);
    }
}
