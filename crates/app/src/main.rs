use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use match_overlay_core::{
    is_capture_host, launch, AppConfig, AssetProbe, FileProbe, Gesture, HttpProbe, MatchTimer,
    MediaEvent, MediaSink, NavigationWatcher, Overlay, OverlayError, RadioConfig, RadioInput,
    RadioScheduler, RawQuery, Reconciler, Renderer, UpdateCommand,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::sink::ConsoleSink;

mod sink;

#[tokio::main(flavor = "current_thread")]
async fn main() -> match_overlay_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render { url } => run_render(&url, config),
        Commands::Live { url } => run_live(&url, config).await,
        Commands::Radio {
            url,
            base,
            user_agent,
        } => run_radio(&url, &base, user_agent.as_deref(), config).await,
    }
}

fn run_render(url: &str, config: AppConfig) -> match_overlay_core::Result<()> {
    let location = Url::parse(url)?;
    tracing::info!(%location, "rendering single pass");

    let mut reconciler = Reconciler::new(config.overlay);
    let mut timer = MatchTimer::new();
    let commands = reconciler.apply(&RawQuery::from_url(&location), &mut timer);

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &commands)?;
    writeln!(stdout)?;
    Ok(())
}

async fn run_live(url: &str, config: AppConfig) -> match_overlay_core::Result<()> {
    let watcher = NavigationWatcher::parse(url)?;
    let overlay = Overlay::new(watcher.clone(), config.overlay, JsonLinesRenderer)?;

    let navigation = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Err(err) = navigate(&watcher, line) {
                tracing::warn!(input = line, error = %err, "navigation ignored");
            }
        }
        tracing::info!("stdin closed, stopping overlay");
        Ok::<_, OverlayError>(())
    };

    tokio::select! {
        result = overlay.run() => result,
        result = navigation => result,
    }
}

/// Maps one line of input onto a history operation.
fn navigate(watcher: &NavigationWatcher, line: &str) -> match_overlay_core::Result<()> {
    match line {
        "back" => {
            watcher.back()?;
        }
        "forward" => {
            watcher.forward()?;
        }
        fragment if fragment.starts_with('#') => {
            watcher.set_fragment(fragment)?;
        }
        other => match other.strip_prefix("replace ") {
            Some(target) => {
                watcher.replace_state(target.trim())?;
            }
            None => {
                watcher.push_state(other)?;
            }
        },
    }
    Ok(())
}

async fn run_radio(
    url: &str,
    base: &str,
    user_agent: Option<&str>,
    config: AppConfig,
) -> match_overlay_core::Result<()> {
    let location = Url::parse(url)?;
    let radio_config = config.radio.with_query(&RawQuery::from_url(&location));
    let probe = build_probe(base, &radio_config)?;
    let capture_host = is_capture_host(user_agent);

    let mut radio = match launch(probe.as_ref(), &radio_config, ConsoleSink::default(), capture_host)
        .await
    {
        Ok(radio) => radio,
        Err(err @ OverlayError::EmptyCatalog { .. }) => {
            tracing::warn!(error = %err, "radio disabled");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    print_json(&json!({ "catalog": radio.catalog() }))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "status" {
            print_status(&radio)?;
            continue;
        }
        match parse_radio_input(line) {
            Some(input) => radio.handle(input).await,
            None if line.is_empty() => {}
            None => tracing::warn!(input = line, "unknown radio command"),
        }
    }
    Ok(())
}

fn build_probe(
    base: &str,
    config: &RadioConfig,
) -> match_overlay_core::Result<Box<dyn AssetProbe>> {
    match Url::parse(base) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let timeout = Duration::from_millis(config.probe_timeout_ms);
            Ok(Box::new(HttpProbe::new(url, timeout)?))
        }
        _ => Ok(Box::new(FileProbe::new(base))),
    }
}

fn parse_radio_input(line: &str) -> Option<RadioInput> {
    let mut words = line.split_whitespace();
    let input = match words.next()? {
        "ended" => RadioInput::Media(MediaEvent::Ended),
        "error" => RadioInput::Media(MediaEvent::Error),
        "click" | "pointer" => RadioInput::Gesture(Gesture::Pointer),
        "key" => RadioInput::Gesture(Gesture::Key),
        "touch" => RadioInput::Gesture(Gesture::Touch),
        "next" => RadioInput::Advance,
        "volume" => RadioInput::SetVolume(words.next()?.parse().ok()?),
        _ => return None,
    };
    Some(input)
}

fn print_status(radio: &RadioScheduler<ConsoleSink>) -> match_overlay_core::Result<()> {
    print_json(&json!({
        "state": radio.state(),
        "current": radio.current_source(),
        "muted": radio.sink().is_muted(),
        "volume": radio.sink().volume(),
        "gesture_armed": radio.gesture_armed(),
        "tracks": radio.catalog().len(),
    }))
}

fn print_json(value: &serde_json::Value) -> match_overlay_core::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Writes every non-empty batch as one JSON line on stdout.
struct JsonLinesRenderer;

impl Renderer for JsonLinesRenderer {
    fn apply(&mut self, commands: &[UpdateCommand]) -> match_overlay_core::Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer(&mut stdout, commands)?;
        writeln!(stdout)?;
        stdout.flush()?;
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> match_overlay_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::from_json_file(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "URL-driven match overlay and background radio", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single reconciliation pass and print the resulting commands.
    Render {
        /// Overlay location, including its query string.
        url: String,
    },
    /// Follow navigation read from stdin (one URL, `back`, `forward`,
    /// `#fragment` or `replace <url>` per line) and stream commands.
    Live {
        /// Initial overlay location.
        url: String,
    },
    /// Discover media and drive the radio scheduler from stdin events.
    Radio {
        /// Location whose query carries the radio parameters.
        url: String,
        /// Directory or http(s) URL the media paths are relative to.
        #[arg(short, long, default_value = ".")]
        base: String,
        /// User agent used to guess whether audible autoplay is allowed.
        #[arg(long)]
        user_agent: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radio_commands() {
        assert_eq!(
            parse_radio_input("ended"),
            Some(RadioInput::Media(MediaEvent::Ended))
        );
        assert_eq!(
            parse_radio_input("click"),
            Some(RadioInput::Gesture(Gesture::Pointer))
        );
        assert_eq!(
            parse_radio_input("volume 0.25"),
            Some(RadioInput::SetVolume(0.25))
        );
        assert_eq!(parse_radio_input("volume loud"), None);
        assert_eq!(parse_radio_input("rewind"), None);
    }

    #[test]
    fn navigation_lines_drive_history() {
        let watcher = NavigationWatcher::parse("https://overlay.test/?points1=1").unwrap();
        navigate(&watcher, "?points1=2").unwrap();
        navigate(&watcher, "replace ?points1=3").unwrap();
        navigate(&watcher, "#scores").unwrap();
        assert_eq!(watcher.location().unwrap().fragment(), Some("scores"));

        navigate(&watcher, "back").unwrap();
        assert_eq!(watcher.location().unwrap().query(), Some("points1=3"));
        assert_eq!(watcher.location().unwrap().fragment(), None);
    }
}
