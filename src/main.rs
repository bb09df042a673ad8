use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::prelude::*;

use encore::import::read_songs;
use encore::{
    Config, Controller, DisplayCount, DisplaySong, HistorySort, ImportOutcome, InitialSource,
    LibraryView, MergeMode, SessionPhase, SettingsPatch, SortKey, SortOrder,
};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Encore - random karaoke picks from your own song list", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON song list
    Import {
        /// Export file (JSON array of songs)
        file: PathBuf,
        /// How to combine with an existing catalog: replace, keep or sync
        #[arg(short, long)]
        mode: Option<MergeMode>,
    },

    /// Show the catalog
    List {
        /// Case-insensitive match on name, artist or album
        #[arg(short, long, default_value = "")]
        query: String,
        /// name, artist or album
        #[arg(long, default_value = "name")]
        sort: SortKey,
        #[arg(long)]
        desc: bool,
    },

    /// Propose songs and record them in history
    Recommend {
        /// Songs per recommendation (1 or 3); saved as the new default
        #[arg(short, long)]
        count: Option<u8>,
        /// Only draw from songs matching this search
        #[arg(short, long, default_value = "")]
        query: String,
        /// Only draw from these track URIs
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
    },

    /// Show or edit recommendation history
    History {
        /// newest, oldest, name or artist
        #[arg(long, default_value = "newest")]
        sort: HistorySort,
        /// Remove one entry by id
        #[arg(long)]
        remove: Option<String>,
        /// Remove every entry
        #[arg(long)]
        clear: bool,
    },

    /// Show or change settings
    Settings {
        #[arg(long)]
        prevent_duplicates: Option<bool>,
        /// all or unproposed
        #[arg(long)]
        initial_source: Option<InitialSource>,
        /// 1 or 3
        #[arg(long)]
        display_count: Option<u8>,
    },

    /// Catalog and history statistics
    Stats,

    /// Write the catalog back out as JSON
    Export {
        file: PathBuf,
    },

    /// Remove every song (history is kept)
    Clear,

    /// Print the config file location and an example config
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config);

    // Config needs no store; everything else opens one
    let open = || Controller::open(&config);

    match cli.command {
        Commands::Config => cmd_config(),
        Commands::Import { file, mode } => cmd_import(&mut open().await, file, mode).await,
        Commands::List { query, sort, desc } => cmd_list(&open().await, query, sort, desc),
        Commands::Recommend { count, query, select } => {
            cmd_recommend(&mut open().await, count, query, select).await
        }
        Commands::History { sort, remove, clear } => {
            cmd_history(&mut open().await, sort, remove, clear).await
        }
        Commands::Settings {
            prevent_duplicates,
            initial_source,
            display_count,
        } => {
            let patch = SettingsPatch {
                prevent_duplicates,
                initial_source,
                display_count: display_count.map(parse_display_count).transpose()?,
            };
            cmd_settings(&mut open().await, patch).await
        }
        Commands::Stats => print_json(&open().await.stats()),
        Commands::Export { file } => cmd_export(&open().await, file),
        Commands::Clear => {
            open().await.clear_catalog().await?;
            eprintln!("Catalog cleared");
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("ENCORE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_config() -> Result<()> {
    println!("# {}", Config::config_path()?.display());
    print!("{}", Config::example_config());
    Ok(())
}

fn cmd_export(controller: &Controller, file: PathBuf) -> Result<()> {
    let json = controller.export_catalog()?;
    std::fs::write(&file, json).with_context(|| format!("Failed to write {}", file.display()))?;
    eprintln!("Exported {} songs to {}", controller.state().songs.len(), file.display());
    Ok(())
}

async fn cmd_import(
    controller: &mut Controller,
    file: PathBuf,
    mode: Option<MergeMode>,
) -> Result<()> {
    let songs = read_songs(&file)?;
    let outcome = controller.import_songs(songs, mode).await?;
    print_json(&outcome)?;

    if let ImportOutcome::NeedsDecision { existing, .. } = outcome {
        eprintln!("{} songs already stored; re-run with --mode replace, keep or sync", existing);
    }
    Ok(())
}

fn cmd_list(controller: &Controller, query: String, sort: SortKey, desc: bool) -> Result<()> {
    require_catalog(controller)?;

    let order = if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    let songs: Vec<DisplaySong> = LibraryView::new(query, sort, order)
        .apply(&controller.state().songs)
        .iter()
        .map(DisplaySong::from)
        .collect();
    print_json(&songs)
}

async fn cmd_recommend(
    controller: &mut Controller,
    count: Option<u8>,
    query: String,
    select: Vec<String>,
) -> Result<()> {
    require_catalog(controller)?;

    if let Some(count) = count {
        let patch = SettingsPatch {
            display_count: Some(parse_display_count(count)?),
            ..Default::default()
        };
        controller.update_settings(patch).await;
    }

    let view = LibraryView::new(query, SortKey::TrackName, SortOrder::Ascending);
    controller.narrow_candidates(&select, &view);

    let recommendation = controller.request_recommendation().await;
    print_json(&recommendation)
}

async fn cmd_history(
    controller: &mut Controller,
    sort: HistorySort,
    remove: Option<String>,
    clear: bool,
) -> Result<()> {
    if clear {
        controller.clear_history().await;
    } else if let Some(id) = remove {
        controller.remove_history(&id).await;
    }
    print_json(&controller.history_sorted(sort))
}

async fn cmd_settings(controller: &mut Controller, patch: SettingsPatch) -> Result<()> {
    let settings = if patch.is_empty() {
        controller.state().settings
    } else {
        controller.update_settings(patch).await
    };
    print_json(&settings)
}

fn require_catalog(controller: &Controller) -> Result<()> {
    if controller.phase() == SessionPhase::Unloaded {
        anyhow::bail!("No songs loaded yet. Run `encore import <file>` first.");
    }
    Ok(())
}

fn parse_display_count(count: u8) -> Result<DisplayCount> {
    DisplayCount::try_from(count).map_err(anyhow::Error::msg)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_subcommand_parses() {
        let cli = Cli::try_parse_from(["encore", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_import_mode_aliases() {
        let args = ["encore", "import", "songs.json", "--mode", "keep"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Import { file, mode } => {
                assert_eq!(file, PathBuf::from("songs.json"));
                assert_eq!(mode, Some(MergeMode::MergeKeepExisting));
            }
            _ => panic!("expected import"),
        }

        assert!(Cli::try_parse_from(["encore", "import", "x.json", "--mode", "nope"]).is_err());
    }

    #[test]
    fn test_display_count_must_be_one_or_three() {
        assert_eq!(parse_display_count(3).unwrap(), DisplayCount::Three);
        assert!(parse_display_count(2).is_err());
    }
}
