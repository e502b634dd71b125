use annotex::{
    CanonicalText, ExportBundle, ExportConfig, HighlightState, IdentityMap, LatexConverter, remap,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a document with its highlights and comments as LaTeX
    Export {
        /// JSON bundle with `document`, `highlights` and `comments`
        #[arg(long)]
        input: PathBuf,
        /// JSON export configuration
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical text highlight offsets refer to
    Text {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Apply an identity map to highlight state
    Remap {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        map: PathBuf,
    },
}

#[derive(Serialize)]
struct TextReport {
    text: String,
    chars: usize,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Export {
            input,
            config,
            json,
        } => export_command(input, config.as_deref(), *json),
        Commands::Text { input, json } => text_command(input, *json),
        Commands::Remap { state, map } => remap_command(state, map),
    }
}

/// `ANNOTEX_LOG` > `RUST_LOG` > `warn`. Logs go to stderr.
fn init_logging() {
    let filter = env::var("ANNOTEX_LOG")
        .map(EnvFilter::new)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn export_command(input: &Path, config: Option<&Path>, json: bool) {
    let bundle: ExportBundle = read_json(input);
    tracing::debug!(
        path = %input.display(),
        highlights = bundle.highlights.len(),
        comments = bundle.comments.len(),
        "loaded bundle"
    );
    let config: ExportConfig = match config {
        Some(path) => read_json(path),
        None => ExportConfig::default(),
    };

    let composition = match bundle.export(&LatexConverter::new(), &config) {
        Ok(composition) => composition,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if json {
        print_json(&composition);
    } else {
        print!("{}", composition.output);
    }
}

fn text_command(input: &Path, json: bool) {
    let bundle: ExportBundle = read_json(input);
    let canonical = CanonicalText::of(&bundle.document);

    if json {
        print_json(&TextReport {
            chars: canonical.char_len(),
            text: canonical.into_string(),
        });
    } else {
        println!("{}", canonical.as_str());
    }
}

fn remap_command(state: &Path, map: &Path) {
    let state: HighlightState = read_json(state);
    let map: IdentityMap = read_json(map);
    print_json(&remap(&state, &map));
}
