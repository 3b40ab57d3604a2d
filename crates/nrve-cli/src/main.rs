mod config;
#[cfg(feature = "web")]
mod web;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use nrve_chat::ChatService;
use nrve_core::{respond_to_mood, JournalDocument, JournalEntry, JournalStore, PromptKind};
use nrve_store::SqliteStore;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "nrve",
    version,
    about = "NRVE - journal, mood check-in and companion chat backend"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Bind address (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port (default from config or $PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Add a journal entry
    Add {
        /// Entry text; the first line becomes the title
        text: String,
    },

    /// List entries, most recently updated first
    List {
        /// Only show favorites
        #[arg(short, long)]
        favorites: bool,
    },

    /// Search entries by text or title
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "3")]
        limit: usize,
    },

    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: String,
    },

    /// Mark an entry as favorite
    Favorite {
        /// Entry ID
        id: String,

        /// Remove the favorite mark instead
        #[arg(long)]
        off: bool,
    },

    /// Mood check-in (sunny, cloudy, rainy, stormy)
    Mood {
        mood: String,
    },

    /// Send a chat message to the companion
    Chat {
        message: String,
    },

    /// Run a guided exercise (reflection, gratitude, reframe, grounding)
    Prompt {
        kind: PromptKind,

        input: String,
    },

    /// Import a journal.json document ({"entries": [...]})
    Import {
        path: PathBuf,
    },

    /// Export all entries as a journal.json document
    Export {
        /// Output file (stdout if omitted)
        path: Option<PathBuf>,
    },

    /// Show the active configuration
    Config,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "nrve", "nrve")
        .map(|dirs| dirs.data_dir().join("journal.db"))
        .unwrap_or_else(|| PathBuf::from("journal.db"))
}

fn open_store(db: Option<PathBuf>, config: &Config) -> Result<Arc<SqliteStore>> {
    let path = db
        .or_else(|| config.store.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path);
    tracing::debug!("opening store at {}", path.display());
    let store = SqliteStore::new(&path).context("failed to open database")?;
    Ok(Arc::new(store))
}

fn chat_service(store: Arc<SqliteStore>, config: &Config) -> ChatService<SqliteStore> {
    ChatService::new(store, config.model.build(), config.chat.settings())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        tracing_subscriber::filter::LevelFilter::INFO
    } else {
        tracing_subscriber::filter::LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let config = config::load_config()?;
    if let Commands::Config = cli.command {
        return cmd_config(&config);
    }

    let store = open_store(cli.db, &config)?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(store, &config, host, port),
        Commands::Add { text } => cmd_add(&store, &text),
        Commands::List { favorites } => cmd_list(&store, favorites),
        Commands::Search { query, limit } => cmd_search(&store, &query, limit),
        Commands::Delete { id } => cmd_delete(&store, &id),
        Commands::Favorite { id, off } => cmd_favorite(&store, &id, !off),
        Commands::Mood { mood } => cmd_mood(&mood),
        Commands::Chat { message } => cmd_chat(store, &config, &message),
        Commands::Prompt { kind, input } => cmd_prompt(store, &config, kind, &input),
        Commands::Import { path } => cmd_import(&store, &path),
        Commands::Export { path } => cmd_export(&store, path.as_deref()),
        Commands::Config => cmd_config(&config),
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[cfg(feature = "web")]
fn cmd_serve(
    store: Arc<SqliteStore>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or_else(|| config.server.port());
    let state = Arc::new(web::AppState::new(chat_service(store, config)));

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(web::serve(state, &host, port))
}

#[cfg(not(feature = "web"))]
fn cmd_serve(
    _store: Arc<SqliteStore>,
    _config: &Config,
    _host: Option<String>,
    _port: Option<u16>,
) -> Result<()> {
    anyhow::bail!("web feature not enabled, rebuild with `--features web`")
}

// ---------------------------------------------------------------------------
// Journal commands
// ---------------------------------------------------------------------------

fn cmd_add(store: &SqliteStore, text: &str) -> Result<()> {
    let entry = store.create(text)?;
    println!("Stored: {}", entry.id);
    Ok(())
}

fn cmd_list(store: &SqliteStore, favorites: bool) -> Result<()> {
    let mut entries = store.list()?;
    if favorites {
        entries.retain(|e| e.favorite);
    }

    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn cmd_search(store: &SqliteStore, query: &str, limit: usize) -> Result<()> {
    let results = store.search(query, limit)?;
    if results.is_empty() {
        println!("No entries found.");
        return Ok(());
    }
    for entry in &results {
        print_entry(entry);
    }
    Ok(())
}

fn cmd_delete(store: &SqliteStore, id: &str) -> Result<()> {
    let removed = store.delete(id)?;
    if removed == 0 {
        println!("No entry with id {id}.");
    } else {
        println!("Deleted: {id}");
    }
    Ok(())
}

fn cmd_favorite(store: &SqliteStore, id: &str, favorite: bool) -> Result<()> {
    let entry = store.set_favorite(id, favorite)?;
    let mark = if entry.favorite { "★" } else { "☆" };
    println!("{mark} {}", entry.title);
    Ok(())
}

fn cmd_import(store: &SqliteStore, path: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc: JournalDocument =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    let total = doc.entries.len();
    let imported = store.import_document(doc)?;
    println!("Imported {imported} of {total} entries.");
    Ok(())
}

fn cmd_export(store: &SqliteStore, path: Option<&Path>) -> Result<()> {
    let doc = store.export_document()?;
    let json = serde_json::to_string_pretty(&doc)?;
    match path {
        Some(p) => {
            std::fs::write(p, json).with_context(|| format!("writing {}", p.display()))?;
            println!("Exported {} entries to {}", doc.entries.len(), p.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Companion commands
// ---------------------------------------------------------------------------

fn cmd_mood(mood: &str) -> Result<()> {
    println!("{}", respond_to_mood(mood)?);
    Ok(())
}

fn cmd_chat(store: Arc<SqliteStore>, config: &Config, message: &str) -> Result<()> {
    let reply = chat_service(store, config).reply(message)?;
    if reply.degraded {
        tracing::info!("model unavailable, canned reply used");
    }
    println!("{}", reply.reply);
    Ok(())
}

fn cmd_prompt(
    store: Arc<SqliteStore>,
    config: &Config,
    kind: PromptKind,
    input: &str,
) -> Result<()> {
    let reply = chat_service(store, config).guided(kind, input)?;
    println!("{}", reply.reply);
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Config:   {}", config::show_config_path());
    println!(
        "Database: {}",
        config
            .store
            .path
            .clone()
            .unwrap_or_else(|| default_db_path().display().to_string())
    );
    println!(
        "Server:   {}:{}",
        config.server.host,
        config.server.port()
    );
    println!(
        "Model:    {} (key from ${}, timeout {}s)",
        config.model.model, config.model.api_key_env, config.model.timeout_secs
    );
    println!(
        "Chat:     retries={} match_limit={} recent_limit={} excerpt_chars={}",
        config.chat.max_retries,
        config.chat.match_limit,
        config.chat.recent_limit,
        config.chat.excerpt_chars
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_entry(entry: &JournalEntry) {
    let mark = if entry.favorite { "★" } else { " " };
    println!("{mark} [{}] {}", entry.id, entry.title);
    if let Some(preview) = &entry.preview {
        println!("    {}...", truncate(preview, 60));
    }
    println!(
        "    created {}  updated {}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.updated_at.format("%Y-%m-%d %H:%M")
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
