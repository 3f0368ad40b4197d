//! Daydream CLI — dream backend HTTP server.
//!
//! Usage:
//!   daydream serve [--bind 0.0.0.0:8000] [--db path]

use clap::{Parser, Subcommand};
use daydream::{DreamOrchestrator, GroqGenerator, OpenStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "daydream", version, about = "Dream concept-tree backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Get the default database path (~/.local/share/daydream/daydream.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let daydream_dir = data_dir.join("daydream");
    std::fs::create_dir_all(&daydream_dir).ok();
    daydream_dir.join("daydream.db")
}

async fn cmd_serve(bind: String, db: Option<PathBuf>) -> i32 {
    let db_path = db.unwrap_or_else(default_db_path);
    let store = match SqliteStore::open(&db_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("failed to open database at {}: {}", db_path.display(), e);
            return 1;
        }
    };

    let generator = match GroqGenerator::from_env() {
        Ok(g) => Arc::new(g),
        Err(e) => {
            eprintln!("failed to configure generator: {} (set GROQ_API_KEY)", e);
            return 1;
        }
    };

    let orchestrator = Arc::new(DreamOrchestrator::new(generator, store));
    tracing::info!("daydream {} serving from {}", daydream::VERSION, db_path.display());

    if let Err(e) = daydream::http::run_server(&bind, orchestrator).await {
        eprintln!("server error: {}", e);
        return 1;
    }
    0
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { bind, db } => {
            let code = cmd_serve(bind, db).await;
            std::process::exit(code);
        }
    }
}
