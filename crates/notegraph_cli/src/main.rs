//! `notegraph` command-line entry point.
//!
//! Every command prints one pretty JSON document on stdout.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use notegraph_core::{
    init_logging, open_db, AppConfig, CoordinateReducer, EmbeddingGenerator, NoteGraphService,
    NoteScope, SqliteEmbeddingStore, SqliteNoteRepository,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(about = "Embeddings, coordinates and similarity graphs for notes")]
#[command(version)]
struct Cli {
    /// YAML configuration file (defaults to ./notegraph.yaml)
    #[arg(long, env = "NOTEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note and embed it
    AddNote {
        /// Owner ID
        #[arg(long)]
        owner: Uuid,

        /// Note text
        content: String,
    },

    /// Delete a note and its embedding
    DeleteNote {
        /// Note ID
        id: Uuid,
    },

    /// List embedded notes with their coordinates
    List {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Include raw embedding vectors
        #[arg(long)]
        vectors: bool,
    },

    /// Embed missing notes, then recompute coordinates
    Backfill {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Only generate embeddings
        #[arg(long)]
        skip_coords: bool,
    },

    /// Recompute coordinates for every embedded note in scope
    Coords {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Build the similarity graph
    Graph {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Minimum cosine similarity for an edge
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// Owner ID
    #[arg(long)]
    owner: Uuid,

    /// Calendar year of note creation (UTC)
    #[arg(long)]
    year: Option<i32>,

    /// Calendar month of note creation, 1-12 (UTC)
    #[arg(long)]
    month: Option<u32>,
}

impl From<&ScopeArgs> for NoteScope {
    fn from(args: &ScopeArgs) -> Self {
        NoteScope {
            owner_id: args.owner,
            year: args.year,
            month: args.month,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref());

    if let Some(dir) = config.logging.dir.as_deref() {
        if let Err(err) = init_logging(&config.logging.level, dir, true) {
            eprintln!("file logging disabled: {err}");
        }
    }

    let conn = open_db(&config.database.path)?;
    let notes = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::new(&conn);
    let generator = EmbeddingGenerator::from_config(&config.embedding);
    let reducer = CoordinateReducer::from_config(&config.projection);
    let service = NoteGraphService::new(&notes, &store, &generator, &reducer)
        .with_default_threshold(config.similarity.default_threshold);

    let output = match &cli.command {
        Commands::AddNote { owner, content } => {
            serde_json::to_value(service.lifecycle().create_note(*owner, content.as_str())?)?
        }
        Commands::DeleteNote { id } => {
            service.lifecycle().delete_note(*id)?;
            json!({ "deleted": id })
        }
        Commands::List { scope, vectors } => {
            let items = service.embeddings(&scope.into())?;
            let rows: Vec<Value> = items
                .iter()
                .map(|item| {
                    let mut row = json!({
                        "id": item.note.id,
                        "content": item.note.content,
                        "created_at": item.note.created_at,
                        "coords_3d": item.coordinates.spatial,
                        "coords_2d": item.coordinates.cluster,
                    });
                    if *vectors {
                        row["embedding"] = json!(item.vector);
                    }
                    row
                })
                .collect();
            json!({ "count": rows.len(), "embeddings": rows })
        }
        Commands::Backfill { scope, skip_coords } => {
            let scope = NoteScope::from(scope);
            if *skip_coords {
                serde_json::to_value(service.generate_missing(&scope)?)?
            } else {
                serde_json::to_value(service.run_backfill(&scope)?)?
            }
        }
        Commands::Coords { scope } => {
            let computed = service.recompute_coordinates(&scope.into())?;
            json!({ "computed": computed })
        }
        Commands::Graph { scope, threshold } => {
            serde_json::to_value(service.similarity_graph(&scope.into(), *threshold)?)?
        }
    };

    info!("event=cli_command module=cli status=ok");
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
