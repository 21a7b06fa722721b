mod graph_file;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::RwLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use canvas_core::models::is_known_model;
use canvas_core::serializer::{export_node, from_json};
use canvas_core::{
    model_info, paths, CanvasConfig, Command, CommandOutcome, CommandResult, NodeFactory, NodeId,
    NoticeLevel, Position, MODELS,
};
use canvas_llm::{OpenAiCompatProvider, TurnOutcome, TurnRunner};
use canvas_storage::{
    shorten_cid, ContentStore, FileContentStore, FileProjectRegistry, GatewayContentStore,
    ProjectService, SaveRequest,
};

use crate::graph_file::GraphFile;

#[derive(Parser)]
#[command(name = "canvas")]
#[command(about = "Branching conversation canvas")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.branchcanvas)
    #[arg(long, env = "CANVAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new root conversation
    New {
        #[arg(long, default_value_t = 250.0)]
        x: f64,
        #[arg(long, default_value_t = 100.0)]
        y: f64,
    },
    /// Branch a conversation
    Fork {
        node: String,
        /// Start an empty branch seeded with this quoted text. The text is
        /// kept as the branch's draft until the next `send` to it.
        #[arg(long)]
        selection: Option<String>,
    },
    /// Send a message and stream the reply
    Send {
        node: String,
        /// Defaults to the branch's draft
        message: Option<String>,
    },
    /// Rename a conversation
    Rename { node: String, title: String },
    /// Change the model a conversation talks to
    Model { node: String, model: String },
    /// Move a conversation on the canvas
    Move { node: String, x: f64, y: f64 },
    /// List conversations
    List,
    /// Print a conversation as plain text
    Transcript { node: String },
    /// Write the canvas (or one conversation) as JSON
    Export {
        #[arg(long)]
        node: Option<String>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the canvas with a project document
    Import { file: PathBuf },
    /// Remove every conversation
    Reset,
    /// Save the canvas as a registered project
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner: String,
        /// Upload through the configured IPFS gateway instead of the data dir
        #[arg(long)]
        gateway: bool,
    },
    /// Replace the canvas with a saved project
    Load {
        project_id: uuid::Uuid,
        #[arg(long)]
        gateway: bool,
    },
    /// List saved projects
    Projects {
        #[arg(long)]
        owner: String,
    },
    /// Show the model catalog
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    let mut config = CanvasConfig::load();
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config.data_dir();
    let graph = GraphFile::new(paths::graph_path(&data_dir));

    if cli.debug {
        eprintln!(
            "{}",
            format!("[DEBUG] Graph file: {}", graph.path().display()).dimmed()
        );
    }

    match cli.command {
        Commands::New { x, y } => {
            let position = Position::new(x, y);
            apply(&graph, &config, Command::CreateRoot { position })
        }
        Commands::Fork { node, selection } => apply(
            &graph,
            &config,
            Command::Fork {
                node_id: NodeId::from(node),
                position: None,
                selected_text: selection,
            },
        ),
        Commands::Send { node, message } => send(&graph, &config, node.into(), message).await,
        Commands::Rename { node, title } => apply(
            &graph,
            &config,
            Command::Rename {
                node_id: node.into(),
                title,
            },
        ),
        Commands::Model { node, model } => {
            if !is_known_model(&model) {
                println!(
                    "{}",
                    format!("⚠️  {} is not in the catalog", model).yellow()
                );
            }
            apply(
                &graph,
                &config,
                Command::SetModel {
                    node_id: node.into(),
                    model,
                },
            )
        }
        Commands::Move { node, x, y } => apply(
            &graph,
            &config,
            Command::Move {
                node_id: node.into(),
                position: Position::new(x, y),
            },
        ),
        Commands::List => list(&graph, &config),
        Commands::Transcript { node } => {
            let canvas = graph.load(factory(&config))?;
            println!("{}", canvas.transcript(&NodeId::from(node))?);
            Ok(())
        }
        Commands::Export { node, output } => export(&graph, &config, node, output),
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let document = from_json(&json)?;
            apply(&graph, &config, Command::Import { document })
        }
        Commands::Reset => apply(&graph, &config, Command::Reset),
        Commands::Save {
            name,
            description,
            owner,
            gateway,
        } => {
            let request = SaveRequest {
                name,
                description,
                owner: Some(owner),
            };
            if gateway {
                save(&graph, &config, GatewayContentStore::from_config(&config), request).await
            } else {
                let content = FileContentStore::new(paths::content_dir(&data_dir));
                save(&graph, &config, content, request).await
            }
        }
        Commands::Load {
            project_id,
            gateway,
        } => {
            if gateway {
                load(&graph, &config, GatewayContentStore::from_config(&config), project_id).await
            } else {
                let content = FileContentStore::new(paths::content_dir(&data_dir));
                load(&graph, &config, content, project_id).await
            }
        }
        Commands::Projects { owner } => {
            let registry = FileProjectRegistry::new(paths::projects_dir(&data_dir));
            let content = FileContentStore::new(paths::content_dir(&data_dir));
            let service = ProjectService::new(Arc::new(content), Arc::new(registry));
            for record in service.list(&owner).await? {
                println!(
                    "{}  {}  {:?}  {}",
                    record.id.to_string().cyan(),
                    record.name.bold(),
                    record.nft_status,
                    shorten_cid(record.data_cid.as_str()).dimmed()
                );
            }
            Ok(())
        }
        Commands::Models => {
            for model in MODELS {
                println!(
                    "{}  {} - {}",
                    model.id.cyan(),
                    model.name.bold(),
                    model.description
                );
            }
            Ok(())
        }
    }
}

fn factory(config: &CanvasConfig) -> NodeFactory {
    NodeFactory::new(config.default_model.clone())
}

/// Run one command against the graph file, persisting on success.
fn apply(graph: &GraphFile, config: &CanvasConfig, command: Command) -> anyhow::Result<()> {
    let mut canvas = graph.load(factory(config))?;
    let outcome = canvas.dispatch(command);
    report(&outcome);
    if outcome.is_ok() {
        graph.save(&canvas)?;
    }
    Ok(())
}

fn report(outcome: &CommandOutcome) {
    match &outcome.result {
        Some(CommandResult::NodeCreated(created)) => {
            println!("{}", format!("✅ {}", created.node_id).green());
            if let Some(draft) = &created.draft_input {
                println!("{}", format!("📝 Draft: {}", draft).cyan());
            }
        }
        Some(CommandResult::Imported(stats)) => println!(
            "{}",
            format!(
                "✅ {} conversations, {} links, {} messages",
                stats.total_nodes, stats.total_edges, stats.total_messages
            )
            .green()
        ),
        _ => {}
    }
    if let Some(notice) = &outcome.notice {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message.green()),
            NoticeLevel::Warning => println!("{}", format!("⚠️  {}", notice.message).yellow()),
            NoticeLevel::Error => println!("{}", format!("❌ {}", notice.message).red()),
        }
    }
}

fn list(graph: &GraphFile, config: &CanvasConfig) -> anyhow::Result<()> {
    let canvas = graph.load(factory(config))?;
    let view = canvas.view();
    if view.nodes.is_empty() {
        println!("{}", "No conversations yet".dimmed());
        return Ok(());
    }

    for card in &view.nodes {
        let parent = canvas
            .node(&card.id)
            .and_then(|node| node.parent_id.as_ref())
            .map(|p| format!(" ← {}", p))
            .unwrap_or_default();
        let branches = canvas.store().children_of(&card.id).count();
        println!(
            "{}  {} [{}] {} messages, {} branches{}",
            card.id.to_string().cyan(),
            card.title.bold(),
            card.model_name,
            card.message_count,
            branches,
            parent.dimmed()
        );
        if let Some(preview) = &card.preview {
            println!("    {}", preview.dimmed());
        }
        if let Some(draft) = canvas.draft(&card.id) {
            println!("    {}", format!("📝 {}", draft).cyan());
        }
    }
    Ok(())
}

fn export(
    graph: &GraphFile,
    config: &CanvasConfig,
    node: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let canvas = graph.load(factory(config))?;
    let json = match node {
        Some(node) => {
            let node_id = NodeId::from(node);
            let node = canvas
                .node(&node_id)
                .with_context(|| format!("no conversation {}", node_id))?;
            serde_json::to_string_pretty(&export_node(node))?
        }
        None => canvas_core::serializer::to_json(&canvas.export())?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("{}", format!("✅ Wrote {}", path.display()).green());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn send(
    graph: &GraphFile,
    config: &CanvasConfig,
    node_id: NodeId,
    message: Option<String>,
) -> anyhow::Result<()> {
    let canvas = graph.load(factory(config))?;
    let model = canvas
        .node(&node_id)
        .map(|node| model_info(&node.model).name)
        .with_context(|| format!("no conversation {}", node_id))?;
    let message = match message {
        Some(message) => message,
        None => canvas
            .draft(&node_id)
            .map(str::to_string)
            .with_context(|| format!("no message given and no draft on {}", node_id))?,
    };
    println!("{}", format!("🚀 {} is thinking...", model).cyan());

    let canvas = Arc::new(RwLock::new(canvas));
    let provider = Arc::new(OpenAiCompatProvider::from_config(config));
    let runner = TurnRunner::new(canvas.clone(), provider);

    let result = runner
        .run_with(&node_id, &message, |delta| {
            print!("{}", delta.green());
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    // The user message is kept even when the reply fails.
    graph.save(&*canvas.read().await)?;
    match result? {
        TurnOutcome::Completed { message_id: None, .. } => {
            println!("{}", "⚠️  Empty reply".yellow());
        }
        TurnOutcome::Completed { .. } => {}
        TurnOutcome::Abandoned { .. } => {
            println!("{}", "⚠️  Conversation removed during reply".yellow());
        }
    }
    Ok(())
}

async fn save<C: ContentStore>(
    graph: &GraphFile,
    config: &CanvasConfig,
    content: C,
    request: SaveRequest,
) -> anyhow::Result<()> {
    let canvas = graph.load(factory(config))?;
    let registry = FileProjectRegistry::new(paths::projects_dir(&config.data_dir()));
    let service = ProjectService::new(Arc::new(content), Arc::new(registry));

    let saved = service.save(&canvas, request).await?;
    println!("{}", format!("✅ Project {}", saved.record.id).green());
    println!(
        "{}",
        format!("📦 Data: {}", shorten_cid(saved.record.data_cid.as_str())).cyan()
    );
    println!(
        "{}",
        format!("🏷  Metadata: {}", shorten_cid(saved.record.metadata_cid.as_str())).cyan()
    );
    Ok(())
}

async fn load<C: ContentStore>(
    graph: &GraphFile,
    config: &CanvasConfig,
    content: C,
    project_id: uuid::Uuid,
) -> anyhow::Result<()> {
    let mut canvas = graph.load(factory(config))?;
    let registry = FileProjectRegistry::new(paths::projects_dir(&config.data_dir()));
    let service = ProjectService::new(Arc::new(content), Arc::new(registry));

    let stats = service.load(&mut canvas, project_id).await?;
    graph.save(&canvas)?;
    println!(
        "{}",
        format!(
            "✅ Loaded {} conversations, {} messages",
            stats.total_nodes, stats.total_messages
        )
        .green()
    );
    Ok(())
}
