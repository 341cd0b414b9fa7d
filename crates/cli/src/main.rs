//! Neo assistant CLI (`neo`)
//!
//! Loads configuration and the local knowledge corpus, then answers
//! messages either once (`--message`) or in an interactive session that
//! streams replies as they arrive. Ctrl+C cancels the reply in flight and
//! ends the session at the prompt.
//!
//! ```bash
//! NEO_ENV=development neo --knowledge ./knowledge
//! neo --message "What is Orion?" --json
//! ```

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use neo_agent::{ChatCoordinator, ContextWindowStore};
use neo_config::{load_settings, Settings, VocabularyConfig};
use neo_core::{Block, BlockType, ChatEvent, ChatRequest, SourceRecord};
use neo_llm::{OpenAIBackend, OpenAIConfig};
use neo_rag::{HashEmbedder, InMemoryVectorIndex, KnowledgeLoader};

/// How often idle conversations are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Conversation id used by the interactive session
const SESSION_CONVERSATION: &str = "cli";

#[derive(Parser)]
#[command(name = "neo", version, about = "Neo, the Cogneoverse knowledge assistant")]
struct Cli {
    /// Configuration environment, loads `config/<env>.yaml` over `config/default.yaml`
    #[arg(long)]
    env: Option<String>,

    /// Directory of YAML/JSON knowledge files (overrides `knowledge.dir`)
    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// Trigger/stopword/domain vocabulary file (YAML)
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Answer a single message and exit
    #[arg(long, short)]
    message: Option<String>,

    /// With `--message`, print the structured response as JSON
    #[arg(long, requires = "message")]
    json: bool,

    /// Conversation id for `--message`
    #[arg(long, requires = "message")]
    conversation: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env = cli.env.clone().or_else(|| std::env::var("NEO_ENV").ok());
    let mut settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    if let Some(path) = &cli.vocabulary {
        settings.vocabulary = VocabularyConfig::load(path)
            .with_context(|| format!("loading vocabulary from {}", path.display()))?;
    }
    if let Some(dir) = &cli.knowledge {
        settings.knowledge.dir = dir.clone();
    }

    init_tracing(&settings);
    tracing::info!(
        environment = ?settings.environment,
        config = env.as_deref().unwrap_or("default"),
        "Starting Neo v{}",
        env!("CARGO_PKG_VERSION")
    );

    if settings.observability.metrics_enabled {
        init_metrics(settings.observability.metrics_port)?;
    }

    let coordinator = Arc::new(build_coordinator(&settings)?);

    let sweeper = spawn_sweeper(Arc::clone(coordinator.context_store()));

    let result = match cli.message {
        Some(message) => run_once(&coordinator, message, cli.conversation, cli.json).await,
        None => run_interactive(&coordinator).await,
    };

    sweeper.abort();
    result
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("neo={level},neo_agent={level},neo_rag={level},neo_llm={level},neo_config={level}")
            .into()
    });

    // Logs go to stderr so streamed replies own stdout
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing Prometheus exporter")?;
    tracing::info!(%addr, "Serving Prometheus metrics");
    Ok(())
}

fn build_coordinator(settings: &Settings) -> anyhow::Result<ChatCoordinator> {
    let index = Arc::new(InMemoryVectorIndex::new(HashEmbedder::new(
        settings.knowledge.embedding_dim,
    )));
    let loaded = KnowledgeLoader::load_directory(&settings.knowledge.dir, &index)
        .context("loading knowledge base")?;
    if loaded == 0 {
        tracing::warn!(
            dir = %settings.knowledge.dir.display(),
            "Knowledge base is empty; knowledge questions will get the fallback reply"
        );
    }

    let backend = OpenAIBackend::new(OpenAIConfig::from(&settings.llm))
        .context("configuring language model backend")?;
    tracing::info!(
        endpoint = %settings.llm.endpoint,
        model = %settings.llm.model,
        multi_hop = settings.rag.multi_hop_enabled(),
        "Language model ready"
    );

    Ok(ChatCoordinator::new(settings, index, Arc::new(backend)))
}

fn spawn_sweeper(store: Arc<ContextWindowStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            store.sweep_idle();
        }
    })
}

async fn run_once(
    coordinator: &ChatCoordinator,
    message: String,
    conversation: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut request = ChatRequest::new(message);
    if let Some(id) = conversation {
        request = request.with_conversation(id);
    }

    match coordinator.respond(request).await {
        Ok(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                for block in &response.blocks {
                    print!("{}", render_block(block));
                }
                print!("{}", render_sources(&response.sources));
            }
            Ok(())
        }
        Err(envelope) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
            anyhow::bail!("request {} failed: {}", envelope.request_id, envelope.error)
        }
    }
}

async fn run_interactive(coordinator: &Arc<ChatCoordinator>) -> anyhow::Result<()> {
    println!("Neo is ready. Type a message, /clear to forget the conversation, /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_prompt(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                coordinator.context_store().clear(SESSION_CONVERSATION);
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        let request = ChatRequest::new(line).with_conversation(SESSION_CONVERSATION);
        stream_reply(coordinator, request).await?;
    }

    Ok(())
}

/// Next input line; `None` on end of input or when `interrupt` fires first
async fn read_prompt<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        _ = interrupt => Ok(None),
        line = lines.next_line() => line,
    }
}

/// Print one streamed reply; Ctrl+C drops the stream and cancels the turn
async fn stream_reply(coordinator: &Arc<ChatCoordinator>, request: ChatRequest) -> anyhow::Result<()> {
    let mut events = coordinator.stream(request);
    let mut stdout = std::io::stdout();
    let mut sources: Vec<SourceRecord> = Vec::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n[cancelled]");
                return Ok(());
            }
            event = events.next() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    ChatEvent::Meta { sources: found, request_id, .. } => {
                        tracing::debug!(request_id = %request_id, "Reply started");
                        sources = found;
                    }
                    ChatEvent::Chunk { data } => {
                        print!("{}", data);
                        stdout.flush()?;
                    }
                    ChatEvent::Done => {
                        println!();
                        print!("{}", render_sources(&sources));
                        break;
                    }
                    ChatEvent::Error { message } => {
                        println!();
                        eprintln!("error: {}", message);
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn render_block(block: &Block) -> String {
    let content = block.content.as_deref().unwrap_or_default();
    let items = block.items.as_deref().unwrap_or_default();

    match block.block_type {
        BlockType::Heading => format!("# {}\n\n", content),
        BlockType::Paragraph => format!("{}\n\n", content),
        BlockType::List => {
            let mut out: String = items.iter().map(|item| format!("- {}\n", item)).collect();
            out.push('\n');
            out
        }
        BlockType::NumberedList => {
            let mut out: String = items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}\n", i + 1, item))
                .collect();
            out.push('\n');
            out
        }
        BlockType::Quote => format!("> {}\n\n", content),
        BlockType::Code => format!(
            "```{}\n{}\n```\n\n",
            block.language.as_deref().unwrap_or_default(),
            content
        ),
        BlockType::Divider => "---\n\n".to_string(),
    }
}

fn render_sources(sources: &[SourceRecord]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("Sources:\n");
    for source in sources {
        out.push_str(&format!(
            "  - {} ({}) [{:.3}]\n",
            source.title, source.source, source.score
        ));
    }
    out
}
