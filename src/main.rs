use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use repolens_core::bootstrap::{create_provider, resolve_config_path};
use repolens_core::{AnswerResponse, Config, FileDocumentation, QaService, analyze_repository};
use repolens_index::source::load_directory;
use repolens_llm::any::AnyProvider;

#[derive(Parser)]
#[command(name = "repolens", version, about = "Ask questions about a source repository")]
struct Cli {
    /// Config file, overrides `REPOLENS_CONFIG`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway until Ctrl-C.
    #[cfg(feature = "gateway")]
    Serve,
    /// Answer one question about a local directory.
    Ask {
        path: PathBuf,
        question: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the structural overview of a local directory without calling a model.
    Summary { path: PathBuf },
    /// Generate per-file documentation for a local directory.
    Docs {
        path: PathBuf,
        /// Write documented copies of every file under this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match cli.command {
        #[cfg(feature = "gateway")]
        Command::Serve => serve(&config).await,
        Command::Ask {
            path,
            question,
            json,
        } => ask(&config, &path, &question, json).await,
        Command::Summary { path } => summary(&path),
        Command::Docs { path, out } => docs(&config, &path, out.as_deref()).await,
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn build_service(config: &Config) -> anyhow::Result<QaService<AnyProvider>> {
    let provider = create_provider(config)?;
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "provider ready"
    );
    health_check(&provider).await;
    Ok(QaService::new(Arc::new(provider), config))
}

async fn health_check(provider: &AnyProvider) {
    match provider {
        AnyProvider::Ollama(ollama) => match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        },
        AnyProvider::OpenAi(_) => {}
        #[cfg(feature = "mock")]
        AnyProvider::Mock(_) => {}
    }
}

#[cfg(feature = "gateway")]
async fn serve(config: &Config) -> anyhow::Result<()> {
    use repolens_gateway::GatewayServer;
    use tokio::sync::watch;

    let service = Arc::new(build_service(config).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let gateway = &config.gateway;
    GatewayServer::new(&gateway.bind, gateway.port, service, shutdown_rx)
        .with_auth(gateway.auth_token.clone())
        .with_rate_limit(gateway.rate_limit)
        .with_max_body_size(gateway.max_body_size)
        .serve()
        .await?;
    Ok(())
}

async fn ask(config: &Config, path: &Path, question: &str, json: bool) -> anyhow::Result<()> {
    let service = build_service(config).await?;
    let files = load_directory(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let report = service.upload(files).await?;
    let response = service.ask(&report.repo_id, question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_answer(&response));
    }
    Ok(())
}

fn render_answer(response: &AnswerResponse) -> String {
    let mut out = format!("{}\n", response.answer);
    if !response.sources.is_empty() {
        let _ = writeln!(out, "\nSources (confidence {:.2}):", response.confidence);
        for source in &response.sources {
            let _ = writeln!(out, "  {}:{}", source.file, source.lines);
        }
    }
    out
}

fn summary(path: &Path) -> anyhow::Result<()> {
    let files = load_directory(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let facts = analyze_repository(&files);
    println!("{}", facts.summary);

    let important = facts.important_files();
    if !important.is_empty() {
        println!("\nImportant files:");
        for file in important {
            println!("  {} ({})", file.path, file.reason);
        }
    }
    Ok(())
}

async fn docs(config: &Config, path: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let service = build_service(config).await?;
    let files = load_directory(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let report = service.upload(files).await?;
    let documented = service.generate_docs(&report.repo_id).await?;

    match out {
        Some(dir) => {
            write_docs(dir, &documented)?;
            tracing::info!(files = documented.len(), out = %dir.display(), "documentation written");
        }
        None => {
            for doc in &documented {
                println!("== {} ==\n{}", doc.path, doc.documentation);
            }
        }
    }
    Ok(())
}

fn write_docs(dir: &Path, documented: &[FileDocumentation]) -> anyhow::Result<()> {
    for doc in documented {
        let target = dir.join(&doc.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, &doc.documented_content)
            .with_context(|| format!("failed to write {}", target.display()))?;
    }
    Ok(())
}
