#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use futures::StreamExt;
use smartdocs_lib::config::load_from_path;
use smartdocs_lib::server::{run, ServerContext};
use smartdocs_lib::stream::{AnswerRenderer, NdjsonDecoder, RenderState, StreamEvent};
use smartdocs_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use smartdocs_lib::ChatRequest;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "SmartDocs chat gateway (retrieval-augmented answers over NDJSON)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the chat gateway
    Serve {
        /// Path to configuration TOML file
        #[arg(
            short,
            long,
            value_name = "FILE",
            env = "SMARTDOCS_CONFIG",
            default_value = "config/smartdocs.toml"
        )]
        config: PathBuf,
    },
    /// Ask a running gateway one question and print the streamed answer
    Ask {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:7860")]
        url: String,
        /// Model backend: "gemini" or "local"
        #[arg(long, default_value = "gemini")]
        model: String,
        /// Question to ask
        question: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Serve { config } => serve(config).await,
        Command::Ask { url, model, question } => ask(&url, &model, &question).await,
    };
    std::process::exit(code);
}

async fn serve(path: PathBuf) -> i32 {
    let cfg = match load_from_path(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return 1;
        }
    };
    if let Err(err) = init_tracing(&cfg.logging) {
        eprintln!("failed to initialize tracing: {err}");
        return 1;
    }
    info!(?cfg.listen, retriever = %cfg.retriever.url, "configuration loaded");

    let shutdown = CancellationToken::new();

    let (metrics, registry) = match cfg.telemetry.metrics_port {
        Some(port) => match init_metrics() {
            Ok((metrics, registry)) => {
                metrics.set_build_info();
                (Some(metrics), Some((port, registry)))
            }
            Err(err) => {
                error!(%err, "failed to initialize metrics");
                return 1;
            }
        },
        None => (None, None),
    };

    let ctx = match ServerContext::from_config(&cfg, metrics) {
        Ok(ctx) => Arc::new(ctx),
        Err(err) => {
            error!(%err, "failed to build chat gateway");
            return 1;
        }
    };

    if let Some((port, registry)) = registry {
        let retriever = Arc::clone(ctx.handler.retriever());
        let token = shutdown.child_token();
        tokio::spawn(async move {
            if let Err(err) = start_observability_server(port, registry, retriever, token).await {
                error!(%err, "observability server exited with error");
            }
        });
    }

    match run(ctx, shutdown).await {
        Ok(()) => 0,
        Err(err) => {
            error!(%err, "chat gateway exited with error");
            1
        }
    }
}

async fn ask(url: &str, model: &str, question: &str) -> i32 {
    let endpoint = format!("{}/chat", url.trim_end_matches('/'));
    let request = ChatRequest::new(question, model);

    let response = match reqwest::Client::new().post(&endpoint).json(&request).send().await {
        Ok(response) => response,
        Err(err) => {
            eprintln!("request to {endpoint} failed: {err}");
            return 1;
        }
    };

    let mut decoder = NdjsonDecoder::new();
    let mut renderer = AnswerRenderer::new();
    let mut body = response.bytes_stream();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                eprintln!("\nconnection lost: {err}");
                return 1;
            }
        };
        let events = match decoder.feed(&chunk) {
            Ok(events) => events,
            Err(err) => {
                eprintln!("\ninvalid stream: {err}");
                return 1;
            }
        };
        for event in events {
            if let StreamEvent::Token { text } = &event {
                print!("{text}");
                let _ = stdout.flush();
            }
            renderer.apply(event);
        }
    }
    if let Err(err) = decoder.finish() {
        eprintln!("\ninvalid stream: {err}");
        return 1;
    }

    match renderer.state() {
        RenderState::Complete => {
            println!();
            if !renderer.sources().is_empty() {
                println!("\nSources: {}", renderer.sources().join(", "));
            }
            0
        }
        RenderState::Failed => {
            if let Some((kind, message)) = renderer.error() {
                eprintln!("\nerror ({}): {message}", kind.as_str());
            }
            1
        }
        RenderState::Pending | RenderState::Streaming => {
            eprintln!("\nstream ended before the answer was complete");
            1
        }
    }
}
