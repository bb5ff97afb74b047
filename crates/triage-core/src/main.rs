use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use triage_capability::{Capabilities, MemoryIndex, OpenAiProvider};
use triage_core::{
    find_and_load_tickets, BulkClassifier, BulkEvent, ProviderKind, ReportBuilder, TriageConfig,
    TriageService,
};

fn build_cli() -> Command {
    Command::new("triage")
        .version(triage_core::VERSION)
        .about("Support-ticket triage: classify, retrieve, answer, route")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML config file"),
        )
        .subcommand(
            Command::new("classify")
                .about("Classify a single ticket (labels, sentiment, priority)")
                .arg(
                    Arg::new("text")
                        .long("text")
                        .required(true)
                        .help("Ticket text"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Run the full triage graph on a single ticket")
                .arg(
                    Arg::new("text")
                        .long("text")
                        .required(true)
                        .help("Ticket text"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("bulk")
                .about("Classify every ticket in a file, streaming progress")
                .arg(
                    Arg::new("tickets")
                        .long("tickets")
                        .value_parser(value_parser!(PathBuf))
                        .help("Tickets JSON file (defaults to the configured path)"),
                )
                .arg(
                    Arg::new("json-lines")
                        .long("json-lines")
                        .action(ArgAction::SetTrue)
                        .help("Emit one JSON event per line"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Classify a ticket file and print distribution statistics")
                .arg(
                    Arg::new("tickets")
                        .long("tickets")
                        .value_parser(value_parser!(PathBuf))
                        .help("Tickets JSON file (defaults to the configured path)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn build_capabilities(config: &TriageConfig) -> anyhow::Result<Capabilities> {
    let index = Arc::new(MemoryIndex::new(config.retrieval_top_k));
    if let Some(dir) = &config.knowledge_dir {
        let added = index
            .load_directory(dir)
            .with_context(|| format!("indexing knowledge documents in {}", dir.display()))?;
        tracing::info!(count = added, dir = %dir.display(), "knowledge base indexed");
    }

    match config.provider {
        ProviderKind::Heuristic => Ok(Capabilities::offline(index)),
        ProviderKind::OpenAi => {
            let api_key = config.resolved_api_key().with_context(|| {
                format!(
                    "provider 'openai' needs an api_key in the config or the {} environment variable",
                    triage_core::API_KEY_ENV
                )
            })?;
            let provider = Arc::new(
                OpenAiProvider::new(api_key)?
                    .with_model(&config.model)
                    .with_api_url(&config.api_url),
            );
            Ok(Capabilities::new(
                provider.clone(),
                index,
                provider.clone(),
                provider,
            ))
        }
    }
}

fn ticket_candidates(config: &TriageConfig, explicit: Option<&PathBuf>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.clone()],
        None => vec![
            config.tickets_file.clone(),
            PathBuf::from("sample_tickets.json"),
            PathBuf::from("data/sample_tickets.json"),
        ],
    }
}

fn format_labels(classification: &triage_ticket::Classification) -> String {
    if classification.labels.is_empty() {
        return "(none)".to_string();
    }
    classification
        .labels
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_bulk_event(event: &BulkEvent, total: usize) {
    match event {
        BulkEvent::Started { total } => println!("Classifying {total} tickets..."),
        BulkEvent::Classified {
            ticket_id,
            index,
            classification,
        } => {
            println!(
                "[{}/{}] {}: {} ({}, {})",
                index + 1,
                total,
                ticket_id,
                format_labels(classification),
                classification.priority,
                classification.sentiment
            );
        }
        BulkEvent::Failed {
            ticket_id,
            index,
            error,
        } => {
            println!("[{}/{}] {}: FAILED - {}", index + 1, total, ticket_id, error);
        }
        BulkEvent::Completed { summary } => {
            println!();
            println!(
                "Done: {} classified, {} failed (of {})",
                summary.succeeded, summary.failed, summary.total
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let matches = build_cli().get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => TriageConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TriageConfig::default(),
    };

    let caps = build_capabilities(&config)?;
    let service = TriageService::new(&config, &caps)?;

    match matches.subcommand() {
        Some(("classify", args)) => {
            let text = args.get_one::<String>("text").unwrap();
            let outcome = service.classify_only(text).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("Labels:    {}", format_labels(&outcome.classification));
                println!("Sentiment: {}", outcome.classification.sentiment);
                println!("Priority:  {}", outcome.classification.priority);
            }
        }
        Some(("resolve", args)) => {
            let text = args.get_one::<String>("text").unwrap();
            let outcome = service.resolve_ticket(text).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                let decision = &outcome.decision;
                println!("Labels:     {}", format_labels(&outcome.classification));
                println!("Needs RAG:  {}", decision.needs_rag);
                println!("Team:       {}", decision.routing_team);
                println!("Confidence: {:.2}", decision.confidence);
                println!("Reason:     {}", decision.reason);
                if decision.queue_for_review {
                    println!("Queued for human review");
                }
                match &decision.final_response {
                    Some(response) => println!("\n{response}"),
                    None => println!("\n(no automatic response; escalated)"),
                }
            }
        }
        Some(("bulk", args)) => {
            let candidates = ticket_candidates(&config, args.get_one::<PathBuf>("tickets"));
            let (path, tickets) = find_and_load_tickets(&candidates)?;
            let json_lines = args.get_flag("json-lines");
            if !json_lines {
                println!("Loaded {} tickets from {}", tickets.len(), path.display());
            }

            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_cancel.cancel();
                }
            });

            let total = tickets.len();
            let (tx, mut rx) = mpsc::channel(32);
            let classifier = BulkClassifier::new(&service);
            let consumer = async {
                while let Some(event) = rx.recv().await {
                    if json_lines {
                        match serde_json::to_string(&event) {
                            Ok(line) => println!("{line}"),
                            Err(err) => eprintln!("could not encode event: {err}"),
                        }
                    } else {
                        render_bulk_event(&event, total);
                    }
                }
            };
            let (summary, ()) =
                tokio::join!(classifier.run_with_cancellation(&tickets, tx, &cancel), consumer);

            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Some(("report", args)) => {
            let candidates = ticket_candidates(&config, args.get_one::<PathBuf>("tickets"));
            let (path, tickets) = find_and_load_tickets(&candidates)?;
            let json = args.get_flag("json");
            if !json {
                println!("Classifying {} tickets from {}...", tickets.len(), path.display());
                println!();
            }

            let mut builder = ReportBuilder::new();
            for ticket in &tickets {
                let started = Instant::now();
                match service.classify_only(&ticket.text()).await {
                    Ok(outcome) => builder.record_success(&outcome.classification, started.elapsed()),
                    Err(err) => {
                        tracing::warn!(error = %err, "classification failed");
                        builder.record_failure();
                    }
                }
            }
            let report = builder.finish();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        _ => {}
    }

    Ok(())
}
