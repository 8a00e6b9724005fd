//! MediMind: multimodal health assistant server and CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use medimind_core::AssistantConfig;
use medimind_gateway::{BackendGateway, GatewayConfig};
use medimind_ledger::{SessionLedger, SessionSummary};
use medimind_runtime::{QueryOrchestrator, QueryRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("MEDIMIND_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Value following `--name`, if it is not itself a flag.
fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = resolve_data_dir();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(&data_dir).await,
        Some("ask") => ask(&args[2..], &data_dir).await,
        Some("summary") => {
            let Some(snapshot) = args.get(2) else {
                eprintln!("Usage: medimind summary <snapshot.json>");
                std::process::exit(1);
            };
            let ledger = SessionLedger::new();
            ledger.restore(Path::new(snapshot))?;
            print_summary(&ledger.summarize());
            Ok(())
        }
        Some("export") => {
            let Some(snapshot) = args.get(2) else {
                eprintln!("Usage: medimind export <snapshot.json> [output.csv]");
                std::process::exit(1);
            };
            let config = AssistantConfig::from_env(&data_dir)?;
            let ledger = SessionLedger::new();
            ledger.restore(Path::new(snapshot))?;
            let dest = args.get(3).map(PathBuf::from).unwrap_or_else(|| {
                config
                    .data_paths
                    .default_export_path(AppState::unix_now())
            });
            let path = ledger.export_tabular(&dest)?;
            println!("Exported {} interactions to {}", ledger.len(), path.display());
            Ok(())
        }
        Some("--help" | "-h" | "help") => {
            print_help();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'medimind help' for usage.", other);
            std::process::exit(1);
        }
    }
}

async fn serve(data_dir: &Path) -> anyhow::Result<()> {
    info!("Data directory: {}", data_dir.display());

    let config = AssistantConfig::from_env(data_dir)?;
    let port = config.port;

    let gateway_config = GatewayConfig::from_assistant_config(&config)?;
    let gateway = Arc::new(BackendGateway::from_config(&gateway_config)?);

    let state = Arc::new(AppState::new(config, gateway));
    info!("Synthesis policy: {}", state.orchestrator.policy());
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("MediMind server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// One orchestration from the command line, with optional session restore
/// before and persist after.
async fn ask(args: &[String], data_dir: &Path) -> anyhow::Result<()> {
    let mut config = AssistantConfig::from_env(data_dir)?;
    if let Some(path) = flag_value(args, "--credentials") {
        config.credentials_path = PathBuf::from(path);
    }
    if let Some(project) = flag_value(args, "--project-id") {
        config.project_id = Some(project);
    }
    if let Some(policy) = flag_value(args, "--synthesis-policy") {
        config.synthesis_policy = policy.parse()?;
    }

    let gateway_config = GatewayConfig::from_assistant_config(&config)?;
    let gateway = Arc::new(BackendGateway::from_config(&gateway_config)?);
    let ledger = Arc::new(SessionLedger::new());

    if let Some(source) = flag_value(args, "--load-session") {
        let session = ledger.restore(Path::new(&source))?;
        println!(
            "Loaded session {} ({} interactions)",
            session.id,
            session.interactions.len()
        );
    }

    let orchestrator =
        QueryOrchestrator::new(gateway, ledger.clone()).with_policy(config.synthesis_policy);
    let request = QueryRequest {
        text: flag_value(args, "--text"),
        image: flag_value(args, "--image").map(PathBuf::from),
        audio: flag_value(args, "--audio").map(PathBuf::from),
        description: flag_value(args, "--description"),
        language: flag_value(args, "--language").unwrap_or_else(|| "en".into()),
    };

    let failed = match orchestrator.handle(request).await {
        Ok(answer) => {
            println!("{}", answer.response);
            false
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.kind(), e);
            true
        }
    };

    if has_flag(args, "--save-session") {
        let dest = flag_value(args, "--save-session")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_paths.default_snapshot_path(AppState::unix_now()));
        let path = ledger.persist(&dest)?;
        println!("Session saved to {}", path.display());
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!("Session {}", summary.session_id);
    println!("Started:       {}", summary.start_time.to_rfc3339());
    println!(
        "Interactions:  {} ({} succeeded, {} failed)",
        summary.count,
        summary.success_count,
        summary.failure_count()
    );
    println!("Success rate:  {:.1}%", summary.success_percent());
    println!("Duration:      {:.1}s", summary.duration_seconds);
    for (title, counts) in [
        ("By modality", &summary.by_modality),
        ("By language", &summary.by_language),
        ("By error", &summary.by_error_kind),
    ] {
        if counts.is_empty() {
            continue;
        }
        let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("{:<14} {}", format!("{}:", title), parts.join(", "));
    }
}

fn print_help() {
    println!("MediMind: multimodal health assistant");
    println!();
    println!("Usage: medimind [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve               Start the HTTP API");
    println!("  ask [options]                Answer one query and exit");
    println!("  summary <snapshot>           Print a saved session's summary");
    println!("  export <snapshot> [csv]      Write a saved session as CSV");
    println!("  help                         Show this help message");
    println!();
    println!("The HTTP API reads attachments by name from <data>/uploads (PUT /api/uploads/<name>)");
    println!("and saves sessions and exports by name under <data>/sessions and <data>/exports.");
    println!();
    println!("Options for ask:");
    println!("  --text T                     Text question");
    println!("  --image P                    Image file (jpg, jpeg, png, bmp, tiff, webp)");
    println!("  --description D              Context for the image");
    println!("  --audio P                    Audio file (wav, mp3, m4a, flac, ogg)");
    println!("  --language L                 en, hi or es (default en)");
    println!("  --credentials P              Credential bundle (default cred.json)");
    println!("  --project-id ID              Project id (default: from credentials)");
    println!("  --synthesis-policy P         always or require_one_partial");
    println!("  --load-session P             Restore a session before asking");
    println!("  --save-session [P]           Save the session after asking");
}
