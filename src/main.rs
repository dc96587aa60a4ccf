use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{info, warn};

use botflow::api::{ApiClient, WorkflowBackend};
use botflow::config::{ApiConfig, LiveConfig, load_workflow_file};
use botflow::live::LiveSocket;
use botflow::preview::run_preview;
use botflow::workflow::Workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let api_config = ApiConfig::from_env()?;
    let live_config = LiveConfig::from_env()?;

    eprintln!("botflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", api_config.base_url);
    eprintln!("   Type an answer and press Enter. /restart to start over, /quit to exit.\n");

    let workflow = load_workflow(api_config).await?;
    report(&workflow);

    // ── Live connection ─────────────────────────────────────────────────
    let live = match std::env::var("BOTFLOW_LIVE_PAGE_ID") {
        Ok(page_id) if !page_id.is_empty() => {
            let (socket, mut events) = LiveSocket::connect(&live_config, &page_id)?;
            let logger = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    info!(
                        kind = ?event.kind,
                        sender_id = event.sender_id.as_deref().unwrap_or_default(),
                        data = %event.data,
                        "Live event"
                    );
                }
            });
            Some((socket, logger))
        }
        _ => None,
    };

    // ── Preview ─────────────────────────────────────────────────────────
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = run_preview(&workflow, "preview", stdin, tokio::io::stdout()).await?;
    if !outcome.completed {
        info!(
            answered = outcome.session.variables.len(),
            "Preview stopped before completion"
        );
    }

    if let Some((socket, logger)) = live {
        socket.close().await;
        logger.abort();
    }

    Ok(())
}

async fn load_workflow(api_config: ApiConfig) -> anyhow::Result<Workflow> {
    if let Ok(path) = std::env::var("BOTFLOW_WORKFLOW_FILE") {
        return load_workflow_file(&path)
            .await
            .with_context(|| format!("loading workflow from {path}"));
    }

    let Ok(id) = std::env::var("BOTFLOW_WORKFLOW_ID") else {
        bail!("set BOTFLOW_WORKFLOW_FILE or BOTFLOW_WORKFLOW_ID");
    };
    if api_config.token.is_none() {
        warn!("BOTFLOW_API_TOKEN not set, requesting without authorization");
    }
    let client: Arc<dyn WorkflowBackend> = Arc::new(ApiClient::new(api_config)?);
    client
        .get_workflow(&id)
        .await
        .with_context(|| format!("fetching workflow {id}"))
}

/// Print construction problems and gates nothing can satisfy.
fn report(workflow: &Workflow) {
    eprintln!(
        "Workflow '{}' ({} steps, {})",
        workflow.name,
        workflow.steps.len(),
        if workflow.active { "active" } else { "inactive" }
    );

    let problems = workflow.check();
    for problem in &problems {
        eprintln!("   problem: {problem}");
    }
    for step in workflow.dangling_dependencies() {
        eprintln!(
            "   note: step {} depends on '{}', which no other step asks; it will always be shown",
            step.step_id,
            step.depends_on.as_deref().unwrap_or_default()
        );
    }
    if problems.is_empty() {
        eprintln!("   no problems found");
    }
    eprintln!();
}
