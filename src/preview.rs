//! Interactive preview of a workflow over a line reader and a writer.
//!
//! Each eligible question is written out, one answer line is read back, and
//! rejected answers are reported without advancing. `/restart` starts over
//! and `/quit` (or end of input) stops early.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::workflow::{FlowSession, Progress, Step, StepType, Workflow};

/// How a preview ended.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOutcome {
    pub session: FlowSession,
    pub completed: bool,
}

pub async fn run_preview<R, W>(
    workflow: &Workflow,
    sender_id: &str,
    input: R,
    mut output: W,
) -> std::io::Result<PreviewOutcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = FlowSession::start(workflow, sender_id);
    let mut lines = input.lines();
    info!(workflow_id = %workflow.id, steps = workflow.steps.len(), "Preview started");

    loop {
        let Some(step) = session.current_step(workflow) else {
            write_summary(&session, &mut output).await?;
            info!(workflow_id = %workflow.id, "Preview completed");
            return Ok(PreviewOutcome {
                session,
                completed: true,
            });
        };
        write_question(step, &mut output).await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" => break,
            "/restart" => {
                session.restart(workflow);
                output.write_all(b"-- restarted --\n").await?;
                continue;
            }
            _ => {}
        }

        match session.submit(workflow, &line) {
            Ok(Progress::Next(_)) | Ok(Progress::Completed) => {}
            Err(rejection) => {
                output
                    .write_all(format!("  ! {rejection}\n").as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(PreviewOutcome {
        session,
        completed: false,
    })
}

async fn write_question<W: AsyncWrite + Unpin>(step: &Step, output: &mut W) -> std::io::Result<()> {
    let mut text = format!("{}\n", step.question);
    if step.step_type == StepType::Select {
        for (n, option) in step.options.iter().enumerate() {
            text.push_str(&format!("  {}) {} [{}]\n", n + 1, option.label, option.value));
        }
    }
    text.push_str("> ");
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

async fn write_summary<W: AsyncWrite + Unpin>(
    session: &FlowSession,
    output: &mut W,
) -> std::io::Result<()> {
    let mut fields: Vec<_> = session.variables.iter().collect();
    fields.sort();

    let mut text = String::from("\nFlow completed.\n");
    for (field, value) in fields {
        text.push_str(&format!("  {field} = {value}\n"));
    }
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}
