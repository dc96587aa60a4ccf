//! One sender's forward walk through a workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::answer::AnswerError;
use super::eligibility::Variables;
use super::model::{Step, Workflow};

/// Persisted conversation state for one sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSession {
    pub sender_id: String,
    pub company_id: String,
    pub workflow_id: String,
    /// Index of the step awaiting an answer; equals the step count once done.
    pub current_step_index: usize,
    #[serde(default)]
    pub variables: Variables,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What happened after an accepted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress<'a> {
    /// The next question to ask.
    Next(&'a Step),
    /// No eligible steps remain.
    Completed,
}

/// A rejected answer, with the message to show the sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub step_id: String,
    pub error: AnswerError,
    pub message: String,
}

impl FlowSession {
    /// Start a session positioned on the first eligible step.
    pub fn start(workflow: &Workflow, sender_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let variables = Variables::new();
        let current_step_index = workflow
            .next_eligible(0, &variables)
            .map_or(workflow.steps.len(), |(idx, _)| idx);
        Self {
            sender_id: sender_id.into(),
            company_id: workflow.company_id.clone(),
            workflow_id: workflow.id.clone(),
            current_step_index,
            variables,
            created_at: now,
            updated_at: now,
        }
    }

    /// The step awaiting an answer, if any.
    pub fn current_step<'a>(&self, workflow: &'a Workflow) -> Option<&'a Step> {
        workflow.steps.get(self.current_step_index)
    }

    pub fn is_complete(&self, workflow: &Workflow) -> bool {
        self.current_step(workflow).is_none()
    }

    /// Validate and record an answer for the current step, then advance.
    ///
    /// A rejected answer leaves the session untouched.
    pub fn submit<'a>(
        &mut self,
        workflow: &'a Workflow,
        raw: &str,
    ) -> Result<Progress<'a>, Rejection> {
        let Some(step) = self.current_step(workflow) else {
            return Ok(Progress::Completed);
        };

        let value = step.validate_answer(raw).map_err(|error| Rejection {
            step_id: step.step_id.clone(),
            message: step.rejection_message(&error),
            error,
        })?;

        debug!(
            sender_id = %self.sender_id,
            step_id = %step.step_id,
            field = %step.field_name,
            "Answer recorded"
        );
        self.variables.insert(step.field_name.clone(), value);
        self.updated_at = Utc::now();

        match workflow.next_eligible(self.current_step_index + 1, &self.variables) {
            Some((idx, next)) => {
                self.current_step_index = idx;
                Ok(Progress::Next(next))
            }
            None => {
                self.current_step_index = workflow.steps.len();
                Ok(Progress::Completed)
            }
        }
    }

    /// Forget all answers and go back to the first eligible step.
    pub fn restart(&mut self, workflow: &Workflow) {
        self.variables.clear();
        self.current_step_index = workflow
            .next_eligible(0, &self.variables)
            .map_or(workflow.steps.len(), |(idx, _)| idx);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::StepType;

    fn laundry() -> Workflow {
        Workflow::new("wf", "company-1", "Laundry")
            .with_step(Step::new("name", StepType::Text, "Name?").with_id("name"))
            .with_step(
                Step::new("business", StepType::Select, "Business?")
                    .with_id("business")
                    .with_option("Domestic", "domestico")
                    .with_option("Laundromat", "lavanderia")
                    .with_option("Hotel", "hotel"),
            )
            .with_step(
                Step::new("qty_domestico", StepType::Number, "Machines at home?")
                    .with_id("qty_domestico")
                    .shown_when("business", "domestico"),
            )
            .with_step(
                Step::new("qty_lavanderia", StepType::Number, "Machines in shop?")
                    .with_id("qty_lavanderia")
                    .shown_when("business", "lavanderia"),
            )
            .with_step(Step::new("budget", StepType::Text, "Budget?").with_id("budget"))
    }

    fn step_id(p: Progress<'_>) -> String {
        match p {
            Progress::Next(s) => s.step_id.clone(),
            Progress::Completed => "<done>".into(),
        }
    }

    #[test]
    fn walks_domestic_branch() {
        let wf = laundry();
        let mut session = FlowSession::start(&wf, "51940281263");
        assert_eq!(session.current_step(&wf).unwrap().step_id, "name");
        assert_eq!(session.workflow_id, "wf");
        assert_eq!(session.company_id, "company-1");

        assert_eq!(step_id(session.submit(&wf, "Ana").unwrap()), "business");
        assert_eq!(step_id(session.submit(&wf, "domestico").unwrap()), "qty_domestico");
        assert_eq!(step_id(session.submit(&wf, "2").unwrap()), "budget");
        assert_eq!(step_id(session.submit(&wf, "5000").unwrap()), "<done>");

        assert!(session.is_complete(&wf));
        assert_eq!(session.variables.get("business").map(String::as_str), Some("domestico"));
        assert!(!session.variables.contains_key("qty_lavanderia"));
    }

    #[test]
    fn hotel_skips_both_quantity_steps() {
        let wf = laundry();
        let mut session = FlowSession::start(&wf, "s");
        session.submit(&wf, "Ana").unwrap();
        assert_eq!(step_id(session.submit(&wf, "hotel").unwrap()), "budget");
    }

    #[test]
    fn rejected_answer_leaves_session_unchanged() {
        let wf = laundry();
        let mut session = FlowSession::start(&wf, "s");
        session.submit(&wf, "Ana").unwrap();
        let before = session.clone();

        let rejection = session.submit(&wf, "Domestic").unwrap_err();
        assert_eq!(rejection.step_id, "business");
        assert_eq!(rejection.error, AnswerError::NotAnOption);
        assert_eq!(session, before);
    }

    #[test]
    fn rejection_uses_error_message_override() {
        let wf = Workflow::new("wf", "c", "n").with_step(
            Step::new("email", StepType::Email, "Email?").with_error_message("Email inválido"),
        );
        let mut session = FlowSession::start(&wf, "s");
        let rejection = session.submit(&wf, "nope").unwrap_err();
        assert_eq!(rejection.message, "Email inválido");
        assert_eq!(rejection.to_string(), "Email inválido");
    }

    #[test]
    fn empty_workflow_starts_complete() {
        let wf = Workflow::new("wf", "c", "Empty");
        let mut session = FlowSession::start(&wf, "s");
        assert!(session.is_complete(&wf));
        assert_eq!(session.submit(&wf, "x").unwrap(), Progress::Completed);
    }

    #[test]
    fn starts_past_ineligible_leading_steps() {
        let wf = Workflow::new("wf", "c", "n")
            .with_step(Step::new("gated", StepType::Text, "G?").shown_when("later", "y"))
            .with_step(Step::new("later", StepType::Text, "L?").with_id("later"));
        let session = FlowSession::start(&wf, "s");
        assert_eq!(session.current_step(&wf).unwrap().step_id, "later");
    }

    #[test]
    fn restart_clears_answers() {
        let wf = laundry();
        let mut session = FlowSession::start(&wf, "s");
        session.submit(&wf, "Ana").unwrap();
        session.restart(&wf);
        assert!(session.variables.is_empty());
        assert_eq!(session.current_step_index, 0);
    }

    #[test]
    fn session_serde_roundtrip() {
        let wf = laundry();
        let mut session = FlowSession::start(&wf, "s");
        session.submit(&wf, "Ana").unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["currentStepIndex"], 1);
        assert_eq!(json["variables"]["name"], "Ana");
        let parsed: FlowSession = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, session);
    }
}
