//! Container operations on a workflow's step list and connections.
//!
//! Every edit applies immediately to the in-memory workflow; persisting is a
//! separate, explicit save.

use chrono::Utc;
use tracing::debug;

use super::model::{Connection, Step, StepPatch, Workflow};
use crate::error::WorkflowError;

impl Workflow {
    /// Append a step to the end of the flow.
    pub fn add_step(&mut self, step: Step) -> Result<(), WorkflowError> {
        if self.position(&step.step_id).is_some() {
            return Err(WorkflowError::DuplicateStepId {
                step_id: step.step_id,
            });
        }
        debug!(workflow_id = %self.id, step_id = %step.step_id, "Step added");
        self.steps.push(step);
        self.touch();
        Ok(())
    }

    /// Merge `patch` into the step with `step_id`.
    pub fn update_step(&mut self, step_id: &str, patch: StepPatch) -> Result<&Step, WorkflowError> {
        let idx = self
            .position(step_id)
            .ok_or_else(|| WorkflowError::StepNotFound {
                step_id: step_id.to_string(),
            })?;
        patch.apply_to(&mut self.steps[idx]);
        self.touch();
        debug!(workflow_id = %self.id, step_id, "Step updated");
        Ok(&self.steps[idx])
    }

    /// Remove a step by id and return it.
    ///
    /// Steps gated on the removed step's field are left as they are; they
    /// become pass-through at evaluation time.
    pub fn delete_step(&mut self, step_id: &str) -> Option<Step> {
        let idx = self.position(step_id)?;
        let removed = self.steps.remove(idx);
        self.touch();
        debug!(workflow_id = %self.id, step_id, "Step deleted");
        Some(removed)
    }

    /// Replace the whole step sequence. No permutation check is made.
    pub fn reorder_steps(&mut self, steps: Vec<Step>) {
        self.steps = steps;
        self.touch();
    }

    /// Publish or unpublish.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
        self.touch();
    }

    /// Remove a connection by id.
    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let idx = self.connections.iter().position(|c| c.id == connection_id)?;
        self.touch();
        Some(self.connections.remove(idx))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
