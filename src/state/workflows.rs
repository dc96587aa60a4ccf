//! Workflow list and the open workflow being edited.
//!
//! Step edits are applied in memory; nothing reaches the backend until
//! [`WorkflowStore::save`], which checks the workflow first and then sends it
//! whole. A failed request leaves the in-memory state as it was and records a
//! dismissible error.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{NewWorkflow, WorkflowBackend};
use crate::error::{ApiError, Error, Result, WorkflowError};
use crate::workflow::{Step, StepPatch, Workflow, WorkflowPatch};

pub struct WorkflowStore {
    backend: Arc<dyn WorkflowBackend>,
    workflows: Vec<Workflow>,
    current: Option<Workflow>,
    error: Option<String>,
    loading: bool,
}

impl WorkflowStore {
    pub fn new(backend: Arc<dyn WorkflowBackend>) -> Self {
        Self {
            backend,
            workflows: Vec::new(),
            current: None,
            error: None,
            loading: false,
        }
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// The workflow open for editing.
    pub fn current(&self) -> Option<&Workflow> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub async fn fetch_workflows(&mut self, company_id: &str) -> Result<&[Workflow]> {
        self.begin();
        let result = self.backend.list_workflows(company_id).await;
        self.workflows = self.finish("list", result)?;
        info!(company_id, count = self.workflows.len(), "Workflows loaded");
        Ok(&self.workflows)
    }

    /// Load one workflow and open it for editing.
    pub async fn fetch_workflow(&mut self, id: &str) -> Result<&Workflow> {
        self.begin();
        let result = self.backend.get_workflow(id).await;
        let workflow = self.finish("get", result)?;
        self.current = Some(workflow.clone());
        Ok(self.sync(workflow))
    }

    /// Create an empty, inactive workflow and open it.
    pub async fn create_workflow(
        &mut self,
        company_id: &str,
        name: &str,
        description: &str,
    ) -> Result<&Workflow> {
        self.begin();
        let new = NewWorkflow::empty(company_id, name, description);
        let result = self.backend.create_workflow(&new).await;
        let created = self.finish("create", result)?;
        self.current = Some(created.clone());
        Ok(self.sync(created))
    }

    /// Change name, description or active flag of a loaded workflow.
    pub async fn update_workflow(&mut self, id: &str, patch: &WorkflowPatch) -> Result<&Workflow> {
        let mut updated = self
            .current
            .as_ref()
            .filter(|w| w.id == id)
            .or_else(|| self.workflows.iter().find(|w| w.id == id))
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownWorkflow { id: id.to_string() })?;
        patch.apply_to(&mut updated);

        self.begin();
        let result = self.backend.put_workflow(&updated).await;
        let saved = self.finish("update", result)?;
        Ok(self.sync(saved))
    }

    pub async fn delete_workflow(&mut self, id: &str) -> Result<()> {
        self.begin();
        let result = self.backend.delete_workflow(id).await;
        self.finish("delete", result)?;
        self.workflows.retain(|w| w.id != id);
        if self.current.as_ref().is_some_and(|w| w.id == id) {
            self.current = None;
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn add_step(&mut self, step: Step) -> Result<()> {
        self.current_mut()?.add_step(step)?;
        Ok(())
    }

    pub fn update_step(&mut self, step_id: &str, patch: StepPatch) -> Result<()> {
        self.current_mut()?.update_step(step_id, patch)?;
        Ok(())
    }

    pub fn delete_step(&mut self, step_id: &str) -> Result<Step> {
        self.current_mut()?
            .delete_step(step_id)
            .ok_or_else(|| {
                WorkflowError::StepNotFound {
                    step_id: step_id.to_string(),
                }
                .into()
            })
    }

    pub fn reorder_steps(&mut self, steps: Vec<Step>) -> Result<()> {
        self.current_mut()?.reorder_steps(steps);
        Ok(())
    }

    pub fn set_active(&mut self, active: bool) -> Result<()> {
        self.current_mut()?.set_active(active);
        Ok(())
    }

    /// Check the open workflow and send it to the backend as a whole.
    ///
    /// Construction problems abort before any request is made.
    pub async fn save(&mut self) -> Result<&Workflow> {
        let workflow = self.current.clone().ok_or(WorkflowError::NoWorkflowOpen)?;

        let problems = workflow.check();
        if !problems.is_empty() {
            for problem in &problems {
                warn!(workflow_id = %workflow.id, %problem, "Workflow check failed");
            }
            let err = WorkflowError::Invalid {
                id: workflow.id.clone(),
                count: problems.len(),
            };
            self.error = Some(err.to_string());
            return Err(err.into());
        }
        for step in workflow.dangling_dependencies() {
            warn!(
                workflow_id = %workflow.id,
                step_id = %step.step_id,
                depends_on = step.depends_on.as_deref().unwrap_or_default(),
                "Gate has no producing step and will be ignored"
            );
        }

        self.begin();
        let result = self.backend.put_workflow(&workflow).await;
        let saved = self.finish("save", result)?;
        Ok(self.sync(saved))
    }

    fn current_mut(&mut self) -> std::result::Result<&mut Workflow, WorkflowError> {
        self.current.as_mut().ok_or(WorkflowError::NoWorkflowOpen)
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish<T>(&mut self, action: &str, result: std::result::Result<T, ApiError>) -> Result<T> {
        self.loading = false;
        result.map_err(|e| {
            warn!(action, error = %e, "Workflow request failed");
            self.error = Some(e.to_string());
            Error::from(e)
        })
    }

    /// Replace the list entry (and the open workflow, if the same) with `saved`.
    fn sync(&mut self, saved: Workflow) -> &Workflow {
        if let Some(current) = self.current.as_mut().filter(|c| c.id == saved.id) {
            *current = saved.clone();
        }
        let index = match self.workflows.iter().position(|w| w.id == saved.id) {
            Some(index) => {
                self.workflows[index] = saved;
                index
            }
            None => {
                self.workflows.push(saved);
                self.workflows.len() - 1
            }
        };
        &self.workflows[index]
    }
}
