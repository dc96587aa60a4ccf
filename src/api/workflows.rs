//! `/workflows` endpoints.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backend::WorkflowBackend;
use super::client::ApiClient;
use crate::error::ApiError;
use crate::workflow::{Connection, Step, Workflow};

/// Body of `POST /workflows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub company_id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "flujoBot")]
    pub steps: Vec<Step>,
    pub connections: Vec<Connection>,
    pub active: bool,
}

impl NewWorkflow {
    /// An empty, inactive workflow draft.
    pub fn empty(
        company_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
            connections: Vec::new(),
            active: false,
        }
    }
}

#[async_trait]
impl WorkflowBackend for ApiClient {
    async fn list_workflows(&self, company_id: &str) -> Result<Vec<Workflow>, ApiError> {
        let path = "/workflows";
        let req = self
            .request(Method::GET, path)
            .await?
            .query(&[("companyId", company_id)]);
        self.send_json(req, &Method::GET, path).await
    }

    async fn get_workflow(&self, id: &str) -> Result<Workflow, ApiError> {
        let path = format!("/workflows/{id}");
        let req = self.request_item(Method::GET, "/workflows", id).await?;
        self.send_json(req, &Method::GET, &path).await
    }

    async fn create_workflow(&self, new: &NewWorkflow) -> Result<Workflow, ApiError> {
        let path = "/workflows";
        let req = self.request(Method::POST, path).await?.json(new);
        let created: Workflow = self.send_json(req, &Method::POST, path).await?;
        info!(workflow_id = %created.id, company_id = %created.company_id, "Workflow created");
        Ok(created)
    }

    async fn put_workflow(&self, workflow: &Workflow) -> Result<Workflow, ApiError> {
        let path = format!("/workflows/{}", workflow.id);
        let req = self
            .request_item(Method::PUT, "/workflows", &workflow.id)
            .await?
            .json(workflow);
        let saved: Workflow = self.send_json(req, &Method::PUT, &path).await?;
        info!(
            workflow_id = %saved.id,
            steps = saved.steps.len(),
            active = saved.active,
            "Workflow saved"
        );
        Ok(saved)
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/workflows/{id}");
        let req = self.request_item(Method::DELETE, "/workflows", id).await?;
        self.send_empty(req, &Method::DELETE, &path).await?;
        info!(workflow_id = %id, "Workflow deleted");
        Ok(())
    }
}
