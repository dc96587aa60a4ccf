//! `/companies` endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::ApiClient;
use crate::error::ApiError;
use crate::workflow::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Inactive,
}

/// Knowledge-base namespaces: stored either as one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Namespaces {
    One(String),
    Many(Vec<String>),
}

impl Namespaces {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(ns) => vec![ns.clone()],
            Self::Many(list) => list.clone(),
        }
    }
}

/// A bot-owning company and its WhatsApp configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub config_id: String,
    pub nombre_empresa: String,
    pub phone_number_id: String,
    pub wsp_number_id: String,
    pub access_token: String,
    pub account_id: String,
    pub agent_active: bool,
    pub estado: CompanyStatus,
    pub prompt: String,
    #[serde(rename = "urlWebHook")]
    pub url_webhook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_namespaces: Option<Namespaces>,
    /// Milliseconds since the epoch.
    pub fecha_creacion: i64,
    pub fecha_actualizacion: i64,
    #[serde(rename = "flujoBot", default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

/// Partial company update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_empresa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wsp_number_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<CompanyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "urlWebHook", skip_serializing_if = "Option::is_none")]
    pub url_webhook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_namespaces: Option<Namespaces>,
}

impl ApiClient {
    pub async fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        let path = "/companies";
        let req = self.request(Method::GET, path).await?;
        self.send_json(req, &Method::GET, path).await
    }

    pub async fn get_company(&self, config_id: &str) -> Result<Company, ApiError> {
        let path = format!("/companies/{config_id}");
        let req = self.request_item(Method::GET, "/companies", config_id).await?;
        self.send_json(req, &Method::GET, &path).await
    }

    pub async fn update_company(
        &self,
        config_id: &str,
        update: &CompanyUpdate,
    ) -> Result<Company, ApiError> {
        let path = format!("/companies/{config_id}");
        let req = self
            .request_item(Method::PUT, "/companies", config_id)
            .await?
            .json(update);
        let company: Company = self.send_json(req, &Method::PUT, &path).await?;
        info!(config_id, "Company updated");
        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_json(namespaces: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "configId": "cfg-1",
            "nombreEmpresa": "Lavandería Sol",
            "phoneNumberId": "1026217640567682",
            "wspNumberId": "51940281263",
            "accessToken": "EAAG",
            "accountId": "acc-1",
            "agentActive": true,
            "estado": "active",
            "prompt": "Eres un asistente",
            "urlWebHook": "https://hooks.test/wa",
            "pineconeNamespaces": namespaces,
            "fechaCreacion": 1735689600000_i64,
            "fechaActualizacion": 1735689600000_i64
        })
    }

    #[test]
    fn namespaces_as_string() {
        let company: Company = serde_json::from_value(company_json("faq".into())).unwrap();
        assert_eq!(
            company.pinecone_namespaces.unwrap().to_vec(),
            vec!["faq".to_string()]
        );
        assert!(company.steps.is_none());
    }

    #[test]
    fn namespaces_as_list() {
        let company: Company =
            serde_json::from_value(company_json(serde_json::json!(["faq", "precios"]))).unwrap();
        assert_eq!(
            company.pinecone_namespaces,
            Some(Namespaces::Many(vec!["faq".into(), "precios".into()]))
        );
        assert_eq!(company.url_webhook, "https://hooks.test/wa");
    }

    #[test]
    fn update_sends_only_set_fields() {
        let update = CompanyUpdate {
            agent_active: Some(false),
            url_webhook: Some("https://hooks.test/new".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(json["agentActive"], false);
        assert_eq!(json["urlWebHook"], "https://hooks.test/new");
    }
}
