//! WhatsApp delivery adapter. The workflow core only sees the
//! `MessageGateway` trait; the concrete client speaks the Graph-API message
//! endpoint and is configured from the settings store, not the environment.

use async_trait::async_trait;
use rusqlite::Connection;

use crate::errors::AppError;
use crate::models::setting;

/// Narrow outbound-messaging contract consumed by the notifier.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_text(
        &self,
        phone: &str,
        body: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError>;

    async fn send_template(
        &self,
        phone: &str,
        template_code: &str,
        variables: &[String],
        display_name: Option<&str>,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_token: String,
    pub phone_number_id: String,
    pub display_name: Option<String>,
}

/// Load the provider configuration from the settings table.
/// Disabled or incomplete configuration is `NotConfigured`, which callers
/// swallow: rows stay pending until an administrator fills the settings in.
pub fn load_config(conn: &Connection) -> Result<WhatsAppConfig, AppError> {
    if !setting::get_bool(conn, "whatsapp.enabled") {
        return Err(AppError::NotConfigured("whatsapp is disabled".to_string()));
    }
    let api_url = setting::get(conn, "whatsapp.api_url")?.unwrap_or_default();
    let api_token = setting::get(conn, "whatsapp.api_token")?.unwrap_or_default();
    let phone_number_id = setting::get(conn, "whatsapp.phone_number_id")?.unwrap_or_default();
    if api_url.is_empty() || api_token.is_empty() || phone_number_id.is_empty() {
        return Err(AppError::NotConfigured(
            "whatsapp api_url, api_token and phone_number_id must all be set".to_string(),
        ));
    }
    Ok(WhatsAppConfig {
        api_url,
        api_token,
        phone_number_id,
        display_name: setting::get(conn, "whatsapp.display_name")?.filter(|s| !s.is_empty()),
    })
}

pub struct WhatsAppClient {
    http: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        WhatsAppClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_settings(conn: &Connection) -> Result<Self, AppError> {
        Ok(Self::new(load_config(conn)?))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_url.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    async fn post(&self, payload: serde_json::Value) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("whatsapp request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "whatsapp API returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageGateway for WhatsAppClient {
    async fn send_text(
        &self,
        phone: &str,
        body: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        let sender = display_name
            .or(self.config.display_name.as_deref());
        let body = match sender {
            Some(name) => format!("{name}:\n{body}"),
            None => body.to_string(),
        };
        self.post(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "text",
            "text": { "body": body },
        }))
        .await
    }

    async fn send_template(
        &self,
        phone: &str,
        template_code: &str,
        variables: &[String],
        _display_name: Option<&str>,
    ) -> Result<(), AppError> {
        let parameters: Vec<serde_json::Value> = variables
            .iter()
            .map(|v| serde_json::json!({ "type": "text", "text": v }))
            .collect();
        self.post(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "template",
            "template": {
                "name": template_code,
                "language": { "code": "ar" },
                "components": [{ "type": "body", "parameters": parameters }],
            },
        }))
        .await
    }
}
