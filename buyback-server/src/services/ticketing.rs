//! 工单服务客户端
//!
//! 对接外部 ticketing API：创建工单 = 创建会话线程，
//! 追加评论 = 向既有线程发消息（public / internal 可见性）。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ThreadRequester, TicketGateway};
use crate::utils::{AppError, AppResult};

pub struct HttpTicketGateway {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TicketCreated {
    ticket: TicketBody,
}

#[derive(Debug, Deserialize)]
struct TicketBody {
    id: i64,
}

impl HttpTicketGateway {
    pub fn new(base_url: String, token: String, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            token,
            client,
        }
    }
}

#[async_trait]
impl TicketGateway for HttpTicketGateway {
    async fn create_thread(
        &self,
        requester: &ThreadRequester,
        subject: &str,
        body: &str,
        public: bool,
    ) -> AppResult<String> {
        let resp = self
            .client
            .post(format!("{}/api/v2/tickets", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "ticket": {
                    "requester": { "name": requester.name, "email": requester.email },
                    "subject": subject,
                    "comment": { "body": body, "public": public },
                }
            }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Ticketing service unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::upstream(format!(
                "Ticket creation failed: {status} - {text}"
            )));
        }

        let created: TicketCreated = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Invalid ticketing response: {e}")))?;

        Ok(created.ticket.id.to_string())
    }

    async fn append_comment(&self, thread_id: &str, body: &str, public: bool) -> AppResult<()> {
        let resp = self
            .client
            .put(format!("{}/api/v2/tickets/{thread_id}", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "ticket": {
                    "comment": { "body": body, "public": public },
                }
            }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Ticketing service unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::upstream(format!(
                "Ticket comment failed: {status} - {text}"
            )));
        }

        Ok(())
    }
}
