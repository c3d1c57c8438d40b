//! 面单服务客户端
//!
//! 单接口：提交 from/to 地址 + 包裹规格，换回 label_url 和运单号。

use async_trait::async_trait;
use std::time::Duration;

use super::{Label, LabelGateway, LabelRequest};
use crate::utils::{AppError, AppResult};

pub struct HttpLabelGateway {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpLabelGateway {
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
impl LabelGateway for HttpLabelGateway {
    async fn create_label(&self, request: &LabelRequest) -> AppResult<Label> {
        let resp = self
            .client
            .post(format!("{}/v1/labels", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Label service unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::upstream(format!(
                "Label creation failed: {status} - {text}"
            )));
        }

        let label: Label = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Invalid label response: {e}")))?;

        Ok(label)
    }
}
