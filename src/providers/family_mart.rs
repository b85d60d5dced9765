//! 全家 FamilyMart アダプタ
//!
//! `GetOrderDetail` は ASP.NET の `{"d": "<JSON 文字列>"}` 形式で返す。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::contains_any;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

const DELIVERED_KEYWORDS: &[&str] = &["貨件配達取件店舖", "已完成取件"];

#[derive(Debug, Deserialize)]
struct Envelope {
    d: String,
}

pub struct FamilyMartTracker {
    base_url: String,
}

impl FamilyMartTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.endpoints.family_mart.trim_end_matches('/').to_string(),
        }
    }

    /// 外側の `d` を外して内側の JSON を取り出す
    fn decode(body: &str) -> Result<Value, TrackerError> {
        let envelope: Envelope = serde_json::from_str(body.trim())?;
        Ok(serde_json::from_str(&envelope.d)?)
    }
}

#[async_trait]
impl Tracker for FamilyMartTracker {
    fn provider(&self) -> Provider {
        Provider::FamilyMart
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        info!("[FamilyMart] 照会リクエスト送信");
        let payload = json!({
            "EC_ORDER_NO": order_id,
            "ORDER_NO": order_id,
            "RCV_USER_NAME": null,
        });
        let request = session
            .client()
            .post(format!("{}/GetOrderDetail", self.base_url))
            .json(&payload);
        let response = session.send(request).await?;
        Ok(response.text().await?)
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let raw = Self::decode(body)?;

        let list = raw
            .get("List")
            .and_then(Value::as_array)
            .ok_or_else(|| TrackerError::Parse("[FamilyMart] List がありません".into()))?;

        // 先頭が最新
        let latest = list
            .first()
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[FamilyMart] {}", order_id)))?;

        let status = latest
            .get("STATUS_D")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TrackerError::Parse("[FamilyMart] STATUS_D がありません".into()))?
            .to_string();

        let time = latest
            .get("ORDER_DATE_R")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|t| format!("{}:00", t));

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::FamilyMart,
            is_delivered: contains_any(&status, DELIVERED_KEYWORDS),
            status,
            time,
            raw_data: raw,
        })
    }
}
