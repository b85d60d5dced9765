//! 宅配通 (e-can) アダプタ
//!
//! ページは Big5 で返ることがあるため、UTF-8 で読めなければ Big5 として解釈する。

use async_trait::async_trait;
use encoding_rs::BIG5;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{contains_any, element_text, element_text_joined, selector};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

const DELIVERED_KEYWORDS: &[&str] = &["配達完成", "已送達", "完成配達", "貨件送達"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcanEvent {
    /// 日期
    pub time: String,
    /// 狀態
    pub status: String,
    /// 說明
    pub description: String,
    /// 作業站
    pub station: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcanTrace {
    pub waybill: Option<String>,
    pub events: Vec<EcanEvent>,
}

fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("[Ecan] UTF-8 ではないため Big5 としてデコード");
            let (text, _, _) = BIG5.decode(bytes);
            text.into_owned()
        }
    }
}

/// 「單號：577293125651-001」→「577293125651」
fn waybill_from(text: &str) -> Option<String> {
    if !text.contains("單號") {
        return None;
    }
    let number = text.replace("單號：", "").replace("單號:", "");
    number
        .trim()
        .split('-')
        .next()
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn parse_trace(html: &str) -> Result<EcanTrace, TrackerError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.sheetList")?;
    let waybill_sel = selector(r#"tbody.ListStyle01 td[colspan="4"]"#)?;
    let row_sel = selector("tbody.ListStyle01 tr")?;
    let waybill_cell_sel = selector(r#"td[colspan="4"]"#)?;
    let td_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| TrackerError::Parse("[Ecan] table.sheetList がありません".into()))?;

    let waybill = table
        .select(&waybill_sel)
        .next()
        .and_then(|td| waybill_from(&element_text(td)));

    let mut events = Vec::new();
    for tr in table.select(&row_sel) {
        // 單號の行は除く
        if tr.select(&waybill_cell_sel).next().is_some() {
            continue;
        }
        let tds: Vec<_> = tr.select(&td_sel).collect();
        if tds.len() < 4 {
            continue;
        }
        events.push(EcanEvent {
            time: element_text_joined(tds[0], " "),
            status: element_text(tds[1]),
            description: element_text(tds[2]),
            station: element_text(tds[3]),
        });
    }

    Ok(EcanTrace { waybill, events })
}

pub struct EcanTracker {
    base_url: String,
}

impl EcanTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.endpoints.ecan.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tracker for EcanTracker {
    fn provider(&self) -> Provider {
        Provider::Ecan
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        info!("[Ecan] 照会フォーム送信");
        let request = session
            .client()
            .post(format!("{}/DS_LINK.asp", self.base_url))
            .form(&[("txtMainID", order_id), ("B1", "查詢")]);
        let response = session.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(decode_body(&bytes))
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let trace = parse_trace(body)?;

        // 先頭が最新
        let latest = trace
            .events
            .first()
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[Ecan] {}", order_id)))?;

        if latest.status.is_empty() && latest.description.is_empty() {
            return Err(TrackerError::Parse("[Ecan] 狀態が空です".into()));
        }

        let status = format!(
            "{}({}) - {}",
            latest.status, latest.station, latest.description
        )
        .trim_matches(|c| c == ' ' || c == '-')
        .to_string();
        let delivered_text = format!("{} {}", latest.status, latest.description);
        let time = Some(latest.time.clone()).filter(|t| !t.is_empty());

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::Ecan,
            status,
            time,
            is_delivered: contains_any(&delivered_text, DELIVERED_KEYWORDS),
            raw_data: serde_json::to_value(&trace)?,
        })
    }
}
