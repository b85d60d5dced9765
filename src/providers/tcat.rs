//! 黑貓宅急便アダプタ

use async_trait::async_trait;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{contains_any, element_text, element_text_joined, selector};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

const DELIVERED_KEYWORDS: &[&str] = &["配達完成", "送達"];

/// 貨物追跡の 1 行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcatEvent {
    /// 貨物狀態
    pub status: String,
    /// 作業時間
    pub time: String,
    /// 營業所
    pub station: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcatTrace {
    pub waybill: Option<String>,
    pub events: Vec<TcatEvent>,
}

fn parse_trace(html: &str) -> Result<TcatTrace, TrackerError> {
    let document = Html::parse_document(html);
    let table_sel = selector(".tablelist")?;
    let row_sel = selector("tr")?;
    let waybill_sel = selector("td .bl12")?;
    let col_sel = selector("td.style1")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| TrackerError::Parse("[Tcat] .tablelist がありません".into()))?;

    let mut waybill = None;
    let mut events = Vec::new();

    // 1 行目は見出し
    for tr in table.select(&row_sel).skip(1) {
        if let Some(bill) = tr.select(&waybill_sel).next() {
            waybill = Some(element_text(bill));
        }

        let cols: Vec<_> = tr.select(&col_sel).collect();
        if cols.len() < 3 {
            continue;
        }
        events.push(TcatEvent {
            status: element_text(cols[0]),
            time: element_text_joined(cols[1], " "),
            station: element_text(cols[2]),
        });
    }

    Ok(TcatTrace { waybill, events })
}

pub struct TcatTracker {
    base_url: String,
}

impl TcatTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.endpoints.tcat.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tracker for TcatTracker {
    fn provider(&self) -> Provider {
        Provider::Tcat
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        info!("[Tcat] 追跡ページ取得");
        let request = session
            .client()
            .get(format!("{}/TraceDetail.aspx", self.base_url))
            .query(&[("BillID", order_id)]);
        let response = session.send(request).await?;
        Ok(response.text().await?)
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let trace = parse_trace(body)?;

        // 先頭が最新
        let latest = trace
            .events
            .first()
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[Tcat] {}", order_id)))?;

        if latest.status.is_empty() {
            return Err(TrackerError::Parse("[Tcat] 貨物狀態が空です".into()));
        }

        let status = format!("{}({})", latest.status, latest.station);
        let time = Some(latest.time.clone()).filter(|t| !t.is_empty());

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::Tcat,
            is_delivered: contains_any(&status, DELIVERED_KEYWORDS),
            status,
            time,
            raw_data: serde_json::to_value(&trace)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE_PAGE: &str = r#"
<html><body>
<table class="tablelist">
  <tr><th>包裹查詢號碼</th><th>目前狀態</th><th>資料登入時間</th><th>負責營業所</th></tr>
  <tr>
    <td><span class="bl12">900012345678</span></td>
    <td class="style1"><strong>順利送達</strong></td>
    <td class="style1">2024/01/05<br/>14:22</td>
    <td class="style1">信義營業所</td>
  </tr>
  <tr>
    <td></td>
    <td class="style1">配送中</td>
    <td class="style1">2024/01/05<br/>08:10</td>
    <td class="style1">信義營業所</td>
  </tr>
</table>
</body></html>
"#;

    fn tracker() -> TcatTracker {
        TcatTracker::new(&TrackerConfig::default())
    }

    #[test]
    fn test_parse_latest_event() {
        let result = tracker().parse("900012345678", TRACE_PAGE).unwrap();

        assert_eq!(result.platform, Provider::Tcat);
        assert_eq!(result.status, "順利送達(信義營業所)");
        assert_eq!(result.time.as_deref(), Some("2024/01/05 14:22"));
        assert!(result.is_delivered);
        assert_eq!(result.raw_data["waybill"], "900012345678");
        assert_eq!(result.raw_data["events"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_header_only_is_not_found() {
        let html = r#"<table class="tablelist"><tr><th>包裹查詢號碼</th></tr></table>"#;
        let err = tracker().parse("900000000000", html).unwrap_err();
        assert!(matches!(err, TrackerError::OrderNotFound(_)));
    }

    #[test]
    fn test_missing_table_is_parse_error() {
        let err = tracker()
            .parse("900000000000", "<html><body>系統維護中</body></html>")
            .unwrap_err();
        assert!(matches!(err, TrackerError::Parse(_)));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let a = tracker().parse("900012345678", TRACE_PAGE).unwrap();
        let b = tracker().parse("900012345678", TRACE_PAGE).unwrap();
        assert_eq!(a, b);
    }
}
