//! 大榮貨運 (KTJ) アダプタ
//!
//! `Handler.aspx` はキーに引用符のない JS オブジェクトリテラルを返し、
//! その `msg` に本体の JSON が文字列として入っている。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, REFERER};
use serde_json::Value;
use tracing::{debug, info};

use super::contains_any;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

static UNQUOTED_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_]\w*)(\s*:)").expect("valid regex"));

const DELIVERED_KEYWORDS: &[&str] = &["簽收", "配達", "已送達", "已完成配送", "已完成", "配送完成"];

/// `({success:true,msg:"..."})` を JSON として読む
fn parse_js_object_literal(text: &str) -> Result<Value, TrackerError> {
    let mut s = text.trim();
    if s.starts_with('(') && s.ends_with(')') {
        s = s[1..s.len() - 1].trim();
    }
    let quoted = UNQUOTED_KEY_RE.replace_all(s, r#"$1"$2"$3"#);
    Ok(serde_json::from_str(&quoted)?)
}

fn is_success(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// 外側のオブジェクトを検証して `msg` の中身を返す
fn decode(body: &str) -> Result<Value, TrackerError> {
    let outer = parse_js_object_literal(body)?;

    if !is_success(outer.get("success")) {
        return Err(TrackerError::Parse(format!(
            "[KTJ] success=false: {}",
            outer
        )));
    }

    let msg = outer
        .get("msg")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| TrackerError::Parse("[KTJ] msg がありません".into()))?;

    Ok(serde_json::from_str(msg)?)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub struct KtjTracker {
    base_url: String,
}

impl KtjTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.endpoints.ktj.trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self) -> String {
        format!("{}/tools/positchecking_listForKtj.aspx", self.base_url)
    }
}

#[async_trait]
impl Tracker for KtjTracker {
    fn provider(&self) -> Provider {
        Provider::Ktj
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        // 先に一覧ページを開いてセッション Cookie を得る（失敗しても続行）
        if let Err(e) = session.get_text(&self.listing_url()).await {
            debug!("[KTJ] セッション準備に失敗: {}", e);
        }

        info!("[KTJ] 照会リクエスト送信");
        let query_id = format!("\"{}\"", order_id);
        let request = session
            .client()
            .post(format!("{}/Handler.aspx", self.base_url))
            .header(ACCEPT, "text/html, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(
                REFERER,
                format!("{}?searchNumber={}", self.listing_url(), order_id),
            )
            .form(&[("queryId", query_id.as_str()), ("Action", "getKtjData")]);
        let response = session.send(request).await?;
        Ok(response.text().await?)
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let raw = decode(body)?;

        let item = raw
            .get("result")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .filter(|item| !item.is_null())
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[KTJ] {}", order_id)))?;

        // 先頭が最新
        let latest = item
            .get("course")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[KTJ] {}", order_id)))?;

        let status = str_field(latest, "statusIdName")
            .ok_or_else(|| TrackerError::Parse("[KTJ] statusIdName がありません".into()))?
            .to_string();

        let time = str_field(latest, "processCargoCrtDAteAndTime")
            .map(str::to_string)
            .or_else(|| {
                let date = str_field(latest, "processCargoCrtDate")?;
                let time = str_field(latest, "processCargoCrtTime")?;
                Some(format!("{}T{}", date, time))
            });

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::Ktj,
            is_delivered: contains_any(&status, DELIVERED_KEYWORDS),
            status,
            time,
            raw_data: raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn wrap(inner: Value) -> String {
        format!(
            "({{success:true,msg:{}}})",
            serde_json::to_string(&inner.to_string()).unwrap()
        )
    }

    fn delivered_inner() -> Value {
        json!({
            "result": [{
                "bolNo": "1234567890",
                "course": [
                    {
                        "statusIdName": "已送達，簽收",
                        "processCargoCrtDAteAndTime": "2025-12-16T05:08:33.000"
                    },
                    {
                        "statusIdName": "配送中",
                        "processCargoCrtDate": "2025-12-15",
                        "processCargoCrtTime": "09:14:00"
                    }
                ]
            }]
        })
    }

    fn tracker() -> KtjTracker {
        KtjTracker::new(&TrackerConfig::default())
    }

    #[test]
    fn test_parse_js_object_literal() {
        let value = parse_js_object_literal(r#"({success:true, msg:"{}"})"#).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["msg"], "{}");
    }

    #[test]
    fn test_parse_latest_course() {
        let result = tracker().parse("1234567890", &wrap(delivered_inner())).unwrap();

        assert_eq!(result.platform, Provider::Ktj);
        assert_eq!(result.status, "已送達，簽收");
        assert_eq!(result.time.as_deref(), Some("2025-12-16T05:08:33.000"));
        assert!(result.is_delivered);
        assert!(result.normalized_time().is_some());
    }

    #[test]
    fn test_time_from_date_and_time() {
        let inner = json!({
            "result": [{ "course": [{
                "statusIdName": "配送中",
                "processCargoCrtDate": "2025-12-15",
                "processCargoCrtTime": "09:14:00"
            }]}]
        });
        let result = tracker().parse("1", &wrap(inner)).unwrap();
        assert_eq!(result.time.as_deref(), Some("2025-12-15T09:14:00"));
        assert!(!result.is_delivered);
    }

    #[test]
    fn test_success_as_string() {
        let body = format!(
            "{{success:\"true\",msg:{}}}",
            serde_json::to_string(&delivered_inner().to_string()).unwrap()
        );
        assert!(tracker().parse("1234567890", &body).is_ok());
    }

    #[test]
    fn test_empty_result_is_not_found() {
        let err = tracker().parse("1", &wrap(json!({ "result": [] }))).unwrap_err();
        assert!(matches!(err, TrackerError::OrderNotFound(_)));

        let err = tracker()
            .parse("1", &wrap(json!({ "result": [{ "course": [] }] })))
            .unwrap_err();
        assert!(matches!(err, TrackerError::OrderNotFound(_)));
    }

    #[test]
    fn test_success_false_is_parse_error() {
        let err = tracker().parse("1", r#"({success:false,msg:""})"#).unwrap_err();
        assert!(matches!(err, TrackerError::Parse(_)));
    }

    #[tokio::test]
    async fn test_track_ignores_warm_up_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools/positchecking_listForKtj.aspx"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/Handler.aspx"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .and(body_string_contains("Action=getKtjData"))
            .respond_with(ResponseTemplate::new(200).set_body_string(wrap(delivered_inner())))
            .expect(1)
            .mount(&server)
            .await;

        let config = TrackerConfig::default()
            .with_endpoints(crate::config::Endpoints::all(server.uri()));
        let session = HttpSession::new(&config).unwrap();
        let result = KtjTracker::new(&config)
            .track(&session, "1234567890")
            .await
            .unwrap();

        assert_eq!(result.order_id, "1234567890");
        assert_eq!(result.status, "已送達，簽收");
    }
}
