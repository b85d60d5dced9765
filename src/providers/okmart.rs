//! OK 超商アダプタ
//!
//! 検証コードは `ValidateNumber.ashx` の Set-Cookie にそのまま入っているので OCR は不要。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{COOKIE, SET_COOKIE};
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{contains_any, element_text, selector};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

static VALIDATE_COOKIE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ValidateNumber=code=([^&;]{5})").expect("valid regex"));

const DELIVERED_KEYWORDS: &[&str] = &["已送達", "已取貨"];

/// 照会結果ページの項目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OKMartRecord {
    /// 寄件編號
    #[serde(rename = "triNo")]
    pub tri_no: Option<String>,
    /// 訂單編號
    #[serde(rename = "odNo")]
    pub od_no: Option<String>,
    /// 類別
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// 目前貨況
    pub status: Option<String>,
    /// 取件門市店號
    #[serde(rename = "stNo")]
    pub st_no: Option<String>,
    /// 取件門市名稱
    #[serde(rename = "stNm")]
    pub st_nm: Option<String>,
    /// 取件門市地址
    #[serde(rename = "stNm2")]
    pub st_addr: Option<String>,
    /// 貨到門市日期
    #[serde(rename = "takeFrom")]
    pub take_from: Option<String>,
    /// 取貨截止
    #[serde(rename = "takeTo")]
    pub take_to: Option<String>,
    /// 取貨日期
    #[serde(rename = "takeAt")]
    pub take_at: Option<String>,
    /// 取件人
    pub taker: Option<String>,
}

fn parse_record(html: &str) -> Result<OKMartRecord, TrackerError> {
    let document = Html::parse_document(html);

    // 要素の位置を保ったまま、空文字は None にする
    let texts = |class: &str| -> Result<Vec<Option<String>>, TrackerError> {
        let sel = selector(&format!(".{}", class))?;
        Ok(document
            .select(&sel)
            .map(element_text)
            .map(|s| Some(s).filter(|s| !s.is_empty()))
            .collect())
    };
    let first = |class: &str| -> Result<Option<String>, TrackerError> {
        Ok(texts(class)?.into_iter().flatten().next())
    };

    // 1 つ目が店名、2 つ目が住所
    let mut store_names = texts("stNm")?.into_iter();

    Ok(OKMartRecord {
        tri_no: first("triNo")?,
        od_no: first("odNo")?,
        kind: first("type")?,
        status: first("status")?,
        st_no: first("stNo")?,
        st_nm: store_names.next().flatten(),
        st_addr: store_names.next().flatten(),
        take_from: first("takeFrom")?,
        take_to: first("takeTo")?,
        take_at: first("takeAt")?,
        taker: first("taker")?,
    })
}

pub struct OKMartTracker {
    base_url: String,
}

impl OKMartTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.endpoints.okmart.trim_end_matches('/').to_string(),
        }
    }

    /// Set-Cookie から検証コードを取り出す
    async fn fetch_validate_code(&self, session: &HttpSession) -> Result<String, TrackerError> {
        let url = format!("{}/ValidateNumber.ashx", self.base_url);
        let response = session.send(session.client().get(&url)).await?;

        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| VALIDATE_COOKIE_RE.captures(cookie).map(|c| c[1].to_string()))
            .ok_or_else(|| TrackerError::Parse("[OKMart] 検証コードの Cookie がありません".into()))
    }
}

#[async_trait]
impl Tracker for OKMartTracker {
    fn provider(&self) -> Provider {
        Provider::OKMart
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        info!("[OKMart] 検証コード取得");
        let code = self.fetch_validate_code(session).await?;

        info!("[OKMart] 照会結果取得");
        let cookie = format!(
            "ValidateNumber=code={}&odno={}&cutknm=&cutktl=",
            code, order_id
        );
        let request = session
            .client()
            .get(format!("{}/Result", self.base_url))
            .query(&[("inputOdNo", order_id), ("inputCode1", code.as_str())])
            .header(COOKIE, cookie);
        let response = session.send(request).await?;
        Ok(response.text().await?)
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let record = parse_record(body)?;

        if record.od_no.is_none() {
            return Err(TrackerError::OrderNotFound(format!("[OKMart] {}", order_id)));
        }

        let status = record
            .status
            .clone()
            .ok_or_else(|| TrackerError::Parse("[OKMart] 目前貨況がありません".into()))?;

        // 取貨済みなら取貨日期、未取貨なら貨到門市日期
        let time = record.take_at.clone().or_else(|| record.take_from.clone());

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::OKMart,
            is_delivered: contains_any(&status, DELIVERED_KEYWORDS),
            status,
            time,
            raw_data: serde_json::to_value(&record)?,
        })
    }
}
