//! 新竹物流 (HCT) アダプタ
//!
//! 照会は 2 段階。キャプチャ付きフォームを送ると `no`/`chk` を含む中継ページが返り、
//! それを結果ページに POST する。キャプチャが誤っていると中継ページに `no`/`chk` がない。

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use super::{contains_any, element_text, input_value, selector};
use crate::captcha::{Attempt, CaptchaChallenge, CaptchaSolver, OcrEngine, OcrProfile};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

static TOOLTIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(.*?)'").expect("valid regex"));

const CAPTCHA_IMG_CSS: &str =
    r#"img[name="imgCode"], img#imgCode, img[src*="imgCode"], img[src*="code"]"#;

const DELIVERED_KEYWORDS: &[&str] = &["送達"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HctRecord {
    /// 作業時間
    pub time: String,
    /// 貨物狀態（ツールチップの説明を改行で連結）
    pub status: String,
    /// 貨物件數
    pub count: String,
    /// 負責營業所
    pub office: String,
}

fn parse_records(html: &str) -> Result<Vec<HctRecord>, TrackerError> {
    let document = Html::parse_document(html);
    let container_sel = selector("div.grid-container")?;
    let time_sel = selector("div.col_optime")?;
    let state_sel = selector("div.col_state span.linkInv")?;
    let count_sel = selector("div.col_count")?;
    let office_sel = selector("div.col_office")?;

    let mut records = Vec::new();
    for container in document.select(&container_sel) {
        let time = container
            .select(&time_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if time.is_empty() {
            continue;
        }

        let state = container.select(&state_sel).next();
        let state_text = state.map(element_text).unwrap_or_default();
        let tooltip = state
            .and_then(|span| span.value().attr("onmouseover"))
            .and_then(|attr| TOOLTIP_RE.captures(attr).map(|c| c[1].to_string()))
            .unwrap_or_default();

        records.push(HctRecord {
            time,
            status: format!("{}\n{}", state_text, tooltip).trim().to_string(),
            count: container
                .select(&count_sel)
                .next()
                .map(|el| element_text(el).replace('件', ""))
                .unwrap_or_default(),
            office: container
                .select(&office_sel)
                .next()
                .map(element_text)
                .unwrap_or_default(),
        });
    }
    Ok(records)
}

pub struct HctTracker {
    base_url: String,
    solver: CaptchaSolver,
}

impl HctTracker {
    pub fn new(config: &TrackerConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            base_url: config.endpoints.hct.trim_end_matches('/').to_string(),
            solver: CaptchaSolver::new(ocr, OcrProfile::ALNUM4, config.captcha_max_attempts),
        }
    }
}

/// WebForm のトークン
#[derive(Debug, Default)]
struct FormTokens {
    view_state: String,
    view_state_generator: Option<String>,
    event_validation: Option<String>,
}

struct SearchChallenge<'a> {
    base_url: &'a str,
    order_id: &'a str,
    tokens: FormTokens,
}

impl<'a> SearchChallenge<'a> {
    fn search_url(&self) -> String {
        format!("{}/SearchGoods_n.aspx", self.base_url)
    }

    /// トークンを読み、キャプチャ画像の絶対 URL を返す
    fn read_form(&mut self, html: &str) -> Result<String, TrackerError> {
        let document = Html::parse_document(html);

        let view_state = input_value(&document, r#"input[id="__VIEWSTATE"]"#)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TrackerError::Parse("[HCT] __VIEWSTATE がありません".into()))?;
        self.tokens = FormTokens {
            view_state,
            view_state_generator: input_value(&document, r#"input[id="__VIEWSTATEGENERATOR"]"#)?
                .filter(|v| !v.is_empty()),
            event_validation: input_value(&document, r#"input[id="__EVENTVALIDATION"]"#)?
                .filter(|v| !v.is_empty()),
        };

        let img_sel = selector(CAPTCHA_IMG_CSS)?;
        let src = document
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or_else(|| TrackerError::Parse("[HCT] キャプチャ画像が見つかりません".into()))?;

        let base = Url::parse(&self.search_url())
            .map_err(|e| TrackerError::Parse(format!("[HCT] URL 解析エラー: {}", e)))?;
        let image_url = base
            .join(src)
            .map_err(|e| TrackerError::Parse(format!("[HCT] キャプチャ URL が不正: {}", e)))?;
        Ok(image_url.to_string())
    }
}

/// 中継ページの `no`/`chk`
fn relay_fields(html: &str) -> Result<Option<(String, String)>, TrackerError> {
    let document = Html::parse_document(html);
    let no = input_value(&document, r#"input[name="no"]"#)?;
    let chk = input_value(&document, r#"input[name="chk"]"#)?;
    Ok(no.zip(chk))
}

#[async_trait]
impl<'a> CaptchaChallenge for SearchChallenge<'a> {
    type Output = String;

    async fn fetch_image(&mut self, session: &HttpSession) -> Result<Vec<u8>, TrackerError> {
        info!("[HCT] 照会ページ取得");
        // リダイレクト先はエラーページなので追わずに再試行する
        let html = session.get_text_no_redirect(&self.search_url()).await?;
        let image_url = self.read_form(&html)?;
        session.get_bytes(&image_url).await
    }

    async fn submit(
        &mut self,
        session: &HttpSession,
        guess: &str,
    ) -> Result<Attempt<String>, TrackerError> {
        info!("[HCT] 中継フォーム送信");
        let mut form = vec![
            ("__VIEWSTATE", self.tokens.view_state.as_str()),
            ("ctl00$ContentFrame$txtpKey", self.order_id),
            ("ctl00$ContentFrame$txt_chk", guess),
            ("ctl00$ContentFrame$Button1", "查詢 >"),
        ];
        if let Some(generator) = self.tokens.view_state_generator.as_deref() {
            form.push(("__VIEWSTATEGENERATOR", generator));
        }
        if let Some(validation) = self.tokens.event_validation.as_deref() {
            form.push(("__EVENTVALIDATION", validation));
        }

        let relay = session.post_form(&self.search_url(), &form).await?;
        let Some((no, chk)) = relay_fields(&relay)? else {
            return Ok(Attempt::Rejected("no/chk がありません（驗證碼錯誤）".into()));
        };

        info!("[HCT] 結果ページ取得");
        let body = session
            .post_form(
                &format!("{}/SearchGoods.aspx", self.base_url),
                &[("no", no.as_str()), ("chk", chk.as_str())],
            )
            .await?;
        Ok(Attempt::Accepted(body))
    }
}

#[async_trait]
impl Tracker for HctTracker {
    fn provider(&self) -> Provider {
        Provider::Hct
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        let mut challenge = SearchChallenge {
            base_url: &self.base_url,
            order_id,
            tokens: FormTokens::default(),
        };
        self.solver.fetch_and_submit(session, &mut challenge).await
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        let records = parse_records(body)?;

        // 先頭が最新
        let latest = records
            .first()
            .ok_or_else(|| TrackerError::OrderNotFound(format!("[HCT] {}", order_id)))?;

        if latest.status.is_empty() {
            return Err(TrackerError::Parse("[HCT] 貨物狀態が空です".into()));
        }

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::Hct,
            status: latest.status.clone(),
            time: Some(latest.time.clone()),
            is_delivered: contains_any(&latest.status, DELIVERED_KEYWORDS),
            raw_data: serde_json::to_value(&records)?,
        })
    }
}
