use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::info;

use super::parser::{parse_page, SevenElevenPage};
use crate::captcha::{Attempt, CaptchaChallenge, CaptchaSolver, OcrEngine, OcrProfile};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::providers::{contains_any, input_value};
use crate::session::HttpSession;
use crate::traits::Tracker;
use crate::types::{Provider, TrackingResult};

static VALIDATE_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="(ValidateImage\.aspx\?ts=[0-9]+)""#).expect("valid regex"));

static M_NEWS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*)(\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2})").expect("valid regex")
});

const DELIVERED_KEYWORDS: &[&str] = &["包裹配達取件門市", "已完成包裹成功取件"];

/// 寄件 8 碼、取貨 11 碼または 12 碼
const VALID_LENGTHS: &[usize] = &[8, 11, 12];

pub struct SevenElevenTracker {
    base_url: String,
    solver: CaptchaSolver,
}

impl SevenElevenTracker {
    pub fn new(config: &TrackerConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            base_url: config.endpoints.seven_eleven.trim_end_matches('/').to_string(),
            solver: CaptchaSolver::new(ocr, OcrProfile::DIGITS, config.captcha_max_attempts),
        }
    }

    fn into_result(order_id: &str, page: SevenElevenPage) -> Result<TrackingResult, TrackerError> {
        if !page.is_success() {
            let msg = page.msg.unwrap_or_default();
            return Err(TrackerError::OrderNotFound(format!("[7-11] {}: {}", order_id, msg)));
        }

        let m_news = page
            .m_news
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TrackerError::Parse("[7-11] m_news がありません".into()))?;

        let caps = M_NEWS_RE
            .captures(m_news)
            .ok_or_else(|| TrackerError::Parse(format!("[7-11] m_news の形式が不正: {}", m_news)))?;
        let status = caps[1].trim().to_string();
        let time = caps[2].to_string();

        if status.is_empty() {
            return Err(TrackerError::Parse("[7-11] 状態が空です".into()));
        }

        Ok(TrackingResult {
            order_id: order_id.to_string(),
            platform: Provider::SevenEleven,
            is_delivered: contains_any(&status, DELIVERED_KEYWORDS),
            status,
            time: Some(time),
            raw_data: serde_json::to_value(&page)?,
        })
    }
}

/// 照会フォーム 1 回分（ページ取得ごとに ViewState とキャプチャが変わる）
struct SearchChallenge<'a> {
    base_url: &'a str,
    order_id: &'a str,
    view_state: String,
    view_state_generator: String,
}

impl<'a> SearchChallenge<'a> {
    fn search_url(&self) -> String {
        format!("{}/search.aspx", self.base_url)
    }

    /// フォームトークンとキャプチャ画像パスを取り出す
    fn read_form(&mut self, html: &str) -> Result<String, TrackerError> {
        let document = Html::parse_document(html);
        self.view_state = input_value(&document, "input#__VIEWSTATE")?
            .ok_or_else(|| TrackerError::Parse("[7-11] __VIEWSTATE がありません".into()))?;
        self.view_state_generator =
            input_value(&document, "input#__VIEWSTATEGENERATOR")?.unwrap_or_default();

        VALIDATE_IMAGE_RE
            .captures(html)
            .map(|cap| cap[1].to_string())
            .ok_or_else(|| TrackerError::Parse("[7-11] キャプチャ画像が見つかりません".into()))
    }
}

#[async_trait]
impl<'a> CaptchaChallenge for SearchChallenge<'a> {
    type Output = String;

    async fn fetch_image(&mut self, session: &HttpSession) -> Result<Vec<u8>, TrackerError> {
        info!("[7-11] 照会ページ取得");
        let html = session.get_text(&self.search_url()).await?;
        let image_path = self.read_form(&html)?;
        session
            .get_bytes(&format!("{}/{}", self.base_url, image_path))
            .await
    }

    async fn submit(
        &mut self,
        session: &HttpSession,
        guess: &str,
    ) -> Result<Attempt<String>, TrackerError> {
        info!("[7-11] 照会フォーム送信");
        let form = [
            ("__EVENTTARGET", "submit"),
            ("__EVENTARGUMENT", ""),
            ("__VIEWSTATE", self.view_state.as_str()),
            ("__VIEWSTATEGENERATOR", self.view_state_generator.as_str()),
            ("txtProductNum", self.order_id),
            ("tbChkCode", guess),
            ("txtIMGName", ""),
            ("txtPage", "1"),
        ];
        let body = session.post_form(&self.search_url(), &form).await?;

        let page = parse_page(&body)?;
        if page.is_captcha_error() {
            return Ok(Attempt::Rejected(page.msg.unwrap_or_default()));
        }
        Ok(Attempt::Accepted(body))
    }
}

#[async_trait]
impl Tracker for SevenElevenTracker {
    fn provider(&self) -> Provider {
        Provider::SevenEleven
    }

    fn validate(&self, order_id: &str) -> Result<(), TrackerError> {
        if VALID_LENGTHS.contains(&order_id.chars().count()) {
            Ok(())
        } else {
            Err(TrackerError::InvalidOrderId(format!(
                "[7-11] {} は 8/11/12 桁ではありません",
                order_id
            )))
        }
    }

    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError> {
        let mut challenge = SearchChallenge {
            base_url: &self.base_url,
            order_id,
            view_state: String::new(),
            view_state_generator: String::new(),
        };
        self.solver.fetch_and_submit(session, &mut challenge).await
    }

    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError> {
        Self::into_result(order_id, parse_page(body)?)
    }
}
