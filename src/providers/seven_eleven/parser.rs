//! e-tracking 照会結果ページの解析

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::providers::{element_text, selector};

/// キャプチャ不一致時のメッセージ
pub(super) const CAPTCHA_ERROR_MSG: &str = "驗證碼錯誤!!";
pub(super) const SUCCESS_MSG: &str = "success";

static ALERT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"alert\('([^']*)'\)").expect("valid regex"));

/// 照会結果ページの解析結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SevenElevenPage {
    /// alert / lbMsg のメッセージ、成功時は "success"
    pub msg: Option<String>,
    /// 最新状況（状態 + 日時）
    pub m_news: Option<String>,
    /// div.info 内の span（id → テキスト）と servicetype
    pub info: BTreeMap<String, String>,
    /// 配送履歴
    pub shipping: Vec<String>,
}

impl SevenElevenPage {
    pub fn is_success(&self) -> bool {
        self.msg.as_deref() == Some(SUCCESS_MSG)
    }

    pub fn is_captcha_error(&self) -> bool {
        self.msg.as_deref() == Some(CAPTCHA_ERROR_MSG)
    }
}

pub fn parse_page(html: &str) -> Result<SevenElevenPage, TrackerError> {
    let document = Html::parse_document(html);
    let mut page = SevenElevenPage::default();

    // script 内の alert を優先
    let script_sel = selector("script")?;
    for script in document.select(&script_sel) {
        let text = script.text().collect::<String>();
        if let Some(cap) = ALERT_RE.captures(&text) {
            page.msg = Some(cap[1].to_string());
            return Ok(page);
        }
    }

    let msg_sel = selector("span#lbMsg")?;
    if let Some(msg) = document
        .select(&msg_sel)
        .next()
        .map(element_text)
        .filter(|m| !m.is_empty())
    {
        page.msg = Some(msg);
        return Ok(page);
    }

    let news_sel = selector("div.m_news")?;
    page.m_news = document.select(&news_sel).next().map(element_text);

    let info_sel = selector("div.info")?;
    let span_sel = selector("span")?;
    let service_sel = selector("h4#servicetype")?;
    if let Some(info) = document.select(&info_sel).next() {
        for span in info.select(&span_sel) {
            if let Some(id) = span.value().attr("id") {
                page.info.insert(id.to_string(), element_text(span));
            }
        }
        if let Some(service) = info.select(&service_sel).next() {
            page.info
                .insert("servicetype".to_string(), element_text(service));
        }
    }

    let shipping_sel = selector("div.shipping p")?;
    page.shipping = document
        .select(&shipping_sel)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect();

    page.msg = Some(SUCCESS_MSG.to_string());
    Ok(page)
}
