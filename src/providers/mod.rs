//! 配送業者ごとのアダプタ

mod ecan;
mod family_mart;
mod hct;
mod ktj;
mod okmart;
mod seven_eleven;
mod tcat;

use std::sync::Arc;

use scraper::{ElementRef, Selector};

pub use ecan::EcanTracker;
pub use family_mart::FamilyMartTracker;
pub use hct::HctTracker;
pub use ktj::KtjTracker;
pub use okmart::OKMartTracker;
pub use seven_eleven::SevenElevenTracker;
pub use tcat::TcatTracker;

use crate::captcha::{OcrEngine, TesseractOcr};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::traits::Tracker;
use crate::types::Provider;

impl Provider {
    /// 業者に対応するアダプタを生成（OCR は Tesseract）
    pub fn tracker(&self, config: &TrackerConfig) -> Box<dyn Tracker> {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(&config.tesseract_path));
        self.tracker_with_ocr(config, ocr)
    }

    /// OCR エンジンを指定してアダプタを生成
    pub fn tracker_with_ocr(
        &self,
        config: &TrackerConfig,
        ocr: Arc<dyn OcrEngine>,
    ) -> Box<dyn Tracker> {
        match self {
            Provider::SevenEleven => Box::new(SevenElevenTracker::new(config, ocr)),
            Provider::FamilyMart => Box::new(FamilyMartTracker::new(config)),
            Provider::OKMart => Box::new(OKMartTracker::new(config)),
            Provider::Tcat => Box::new(TcatTracker::new(config)),
            Provider::Ecan => Box::new(EcanTracker::new(config)),
            Provider::Hct => Box::new(HctTracker::new(config, ocr)),
            Provider::Ktj => Box::new(KtjTracker::new(config)),
        }
    }
}

pub(crate) fn selector(css: &str) -> Result<Selector, TrackerError> {
    Selector::parse(css).map_err(|e| TrackerError::Parse(format!("セレクタ {}: {}", css, e)))
}

/// 要素のテキストを連結して前後の空白を除く
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// テキストノードごとに空白を除き、`sep` で連結する
pub(crate) fn element_text_joined(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// `<input id=... value=...>` の value を取得
pub(crate) fn input_value(document: &scraper::Html, css: &str) -> Result<Option<String>, TrackerError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::to_string))
}
