//! キャプチャ認識モジュール
//!
//! 画像取得 → 前処理 → OCR → 送信 を、上限付きで再試行する。

mod ocr;
mod preprocess;
mod solver;

pub use ocr::{OcrEngine, OcrProfile, TesseractOcr};
pub use preprocess::preprocess;
pub use solver::{Attempt, CaptchaChallenge, CaptchaSolver};

#[cfg(test)]
pub use ocr::MockOcrEngine;
