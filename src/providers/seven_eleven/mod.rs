//! 7-ELEVEN e-tracking アダプタ
//!
//! 照会フォームは数字キャプチャ付き。Tesseract で認識して送信する。

mod parser;
mod tracker;

pub use tracker::SevenElevenTracker;
