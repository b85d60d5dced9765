use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::OcrError;

/// キャプチャの種類ごとの OCR 設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrProfile {
    /// 認識を許可する文字
    pub whitelist: &'static str,
    /// Tesseract のページ分割モード
    pub psm: u8,
    /// 期待する文字数（不明なら None）
    pub expected_len: Option<usize>,
}

impl OcrProfile {
    /// 数字のみ（7-11）
    pub const DIGITS: OcrProfile = OcrProfile {
        whitelist: "0123456789",
        psm: 8,
        expected_len: None,
    };

    /// 英数字 4 文字（新竹物流）
    pub const ALNUM4: OcrProfile = OcrProfile {
        whitelist: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
        psm: 8,
        expected_len: Some(4),
    };

    /// OCR 出力から許可文字以外を除き、文字数を検証する
    pub fn clean(&self, raw: &str) -> Result<String, OcrError> {
        let text: String = raw.chars().filter(|c| self.whitelist.contains(*c)).collect();

        if text.is_empty() {
            return Err(OcrError::InvalidGuess(format!("空の認識結果: {:?}", raw)));
        }
        if let Some(len) = self.expected_len {
            if text.chars().count() != len {
                return Err(OcrError::InvalidGuess(format!(
                    "文字数が不正（期待 {} 文字）: {}",
                    len, text
                )));
            }
        }
        Ok(text)
    }
}

/// OCR エンジントレイト（テスト用モック対応）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 画像から文字列を認識
    async fn recognize(&self, image: &[u8], profile: &OcrProfile) -> Result<String, OcrError>;
}

/// Tesseract コマンドを呼び出す OCR エンジン
///
/// 画像は標準入力で渡し、結果を標準出力から読む。
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8], profile: &OcrProfile) -> Result<String, OcrError> {
        debug!(
            "tesseract 実行: {:?} (psm={}, {} bytes)",
            self.binary,
            profile.psm,
            image.len()
        );

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(profile.psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", profile.whitelist))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
            // drop で標準入力を閉じる
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "tesseract 終了コード {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
