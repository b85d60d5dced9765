use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("通信エラー: {0}")]
    Network(String),

    #[error("キャプチャ認識失敗（{attempts}回試行）: {reason}")]
    Captcha { attempts: u32, reason: String },

    #[error("該当する荷物がありません: {0}")]
    OrderNotFound(String),

    #[error("レスポンス解析エラー: {0}")]
    Parse(String),

    #[error("追跡番号の形式が不正です: {0}")]
    InvalidOrderId(String),
}

impl TrackerError {
    /// キャプチャループで再試行の対象になるか（通信失敗・ページ不整合）
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Network(_) | TrackerError::Parse(_))
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        TrackerError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Parse(e.to_string())
    }
}

/// OCR エンジンのエラー（キャプチャループ内で吸収される）
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR プロセス起動エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR エンジンエラー: {0}")]
    Engine(String),

    #[error("認識結果が不正: {0}")]
    InvalidGuess(String),
}

/// 配送業者名の解析エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未対応の配送業者: {0}")]
pub struct UnknownProvider(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TrackerError::Network("HTTP 500".into()).is_retryable());
        assert!(TrackerError::Parse("__VIEWSTATE".into()).is_retryable());
        assert!(!TrackerError::OrderNotFound("x".into()).is_retryable());
        assert!(!TrackerError::InvalidOrderId("x".into()).is_retryable());
        assert!(!TrackerError::Captcha { attempts: 1, reason: "x".into() }.is_retryable());
    }
}
