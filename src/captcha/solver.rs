use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::ocr::{OcrEngine, OcrProfile};
use super::preprocess::preprocess;
use crate::error::{OcrError, TrackerError};
use crate::session::HttpSession;

/// キャプチャ送信の結果
#[derive(Debug)]
pub enum Attempt<T> {
    Accepted(T),
    /// 認識結果が拒否された（理由）
    Rejected(String),
}

/// キャプチャ付きフォームの 1 回分の操作
///
/// `fetch_image` ごとに新しいキャプチャ（とフォームトークン）を取得し直す。
#[async_trait]
pub trait CaptchaChallenge: Send {
    type Output: Send;

    async fn fetch_image(&mut self, session: &HttpSession) -> Result<Vec<u8>, TrackerError>;

    async fn submit(
        &mut self,
        session: &HttpSession,
        guess: &str,
    ) -> Result<Attempt<Self::Output>, TrackerError>;
}

pub struct CaptchaSolver {
    engine: Arc<dyn OcrEngine>,
    profile: OcrProfile,
    max_attempts: u32,
}

impl CaptchaSolver {
    pub fn new(engine: Arc<dyn OcrEngine>, profile: OcrProfile, max_attempts: u32) -> Self {
        Self {
            engine,
            profile,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn profile(&self) -> &OcrProfile {
        &self.profile
    }

    /// キャプチャ画像を文字列に変換
    pub async fn solve(&self, image: &[u8]) -> Result<String, OcrError> {
        let prepared = match preprocess(image) {
            Ok(png) => png,
            Err(e) => {
                warn!("キャプチャ前処理に失敗、元画像で認識します: {}", e);
                image.to_vec()
            }
        };

        let raw = self.engine.recognize(&prepared, &self.profile).await?;
        self.profile.clean(&raw)
    }

    /// 画像取得 → 認識 → 送信 を最大 `max_attempts` 回まで繰り返す
    ///
    /// 認識失敗・送信拒否、およびページ取得や送信での通信失敗・ページ不整合
    /// (`TrackerError::is_retryable`) は試行回数に数えて再試行する。
    pub async fn fetch_and_submit<C>(
        &self,
        session: &HttpSession,
        challenge: &mut C,
    ) -> Result<C::Output, TrackerError>
    where
        C: CaptchaChallenge,
    {
        let mut last_reason = String::from("未試行");

        for attempt in 1..=self.max_attempts {
            let image = match challenge.fetch_image(session).await {
                Ok(image) => image,
                Err(e) if e.is_retryable() => {
                    warn!("キャプチャ取得失敗 ({}/{}): {}", attempt, self.max_attempts, e);
                    last_reason = e.to_string();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let guess = match self.solve(&image).await {
                Ok(guess) => guess,
                Err(e) => {
                    warn!("キャプチャ認識失敗 ({}/{}): {}", attempt, self.max_attempts, e);
                    last_reason = e.to_string();
                    continue;
                }
            };
            debug!("キャプチャ認識結果 ({}/{}): {}", attempt, self.max_attempts, guess);

            match challenge.submit(session, &guess).await {
                Ok(Attempt::Accepted(output)) => {
                    info!("キャプチャ通過 ({}回目)", attempt);
                    return Ok(output);
                }
                Ok(Attempt::Rejected(reason)) => {
                    warn!("キャプチャ拒否 ({}/{}): {}", attempt, self.max_attempts, reason);
                    last_reason = reason;
                }
                Err(e) if e.is_retryable() => {
                    warn!("キャプチャ送信失敗 ({}/{}): {}", attempt, self.max_attempts, e);
                    last_reason = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }

        Err(TrackerError::Captcha {
            attempts: self.max_attempts,
            reason: last_reason,
        })
    }
}
