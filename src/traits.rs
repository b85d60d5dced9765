use async_trait::async_trait;

use crate::error::TrackerError;
use crate::session::HttpSession;
use crate::types::{Provider, TrackingResult};

#[async_trait]
pub trait Tracker: Send + Sync {
    /// 対応する配送業者
    fn provider(&self) -> Provider;

    /// 送信前の追跡番号チェック
    fn validate(&self, _order_id: &str) -> Result<(), TrackerError> {
        Ok(())
    }

    /// 照会リクエストを送信し、レスポンス本文を返す
    async fn submit(&self, session: &HttpSession, order_id: &str) -> Result<String, TrackerError>;

    /// レスポンス本文を解析
    fn parse(&self, order_id: &str, body: &str) -> Result<TrackingResult, TrackerError>;

    /// 一括実行（validate → submit → parse）
    async fn track(
        &self,
        session: &HttpSession,
        order_id: &str,
    ) -> Result<TrackingResult, TrackerError> {
        self.validate(order_id)?;
        let body = self.submit(session, order_id).await?;
        self.parse(order_id, &body)
    }
}
