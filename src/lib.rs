//! 台湾物流の配送状況スクレイパー
//!
//! - 超商取貨（7-11 / 全家 / OK）と宅配（黑貓 / 宅配通 / 新竹 / 大榮）の照会ページを取得
//! - 業者ごとに異なる HTML / JSON を `TrackingResult` に正規化
//! - キャプチャ付きの業者（7-11 / 新竹）は Tesseract で認識して自動送信
//!
//! # 使用例
//!
//! ```rust,ignore
//! use parcel_tracker::{track, Provider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = track(Provider::OKMart, "123456789012").await.unwrap();
//!     println!("{} {} {:?}", result.platform, result.status, result.time);
//! }
//! ```
//!
//! # tower Service として使う
//!
//! ```rust,ignore
//! use parcel_tracker::{Provider, TrackRequest, TrackingService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = TrackingService::new();
//!     let result = service
//!         .call(TrackRequest::new(Provider::SevenEleven, "F12345678901"))
//!         .await
//!         .unwrap();
//!     println!("{:?}", result);
//! }
//! ```

pub mod captcha;
pub mod config;
pub mod error;
pub mod providers;
pub mod service;
pub mod session;
pub mod traits;
pub mod types;

use tracing::info;

// 主要な型をリエクスポート
pub use captcha::{CaptchaSolver, OcrEngine, OcrProfile, TesseractOcr};
pub use config::{Endpoints, TrackerConfig};
pub use error::{OcrError, TrackerError, UnknownProvider};
pub use service::{TrackRequest, TrackingService};
pub use session::HttpSession;
pub use traits::Tracker;
pub use types::{Provider, TrackingResult};

/// 既定の設定で配送状況を照会
pub async fn track(provider: Provider, order_id: &str) -> Result<TrackingResult, TrackerError> {
    track_with(provider, order_id, &TrackerConfig::default()).await
}

/// 設定を指定して配送状況を照会
///
/// 呼び出しごとに新しいセッションを作り、終了時に破棄する。
pub async fn track_with(
    provider: Provider,
    order_id: &str,
    config: &TrackerConfig,
) -> Result<TrackingResult, TrackerError> {
    info!("[{}] 照会開始: {}", provider, order_id);

    let session = HttpSession::new(config)?;
    let tracker = provider.tracker(config);
    let result = tracker.track(&session, order_id).await?;

    info!(
        "[{}] 照会完了: status={}, time={:?}",
        provider, result.status, result.time
    );
    Ok(result)
}
