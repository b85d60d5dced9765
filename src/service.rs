use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::types::{Provider, TrackingResult};

/// 照会リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub provider: Provider,
    pub order_id: String,
}

impl TrackRequest {
    pub fn new(provider: Provider, order_id: impl Into<String>) -> Self {
        Self {
            provider,
            order_id: order_id.into(),
        }
    }
}

/// tower::Serviceを実装した照会サービス
#[derive(Debug, Clone, Default)]
pub struct TrackingService {
    config: TrackerConfig,
}

impl TrackingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Service<TrackRequest> for TrackingService {
    type Response = TrackingResult;
    type Error = TrackerError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: TrackRequest) -> Self::Future {
        info!("照会リクエスト受信: {} {}", req.provider, req.order_id);

        let config = self.config.clone();
        Box::pin(async move { crate::track_with(req.provider, &req.order_id, &config).await })
    }
}
