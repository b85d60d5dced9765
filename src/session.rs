//! 1 回の追跡呼び出しが所有する HTTP セッション

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::config::TrackerConfig;
use crate::error::TrackerError;

/// Cookie を保持する HTTP セッション
///
/// `track` 呼び出しごとに生成し、呼び出し終了時に破棄する。
/// リダイレクトを追わないクライアントも同じ Cookie を共有する。
pub struct HttpSession {
    client: Client,
    no_redirect: Client,
}

fn build_client(
    config: &TrackerConfig,
    jar: Arc<Jar>,
    redirect: Policy,
) -> Result<Client, TrackerError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"),
    );

    Client::builder()
        .cookie_provider(jar)
        .redirect(redirect)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|e| TrackerError::Network(format!("HTTP クライアント初期化エラー: {}", e)))
}

impl HttpSession {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_client(config, jar.clone(), Policy::default())?,
            no_redirect: build_client(config, jar, Policy::none())?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// リクエストを送信し、2xx 以外は `Network` エラーにする
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, TrackerError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("HTTP {} {}", status.as_u16(), response.url());

        if !status.is_success() {
            return Err(TrackerError::Network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                response.url()
            )));
        }
        Ok(response)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, TrackerError> {
        let response = self.send(self.client.get(url)).await?;
        Ok(response.text().await?)
    }

    /// リダイレクトを追わずに取得する（3xx は `Network` エラー）
    pub async fn get_text_no_redirect(&self, url: &str) -> Result<String, TrackerError> {
        let response = self.send(self.no_redirect.get(url)).await?;
        Ok(response.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TrackerError> {
        let response = self.send(self.client.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, TrackerError> {
        let response = self.send(self.client.post(url).form(form)).await?;
        Ok(response.text().await?)
    }
}
