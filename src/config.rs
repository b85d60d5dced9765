use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// 各配送業者のベース URL
///
/// テストではモックサーバーの URL に差し替える。
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub seven_eleven: String,
    pub family_mart: String,
    pub okmart: String,
    pub tcat: String,
    pub ecan: String,
    pub hct: String,
    pub ktj: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            seven_eleven: "https://eservice.7-11.com.tw/e-tracking".to_string(),
            family_mart: "https://ecfme.fme.com.tw/FMEDCFPWebV2_II/list.aspx".to_string(),
            okmart: "https://ecservice.okmart.com.tw/Tracking".to_string(),
            tcat: "https://www.t-cat.com.tw/Inquire".to_string(),
            ecan: "https://query2.e-can.com.tw/ECAN_APP".to_string(),
            hct: "https://www.hct.com.tw/Search".to_string(),
            ktj: "http://www.express.com.tw".to_string(),
        }
    }
}

impl Endpoints {
    /// 全業者を同じベース URL に向ける（モックサーバー用）
    pub fn all(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            seven_eleven: base.clone(),
            family_mart: base.clone(),
            okmart: base.clone(),
            tcat: base.clone(),
            ecan: base.clone(),
            hct: base.clone(),
            ktj: base,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// キャプチャの最大試行回数
    pub captcha_max_attempts: u32,
    pub tesseract_path: PathBuf,
    pub endpoints: Endpoints,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let tesseract_path = std::env::var("TESSERACT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tesseract"));

        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            captcha_max_attempts: 5,
            tesseract_path,
            endpoints: Endpoints::default(),
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// 0 を指定しても最低 1 回は試行する
    pub fn with_captcha_max_attempts(mut self, attempts: u32) -> Self {
        self.captcha_max_attempts = attempts.max(1);
        self
    }

    pub fn with_tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tesseract_path = path.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}
