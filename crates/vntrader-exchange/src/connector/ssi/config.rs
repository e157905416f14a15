//! SSI FastConnect API 설정.

use crate::error::{ExchangeError, ExchangeResult};

/// 시세 API 기본 URL.
pub const DEFAULT_DATA_API_URL: &str = "https://fc-data.ssi.com.vn";

/// 주문 API 기본 URL.
pub const DEFAULT_TRADING_API_URL: &str = "https://fc-tradeapi.ssi.com.vn";

/// HTTP 요청 기본 타임아웃 (초).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// SSI FastConnect 커넥터 설정.
#[derive(Debug, Clone)]
pub struct SsiConfig {
    /// Consumer ID (API 키)
    pub consumer_id: String,
    /// Consumer Secret
    pub consumer_secret: String,
    /// 기본 계좌 번호 (주문/잔고 조회용)
    pub account_no: Option<String>,
    /// 시세 API URL
    pub data_api_url: String,
    /// 주문 API URL
    pub trading_api_url: String,
    /// HTTP 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for SsiConfig {
    fn default() -> Self {
        Self {
            consumer_id: String::new(),
            consumer_secret: String::new(),
            account_no: None,
            data_api_url: DEFAULT_DATA_API_URL.to_string(),
            trading_api_url: DEFAULT_TRADING_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SsiConfig {
    /// 자격증명으로 설정을 생성합니다.
    pub fn new(consumer_id: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            consumer_secret: consumer_secret.into(),
            ..Default::default()
        }
    }

    /// 기본 계좌 번호를 설정합니다.
    pub fn with_account(mut self, account_no: impl Into<String>) -> Self {
        self.account_no = Some(account_no.into());
        self
    }

    /// 시세 API URL을 설정합니다 (테스트/스테이징용).
    pub fn with_data_api_url(mut self, url: impl Into<String>) -> Self {
        self.data_api_url = url.into();
        self
    }

    /// 주문 API URL을 설정합니다 (테스트/스테이징용).
    pub fn with_trading_api_url(mut self, url: impl Into<String>) -> Self {
        self.trading_api_url = url.into();
        self
    }

    /// HTTP 타임아웃을 설정합니다.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 환경 변수에서 설정을 로드합니다.
    ///
    /// - `SSI_CONSUMER_ID`
    /// - `SSI_CONSUMER_SECRET`
    /// - `SSI_ACCOUNT_NUMBER` (선택)
    pub fn from_env() -> ExchangeResult<Self> {
        dotenvy::dotenv().ok();

        let consumer_id = std::env::var("SSI_CONSUMER_ID").map_err(|_| {
            ExchangeError::CredentialsMissing("SSI_CONSUMER_ID not set".to_string())
        })?;
        let consumer_secret = std::env::var("SSI_CONSUMER_SECRET").map_err(|_| {
            ExchangeError::CredentialsMissing("SSI_CONSUMER_SECRET not set".to_string())
        })?;
        let account_no = std::env::var("SSI_ACCOUNT_NUMBER").ok();

        Ok(Self {
            consumer_id,
            consumer_secret,
            account_no,
            ..Default::default()
        })
    }

    /// API 자격증명이 모두 설정되었는지 확인합니다.
    pub fn credentials_configured(&self) -> bool {
        !self.consumer_id.trim().is_empty() && !self.consumer_secret.trim().is_empty()
    }
}
