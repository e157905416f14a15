//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// API 자격증명 미설정
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    /// 인증 실패 (브로커가 토큰 발급을 거부)
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// 인증 응답에서 토큰을 찾을 수 없음
    #[error("Invalid credential response: {0}")]
    InvalidCredentialResponse(String),

    /// 응답 파싱/역직렬화 에러
    #[error("Decode error: {0}")]
    Decode(String),

    /// 브로커 API가 비성공 상태를 반환
    #[error("Broker error: {message}")]
    Broker {
        /// 브로커 응답 메시지
        message: String,
    },

    /// 심볼을 찾을 수 없음
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// 심볼이 여러 보드에 상장되어 모호함
    #[error("Ambiguous symbol: {0}")]
    AmbiguousSymbol(String),

    /// 지원되지 않는 타임프레임
    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    /// 유효하지 않은 수량
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// 가격이 일일 가격 제한폭을 벗어남
    #[error("Price out of band: {0}")]
    PriceOutOfBand(String),

    /// 휴장 중이거나 현재 세션에서 허용되지 않는 주문
    #[error("Market closed: {0}")]
    MarketClosed(String),

    /// 네트워크/전송 에러
    #[error("Transport error: {0}")]
    Transport(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 지원되지 않는 작업
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Transport(_) | ExchangeError::Timeout(_)
        )
    }

    /// 재시도하면 안 되는 치명적 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::CredentialsMissing(_)
                | ExchangeError::AuthFailed(_)
                | ExchangeError::InvalidCredentialResponse(_)
                | ExchangeError::NotImplemented(_)
        )
    }

    /// 네트워크 왕복 없이 로컬 검증에서 발생한 에러인지 확인.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ExchangeError::SymbolNotFound(_)
                | ExchangeError::AmbiguousSymbol(_)
                | ExchangeError::InvalidTimeframe(_)
                | ExchangeError::InvalidQuantity(_)
                | ExchangeError::PriceOutOfBand(_)
                | ExchangeError::MarketClosed(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else {
            ExchangeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}
