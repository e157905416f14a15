//! 도메인 계층의 에러 타입.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 데이터 에러
    #[error("데이터 에러: {0}")]
    Data(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

impl From<serde_json::Error> for TraderError {
    fn from(err: serde_json::Error) -> Self {
        TraderError::Serialization(err.to_string())
    }
}
