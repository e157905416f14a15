//! 거래소 커넥터 팩토리.

use crate::connector::ssi::{SsiConfig, SsiConnector};
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::Exchange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 지원하는 거래소 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    /// SSI FastConnect (베트남)
    Ssi,
}

impl ExchangeId {
    /// 식별자 문자열을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Ssi => "ssi",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssi" => Ok(ExchangeId::Ssi),
            other => Err(ExchangeError::NotImplemented(format!(
                "exchange: {}",
                other
            ))),
        }
    }
}

/// 거래소 커넥터를 생성합니다.
pub fn build_exchange(id: ExchangeId, config: SsiConfig) -> ExchangeResult<Arc<dyn Exchange>> {
    match id {
        ExchangeId::Ssi => Ok(Arc::new(SsiConnector::new(config)?)),
    }
}
