//! 심볼 및 시장 보드 정의.
//!
//! 이 모듈은 베트남 주식시장 심볼 관련 타입을 정의합니다:
//! - `MarketSegment` - 거래 보드 (HOSE, HNX, UPCOM)
//! - `Symbol` - 거래 가능한 종목을 나타내는 심볼
//!
//! 모든 종목은 VND로 호가되므로 심볼에 호가 통화는 포함하지 않고
//! 표준 문자열 형식에서만 `/VND` 접미사를 붙입니다.

use crate::error::TraderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 호가 통화. 베트남 시장의 모든 종목은 동(VND)으로 호가됩니다.
pub const QUOTE_CURRENCY: &str = "VND";

/// 베트남 시장 거래 보드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketSegment {
    /// 호치민 증권거래소
    Hose,
    /// 하노이 증권거래소
    Hnx,
    /// 비상장 공개회사 시장
    Upcom,
}

impl MarketSegment {
    /// 모든 거래 보드.
    pub const ALL: [MarketSegment; 3] =
        [MarketSegment::Hose, MarketSegment::Hnx, MarketSegment::Upcom];

    /// 보드 코드 문자열을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSegment::Hose => "HOSE",
            MarketSegment::Hnx => "HNX",
            MarketSegment::Upcom => "UPCOM",
        }
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MarketSegment {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HOSE" => Ok(MarketSegment::Hose),
            "HNX" => Ok(MarketSegment::Hnx),
            "UPCOM" => Ok(MarketSegment::Upcom),
            _ => Err(TraderError::InvalidInput(format!(
                "Unknown market segment: {}",
                s
            ))),
        }
    }
}

/// 거래 가능한 종목을 나타내는 심볼.
///
/// 심볼은 거래 보드와 종목 코드로 구성됩니다. 예: HOSE의 SSI.
/// 같은 종목 코드가 여러 보드에 상장될 수 있으므로 보드가 식별자의
/// 일부입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// 거래 보드
    pub segment: MarketSegment,
    /// 종목 코드 (예: SSI, VNM)
    pub ticker: String,
}

impl Symbol {
    /// 새 심볼을 생성합니다. 종목 코드는 대문자로 정규화됩니다.
    pub fn new(segment: MarketSegment, ticker: impl Into<String>) -> Self {
        Self {
            segment,
            ticker: ticker.into().to_uppercase(),
        }
    }

    /// "SEGMENT:TICKER" 형식의 내부 식별자를 반환합니다.
    pub fn raw_id(&self) -> String {
        format!("{}:{}", self.segment, self.ticker)
    }

    /// "SEGMENT:TICKER/VND" 형식의 표준 심볼 문자열을 반환합니다.
    pub fn canonical(&self) -> String {
        format!("{}:{}/{}", self.segment, self.ticker, QUOTE_CURRENCY)
    }

    /// "SEGMENT:TICKER" 형식 문자열에서 심볼을 파싱합니다.
    /// "/VND" 접미사는 있으면 무시합니다.
    pub fn from_raw_id(s: &str) -> Option<Self> {
        let s = s.strip_suffix("/VND").unwrap_or(s);
        let (segment, ticker) = s.split_once(':')?;
        let segment = segment.parse().ok()?;
        if ticker.is_empty() {
            return None;
        }
        Some(Self::new(segment, ticker))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.ticker)
    }
}
