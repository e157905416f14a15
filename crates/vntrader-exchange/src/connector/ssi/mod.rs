//! SSI FastConnect 커넥터 (베트남 주식시장).
//!
//! SSI 증권의 FastConnect REST API를 통해 HOSE/HNX/UPCOM 시장의
//! 시세 조회와 주문을 지원합니다. 시세 API와 주문 API는 별도
//! 호스트를 사용하지만 동일한 토큰 발급 방식을 공유합니다.

pub mod auth;
pub mod candles;
pub mod catalog;
pub mod client;
pub mod config;
pub mod session;

pub use auth::TokenCache;
pub use candles::CandleFetcher;
pub use catalog::{CatalogSnapshot, MarketCatalog};
pub use client::{CompanyInfo, Fee, FinancialReport, SsiConnector, TradingHoliday, FEE_RATE};
pub use config::SsiConfig;
pub use session::{OrderGate, SessionSchedule, TickRuleTable, TradingSession};

use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// SSI FastConnect API 엔드포인트 경로.
pub mod endpoint {
    /// 토큰 발급
    pub const ACCESS_TOKEN: &str = "api/v2/Market/AccessToken";
    /// 종목 목록
    pub const SECURITIES_LIST: &str = "api/Market/GetSecuritiesList";
    /// 종목 상세
    pub const SECURITIES_DETAILS: &str = "api/Market/GetSecuritiesDetails";
    /// 일봉 OHLC
    pub const DAILY_OHLC: &str = "api/Market/GetDailyOHLC";
    /// 분봉 OHLC
    pub const INTRADAY_OHLC: &str = "api/Market/GetIntradayOHLC";
    /// 휴장일 목록
    pub const TRADING_HOLIDAYS: &str = "api/Market/GetTradingHolidays";
    /// 일별 시세 (복수 종목)
    pub const DAILY_STOCK_PRICE: &str = "api/Market/GetDailyStockPrice";
    /// 기업 정보
    pub const COMPANY_INFO: &str = "api/Market/GetCompanyInfo";
    /// 재무제표
    pub const FINANCIAL_REPORT: &str = "api/Market/GetFinancialReport";

    /// 신규 주문
    pub const NEW_ORDER: &str = "api/Trading/NewOrder";
    /// 주문 취소
    pub const CANCEL_ORDER: &str = "api/Trading/CancelOrder";
    /// 주문 정정
    pub const MODIFY_ORDER: &str = "api/Trading/ModifyOrder";
    /// 주문 내역
    pub const ORDER_HISTORY: &str = "api/Trading/GetOrderHistory";
    /// 주문 상세
    pub const ORDER_DETAIL: &str = "api/Trading/GetOrderDetail";
    /// 계좌 잔고
    pub const ACCOUNT_BALANCE: &str = "api/Account/GetAccountBalance";
    /// 보유 종목
    pub const STOCK_POSITION: &str = "api/Account/GetStockPosition";
}

/// SSI 주문 유형.
///
/// 일반 주문 유형(시장가/지정가)은 현재 세션에 따라 이 구체 유형으로
/// 변환됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SsiOrderType {
    /// 개장 동시호가 시장가 (At The Open)
    Ato,
    /// 폐장 동시호가 시장가 (At The Close)
    Atc,
    /// 지정가 (Limit Order)
    Lo,
    /// 시장가 전환 지정가 (Market To Limit)
    Mtl,
}

impl SsiOrderType {
    /// API 주문 유형 코드를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            SsiOrderType::Ato => "ATO",
            SsiOrderType::Atc => "ATC",
            SsiOrderType::Lo => "LO",
            SsiOrderType::Mtl => "MTL",
        }
    }

    /// 가격 지정이 필요한 유형인지 확인합니다.
    pub fn requires_price(&self) -> bool {
        matches!(self, SsiOrderType::Lo)
    }
}

impl std::fmt::Display for SsiOrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SsiOrderType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ATO" => Ok(SsiOrderType::Ato),
            "ATC" => Ok(SsiOrderType::Atc),
            "LO" => Ok(SsiOrderType::Lo),
            // MAK은 MTL의 구 명칭
            "MTL" | "MAK" => Ok(SsiOrderType::Mtl),
            _ => Err(ExchangeError::Decode(format!(
                "Unknown SSI order type: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_roundtrip() {
        assert_eq!("ATO".parse::<SsiOrderType>().unwrap(), SsiOrderType::Ato);
        assert_eq!("lo".parse::<SsiOrderType>().unwrap(), SsiOrderType::Lo);
        assert_eq!("MAK".parse::<SsiOrderType>().unwrap(), SsiOrderType::Mtl);
        assert!("FOK".parse::<SsiOrderType>().is_err());

        assert_eq!(SsiOrderType::Atc.as_str(), "ATC");
        assert!(SsiOrderType::Lo.requires_price());
        assert!(!SsiOrderType::Mtl.requires_price());
    }
}
