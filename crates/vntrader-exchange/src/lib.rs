//! # vnTrader Exchange
//!
//! 베트남 증권사 API 커넥터 크레이트입니다.
//!
//! SSI FastConnect REST API 위에 토큰 캐시, 종목 카탈로그, 거래 세션
//! 게이트, 캔들 수집기를 얹어 [`Exchange`] 인터페이스로 노출합니다.
//!
//! ## 구성
//!
//! - [`transport`]: HTTP 전송 계층 추상화
//! - [`envelope`]: 공통 응답 봉투 파싱 및 필드 정규화
//! - [`traits`]: 통합 거래소 인터페이스
//! - [`connector::ssi`]: SSI FastConnect 구현
//! - [`factory`]: 커넥터 팩토리
//!
//! ## 사용 예
//!
//! ```rust,no_run
//! use vntrader_exchange::{Exchange, ExchangeResult, SsiConfig, SsiConnector};
//!
//! #[tokio::main]
//! async fn main() -> ExchangeResult<()> {
//!     let config = SsiConfig::from_env()?;
//!     let connector = SsiConnector::new(config)?;
//!     let markets = connector.load_markets().await?;
//!     println!("{} instruments", markets.len());
//!     Ok(())
//! }
//! ```

pub mod connector;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod traits;
pub mod transport;

pub use connector::ssi::{
    CandleFetcher, CompanyInfo, Fee, FinancialReport, MarketCatalog, OrderGate, SessionSchedule,
    SsiConfig, SsiConnector, SsiOrderType, TickRuleTable, TokenCache, TradingHoliday,
    TradingSession,
};
pub use error::{ExchangeError, ExchangeResult};
pub use factory::{build_exchange, ExchangeId};
pub use traits::{AccountBalance, Exchange, Instrument, MarketEvent, PricePrecisionMode};
pub use transport::{ApiRequest, HttpMethod, HttpTransport, Transport};
