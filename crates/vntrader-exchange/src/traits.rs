//! 통합 거래소 인터페이스.

use crate::error::{ExchangeError, ExchangeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use vntrader_core::{
    Candle, Order, OrderBook, OrderRequest, Position, Price, Quantity, Symbol, Ticker, Timeframe,
};

/// 가격 정밀도 표현 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePrecisionMode {
    /// 최소 호가 단위 (틱 크기)
    TickSize,
    /// 소수점 자릿수
    DecimalPlaces,
}

/// 거래 가능한 종목의 메타데이터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// "SEGMENT:TICKER" 형식 내부 식별자
    pub raw_id: String,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 최소 호가 단위 (0이면 틱 규칙 미정)
    pub price_tick: Decimal,
    /// 가격 정밀도 표현 방식
    pub precision_mode: PricePrecisionMode,
    /// 최소 주문 단위 (로트 크기)
    pub lot_size: u32,
    /// 기준가 (전일 종가 기반)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_price: Option<Price>,
    /// 거래소 원본 메타데이터
    #[serde(default)]
    pub info: Value,
}

impl Instrument {
    /// 종목 코드를 반환합니다.
    pub fn ticker(&self) -> &str {
        &self.symbol.ticker
    }
}

/// 계좌 잔고.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    /// 계좌 번호
    pub account_no: String,
    /// 주문 가능 현금
    pub available_cash: Decimal,
    /// 총 현금
    pub total_cash: Decimal,
    /// 매수 한도
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchasing_power: Option<Decimal>,
    /// 거래소 원본 응답
    #[serde(default)]
    pub info: Value,
}

/// 실시간 스트림 이벤트.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// 시세 갱신
    Ticker(Ticker),
    /// 캔들 갱신
    Candle(Candle),
    /// 호가창 갱신
    OrderBook(OrderBook),
}

/// 통합 거래소 인터페이스.
///
/// REST 기반 커넥터가 구현해야 하는 작업을 정의합니다. 실시간
/// 스트림(`watch_*`)은 기본적으로 미지원이며 커넥터가 선택적으로
/// 구현합니다.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// 거래소 이름.
    fn name(&self) -> &str;

    /// 전체 종목 메타데이터를 로드합니다.
    async fn load_markets(&self) -> ExchangeResult<Vec<Instrument>>;

    /// 심볼 문자열을 종목 메타데이터로 해석합니다.
    ///
    /// "SSI" 같은 종목 코드와 "HOSE:SSI", "HOSE:SSI/VND" 형식을 모두
    /// 허용합니다.
    async fn resolve_market(&self, symbol: &str) -> ExchangeResult<Instrument>;

    /// 종목 시세 및 상세 정보를 조회합니다.
    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    /// 캔들 데이터를 조회합니다.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> ExchangeResult<Vec<Candle>>;

    /// 호가창을 조회합니다.
    async fn get_order_book(&self, symbol: &str) -> ExchangeResult<OrderBook> {
        let _ = symbol;
        Err(ExchangeError::NotImplemented(
            "get_order_book".to_string(),
        ))
    }

    /// 주문을 제출합니다.
    async fn place_order(&self, request: &OrderRequest) -> ExchangeResult<Order>;

    /// 주문을 취소합니다.
    async fn cancel_order(
        &self,
        order_id: &str,
        symbol: &str,
        account_no: Option<&str>,
    ) -> ExchangeResult<Order>;

    /// 주문의 가격/수량을 정정합니다.
    async fn modify_order(
        &self,
        order_id: &str,
        symbol: &str,
        quantity: Quantity,
        price: Price,
        account_no: Option<&str>,
    ) -> ExchangeResult<Order>;

    /// 단일 주문을 조회합니다.
    async fn get_order(&self, order_id: &str, account_no: Option<&str>) -> ExchangeResult<Order>;

    /// 주문 내역을 조회합니다.
    async fn get_orders(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        account_no: Option<&str>,
    ) -> ExchangeResult<Vec<Order>>;

    /// 미체결 주문을 조회합니다.
    async fn get_open_orders(&self, account_no: Option<&str>) -> ExchangeResult<Vec<Order>>;

    /// 계좌 잔고를 조회합니다.
    async fn get_balance(&self, account_no: Option<&str>) -> ExchangeResult<AccountBalance>;

    /// 보유 포지션을 조회합니다.
    async fn get_positions(&self, account_no: Option<&str>) -> ExchangeResult<Vec<Position>>;

    /// 실시간 시세 스트림을 구독합니다.
    async fn watch_ticker(&self, symbol: &str) -> ExchangeResult<mpsc::Receiver<MarketEvent>> {
        let _ = symbol;
        Err(ExchangeError::NotImplemented("watch_ticker".to_string()))
    }

    /// 실시간 캔들 스트림을 구독합니다.
    async fn watch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> ExchangeResult<mpsc::Receiver<MarketEvent>> {
        let _ = (symbol, timeframe);
        Err(ExchangeError::NotImplemented("watch_candles".to_string()))
    }

    /// 실시간 호가창 스트림을 구독합니다.
    async fn watch_order_book(&self, symbol: &str) -> ExchangeResult<mpsc::Receiver<MarketEvent>> {
        let _ = symbol;
        Err(ExchangeError::NotImplemented(
            "watch_order_book".to_string(),
        ))
    }
}

impl std::fmt::Debug for dyn Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange").field("name", &self.name()).finish()
    }
}
