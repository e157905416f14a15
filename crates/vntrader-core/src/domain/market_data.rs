//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `Candle` - OHLCV 캔들스틱 데이터
//! - `Ticker` - 종목 시세 및 상세 정보
//! - `OrderBook` - 호가창 데이터

use crate::types::{Price, Quantity, Symbol, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량 (주식 수)
    pub volume: Quantity,
    /// 거래대금 (VND)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<Decimal>,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            volume,
            quote_volume: None,
        }
    }

    /// 캔들 시작 시각의 밀리초 타임스탬프를 반환합니다.
    pub fn open_time_ms(&self) -> i64 {
        self.open_time.timestamp_millis()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// 종목 시세 및 상세 정보.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 최근 체결가
    pub last: Price,
    /// 기준가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_price: Option<Price>,
    /// 상한가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<Price>,
    /// 하한가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<Price>,
    /// 당일 시가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Price>,
    /// 당일 고가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Price>,
    /// 당일 저가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Price>,
    /// 당일 거래량
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Quantity>,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

/// 호가창 가격 레벨.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// 가격
    pub price: Price,
    /// 수량
    pub quantity: Quantity,
}

/// 호가창 데이터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 매수 호가 (높은 가격 순)
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 (낮은 가격 순)
    pub asks: Vec<OrderBookLevel>,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<&OrderBookLevel> {
        self.asks.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketSegment;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_candle() -> Candle {
        Candle::new(
            Symbol::new(MarketSegment::Hose, "SSI"),
            Timeframe::D1,
            Utc.with_ymd_and_hms(2024, 3, 15, 2, 0, 0).unwrap(),
            dec!(35000),
            dec!(35600),
            dec!(34800),
            dec!(35400),
            dec!(1_250_000),
        )
    }

    #[test]
    fn test_candle_helpers() {
        let candle = sample_candle();
        assert_eq!(candle.range(), dec!(800));
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn test_candle_open_time_ms() {
        let candle = sample_candle();
        assert_eq!(candle.open_time_ms(), 1_710_468_000_000);
    }
}
