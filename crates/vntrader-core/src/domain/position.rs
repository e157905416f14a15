//! 포지션 타입.

use crate::types::{Price, Quantity, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 포지션 방향.
///
/// 베트남 현물 시장은 매수 포지션만 가능하지만 형식은 열어 둡니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// 매수 포지션
    Long,
    /// 매도 포지션
    Short,
}

/// 계좌의 보유 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 포지션 방향
    pub side: PositionSide,
    /// 보유 수량
    pub quantity: Quantity,
    /// 매도 가능 수량 (결제 대기 물량 제외)
    pub sellable_quantity: Quantity,
    /// 평균 매입 단가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Price>,
    /// 현재 시장 가격
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Price>,
    /// 거래소 원본 응답
    #[serde(default)]
    pub info: serde_json::Value,
}

impl Position {
    /// 평가 금액을 반환합니다.
    pub fn market_value(&self) -> Option<Decimal> {
        self.market_price.map(|p| p * self.quantity)
    }

    /// 미실현 손익을 반환합니다.
    pub fn unrealized_pnl(&self) -> Option<Decimal> {
        match (self.average_price, self.market_price) {
            (Some(avg), Some(market)) => Some((market - avg) * self.quantity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketSegment;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_pnl() {
        let position = Position {
            symbol: Symbol::new(MarketSegment::Hose, "VNM"),
            side: PositionSide::Long,
            quantity: dec!(500),
            sellable_quantity: dec!(300),
            average_price: Some(dec!(65000)),
            market_price: Some(dec!(67000)),
            info: serde_json::Value::Null,
        };

        assert_eq!(position.market_value(), Some(dec!(33500000)));
        assert_eq!(position.unrealized_pnl(), Some(dec!(1000000)));
    }
}
