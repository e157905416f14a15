//! 주문 타입 및 관리.
//!
//! 이 모듈은 주문 관련 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형 (시장가, 지정가)
//! - `OrderStatusType` - 주문 상태
//! - `OrderRequest` - 주문 요청
//! - `Order` - 주문 엔티티

use crate::types::{Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 주문 유형.
///
/// 세션별 구체 유형(ATO, ATC, LO, MTL)으로의 변환은
/// 거래소 커넥터에서 수행합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 주문 - 현재 시장 가격으로 즉시 체결
    Market,
    /// 지정가 주문 - 지정 가격 이상/이하에서 체결
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// 주문 상태 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// 주문 생성됨 (아직 제출되지 않음)
    Pending,
    /// 거래소에 제출됨 (대기 중)
    Open,
    /// 부분 체결됨
    PartiallyFilled,
    /// 전량 체결됨
    Filled,
    /// 사용자 또는 시스템에 의해 취소됨
    Cancelled,
    /// 거래소에서 거부됨
    Rejected,
    /// 유효 기간 만료
    Expired,
}

impl OrderStatusType {
    /// 주문이 최종 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatusType::Filled
                | OrderStatusType::Cancelled
                | OrderStatusType::Rejected
                | OrderStatusType::Expired
        )
    }

    /// 주문이 여전히 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatusType::Pending | OrderStatusType::Open | OrderStatusType::PartiallyFilled
        )
    }
}

/// 새 주문 생성을 위한 주문 요청.
///
/// `symbol`은 원시 문자열로 받아 커넥터가 카탈로그를 통해 해석합니다.
/// "SSI" 같은 종목 코드와 "HOSE:SSI" 형식 모두 허용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// 거래 심볼 (종목 코드 또는 "SEGMENT:TICKER")
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 거래 수량
    pub quantity: Quantity,
    /// 지정가 (지정가 주문에 필수)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// 계좌 번호 (없으면 커넥터 설정의 기본 계좌 사용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_no: Option<String>,
    /// 클라이언트 주문 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    /// 시장가 주문을 생성합니다.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            account_no: None,
            client_order_id: None,
        }
    }

    /// 지정가 주문을 생성합니다.
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Quantity, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            account_no: None,
            client_order_id: None,
        }
    }

    /// 계좌 번호를 설정합니다.
    pub fn with_account(mut self, account_no: impl Into<String>) -> Self {
        self.account_no = Some(account_no.into());
        self
    }

    /// 클라이언트 주문 ID를 설정합니다.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_id.into());
        self
    }
}

/// 거래소에 제출된 주문을 나타내는 주문 엔티티.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 거래소 주문 ID
    pub order_id: String,
    /// 클라이언트 주문 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 원래 수량
    pub quantity: Quantity,
    /// 지정가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// 현재 상태
    pub status: OrderStatusType,
    /// 체결된 수량
    pub filled_quantity: Quantity,
    /// 평균 체결 가격
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_fill_price: Option<Price>,
    /// 계좌 번호
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_no: Option<String>,
    /// 생성/접수 타임스탬프
    pub created_at: DateTime<Utc>,
    /// 거래소 원본 응답
    #[serde(default)]
    pub info: serde_json::Value,
}

impl Order {
    /// 남은 체결 수량을 반환합니다.
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// 주문이 전량 체결되었는지 확인합니다.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatusType::Filled
    }

    /// 주문이 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_builders() {
        let request = OrderRequest::limit("ssi", Side::Buy, dec!(200), dec!(35000))
            .with_account("0901234")
            .with_client_id("OMO_1");

        assert_eq!(request.symbol, "ssi");
        assert_eq!(request.order_type, OrderType::Limit);
        assert_eq!(request.price, Some(dec!(35000)));
        assert_eq!(request.account_no.as_deref(), Some("0901234"));
        assert_eq!(request.client_order_id.as_deref(), Some("OMO_1"));
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn test_order_status_lifecycle() {
        assert!(OrderStatusType::Open.is_active());
        assert!(OrderStatusType::PartiallyFilled.is_active());
        assert!(OrderStatusType::Filled.is_final());
        assert!(OrderStatusType::Rejected.is_final());
        assert!(!OrderStatusType::Pending.is_final());
    }
}
