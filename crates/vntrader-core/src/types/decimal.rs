//! 가격 및 수량의 정밀도 타입.
//!
//! 모든 금액/수량 계산은 부동소수점 오차를 피하기 위해
//! [`rust_decimal::Decimal`]을 사용합니다.

use rust_decimal::Decimal;

/// 가격 타입 (VND 단위).
pub type Price = Decimal;

/// 수량 타입 (주식 수).
pub type Quantity = Decimal;

/// 금액 타입 (가격 x 수량).
pub type Amount = Decimal;
