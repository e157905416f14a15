//! # VnTrader Core
//!
//! 베트남 주식시장 커넥터의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 커넥터 전반에서 사용되는 기본 타입을 제공합니다:
//! - 심볼 및 시장 보드(segment) 정의
//! - 주문 및 주문 상태 타입
//! - 캔들(OHLCV) 및 시세 데이터 구조체
//! - 포지션 타입
//! - 타임프레임 정의
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
