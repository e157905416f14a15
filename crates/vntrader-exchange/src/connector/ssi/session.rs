//! 거래 세션 시계 및 주문 게이트.
//!
//! 베트남 시장의 세션 일정(ICT 기준)과 보드별 호가 단위 규칙을
//! 고정 테이블로 들고, 주문 제출 전에 세션/주문유형/수량/가격을
//! 로컬에서 검증합니다. 네트워크 호출은 없습니다.

use crate::connector::ssi::SsiOrderType;
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::Instrument;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Asia::Ho_Chi_Minh;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vntrader_core::{MarketSegment, OrderType, Price, Quantity, Side};

/// 거래 세션.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingSession {
    /// 개장 동시호가 (09:00-09:15)
    PreOpen,
    /// 오전 연속 거래 (09:15-11:30)
    Morning,
    /// 점심 휴장 (11:30-13:00)
    Lunch,
    /// 오후 연속 거래 (13:00-14:30)
    Afternoon,
    /// 폐장 동시호가 (14:30-14:45)
    Closing,
    /// 시간외 거래 (14:45-15:00)
    AfterHours,
    /// 휴장
    Closed,
}

impl TradingSession {
    /// 이 세션에서 허용되는 SSI 주문 유형을 반환합니다.
    pub fn allowed_order_types(&self) -> &'static [SsiOrderType] {
        match self {
            TradingSession::PreOpen => &[SsiOrderType::Ato, SsiOrderType::Lo],
            TradingSession::Morning | TradingSession::Afternoon => {
                &[SsiOrderType::Lo, SsiOrderType::Mtl]
            }
            TradingSession::Closing => &[SsiOrderType::Atc, SsiOrderType::Lo],
            TradingSession::AfterHours => &[SsiOrderType::Lo],
            TradingSession::Lunch | TradingSession::Closed => &[],
        }
    }
}

impl std::fmt::Display for TradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TradingSession::PreOpen => "pre_open",
            TradingSession::Morning => "morning",
            TradingSession::Lunch => "lunch",
            TradingSession::Afternoon => "afternoon",
            TradingSession::Closing => "closing",
            TradingSession::AfterHours => "after_hours",
            TradingSession::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// 세션 구간. 자정 기준 분 단위 `[start, end)`.
#[derive(Debug, Clone, Copy)]
struct SessionWindow {
    session: TradingSession,
    start_min: u32,
    end_min: u32,
}

/// 불변 세션 일정.
#[derive(Debug, Clone)]
pub struct SessionSchedule {
    windows: Vec<SessionWindow>,
}

impl SessionSchedule {
    /// 베트남 시장 표준 일정 (ICT).
    pub fn vietnam() -> Self {
        let windows = vec![
            SessionWindow { session: TradingSession::PreOpen, start_min: 9 * 60, end_min: 9 * 60 + 15 },
            SessionWindow { session: TradingSession::Morning, start_min: 9 * 60 + 15, end_min: 11 * 60 + 30 },
            SessionWindow { session: TradingSession::Lunch, start_min: 11 * 60 + 30, end_min: 13 * 60 },
            SessionWindow { session: TradingSession::Afternoon, start_min: 13 * 60, end_min: 14 * 60 + 30 },
            SessionWindow { session: TradingSession::Closing, start_min: 14 * 60 + 30, end_min: 14 * 60 + 45 },
            SessionWindow { session: TradingSession::AfterHours, start_min: 14 * 60 + 45, end_min: 15 * 60 },
        ];
        Self { windows }
    }

    /// 주어진 시각의 세션을 반환합니다. 주말과 일정 밖 시각은 휴장입니다.
    pub fn session_at(&self, now: DateTime<Utc>) -> TradingSession {
        let local = now.with_timezone(&Ho_Chi_Minh);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return TradingSession::Closed;
        }

        let minute = local.hour() * 60 + local.minute();
        for window in &self.windows {
            if minute >= window.start_min && minute < window.end_min {
                return window.session;
            }
        }
        TradingSession::Closed
    }

    /// 주문 제출이 가능한 시각인지 확인합니다.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        !matches!(
            self.session_at(now),
            TradingSession::Closed | TradingSession::Lunch
        )
    }
}

impl Default for SessionSchedule {
    fn default() -> Self {
        Self::vietnam()
    }
}

/// 가격 구간별 호가 단위 규칙. `[min, max)` 구간에 적용됩니다.
#[derive(Debug, Clone, Copy)]
pub struct PriceTickRule {
    /// 적용 보드
    pub segment: MarketSegment,
    /// 구간 하한 (포함)
    pub min_price: Decimal,
    /// 구간 상한 (미포함)
    pub max_price: Decimal,
    /// 호가 단위
    pub tick: Decimal,
}

/// 순서 있는 호가 단위 규칙 테이블. 첫 매칭 규칙이 적용됩니다.
#[derive(Debug, Clone)]
pub struct TickRuleTable {
    rules: Vec<PriceTickRule>,
    default_tick: Decimal,
}

impl TickRuleTable {
    /// 베트남 시장 표준 규칙.
    pub fn vietnam() -> Self {
        let max = dec!(999_999_999);
        let rules = vec![
            PriceTickRule { segment: MarketSegment::Hose, min_price: Decimal::ZERO, max_price: dec!(10000), tick: dec!(10) },
            PriceTickRule { segment: MarketSegment::Hose, min_price: dec!(10000), max_price: dec!(50000), tick: dec!(50) },
            PriceTickRule { segment: MarketSegment::Hose, min_price: dec!(50000), max_price: max, tick: dec!(100) },
            PriceTickRule { segment: MarketSegment::Hnx, min_price: Decimal::ZERO, max_price: max, tick: dec!(100) },
            PriceTickRule { segment: MarketSegment::Upcom, min_price: Decimal::ZERO, max_price: max, tick: dec!(100) },
        ];
        Self {
            rules,
            default_tick: dec!(100),
        }
    }

    /// 보드와 가격에 해당하는 호가 단위를 반환합니다.
    pub fn tick_for(&self, segment: MarketSegment, price: Price) -> Decimal {
        for rule in &self.rules {
            if rule.segment == segment && price >= rule.min_price && price < rule.max_price {
                return rule.tick;
            }
        }
        self.default_tick
    }

    /// 가격을 가장 가까운 호가 단위의 배수로 맞춥니다.
    pub fn round_to_tick(&self, segment: MarketSegment, price: Price) -> Price {
        let tick = self.tick_for(segment, price);
        if tick.is_zero() {
            return price;
        }
        (price / tick).round() * tick
    }
}

impl Default for TickRuleTable {
    fn default() -> Self {
        Self::vietnam()
    }
}

/// 주문 제출 전 로컬 검증 게이트.
///
/// 검증 순서: 세션 개장 여부 → 세션별 주문 유형 → 로트 수량 →
/// 지정가의 가격 제한폭.
#[derive(Debug, Clone)]
pub struct OrderGate {
    schedule: SessionSchedule,
    ticks: TickRuleTable,
    /// 일일 가격 제한폭 (기준가 대비 ±비율)
    limit_pct: Decimal,
    default_lot_size: u32,
}

impl OrderGate {
    /// 베트남 시장 기본값(±7%, 로트 100)으로 게이트를 생성합니다.
    pub fn new(schedule: SessionSchedule, ticks: TickRuleTable) -> Self {
        Self {
            schedule,
            ticks,
            limit_pct: dec!(0.07),
            default_lot_size: 100,
        }
    }

    /// 세션 일정을 반환합니다.
    pub fn schedule(&self) -> &SessionSchedule {
        &self.schedule
    }

    /// 주문을 검증하고 세션에 맞는 SSI 주문 유형을 반환합니다.
    pub fn check(
        &self,
        instrument: &Instrument,
        order_type: OrderType,
        side: Side,
        quantity: Quantity,
        price: Option<Price>,
        now: DateTime<Utc>,
    ) -> ExchangeResult<SsiOrderType> {
        let _ = side;
        let session = self.schedule.session_at(now);
        if !self.schedule.is_open_at(now) {
            return Err(ExchangeError::MarketClosed(format!(
                "session is {}",
                session
            )));
        }

        let ssi_type = match order_type {
            OrderType::Limit => SsiOrderType::Lo,
            OrderType::Market => match session {
                TradingSession::PreOpen => SsiOrderType::Ato,
                TradingSession::Closing => SsiOrderType::Atc,
                _ => SsiOrderType::Mtl,
            },
        };
        if !session.allowed_order_types().contains(&ssi_type) {
            return Err(ExchangeError::MarketClosed(format!(
                "order type {} not allowed in {} session",
                ssi_type, session
            )));
        }

        self.check_quantity(instrument, quantity)?;

        if ssi_type.requires_price() {
            let price = price.ok_or_else(|| {
                ExchangeError::PriceOutOfBand("price required for limit orders".to_string())
            })?;
            self.check_price_band(instrument, price)?;
        }

        Ok(ssi_type)
    }

    /// 수량이 로트 크기의 양의 정수 배수인지 검증합니다.
    pub(crate) fn check_quantity(
        &self,
        instrument: &Instrument,
        quantity: Quantity,
    ) -> ExchangeResult<()> {
        let lot = if instrument.lot_size > 0 {
            Decimal::from(instrument.lot_size)
        } else {
            Decimal::from(self.default_lot_size)
        };

        if quantity <= Decimal::ZERO || !quantity.fract().is_zero() {
            return Err(ExchangeError::InvalidQuantity(format!(
                "quantity must be a positive whole number: {}",
                quantity
            )));
        }
        if !(quantity % lot).is_zero() {
            return Err(ExchangeError::InvalidQuantity(format!(
                "quantity {} must be a multiple of lot size {}",
                quantity, lot
            )));
        }
        Ok(())
    }

    /// 지정가가 기준가 대비 제한폭 안에 있는지 검증합니다.
    ///
    /// 기준가가 없으면 제한폭 검사를 건너뜁니다.
    pub(crate) fn check_price_band(
        &self,
        instrument: &Instrument,
        price: Price,
    ) -> ExchangeResult<()> {
        if price <= Decimal::ZERO {
            return Err(ExchangeError::PriceOutOfBand(format!(
                "price must be positive: {}",
                price
            )));
        }

        let Some(ref_price) = instrument.ref_price else {
            return Ok(());
        };

        let segment = instrument.symbol.segment;
        let floor = self
            .ticks
            .round_to_tick(segment, ref_price * (Decimal::ONE - self.limit_pct));
        let ceiling = self
            .ticks
            .round_to_tick(segment, ref_price * (Decimal::ONE + self.limit_pct));

        if price < floor || price > ceiling {
            return Err(ExchangeError::PriceOutOfBand(format!(
                "price {} outside [{}, {}] for ref {}",
                price, floor, ceiling, ref_price
            )));
        }
        Ok(())
    }
}

impl Default for OrderGate {
    fn default() -> Self {
        Self::new(SessionSchedule::vietnam(), TickRuleTable::vietnam())
    }
}
