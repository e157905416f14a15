//! 코어 도메인 타입 통합 테스트.

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use vntrader_core::{
    Candle, MarketSegment, Order, OrderRequest, OrderStatusType, OrderType, Position,
    PositionSide, Side, Symbol, Timeframe,
};

#[test]
fn test_symbol_identity_across_boards() {
    // 같은 종목 코드가 두 보드에 상장되어도 서로 다른 심볼
    let hose = Symbol::new(MarketSegment::Hose, "ssi");
    let hnx = Symbol::new(MarketSegment::Hnx, "SSI");

    assert_ne!(hose, hnx);
    assert_eq!(hose.raw_id(), "HOSE:SSI");
    assert_eq!(hnx.canonical(), "HNX:SSI/VND");
    assert_eq!(Symbol::from_raw_id(&hose.canonical()), Some(hose));
}

#[test]
fn test_order_lifecycle() {
    let request = OrderRequest::limit("HOSE:SSI", Side::Buy, dec!(200), dec!(35000))
        .with_account("0901234");
    assert_eq!(request.order_type, OrderType::Limit);

    let mut order = Order {
        order_id: "1".to_string(),
        client_order_id: None,
        symbol: Symbol::new(MarketSegment::Hose, "SSI"),
        side: request.side,
        order_type: request.order_type,
        quantity: request.quantity,
        price: request.price,
        status: OrderStatusType::Open,
        filled_quantity: dec!(0),
        average_fill_price: None,
        account_no: request.account_no.clone(),
        created_at: Utc::now(),
        info: serde_json::Value::Null,
    };

    assert!(order.is_active());
    assert_eq!(order.remaining_quantity(), dec!(200));

    order.status = OrderStatusType::PartiallyFilled;
    order.filled_quantity = dec!(100);
    assert!(order.is_active());
    assert_eq!(order.remaining_quantity(), dec!(100));

    order.status = OrderStatusType::Filled;
    order.filled_quantity = dec!(200);
    assert!(order.is_filled());
    assert!(order.status.is_final());
    assert_eq!(order.remaining_quantity(), dec!(0));
}

#[test]
fn test_candle_timeframe_window() {
    let open_time = Utc.with_ymd_and_hms(2024, 3, 15, 2, 15, 0).unwrap();
    let candle = Candle::new(
        Symbol::new(MarketSegment::Hose, "VNM"),
        Timeframe::M5,
        open_time,
        dec!(65000),
        dec!(65500),
        dec!(64800),
        dec!(65300),
        dec!(98000),
    );

    assert_eq!(candle.open_time_ms(), 1_710_468_900_000);
    assert_eq!(candle.timeframe.as_millis(), 300_000);
    assert!(candle.is_bullish());
}

#[test]
fn test_position_valuation() {
    let position = Position {
        symbol: Symbol::new(MarketSegment::Upcom, "BSR"),
        side: PositionSide::Long,
        quantity: dec!(1000),
        sellable_quantity: dec!(700),
        average_price: Some(dec!(18500)),
        market_price: Some(dec!(19200)),
        info: serde_json::Value::Null,
    };

    assert_eq!(position.market_value(), Some(dec!(19200000)));
    assert_eq!(position.unrealized_pnl(), Some(dec!(700000)));
    assert!(position.sellable_quantity < position.quantity);
}
