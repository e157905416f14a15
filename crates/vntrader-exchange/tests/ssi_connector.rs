//! SSI 커넥터 통합 테스트.
//!
//! 스크립트된 전송 계층으로 토큰 발급부터 카탈로그 로드, 주문 제출,
//! 캔들 조회까지 전체 흐름을 검증합니다.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use vntrader_core::{OrderRequest, OrderStatusType, OrderType, Side, Timeframe};
use vntrader_exchange::{
    ApiRequest, Exchange, ExchangeError, ExchangeResult, SsiConfig, SsiConnector, Transport,
};

/// URL 및 쿼리 기반으로 정해진 응답을 돌려주는 목 전송 계층.
struct ScriptedTransport {
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn query_value(request: &ApiRequest, key: &str) -> Option<String> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

const EMPTY_LIST: &str = r#"{"status": 200, "message": "Success", "dataList": []}"#;

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> ExchangeResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        let url = request.url.as_str();

        if url.contains("AccessToken") {
            return Ok(r#"{"responseCode": 0, "token": "test-token"}"#.to_string());
        }

        if url.contains("GetSecuritiesList") {
            let body = match Self::query_value(request, "market").as_deref() {
                Some("HOSE") => {
                    r#"{"status": 200, "dataList": [
                        {"Symbol": "SSI", "StockName": "SSI Securities"},
                        {"Symbol": "VNM", "StockName": "Vinamilk"}
                    ]}"#
                }
                _ => EMPTY_LIST,
            };
            return Ok(body.to_string());
        }

        if url.contains("GetSecuritiesDetails") {
            if Self::query_value(request, "symbol").is_some() {
                // 단일 종목 시세 조회
                return Ok(r#"{"status": 200, "dataList": [{
                    "Symbol": "SSI",
                    "LastPrice": "35200",
                    "RefPrice": "35000",
                    "Ceiling": "37450",
                    "Floor": "32550",
                    "OpenPrice": "35100",
                    "HighPrice": "35400",
                    "LowPrice": "34900",
                    "TotalVolume": "1250000",
                    "Time": "15/03/2024 10:00:00"
                }]}"#
                    .to_string());
            }
            let body = match Self::query_value(request, "market").as_deref() {
                Some("HOSE") => {
                    r#"{"status": 200, "dataList": [
                        {"Symbol": "SSI", "TickIncrement1": "50", "LotSize": 100, "RefPrice": "35000"},
                        {"Symbol": "VNM", "TickIncrement1": "100", "LotSize": 100, "RefPrice": "65000"}
                    ]}"#
                }
                _ => EMPTY_LIST,
            };
            return Ok(body.to_string());
        }

        if url.contains("GetIntradayOHLC") {
            return Ok(r#"{"status": 200, "dataList": [
                {"TradingDate": "15/03/2024", "Time": "09:15:00",
                 "Open": "35000", "High": "35100", "Low": "34900",
                 "Close": "35050", "Volume": "120000"},
                {"TradingDate": "15/03/2024", "Time": "09:20:00",
                 "Open": "35050", "High": "35200", "Low": "35000",
                 "Close": "35200", "Volume": "98000"}
            ]}"#
            .to_string());
        }

        if url.contains("NewOrder") {
            return Ok(r#"{"status": 200, "data": {
                "orderId": "12345678",
                "requestId": "OMO_TEST_1",
                "symbol": "SSI",
                "side": "BUY",
                "orderType": "LO",
                "price": 35000,
                "quantity": 200,
                "filledQty": 0,
                "avgPrice": 0,
                "status": "NEW",
                "createTime": "15/03/2024 10:00:05",
                "accountNo": "0901234"
            }}"#
            .to_string());
        }

        if url.contains("CancelOrder") {
            return Ok(r#"{"status": 200, "data": {
                "orderId": "12345678",
                "symbol": "SSI",
                "side": "BUY",
                "orderType": "LO",
                "price": 35000,
                "quantity": 200,
                "filledQty": 0,
                "status": "CANCELLED",
                "createTime": "15/03/2024 10:00:05",
                "accountNo": "0901234"
            }}"#
            .to_string());
        }

        if url.contains("GetOrderHistory") {
            return Ok(r#"{"status": 200, "dataList": [
                {"orderId": "1", "symbol": "SSI", "side": "BUY", "orderType": "LO",
                 "price": 35000, "quantity": 200, "filledQty": 0, "status": "NEW",
                 "createTime": "15/03/2024 09:20:00", "accountNo": "0901234"},
                {"orderId": "2", "symbol": "VNM", "side": "SELL", "orderType": "LO",
                 "price": 65000, "quantity": 100, "filledQty": 100, "avgPrice": 65000,
                 "status": "FILLED", "createTime": "15/03/2024 09:30:00", "accountNo": "0901234"},
                {"orderId": "3", "symbol": "UNKNOWN", "side": "BUY", "orderType": "LO",
                 "price": 1000, "quantity": 100, "status": "NEW",
                 "createTime": "15/03/2024 09:40:00", "accountNo": "0901234"}
            ]}"#
            .to_string());
        }

        if url.contains("GetAccountBalance") {
            return Ok(r#"{"status": 200, "data": {
                "accountNo": "0901234",
                "totalCash": 500000000,
                "availableCash": 320000000,
                "buyingPower": 640000000
            }}"#
            .to_string());
        }

        if url.contains("GetStockPosition") {
            return Ok(r#"{"status": 200, "dataList": [
                {"symbol": "SSI", "quantity": 500, "availableQty": 300,
                 "avgPrice": 34000, "marketPrice": 35200},
                {"symbol": "UNKNOWN", "quantity": 100, "availableQty": 100,
                 "avgPrice": 1000, "marketPrice": 1000}
            ]}"#
            .to_string());
        }

        if url.contains("GetDailyStockPrice") {
            return Ok(r#"{"status": 200, "dataList": [
                {"Symbol": "SSI", "TradingDate": "15/03/2024",
                 "OpenPrice": "35100", "HighestPrice": "35400", "LowestPrice": "34900",
                 "ClosePrice": "35200", "PriorClosePrice": "35000",
                 "TotalVolume": "1250000", "TotalValue": "43750000000"},
                {"Symbol": "UNKNOWN", "TradingDate": "15/03/2024",
                 "OpenPrice": "1000", "HighestPrice": "1000", "LowestPrice": "1000",
                 "ClosePrice": "1000", "PriorClosePrice": "1000",
                 "TotalVolume": "100", "TotalValue": "100000"},
                {"Symbol": "VNM", "TradingDate": "15/03/2024",
                 "OpenPrice": "65000", "HighestPrice": "65500", "LowestPrice": "64800",
                 "ClosePrice": "65200", "PriorClosePrice": "65000",
                 "TotalVolume": "830000", "TotalValue": "54000000000"}
            ]}"#
            .to_string());
        }

        if url.contains("GetCompanyInfo") {
            return Ok(r#"{"status": 200, "data": {
                "symbol": "SSI",
                "companyName": "CTCP Chung khoan SSI",
                "companyNameEn": "SSI Securities Corporation",
                "exchange": "HOSE",
                "sector": "Financials",
                "industry": "Securities",
                "website": "www.ssi.com.vn",
                "listingDate": "15/12/2006",
                "charterCapital": "15011000000000",
                "outstandingShares": "1501100000",
                "issuedShares": "1501100000",
                "foreignOwnership": "0.45",
                "foreignOwnershipMax": "1.0",
                "roomAvailable": "825605000"
            }}"#
            .to_string());
        }

        if url.contains("GetFinancialReport") {
            return Ok(r#"{"status": 200, "data": {
                "symbol": "SSI",
                "reportType": "INCOME_STATEMENT",
                "period": "Q1",
                "year": 2024,
                "quarter": 1,
                "data": {"netRevenue": "1852000000000", "netProfit": "599000000000"},
                "currency": "VND",
                "unit": "VND"
            }}"#
            .to_string());
        }

        Err(ExchangeError::Broker {
            message: format!("unexpected request: {}", url),
        })
    }
}

fn test_connector() -> (SsiConnector, Arc<ScriptedTransport>) {
    vntrader_core::logging::init_logging_from_env();
    let config = SsiConfig::new("id", "secret").with_account("0901234");
    let transport = ScriptedTransport::new();
    let connector = SsiConnector::with_transport(config, transport.clone());
    (connector, transport)
}

/// 2024-03-15 금요일 오전 장중 (ICT)
fn friday_morning() -> DateTime<Utc> {
    Ho_Chi_Minh
        .with_ymd_and_hms(2024, 3, 15, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_load_markets_and_resolve() {
    let (connector, _) = test_connector();

    let markets = connector.load_markets().await.unwrap();
    assert_eq!(markets.len(), 2);

    let instrument = connector.resolve_market("SSI").await.unwrap();
    assert_eq!(instrument.raw_id, "HOSE:SSI");
    assert_eq!(instrument.price_tick, dec!(50));
    assert_eq!(instrument.lot_size, 100);
    assert_eq!(instrument.ref_price, Some(dec!(35000)));

    let qualified = connector.resolve_market("HOSE:SSI/VND").await.unwrap();
    assert_eq!(qualified.raw_id, instrument.raw_id);

    let err = connector.resolve_market("NOPE").await.unwrap_err();
    assert!(matches!(err, ExchangeError::SymbolNotFound(_)));
}

#[tokio::test]
async fn test_submit_and_cancel_order() {
    let (connector, transport) = test_connector();

    let request = OrderRequest::limit("SSI", Side::Buy, dec!(200), dec!(35000))
        .with_client_id("OMO_TEST_1");
    let order = connector
        .submit_order(&request, friday_morning())
        .await
        .unwrap();

    assert_eq!(order.order_id, "12345678");
    assert_eq!(order.client_order_id.as_deref(), Some("OMO_TEST_1"));
    assert_eq!(order.symbol.raw_id(), "HOSE:SSI");
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.order_type, OrderType::Limit);
    assert_eq!(order.status, OrderStatusType::Open);
    assert_eq!(order.quantity, dec!(200));
    assert_eq!(order.price, Some(dec!(35000)));

    // 제출된 주문 바디 확인
    let requests = transport.requests();
    let new_order = requests
        .iter()
        .find(|r| r.url.contains("NewOrder"))
        .unwrap();
    let body = new_order.body.as_ref().unwrap();
    assert_eq!(body["symbol"], "SSI");
    assert_eq!(body["orderType"], "LO");
    assert_eq!(body["side"], "BUY");
    assert_eq!(body["quantity"], 200);
    assert_eq!(body["accountNo"], "0901234");
    assert_eq!(body["requestId"], "OMO_TEST_1");
    assert_eq!(new_order.bearer.as_deref(), Some("test-token"));

    let cancelled = connector
        .cancel_order("12345678", "SSI", None)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
}

#[tokio::test]
async fn test_order_rejected_on_weekend_without_network() {
    let (connector, transport) = test_connector();
    connector.load_markets().await.unwrap();
    let before = transport.requests().len();

    // 2024-03-16 토요일
    let saturday = Ho_Chi_Minh
        .with_ymd_and_hms(2024, 3, 16, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let request = OrderRequest::limit("SSI", Side::Buy, dec!(200), dec!(35000));
    let err = connector.submit_order(&request, saturday).await.unwrap_err();

    assert!(matches!(err, ExchangeError::MarketClosed(_)));
    // 게이트에서 거부되면 주문 요청이 나가지 않음
    assert_eq!(transport.requests().len(), before);
}

#[tokio::test]
async fn test_order_rejected_out_of_band() {
    let (connector, _) = test_connector();

    // 기준가 35000의 +7% 밴드(37450)를 벗어나는 지정가
    let request = OrderRequest::limit("SSI", Side::Buy, dec!(200), dec!(38000));
    let err = connector
        .submit_order(&request, friday_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::PriceOutOfBand(_)));

    // 로트 단위가 맞지 않는 수량
    let request = OrderRequest::limit("SSI", Side::Buy, dec!(150), dec!(35000));
    let err = connector
        .submit_order(&request, friday_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidQuantity(_)));
}

#[tokio::test]
async fn test_get_ticker() {
    let (connector, _) = test_connector();

    let ticker = connector.get_ticker("SSI").await.unwrap();
    assert_eq!(ticker.last, dec!(35200));
    assert_eq!(ticker.ref_price, Some(dec!(35000)));
    assert_eq!(ticker.ceiling, Some(dec!(37450)));
    assert_eq!(ticker.floor, Some(dec!(32550)));
    assert_eq!(ticker.volume, Some(dec!(1250000)));
}

#[tokio::test]
async fn test_get_candles() {
    let (connector, transport) = test_connector();

    // 09:00 ~ 10:00 ICT
    let since = Ho_Chi_Minh
        .with_ymd_and_hms(2024, 3, 15, 9, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let until = friday_morning();

    let candles = connector
        .get_candles("SSI", Timeframe::M5, Some(since), Some(until), Some(10))
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert!(candles[0].open_time < candles[1].open_time);
    assert_eq!(candles[0].open, dec!(35000));
    assert_eq!(candles[1].close, dec!(35200));

    let requests = transport.requests();
    let ohlc = requests
        .iter()
        .find(|r| r.url.contains("GetIntradayOHLC"))
        .unwrap();
    assert!(ohlc.query.contains(&("Symbol".to_string(), "SSI".to_string())));
    assert!(ohlc
        .query
        .contains(&("resolution".to_string(), "5".to_string())));
}

#[tokio::test]
async fn test_order_history_drops_unknown_symbols() {
    let (connector, _) = test_connector();

    let orders = connector.get_orders(None, None, None).await.unwrap();
    // UNKNOWN 종목 행은 버려짐
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].status, OrderStatusType::Open);
    assert_eq!(orders[1].status, OrderStatusType::Filled);

    let open = connector.get_open_orders(None).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order_id, "1");
}

#[tokio::test]
async fn test_balance_and_positions() {
    let (connector, _) = test_connector();

    let balance = connector.get_balance(None).await.unwrap();
    assert_eq!(balance.account_no, "0901234");
    assert_eq!(balance.available_cash, dec!(320000000));
    assert_eq!(balance.total_cash, dec!(500000000));
    assert_eq!(balance.purchasing_power, Some(dec!(640000000)));

    let positions = connector.get_positions(None).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol.raw_id(), "HOSE:SSI");
    assert_eq!(positions[0].quantity, dec!(500));
    assert_eq!(positions[0].sellable_quantity, dec!(300));
}

#[tokio::test]
async fn test_get_tickers_batch() {
    let (connector, transport) = test_connector();

    let tickers = connector.get_tickers(&["SSI", "VNM"]).await.unwrap();
    // 카탈로그에 없는 UNKNOWN 행은 버려짐
    assert_eq!(tickers.len(), 2);
    assert_eq!(tickers[0].symbol.raw_id(), "HOSE:SSI");
    assert_eq!(tickers[0].last, dec!(35200));
    assert_eq!(tickers[0].ref_price, Some(dec!(35000)));
    assert_eq!(tickers[0].high, Some(dec!(35400)));
    assert_eq!(tickers[0].low, Some(dec!(34900)));
    assert_eq!(tickers[1].symbol.raw_id(), "HOSE:VNM");
    assert_eq!(tickers[1].last, dec!(65200));

    // 종목 코드는 쉼표로 이어 한 번에 요청
    let requests = transport.requests();
    let daily = requests
        .iter()
        .find(|r| r.url.contains("GetDailyStockPrice"))
        .unwrap();
    assert!(daily
        .query
        .contains(&("symbols".to_string(), "SSI,VNM".to_string())));

    assert!(connector.get_tickers(&[]).await.unwrap().is_empty());

    let err = connector.get_tickers(&["NOPE"]).await.unwrap_err();
    assert!(matches!(err, ExchangeError::SymbolNotFound(_)));
}

#[tokio::test]
async fn test_company_info() {
    let (connector, transport) = test_connector();

    let info = connector.fetch_company_info("SSI").await.unwrap();
    assert_eq!(info.symbol, "SSI");
    assert_eq!(info.exchange, "HOSE");
    assert_eq!(info.company_name_en, "SSI Securities Corporation");
    assert_eq!(info.outstanding_shares, dec!(1501100000));
    assert_eq!(info.room_available, dec!(825605000));

    let requests = transport.requests();
    let req = requests
        .iter()
        .find(|r| r.url.contains("GetCompanyInfo"))
        .unwrap();
    assert!(req
        .query
        .contains(&("symbol".to_string(), "SSI".to_string())));
    assert_eq!(req.bearer.as_deref(), Some("test-token"));
}

#[tokio::test]
async fn test_financial_report() {
    let (connector, transport) = test_connector();

    let report = connector
        .fetch_financial_report("SSI", "INCOME_STATEMENT", "Q1", 2024)
        .await
        .unwrap();
    assert_eq!(report.symbol, "SSI");
    assert_eq!(report.report_type, "INCOME_STATEMENT");
    assert_eq!(report.period, "Q1");
    assert_eq!(report.year, 2024);
    assert_eq!(report.quarter, 1);
    assert_eq!(report.currency, "VND");
    assert_eq!(report.data["netProfit"], "599000000000");

    let requests = transport.requests();
    let req = requests
        .iter()
        .find(|r| r.url.contains("GetFinancialReport"))
        .unwrap();
    assert!(req
        .query
        .contains(&("reportType".to_string(), "INCOME_STATEMENT".to_string())));
    assert!(req
        .query
        .contains(&("period".to_string(), "Q1".to_string())));
    assert!(req
        .query
        .contains(&("year".to_string(), "2024".to_string())));
}

#[tokio::test]
async fn test_missing_account_number() {
    let config = SsiConfig::new("id", "secret");
    let transport = ScriptedTransport::new();
    let connector = SsiConnector::with_transport(config, transport);

    let err = connector.get_balance(None).await.unwrap_err();
    assert!(matches!(err, ExchangeError::CredentialsMissing(_)));
}
