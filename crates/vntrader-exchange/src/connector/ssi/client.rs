//! SSI FastConnect 커넥터 본체.
//!
//! 시세 API와 주문 API를 묶어 [`Exchange`] 인터페이스를 구현합니다.
//! 주문은 제출 전에 [`OrderGate`]로 세션/수량/가격을 로컬 검증합니다.

use crate::connector::ssi::auth::TokenCache;
use crate::connector::ssi::candles::CandleFetcher;
use crate::connector::ssi::catalog::MarketCatalog;
use crate::connector::ssi::config::SsiConfig;
use crate::connector::ssi::session::{OrderGate, SessionSchedule, TickRuleTable, TradingSession};
use crate::connector::ssi::{endpoint, SsiOrderType};
use crate::envelope::{
    coerce_decimal, coerce_string, decode_object, decode_rows, ensure_success, fold_keys,
    format_ict_date, parse_ict_datetime, payload,
};
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{AccountBalance, Exchange, Instrument};
use crate::transport::{ApiRequest, HttpTransport, Transport};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Asia::Ho_Chi_Minh;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use vntrader_core::{
    Candle, Order, OrderRequest, OrderStatusType, OrderType, Position, PositionSide, Price,
    Quantity, Side, Ticker, Timeframe,
};

/// 매수/매도 공통 수수료율 (0.15%, 호가 통화 기준).
pub const FEE_RATE: Decimal = dec!(0.0015);

/// 거래 수수료.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fee {
    /// 수수료 통화 (VND)
    pub currency: String,
    /// 수수료율
    pub rate: Decimal,
    /// 수수료 금액
    pub cost: Decimal,
}

/// 거래소 휴장일.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradingHoliday {
    /// 날짜 (dd/MM/yyyy 또는 yyyy-MM-dd)
    pub date: String,
    /// 휴일 이름
    pub name: String,
    /// 설명
    pub description: String,
}

/// 상장사 기업 정보.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    /// 종목 코드
    pub symbol: String,
    /// 회사명 (현지어)
    pub company_name: String,
    /// 회사명 (영문)
    pub company_name_en: String,
    /// 상장 거래소
    pub exchange: String,
    /// 섹터
    pub sector: String,
    /// 산업
    pub industry: String,
    /// 웹사이트
    pub website: String,
    /// 상장일
    pub listing_date: String,
    /// 자본금
    pub charter_capital: Decimal,
    /// 유통 주식 수
    pub outstanding_shares: Decimal,
    /// 발행 주식 수
    pub issued_shares: Decimal,
    /// 외국인 보유 비율
    pub foreign_ownership: Decimal,
    /// 외국인 보유 한도
    pub foreign_ownership_max: Decimal,
    /// 외국인 잔여 한도
    pub room_available: Decimal,
}

/// 재무제표.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialReport {
    /// 종목 코드
    pub symbol: String,
    /// 보고서 종류 (BALANCE_SHEET / INCOME_STATEMENT / CASH_FLOW)
    pub report_type: String,
    /// 기간 (Q1..Q4 / YEAR)
    pub period: String,
    /// 연도
    pub year: i32,
    /// 분기 (연간 보고서는 0)
    pub quarter: i32,
    /// 항목별 수치
    pub data: Value,
    /// 통화
    pub currency: String,
    /// 단위
    pub unit: String,
}

/// 주문 응답 행.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SsiOrderInfo {
    order_id: String,
    request_id: String,
    symbol: String,
    side: String,
    order_type: String,
    price: Decimal,
    quantity: Decimal,
    filled_qty: Decimal,
    avg_price: Decimal,
    status: String,
    create_time: String,
    account_no: String,
}

/// 계좌 잔고 응답.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SsiBalanceInfo {
    account_no: String,
    total_cash: Decimal,
    available_cash: Decimal,
    buying_power: Decimal,
}

/// 보유 종목 응답 행.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SsiPositionInfo {
    symbol: String,
    quantity: Decimal,
    available_qty: Decimal,
    avg_price: Decimal,
    market_price: Decimal,
}

/// SSI FastConnect 커넥터.
pub struct SsiConnector {
    config: SsiConfig,
    transport: Arc<dyn Transport>,
    auth: Arc<TokenCache>,
    catalog: Arc<MarketCatalog>,
    gate: OrderGate,
    candles: CandleFetcher,
}

impl SsiConnector {
    /// 운영용 HTTP 전송 계층으로 커넥터를 생성합니다.
    pub fn new(config: SsiConfig) -> ExchangeResult<Self> {
        if !config.credentials_configured() {
            return Err(ExchangeError::CredentialsMissing(
                "ConsumerID/ConsumerSecret required".to_string(),
            ));
        }
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.timeout_secs)?);
        Ok(Self::with_transport(config, transport))
    }

    /// 주어진 전송 계층으로 커넥터를 생성합니다 (테스트용).
    pub fn with_transport(config: SsiConfig, transport: Arc<dyn Transport>) -> Self {
        let auth = Arc::new(TokenCache::new(config.clone(), transport.clone()));
        let catalog = Arc::new(MarketCatalog::new(
            config.clone(),
            auth.clone(),
            transport.clone(),
        ));
        let gate = OrderGate::new(SessionSchedule::vietnam(), TickRuleTable::vietnam());
        let candles = CandleFetcher::new(
            config.clone(),
            auth.clone(),
            catalog.clone(),
            transport.clone(),
        );
        Self {
            config,
            transport,
            auth,
            catalog,
            gate,
            candles,
        }
    }

    /// 종목 카탈로그를 반환합니다.
    pub fn catalog(&self) -> &Arc<MarketCatalog> {
        &self.catalog
    }

    /// 현재 거래 세션을 반환합니다.
    pub fn current_session(&self) -> TradingSession {
        self.gate.schedule().session_at(Utc::now())
    }

    /// 주문 수수료를 계산합니다. 매수/매도 동일 요율이며 호가 통화
    /// 기준입니다.
    pub fn calculate_fee(&self, quantity: Quantity, price: Price) -> Fee {
        let cost = quantity * price * FEE_RATE;
        Fee {
            currency: "VND".to_string(),
            rate: FEE_RATE,
            cost,
        }
    }

    /// 해당 연도의 거래소 휴장일을 조회합니다.
    pub async fn fetch_trading_holidays(&self, year: i32) -> ExchangeResult<Vec<TradingHoliday>> {
        let token = self.auth.get_token().await?;
        let url = format!("{}/{}", self.config.data_api_url, endpoint::TRADING_HOLIDAYS);
        let request = ApiRequest::get(url)
            .with_query("year", year.to_string())
            .with_bearer(token);
        let body = self.transport.send(&request).await?;

        let rows = decode_rows(&body)?;
        let holidays = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(Value::Object(row)).ok())
            .collect();
        Ok(holidays)
    }

    /// 주말도 휴장일 목록도 아닌 거래일인지 확인합니다.
    pub fn is_trading_day(date: NaiveDate, holidays: &[TradingHoliday]) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !holidays.iter().any(|h| {
            parse_ict_datetime(&h.date)
                .map(|dt| dt.with_timezone(&Ho_Chi_Minh).date_naive() == date)
                .unwrap_or(false)
        })
    }

    /// 기업 정보를 조회합니다.
    pub async fn fetch_company_info(&self, symbol: &str) -> ExchangeResult<CompanyInfo> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;

        let data = self
            .data_get(
                endpoint::COMPANY_INFO,
                vec![("symbol".to_string(), instrument.ticker().to_string())],
            )
            .await?;
        let data = match data {
            Value::Array(mut rows) if !rows.is_empty() => rows.remove(0),
            other => other,
        };
        Ok(serde_json::from_value(data)?)
    }

    /// 재무제표를 조회합니다.
    ///
    /// `report_type`은 BALANCE_SHEET/INCOME_STATEMENT/CASH_FLOW,
    /// `period`는 Q1..Q4 또는 YEAR입니다.
    pub async fn fetch_financial_report(
        &self,
        symbol: &str,
        report_type: &str,
        period: &str,
        year: i32,
    ) -> ExchangeResult<FinancialReport> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;

        let data = self
            .data_get(
                endpoint::FINANCIAL_REPORT,
                vec![
                    ("symbol".to_string(), instrument.ticker().to_string()),
                    ("reportType".to_string(), report_type.to_string()),
                    ("period".to_string(), period.to_string()),
                    ("year".to_string(), year.to_string()),
                ],
            )
            .await?;
        let data = match data {
            Value::Array(mut rows) if !rows.is_empty() => rows.remove(0),
            other => other,
        };
        Ok(serde_json::from_value(data)?)
    }

    /// 여러 종목의 일별 시세를 한 번의 호출로 조회합니다.
    ///
    /// 요청 종목은 모두 카탈로그에서 해석되어야 합니다. 응답에서
    /// 카탈로그에 없는 종목 행은 버리고, 빈 입력은 빈 결과를
    /// 반환합니다.
    pub async fn get_tickers(&self, symbols: &[&str]) -> ExchangeResult<Vec<Ticker>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.ensure_loaded().await?;

        let mut tickers = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let instrument = self.catalog.resolve(symbol).await?;
            tickers.push(instrument.ticker().to_string());
        }

        let token = self.auth.get_token().await?;
        let url = format!(
            "{}/{}",
            self.config.data_api_url,
            endpoint::DAILY_STOCK_PRICE
        );
        let request = ApiRequest::get(url)
            .with_query("symbols", tickers.join(","))
            .with_bearer(token);
        let body = self.transport.send(&request).await?;

        let rows = decode_rows(&body)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let row = fold_keys(row);
            let Some(ticker) = coerce_string(&row, &["symbol"]) else {
                continue;
            };
            let instrument = match self.catalog.resolve(&ticker).await {
                Ok(instrument) => instrument,
                Err(err) => {
                    warn!(symbol = %ticker, error = %err, "Dropping price row with unknown symbol");
                    continue;
                }
            };
            let timestamp = coerce_string(&row, &["tradingdate"])
                .and_then(|s| parse_ict_datetime(&s))
                .unwrap_or_else(Utc::now);
            out.push(Ticker {
                symbol: instrument.symbol.clone(),
                last: coerce_decimal(&row, &["closeprice"]).unwrap_or(Decimal::ZERO),
                ref_price: coerce_decimal(&row, &["priorcloseprice"]),
                ceiling: None,
                floor: None,
                open: coerce_decimal(&row, &["openprice"]),
                high: coerce_decimal(&row, &["highestprice"]),
                low: coerce_decimal(&row, &["lowestprice"]),
                volume: coerce_decimal(&row, &["totalvolume"]),
                timestamp,
            });
        }
        Ok(out)
    }

    /// 주어진 시각 기준으로 세션/수량/가격을 검증하고 주문을 제출합니다.
    ///
    /// [`Exchange::place_order`]는 현재 시각으로 이 메서드를 호출합니다.
    pub async fn submit_order(
        &self,
        request: &OrderRequest,
        now: DateTime<Utc>,
    ) -> ExchangeResult<Order> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(&request.symbol).await?;

        let ssi_type = self.gate.check(
            &instrument,
            request.order_type,
            request.side,
            request.quantity,
            request.price,
            now,
        )?;

        let account_no = self.account(request.account_no.as_deref())?;
        let client_order_id = request
            .client_order_id
            .clone()
            .unwrap_or_else(|| format!("OMO_{}", Utc::now().timestamp_millis()));

        let quantity = request.quantity.to_i64().ok_or_else(|| {
            ExchangeError::InvalidQuantity(format!("quantity overflow: {}", request.quantity))
        })?;

        let mut body = json!({
            "symbol": instrument.ticker(),
            "orderType": ssi_type.as_str(),
            "side": request.side.to_string(),
            "quantity": quantity,
            "accountNo": account_no,
            "requestId": client_order_id,
        });
        if let Some(price) = request.price.filter(|p| !p.is_zero()) {
            body["price"] = json!(price.to_f64().unwrap_or_default());
        }

        info!(
            symbol = %instrument.raw_id,
            order_type = %ssi_type,
            side = %request.side,
            quantity,
            "Placing order"
        );

        let data = self.trading_post(endpoint::NEW_ORDER, body).await?;
        let info: SsiOrderInfo = serde_json::from_value(data.clone())?;
        Ok(parse_order(info, &instrument, data))
    }

    fn account(&self, account_no: Option<&str>) -> ExchangeResult<String> {
        account_no
            .map(str::to_string)
            .or_else(|| self.config.account_no.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExchangeError::CredentialsMissing("accountNo required".to_string()))
    }

    async fn trading_post(&self, path: &str, body: Value) -> ExchangeResult<Value> {
        let token = self.auth.get_token().await?;
        let url = format!("{}/{}", self.config.trading_api_url, path);
        let request = ApiRequest::post(url).with_body(body).with_bearer(token);
        let text = self.transport.send(&request).await?;
        let envelope = decode_object(&text)?;
        ensure_success(&envelope)?;
        Ok(payload(&envelope).cloned().unwrap_or(Value::Null))
    }

    async fn data_get(&self, path: &str, query: Vec<(String, String)>) -> ExchangeResult<Value> {
        let token = self.auth.get_token().await?;
        let url = format!("{}/{}", self.config.data_api_url, path);
        let mut request = ApiRequest::get(url).with_bearer(token);
        for (key, value) in query {
            request = request.with_query(key, value);
        }
        let text = self.transport.send(&request).await?;
        let envelope = decode_object(&text)?;
        ensure_success(&envelope)?;
        Ok(payload(&envelope).cloned().unwrap_or(Value::Null))
    }

    async fn trading_get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ExchangeResult<Value> {
        let token = self.auth.get_token().await?;
        let url = format!("{}/{}", self.config.trading_api_url, path);
        let mut request = ApiRequest::get(url).with_bearer(token);
        for (key, value) in query {
            request = request.with_query(key, value);
        }
        let text = self.transport.send(&request).await?;
        let envelope = decode_object(&text)?;
        ensure_success(&envelope)?;
        Ok(payload(&envelope).cloned().unwrap_or(Value::Null))
    }

    /// 응답 행의 종목 코드를 카탈로그로 해석해 주문으로 변환합니다.
    /// 카탈로그에서 찾을 수 없는 행은 버립니다.
    async fn parse_order_rows(&self, rows: Vec<Value>) -> Vec<Order> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = row.clone();
            let Ok(info) = serde_json::from_value::<SsiOrderInfo>(row) else {
                continue;
            };
            match self.catalog.resolve(&info.symbol).await {
                Ok(instrument) => orders.push(parse_order(info, &instrument, raw)),
                Err(err) => {
                    warn!(symbol = %info.symbol, error = %err, "Dropping order with unknown symbol");
                }
            }
        }
        orders
    }
}

/// SSI 주문 상태 문자열을 표준 상태로 매핑합니다.
fn map_order_status(status: &str) -> OrderStatusType {
    match status.to_uppercase().as_str() {
        "NEW" => OrderStatusType::Open,
        "PARTIALLY_FILLED" => OrderStatusType::PartiallyFilled,
        "FILLED" => OrderStatusType::Filled,
        "CANCELLED" => OrderStatusType::Cancelled,
        "REJECTED" => OrderStatusType::Rejected,
        "EXPIRED" => OrderStatusType::Expired,
        _ => OrderStatusType::Pending,
    }
}

fn parse_order(info: SsiOrderInfo, instrument: &Instrument, raw: Value) -> Order {
    let order_type = match info.order_type.parse::<SsiOrderType>() {
        Ok(SsiOrderType::Lo) => OrderType::Limit,
        Ok(_) => OrderType::Market,
        Err(_) => OrderType::Limit,
    };
    let side = if info.side.eq_ignore_ascii_case("SELL") || info.side.eq_ignore_ascii_case("S") {
        Side::Sell
    } else {
        Side::Buy
    };
    let created_at = parse_ict_datetime(&info.create_time).unwrap_or_else(Utc::now);

    Order {
        order_id: info.order_id,
        client_order_id: (!info.request_id.is_empty()).then_some(info.request_id),
        symbol: instrument.symbol.clone(),
        side,
        order_type,
        quantity: info.quantity,
        price: (!info.price.is_zero()).then_some(info.price),
        status: map_order_status(&info.status),
        filled_quantity: info.filled_qty,
        average_fill_price: (!info.avg_price.is_zero()).then_some(info.avg_price),
        account_no: (!info.account_no.is_empty()).then_some(info.account_no),
        created_at,
        info: raw,
    }
}

#[async_trait]
impl Exchange for SsiConnector {
    fn name(&self) -> &str {
        "ssi"
    }

    async fn load_markets(&self) -> ExchangeResult<Vec<Instrument>> {
        self.catalog.rebuild().await?;
        let snapshot = self.catalog.snapshot().await;
        Ok(snapshot
            .instruments()
            .into_iter()
            .map(|i| (*i).clone())
            .collect())
    }

    async fn resolve_market(&self, symbol: &str) -> ExchangeResult<Instrument> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;
        Ok((*instrument).clone())
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;

        let token = self.auth.get_token().await?;
        let url = format!(
            "{}/{}",
            self.config.data_api_url,
            endpoint::SECURITIES_DETAILS
        );
        let request = ApiRequest::get(url)
            .with_query("symbol", instrument.ticker())
            .with_bearer(token);
        let body = self.transport.send(&request).await?;

        let rows = decode_rows(&body)?;
        let row = rows
            .first()
            .map(fold_keys)
            .ok_or_else(|| ExchangeError::Decode("empty securities detail".to_string()))?;

        let timestamp = coerce_string(&row, &["time"])
            .and_then(|s| parse_ict_datetime(&s))
            .unwrap_or_else(Utc::now);

        Ok(Ticker {
            symbol: instrument.symbol.clone(),
            last: coerce_decimal(&row, &["lastprice"]).unwrap_or(Decimal::ZERO),
            ref_price: coerce_decimal(&row, &["refprice"]),
            ceiling: coerce_decimal(&row, &["ceiling"]),
            floor: coerce_decimal(&row, &["floor"]),
            open: coerce_decimal(&row, &["openprice"]),
            high: coerce_decimal(&row, &["highprice"]),
            low: coerce_decimal(&row, &["lowprice"]),
            volume: coerce_decimal(&row, &["totalvolume"]),
            timestamp,
        })
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.candles
            .fetch_candles(symbol, timeframe, since, until, limit)
            .await
    }

    async fn place_order(&self, request: &OrderRequest) -> ExchangeResult<Order> {
        self.submit_order(request, Utc::now()).await
    }

    async fn cancel_order(
        &self,
        order_id: &str,
        symbol: &str,
        account_no: Option<&str>,
    ) -> ExchangeResult<Order> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;
        let account_no = self.account(account_no)?;

        let body = json!({
            "orderId": order_id,
            "accountNo": account_no,
        });
        let data = self.trading_post(endpoint::CANCEL_ORDER, body).await?;
        let info: SsiOrderInfo = serde_json::from_value(data.clone())?;
        Ok(parse_order(info, &instrument, data))
    }

    async fn modify_order(
        &self,
        order_id: &str,
        symbol: &str,
        quantity: Quantity,
        price: Price,
        account_no: Option<&str>,
    ) -> ExchangeResult<Order> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;
        let account_no = self.account(account_no)?;

        let mut body = json!({
            "orderId": order_id,
            "accountNo": account_no,
        });
        if quantity > Decimal::ZERO {
            self.gate.check_quantity(&instrument, quantity)?;
            body["quantity"] = json!(quantity.to_i64().unwrap_or_default());
        }
        if price > Decimal::ZERO {
            self.gate.check_price_band(&instrument, price)?;
            body["price"] = json!(price.to_f64().unwrap_or_default());
        }

        let data = self.trading_post(endpoint::MODIFY_ORDER, body).await?;
        let info: SsiOrderInfo = serde_json::from_value(data.clone())?;
        Ok(parse_order(info, &instrument, data))
    }

    async fn get_order(&self, order_id: &str, account_no: Option<&str>) -> ExchangeResult<Order> {
        self.catalog.ensure_loaded().await?;
        let account_no = self.account(account_no)?;

        let data = self
            .trading_get(
                endpoint::ORDER_DETAIL,
                vec![
                    ("orderId".to_string(), order_id.to_string()),
                    ("accountNo".to_string(), account_no),
                ],
            )
            .await?;
        let info: SsiOrderInfo = serde_json::from_value(data.clone())?;
        let instrument = self.catalog.resolve(&info.symbol).await?;
        Ok(parse_order(info, &instrument, data))
    }

    async fn get_orders(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        account_no: Option<&str>,
    ) -> ExchangeResult<Vec<Order>> {
        self.catalog.ensure_loaded().await?;
        let account_no = self.account(account_no)?;

        let mut query = vec![("accountNo".to_string(), account_no)];
        if let Some(since) = since {
            query.push(("fromDate".to_string(), format_ict_date(since)));
        }
        if let Some(until) = until {
            query.push(("toDate".to_string(), format_ict_date(until)));
        }

        let data = self.trading_get(endpoint::ORDER_HISTORY, query).await?;
        let rows = match data {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Ok(self.parse_order_rows(rows).await)
    }

    async fn get_open_orders(&self, account_no: Option<&str>) -> ExchangeResult<Vec<Order>> {
        let orders = self.get_orders(None, None, account_no).await?;
        Ok(orders
            .into_iter()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatusType::Open | OrderStatusType::PartiallyFilled
                )
            })
            .collect())
    }

    async fn get_balance(&self, account_no: Option<&str>) -> ExchangeResult<AccountBalance> {
        let account_no = self.account(account_no)?;

        let data = self
            .trading_get(
                endpoint::ACCOUNT_BALANCE,
                vec![("accountNo".to_string(), account_no.clone())],
            )
            .await?;
        let info: SsiBalanceInfo = serde_json::from_value(data.clone())?;

        Ok(AccountBalance {
            account_no: if info.account_no.is_empty() {
                account_no
            } else {
                info.account_no
            },
            available_cash: info.available_cash,
            total_cash: info.total_cash,
            purchasing_power: (!info.buying_power.is_zero()).then_some(info.buying_power),
            info: data,
        })
    }

    async fn get_positions(&self, account_no: Option<&str>) -> ExchangeResult<Vec<Position>> {
        self.catalog.ensure_loaded().await?;
        let account_no = self.account(account_no)?;

        let data = self
            .trading_get(
                endpoint::STOCK_POSITION,
                vec![("accountNo".to_string(), account_no)],
            )
            .await?;
        let rows = match data {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        let mut positions = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = row.clone();
            let Ok(info) = serde_json::from_value::<SsiPositionInfo>(row) else {
                continue;
            };
            let instrument = match self.catalog.resolve(&info.symbol).await {
                Ok(instrument) => instrument,
                Err(err) => {
                    warn!(symbol = %info.symbol, error = %err, "Dropping position with unknown symbol");
                    continue;
                }
            };
            positions.push(Position {
                symbol: instrument.symbol.clone(),
                side: PositionSide::Long,
                quantity: info.quantity,
                sellable_quantity: info.available_qty,
                average_price: (!info.avg_price.is_zero()).then_some(info.avg_price),
                market_price: (!info.market_price.is_zero()).then_some(info.market_price),
                info: raw,
            });
        }
        Ok(positions)
    }
}
