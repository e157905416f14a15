//! 캔들(OHLCV) 조회.
//!
//! 일봉은 일봉 전용 엔드포인트, 분봉은 해상도 코드와 함께 분봉
//! 엔드포인트를 사용합니다. 응답 행의 필드명 대소문자와 날짜 형식이
//! 일정하지 않아 소문자 접기와 관용적인 날짜 파싱을 거칩니다.

use crate::connector::ssi::auth::TokenCache;
use crate::connector::ssi::catalog::MarketCatalog;
use crate::connector::ssi::config::SsiConfig;
use crate::connector::ssi::endpoint;
use crate::envelope::{
    coerce_decimal, coerce_string, decode_rows, fold_keys, format_ict_date, parse_ict_datetime,
};
use crate::error::{ExchangeError, ExchangeResult};
use crate::transport::{ApiRequest, Transport};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;
use vntrader_core::{Candle, Timeframe};

/// 기본 캔들 조회 개수.
pub const DEFAULT_CANDLE_LIMIT: usize = 200;

/// 캔들 조회기.
pub struct CandleFetcher {
    config: SsiConfig,
    auth: Arc<TokenCache>,
    catalog: Arc<MarketCatalog>,
    transport: Arc<dyn Transport>,
}

impl CandleFetcher {
    /// 새 캔들 조회기를 생성합니다.
    pub fn new(
        config: SsiConfig,
        auth: Arc<TokenCache>,
        catalog: Arc<MarketCatalog>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            auth,
            catalog,
            transport,
        }
    }

    /// 캔들을 조회합니다.
    ///
    /// `until`이 없으면 현재 시각, `since`가 없으면
    /// `until - limit × 타임프레임`, `limit`이 없거나 0이면 200을
    /// 사용합니다. 결과는 시간 오름차순이며 요청 구간으로 잘라
    /// 최근 `limit`개만 반환합니다.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.catalog.ensure_loaded().await?;
        let instrument = self.catalog.resolve(symbol).await?;

        let resolution = timeframe
            .to_ssi_resolution()
            .ok_or_else(|| ExchangeError::InvalidTimeframe(timeframe.to_string()))?;

        let limit = match limit {
            Some(n) if n > 0 => n,
            _ => DEFAULT_CANDLE_LIMIT,
        };
        let until = until.unwrap_or_else(Utc::now);
        let since = since.unwrap_or_else(|| {
            until - chrono::Duration::milliseconds(limit as i64 * timeframe.as_millis())
        });

        let token = self.auth.get_token().await?;
        let daily = resolution == "D";
        let path = if daily {
            endpoint::DAILY_OHLC
        } else {
            endpoint::INTRADAY_OHLC
        };
        let page_size = if daily {
            limit.max(100)
        } else {
            limit.max(1000)
        };

        let url = format!("{}/{}", self.config.data_api_url, path);
        let mut request = ApiRequest::get(url)
            .with_query("Symbol", instrument.ticker())
            .with_query("FromDate", format_ict_date(since))
            .with_query("ToDate", format_ict_date(until))
            .with_query("PageIndex", "1")
            .with_query("PageSize", page_size.to_string())
            .with_query("ascending", "true")
            .with_bearer(token);
        if !daily {
            request = request.with_query("resolution", resolution);
        }

        debug!(
            symbol = %instrument.raw_id,
            timeframe = %timeframe,
            %daily,
            "Fetching candles"
        );

        let body = self.transport.send(&request).await?;
        let rows = decode_rows(&body)?;

        let mut candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                let folded = fold_keys(row);
                parse_candle_row(&folded, &instrument.symbol, timeframe, daily)
            })
            .collect();

        normalize_candles(&mut candles, since, until, limit);
        Ok(candles)
    }
}

/// 소문자로 접힌 행에서 캔들을 만듭니다. 날짜를 파싱할 수 없으면
/// 행을 버립니다.
fn parse_candle_row(
    row: &std::collections::HashMap<String, serde_json::Value>,
    symbol: &vntrader_core::Symbol,
    timeframe: Timeframe,
    daily: bool,
) -> Option<Candle> {
    let date_text = coerce_string(row, &["tradingdate"])?;
    let stamp_text = if daily {
        date_text
    } else {
        match coerce_string(row, &["time"]) {
            Some(time_text) => format!("{} {}", date_text, time_text),
            None => date_text,
        }
    };
    let open_time = parse_ict_datetime(&stamp_text)?;

    let open = coerce_decimal(row, &["open", "openprice"]).unwrap_or(Decimal::ZERO);
    let high = coerce_decimal(row, &["high", "highestprice"]).unwrap_or(Decimal::ZERO);
    let low = coerce_decimal(row, &["low", "lowestprice"]).unwrap_or(Decimal::ZERO);
    let close = coerce_decimal(row, &["close", "closeprice"]).unwrap_or(Decimal::ZERO);
    let volume = coerce_decimal(row, &["volume", "totalmatchvol", "totaltradedvol"])
        .unwrap_or(Decimal::ZERO);
    let quote_volume = coerce_decimal(row, &["value", "totalmatchval", "totaltradedvalue"]);

    let mut candle = Candle::new(
        symbol.clone(),
        timeframe,
        open_time,
        open,
        high,
        low,
        close,
        volume,
    );
    candle.quote_volume = quote_volume;
    Some(candle)
}

/// 캔들을 오름차순 정렬하고, 같은 타임스탬프는 나중 행을 남기고,
/// 요청 구간으로 거른 뒤 최근 `limit`개로 자릅니다.
fn normalize_candles(
    candles: &mut Vec<Candle>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    limit: usize,
) {
    candles.sort_by_key(|c| c.open_time);

    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles.drain(..) {
        match deduped.last() {
            Some(last) if last.open_time == candle.open_time => {
                *deduped.last_mut().unwrap() = candle;
            }
            _ => deduped.push(candle),
        }
    }

    deduped.retain(|c| c.open_time >= since && c.open_time <= until);
    if deduped.len() > limit {
        deduped.drain(..deduped.len() - limit);
    }
    *candles = deduped;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use vntrader_core::{MarketSegment, Symbol};

    /// 시세 엔드포인트별 고정 응답을 돌려주는 목 전송 계층.
    struct CandleTransport {
        response: Mutex<String>,
        last_url: Mutex<String>,
        last_query: Mutex<Vec<(String, String)>>,
    }

    impl CandleTransport {
        fn new(body: Value) -> Self {
            Self {
                response: Mutex::new(body.to_string()),
                last_url: Mutex::new(String::new()),
                last_query: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Transport for CandleTransport {
        async fn send(&self, request: &ApiRequest) -> ExchangeResult<String> {
            if request.url.ends_with(endpoint::ACCESS_TOKEN) {
                return Ok(r#"{"responseCode": 0, "token": "test-token"}"#.to_string());
            }
            if request.url.contains("GetSecuritiesList") {
                if request.query.iter().any(|(_, v)| v == "HOSE") {
                    return Ok(
                        json!({"status": 200, "dataList": [{"symbol": "SSI", "lotSize": 100}]})
                            .to_string(),
                    );
                }
                return Ok(r#"{"status": 200, "dataList": []}"#.to_string());
            }
            if request.url.contains("GetSecuritiesDetails") {
                return Ok(r#"{"status": 200, "dataList": []}"#.to_string());
            }

            *self.last_url.lock().unwrap() = request.url.clone();
            *self.last_query.lock().unwrap() = request.query.clone();
            Ok(self.response.lock().unwrap().clone())
        }
    }

    fn make_fetcher(transport: Arc<CandleTransport>) -> CandleFetcher {
        let config = SsiConfig::new("id", "secret");
        let auth = Arc::new(TokenCache::new(config.clone(), transport.clone()));
        let catalog = Arc::new(MarketCatalog::new(
            config.clone(),
            auth.clone(),
            transport.clone(),
        ));
        CandleFetcher::new(config, auth, catalog, transport)
    }

    fn utc(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
    }

    #[tokio::test]
    async fn test_intraday_sorted_and_filtered() {
        // 역순으로 도착한 두 캔들 (ICT 09:16 = UTC 02:16)
        let body = json!({"status": 200, "dataList": [
            {"TradingDate": "15/03/2024", "Time": "09:16:00", "Open": 100, "High": 110, "Low": 90, "Close": 105, "Volume": 2000},
            {"TradingDate": "15/03/2024", "Time": "09:15:00", "Open": 99, "High": 101, "Low": 98, "Close": 100, "Volume": 1000}
        ]});
        let transport = Arc::new(CandleTransport::new(body));
        let fetcher = make_fetcher(transport.clone());

        let candles = fetcher
            .fetch_candles(
                "SSI",
                Timeframe::M1,
                Some(utc(2024, 3, 15, 2, 0)),
                Some(utc(2024, 3, 15, 3, 0)),
                Some(10),
            )
            .await
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert!(candles[0].open_time < candles[1].open_time);
        assert_eq!(candles[0].close, dec!(100));
        assert_eq!(candles[1].close, dec!(105));

        // 분봉 엔드포인트 + 해상도 코드 확인
        assert!(transport.last_url.lock().unwrap().contains("GetIntradayOHLC"));
        let query = transport.last_query.lock().unwrap().clone();
        assert!(query.contains(&("resolution".to_string(), "1".to_string())));
        assert!(query.contains(&("Symbol".to_string(), "SSI".to_string())));
    }

    #[tokio::test]
    async fn test_daily_endpoint_and_field_variants() {
        let body = json!({"status": 200, "dataList": [
            {"tradingDate": "14/03/2024", "openPrice": "35000", "highestPrice": "35600",
             "lowestPrice": "34800", "closePrice": "35400", "totalMatchVol": 1250000,
             "totalMatchVal": 44000000000i64}
        ]});
        let transport = Arc::new(CandleTransport::new(body));
        let fetcher = make_fetcher(transport.clone());

        let candles = fetcher
            .fetch_candles("HOSE:SSI", Timeframe::D1, None, None, Some(5))
            .await
            .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, dec!(35000));
        assert_eq!(candles[0].volume, dec!(1250000));
        assert_eq!(candles[0].quote_volume, Some(dec!(44000000000)));

        assert!(transport.last_url.lock().unwrap().contains("GetDailyOHLC"));
        let query = transport.last_query.lock().unwrap().clone();
        assert!(!query.iter().any(|(k, _)| k == "resolution"));
    }

    #[tokio::test]
    async fn test_duplicate_timestamps_last_wins() {
        let body = json!({"status": 200, "dataList": [
            {"TradingDate": "15/03/2024", "Time": "09:15:00", "Close": 100, "Volume": 1},
            {"TradingDate": "15/03/2024", "Time": "09:15:00", "Close": 101, "Volume": 2}
        ]});
        let transport = Arc::new(CandleTransport::new(body));
        let fetcher = make_fetcher(transport);

        let candles = fetcher
            .fetch_candles(
                "SSI",
                Timeframe::M1,
                Some(utc(2024, 3, 15, 2, 0)),
                Some(utc(2024, 3, 15, 3, 0)),
                Some(10),
            )
            .await
            .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, dec!(101));
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent() {
        let body = json!({"status": 200, "dataList": [
            {"TradingDate": "15/03/2024", "Time": "09:15:00", "Close": 100, "Volume": 1},
            {"TradingDate": "15/03/2024", "Time": "09:16:00", "Close": 101, "Volume": 1},
            {"TradingDate": "15/03/2024", "Time": "09:17:00", "Close": 102, "Volume": 1}
        ]});
        let transport = Arc::new(CandleTransport::new(body));
        let fetcher = make_fetcher(transport);

        let candles = fetcher
            .fetch_candles(
                "SSI",
                Timeframe::M1,
                Some(utc(2024, 3, 15, 2, 0)),
                Some(utc(2024, 3, 15, 3, 0)),
                Some(1),
            )
            .await
            .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, dec!(102));
    }

    #[tokio::test]
    async fn test_unparseable_dates_dropped() {
        let body = json!({"status": 200, "dataList": [
            {"TradingDate": "not-a-date", "Close": 100, "Volume": 1},
            {"TradingDate": "15/03/2024", "Time": "09:15:00", "Close": 101, "Volume": 1}
        ]});
        let transport = Arc::new(CandleTransport::new(body));
        let fetcher = make_fetcher(transport);

        let candles = fetcher
            .fetch_candles(
                "SSI",
                Timeframe::M1,
                Some(utc(2024, 3, 15, 2, 0)),
                Some(utc(2024, 3, 15, 3, 0)),
                Some(10),
            )
            .await
            .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, dec!(101));
    }

    #[tokio::test]
    async fn test_invalid_timeframe() {
        let transport = Arc::new(CandleTransport::new(
            json!({"status": 200, "dataList": []}),
        ));
        let fetcher = make_fetcher(transport);

        let err = fetcher
            .fetch_candles("SSI", Timeframe::W1, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidTimeframe(_)));
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let transport = Arc::new(CandleTransport::new(
            json!({"status": 200, "dataList": []}),
        ));
        let fetcher = make_fetcher(transport);

        let err = fetcher
            .fetch_candles("NOPE", Timeframe::M1, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::SymbolNotFound(_)));
    }

    #[test]
    fn test_parse_candle_row_symbol() {
        let symbol = Symbol::new(MarketSegment::Hose, "SSI");
        let row = fold_keys(
            json!({"TradingDate": "15/03/2024", "Open": 1, "High": 2, "Low": 0.5, "Close": 1.5, "Volume": 10})
                .as_object()
                .unwrap(),
        );
        let candle = parse_candle_row(&row, &symbol, Timeframe::D1, true).unwrap();
        assert_eq!(candle.symbol.canonical(), "HOSE:SSI/VND");
        assert_eq!(candle.high, dec!(2));
    }
}
