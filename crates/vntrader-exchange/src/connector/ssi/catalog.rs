//! 종목 카탈로그 (시장 메타데이터).
//!
//! 세 거래 보드(HOSE, HNX, UPCOM)의 종목 목록과 상세 정보를
//! 페이지 단위로 수집해 하나의 스냅샷으로 합칩니다. 스냅샷은
//! `RwLock<Arc<_>>` 뒤에서 원자적으로 교체되므로 리빌드 중에도
//! 조회는 이전 스냅샷을 일관되게 읽습니다.

use crate::connector::ssi::auth::TokenCache;
use crate::connector::ssi::config::SsiConfig;
use crate::connector::ssi::endpoint;
use crate::envelope::{coerce_decimal, coerce_i64, coerce_string, decode_rows, fold_keys};
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{Instrument, PricePrecisionMode};
use crate::transport::{ApiRequest, Transport};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use vntrader_core::{MarketSegment, Symbol};

/// 페이지당 종목 수.
pub const PAGE_SIZE: usize = 100;

/// 보드/엔드포인트당 최대 페이지 수. 비정상 응답으로 인한 무한
/// 페이지네이션을 차단합니다.
pub const MAX_PAGES: usize = 50;

/// 기본 로트 크기.
pub const DEFAULT_LOT_SIZE: u32 = 100;

/// 불변 카탈로그 스냅샷. 세 가지 인덱스를 함께 보관합니다.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    /// 표준 심볼("SEG:TICKER/VND") → 종목
    by_symbol: HashMap<String, Arc<Instrument>>,
    /// 내부 식별자("SEG:TICKER") → 종목
    by_raw_id: HashMap<String, Arc<Instrument>>,
    /// 종목 코드 → 해당 코드로 상장된 전체 종목
    by_ticker: HashMap<String, Vec<Arc<Instrument>>>,
}

impl CatalogSnapshot {
    /// 스냅샷에 담긴 종목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.by_raw_id.len()
    }

    /// 스냅샷이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.by_raw_id.is_empty()
    }

    /// 전체 종목 목록을 반환합니다.
    pub fn instruments(&self) -> Vec<Arc<Instrument>> {
        self.by_raw_id.values().cloned().collect()
    }

    fn insert(&mut self, instrument: Arc<Instrument>) {
        self.by_symbol
            .insert(instrument.symbol.canonical(), instrument.clone());
        self.by_raw_id
            .insert(instrument.raw_id.clone(), instrument.clone());
        self.by_ticker
            .entry(instrument.symbol.ticker.clone())
            .or_default()
            .push(instrument);
    }
}

/// 종목 카탈로그.
pub struct MarketCatalog {
    config: SsiConfig,
    auth: Arc<TokenCache>,
    transport: Arc<dyn Transport>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl MarketCatalog {
    /// 새 카탈로그를 생성합니다. 첫 조회 전에 [`rebuild`] 또는
    /// [`ensure_loaded`]를 호출해야 합니다.
    ///
    /// [`rebuild`]: MarketCatalog::rebuild
    /// [`ensure_loaded`]: MarketCatalog::ensure_loaded
    pub fn new(config: SsiConfig, auth: Arc<TokenCache>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            auth,
            transport,
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    /// 현재 스냅샷을 반환합니다.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// 스냅샷이 비어 있으면 리빌드합니다.
    pub async fn ensure_loaded(&self) -> ExchangeResult<()> {
        if !self.snapshot.read().await.is_empty() {
            return Ok(());
        }
        self.rebuild().await
    }

    /// 전체 보드의 종목 정보를 다시 수집해 스냅샷을 교체합니다.
    ///
    /// 상세 엔드포인트 실패는 보드 단위로 기본 목록만으로 진행합니다.
    pub async fn rebuild(&self) -> ExchangeResult<()> {
        let token = self.auth.get_token().await?;
        let mut next = CatalogSnapshot::default();

        for segment in MarketSegment::ALL {
            let base_rows = self
                .fetch_paged(endpoint::SECURITIES_LIST, segment, &token, false)
                .await?;

            let detail_rows = match self
                .fetch_paged(endpoint::SECURITIES_DETAILS, segment, &token, true)
                .await
            {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(
                        segment = %segment,
                        error = %err,
                        "Securities details unavailable, using base listing only"
                    );
                    Vec::new()
                }
            };

            let merged = merge_rows(base_rows, detail_rows);
            let mut count = 0usize;
            for (ticker, row) in merged {
                if let Some(instrument) = parse_instrument(segment, &ticker, &row) {
                    next.insert(Arc::new(instrument));
                    count += 1;
                }
            }
            info!(segment = %segment, count, "Loaded segment instruments");
        }

        info!(total = next.len(), "Market catalog rebuilt");
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Arc::new(next);
        Ok(())
    }

    /// 심볼 문자열을 종목으로 해석합니다.
    ///
    /// "SEG:TICKER"와 "SEG:TICKER/VND"는 해당 보드에서 직접 찾고,
    /// 종목 코드만 주어지면 전체 보드에서 유일한 종목이어야 합니다.
    pub async fn resolve(&self, id_or_ticker: &str) -> ExchangeResult<Arc<Instrument>> {
        let snapshot = self.snapshot.read().await.clone();
        let input = id_or_ticker.trim();

        if let Some(symbol) = Symbol::from_raw_id(input) {
            return snapshot
                .by_raw_id
                .get(&symbol.raw_id())
                .cloned()
                .ok_or_else(|| ExchangeError::SymbolNotFound(input.to_string()));
        }

        let ticker = input.to_uppercase();
        match snapshot.by_ticker.get(&ticker) {
            None => Err(ExchangeError::SymbolNotFound(input.to_string())),
            Some(hits) if hits.is_empty() => {
                Err(ExchangeError::SymbolNotFound(input.to_string()))
            }
            Some(hits) if hits.len() == 1 => Ok(hits[0].clone()),
            Some(hits) => {
                let boards: Vec<&str> = hits.iter().map(|i| i.symbol.segment.as_str()).collect();
                Err(ExchangeError::AmbiguousSymbol(format!(
                    "{} listed on {}",
                    ticker,
                    boards.join(", ")
                )))
            }
        }
    }

    /// 한 보드의 엔드포인트를 페이지 단위로 수집합니다.
    ///
    /// 상세 엔드포인트의 행은 중첩된 `RepeatedInfo` 하위 목록을
    /// 펼칩니다. 페이지 종료 판정은 펼치기 전의 행 수로 합니다.
    async fn fetch_paged(
        &self,
        path: &str,
        segment: MarketSegment,
        token: &str,
        flatten_repeated: bool,
    ) -> ExchangeResult<Vec<HashMap<String, Value>>> {
        let url = format!("{}/{}", self.config.data_api_url, path);
        let mut rows = Vec::new();

        for page in 1..=MAX_PAGES {
            let request = ApiRequest::get(&url)
                .with_query("market", segment.as_str())
                .with_query("pageIndex", page.to_string())
                .with_query("pageSize", PAGE_SIZE.to_string())
                .with_bearer(token);
            let body = self.transport.send(&request).await?;
            let page_rows = decode_rows(&body)?;
            let page_len = page_rows.len();

            for row in page_rows {
                if flatten_repeated {
                    rows.extend(flatten_detail_row(&row));
                } else {
                    rows.push(fold_keys(&row));
                }
            }

            if page_len < PAGE_SIZE {
                break;
            }
        }

        Ok(rows)
    }
}

/// 상세 행의 `RepeatedInfo` 하위 목록을 펼칩니다.
///
/// 하위 항목이 바깥 행의 필드를 상속하되 자기 필드가 우선합니다.
/// 하위 목록이 없으면 행 자체를 그대로 반환합니다.
fn flatten_detail_row(row: &serde_json::Map<String, Value>) -> Vec<HashMap<String, Value>> {
    let folded = fold_keys(row);
    let repeated = match folded.get("repeatedinfo") {
        Some(Value::Array(items)) if !items.is_empty() => items.clone(),
        _ => return vec![folded],
    };

    repeated
        .iter()
        .filter_map(|item| item.as_object())
        .map(|inner| {
            let mut merged = folded.clone();
            merged.remove("repeatedinfo");
            for (key, value) in fold_keys(inner) {
                merged.insert(key, value);
            }
            merged
        })
        .collect()
}

/// 기본 목록과 상세 행을 종목 코드 기준으로 병합합니다.
///
/// 종목 코드는 대문자로 정규화하며 상세 필드가 기본 필드를 덮어씁니다.
/// 기본 목록에 없는 상세 행은 버립니다.
fn merge_rows(
    base_rows: Vec<HashMap<String, Value>>,
    detail_rows: Vec<HashMap<String, Value>>,
) -> Vec<(String, HashMap<String, Value>)> {
    let mut merged: Vec<(String, HashMap<String, Value>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in base_rows {
        let Some(ticker) = coerce_string(&row, &["symbol"]).map(|s| s.to_uppercase()) else {
            continue;
        };
        if let Some(&at) = index.get(&ticker) {
            merged[at].1 = row;
        } else {
            index.insert(ticker.clone(), merged.len());
            merged.push((ticker, row));
        }
    }

    for row in detail_rows {
        let Some(ticker) = coerce_string(&row, &["symbol"]).map(|s| s.to_uppercase()) else {
            continue;
        };
        if let Some(&at) = index.get(&ticker) {
            for (key, value) in row {
                merged[at].1.insert(key, value);
            }
        }
    }

    merged
}

/// 병합된 행에서 종목 메타데이터를 만듭니다.
fn parse_instrument(
    segment: MarketSegment,
    ticker: &str,
    row: &HashMap<String, Value>,
) -> Option<Instrument> {
    if ticker.is_empty() {
        return None;
    }
    let symbol = Symbol::new(segment, ticker);

    let price_tick = coerce_decimal(row, &["tickincrement1"]).unwrap_or(Decimal::ZERO);
    let precision_mode = if price_tick.is_zero() {
        PricePrecisionMode::DecimalPlaces
    } else {
        PricePrecisionMode::TickSize
    };

    let lot_size = coerce_i64(row, &["lotsize"])
        .filter(|v| *v > 0)
        .map(|v| v as u32)
        .unwrap_or(DEFAULT_LOT_SIZE);

    let ref_price = coerce_decimal(row, &["refprice"]).filter(|p| !p.is_zero());

    let info = Value::Object(
        row.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );

    Some(Instrument {
        raw_id: symbol.raw_id(),
        symbol,
        price_tick,
        precision_mode,
        lot_size,
        ref_price,
        info,
    })
}
