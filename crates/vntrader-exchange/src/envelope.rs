//! SSI FastConnect 공통 응답 봉투 및 필드 정규화.
//!
//! 대부분의 SSI 엔드포인트는 `{status, message, data, dataList}` 형태의
//! 봉투로 응답합니다. `status`는 숫자 200 또는 "200"/"OK"/"SUCCESS"
//! 문자열(대소문자 무시)일 때 성공입니다. 행 데이터의 필드명 대소문자가
//! 엔드포인트마다 다르므로 키를 소문자로 접어 조회합니다.

use crate::error::{ExchangeError, ExchangeResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// 응답 바디를 JSON 객체로 파싱합니다.
pub fn decode_object(body: &str) -> ExchangeResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(body)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExchangeError::Decode(format!(
            "Expected JSON object, got: {}",
            other
        ))),
    }
}

/// 봉투의 `status` 필드가 성공을 나타내는지 확인합니다.
///
/// 실패 시 `message` 필드를 담은 [`ExchangeError::Broker`]를 반환합니다.
pub fn ensure_success(envelope: &Map<String, Value>) -> ExchangeResult<()> {
    let ok = match envelope.get("status") {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => {
            let s = s.trim();
            s == "200" || s.eq_ignore_ascii_case("OK") || s.eq_ignore_ascii_case("SUCCESS")
        }
        _ => false,
    };

    if ok {
        return Ok(());
    }

    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown broker error")
        .to_string();
    Err(ExchangeError::Broker { message })
}

/// 봉투에서 페이로드를 추출합니다. `dataList`가 있으면 `data`보다
/// 우선합니다.
pub fn payload(envelope: &Map<String, Value>) -> Option<&Value> {
    match envelope.get("dataList") {
        Some(v) if !v.is_null() => Some(v),
        _ => match envelope.get("data") {
            Some(v) if !v.is_null() => Some(v),
            _ => None,
        },
    }
}

/// 응답 바디에서 성공을 확인하고 행 객체 목록을 추출합니다.
///
/// 페이로드가 단일 객체이면 한 개짜리 목록으로 취급합니다.
pub fn decode_rows(body: &str) -> ExchangeResult<Vec<Map<String, Value>>> {
    let envelope = decode_object(body)?;
    ensure_success(&envelope)?;

    let rows = match payload(&envelope) {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        Some(Value::Object(obj)) => vec![obj.clone()],
        Some(other) => {
            return Err(ExchangeError::Decode(format!(
                "Unexpected payload shape: {}",
                other
            )))
        }
    };

    Ok(rows)
}

/// 객체의 키를 소문자로 접습니다. 중복 시 먼저 나온 키가 이깁니다.
pub fn fold_keys(row: &Map<String, Value>) -> HashMap<String, Value> {
    let mut folded = HashMap::with_capacity(row.len());
    for (key, value) in row {
        folded.entry(key.to_lowercase()).or_insert_with(|| value.clone());
    }
    folded
}

/// 후보 키 중 첫 번째로 존재하는 값을 Decimal로 변환합니다.
///
/// 숫자와 숫자 문자열 모두 허용합니다. 빈 문자열은 없는 것으로
/// 취급합니다.
pub fn coerce_decimal(row: &HashMap<String, Value>, keys: &[&str]) -> Option<Decimal> {
    for key in keys {
        match row.get(*key) {
            Some(Value::Number(n)) => {
                if let Ok(d) = Decimal::from_str(&n.to_string()) {
                    return Some(d);
                }
            }
            Some(Value::String(s)) => {
                let s = s.trim().replace(',', "");
                if s.is_empty() {
                    continue;
                }
                if let Ok(d) = Decimal::from_str(&s) {
                    return Some(d);
                }
            }
            _ => continue,
        }
    }
    None
}

/// 후보 키 중 첫 번째로 존재하는 값을 i64로 변환합니다.
pub fn coerce_i64(row: &HashMap<String, Value>, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match row.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_i64() {
                    return Some(v);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(v) = s.trim().parse::<i64>() {
                    return Some(v);
                }
            }
            _ => continue,
        }
    }
    None
}

/// 후보 키 중 첫 번째로 존재하는 비어 있지 않은 문자열을 반환합니다.
pub fn coerce_string(row: &HashMap<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match row.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// 베트남 현지 시각(ICT, UTC+7) 문자열을 UTC로 파싱합니다.
///
/// `dd/MM/yyyy`, `yyyy-MM-dd` 두 날짜 형식을 지원하며, 뒤에
/// `HH:MM:SS` 시간이 붙을 수 있습니다. 날짜만 있으면 자정으로
/// 해석합니다.
pub fn parse_ict_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    let naive = NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%d/%m/%Y")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    Ho_Chi_Minh
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// UTC 시각을 SSI가 기대하는 `dd/MM/yyyy` 현지 날짜 문자열로
/// 변환합니다.
pub fn format_ict_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Ho_Chi_Minh).format("%d/%m/%Y").to_string()
}
