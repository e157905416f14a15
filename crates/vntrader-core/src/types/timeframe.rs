//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 이 모듈은 다양한 시간 간격을 나타내는 타임프레임 타입을 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

impl Timeframe {
    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M3 => Duration::from_secs(3 * 60),
            Timeframe::M5 => Duration::from_secs(5 * 60),
            Timeframe::M15 => Duration::from_secs(15 * 60),
            Timeframe::M30 => Duration::from_secs(30 * 60),
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
            Timeframe::W1 => Duration::from_secs(7 * 24 * 60 * 60),
            Timeframe::MN1 => Duration::from_secs(30 * 24 * 60 * 60), // 근사값
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// 이 타임프레임의 밀리초 단위 값을 반환합니다.
    pub fn as_millis(&self) -> i64 {
        self.duration().as_millis() as i64
    }

    /// SSI FastConnect 해상도 문자열로 변환합니다.
    ///
    /// 주봉/월봉은 SSI 시세 API에서 지원하지 않으므로 `None`을 반환합니다.
    pub fn to_ssi_resolution(&self) -> Option<&'static str> {
        match self {
            Timeframe::M1 => Some("1"),
            Timeframe::M3 => Some("3"),
            Timeframe::M5 => Some("5"),
            Timeframe::M15 => Some("15"),
            Timeframe::M30 => Some("30"),
            Timeframe::H1 => Some("60"),
            Timeframe::D1 => Some("D"),
            Timeframe::W1 | Timeframe::MN1 => None,
        }
    }

    /// 표준 간격 문자열에서 파싱합니다.
    pub fn from_interval(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Timeframe::M1),
            "3m" => Some(Timeframe::M3),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "30m" => Some(Timeframe::M30),
            "1h" => Some(Timeframe::H1),
            "1d" => Some(Timeframe::D1),
            "1w" => Some(Timeframe::W1),
            "1M" => Some(Timeframe::MN1),
            _ => None,
        }
    }

    /// 표준 간격 문자열로 변환합니다.
    pub fn to_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1M",
        }
    }

    /// 일봉 이상 여부를 반환합니다.
    pub fn is_daily_or_above(&self) -> bool {
        matches!(self, Timeframe::D1 | Timeframe::W1 | Timeframe::MN1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_interval())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_interval(s).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}
