//! tracing 기반 로깅 초기화.
//!
//! 커넥터 크레이트들이 공유하는 전역 구독자 설정입니다. 필터는
//! `VNTRADER_LOG` 환경 변수로, 출력 형식은 `VNTRADER_LOG_FORMAT`
//! (pretty/json/compact)으로 제어합니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 기본 로그 필터. 워크스페이스 크레이트만 info 레벨로 출력합니다.
pub const DEFAULT_FILTER: &str = "vntrader=info";

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 개발용 사람이 읽기 쉬운 형식
    #[default]
    Pretty,
    /// 로그 집계용 JSON 형식
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 전역 구독자를 설치하고 설치 여부를 반환합니다.
///
/// 이미 구독자가 설치되어 있으면 `false`를 반환하고 기존 설정을
/// 유지하므로, 테스트처럼 반복 호출되는 곳에서도 안전합니다.
/// 파싱할 수 없는 필터는 [`DEFAULT_FILTER`]로 대체됩니다.
pub fn init_logging(filter: &str, format: LogFormat) -> bool {
    let env_filter =
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
            .is_ok(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .is_ok(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::debug!(filter, format = ?format, "Logging initialized");
    }
    installed
}

/// `VNTRADER_LOG`와 `VNTRADER_LOG_FORMAT` 환경 변수로 전역 구독자를
/// 설치합니다. 변수가 없으면 [`DEFAULT_FILTER`]와 pretty 형식을
/// 사용합니다.
pub fn init_logging_from_env() -> bool {
    let filter = std::env::var("VNTRADER_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let format = std::env::var("VNTRADER_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    init_logging(&filter, format)
}
