//! SSI FastConnect 토큰 발급 및 캐싱.
//!
//! 토큰은 만료 5분 전까지 캐시에서 재사용하고, 만료가 가까워지면
//! 쓰기 락 안에서 한 번만 재발급합니다. 동시에 여러 태스크가
//! 토큰을 요청해도 인증 요청은 한 번만 나갑니다.

use crate::connector::ssi::config::SsiConfig;
use crate::connector::ssi::endpoint;
use crate::error::{ExchangeError, ExchangeResult};
use crate::transport::{ApiRequest, Transport};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 토큰 만료 전 안전 마진 (밀리초). 만료 5분 전부터 재발급합니다.
pub const TOKEN_SAFETY_MARGIN_MS: i64 = 5 * 60 * 1000;

/// JWT에서 만료 시각을 읽을 수 없을 때의 기본 유효 기간 (2시간).
pub const DEFAULT_TOKEN_TTL_MS: i64 = 2 * 60 * 60 * 1000;

/// 캐시된 토큰 상태.
#[derive(Debug, Clone)]
struct TokenState {
    token: String,
    expires_at_ms: i64,
}

impl TokenState {
    /// 안전 마진을 고려해 토큰이 아직 유효한지 확인합니다.
    fn is_fresh(&self, now_ms: i64) -> bool {
        !self.token.is_empty() && now_ms < self.expires_at_ms - TOKEN_SAFETY_MARGIN_MS
    }
}

/// 액세스 토큰 캐시.
pub struct TokenCache {
    config: SsiConfig,
    transport: Arc<dyn Transport>,
    state: RwLock<Option<TokenState>>,
}

impl TokenCache {
    /// 새 토큰 캐시를 생성합니다.
    pub fn new(config: SsiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            state: RwLock::new(None),
        }
    }

    /// 유효한 액세스 토큰을 반환합니다. 필요하면 재발급합니다.
    pub async fn get_token(&self) -> ExchangeResult<String> {
        let now_ms = Utc::now().timestamp_millis();

        // 빠른 경로: 읽기 락으로 캐시 확인
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref() {
                if cached.is_fresh(now_ms) {
                    return Ok(cached.token.clone());
                }
            }
        }

        // 느린 경로: 쓰기 락을 잡고 재확인 후 재발급
        let mut state = self.state.write().await;
        let now_ms = Utc::now().timestamp_millis();
        if let Some(cached) = state.as_ref() {
            if cached.is_fresh(now_ms) {
                return Ok(cached.token.clone());
            }
        }

        let refreshed = self.request_token(now_ms).await?;
        let token = refreshed.token.clone();
        *state = Some(refreshed);
        Ok(token)
    }

    /// 캐시를 비웁니다. 다음 호출에서 강제로 재발급합니다.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        *state = None;
    }

    async fn request_token(&self, now_ms: i64) -> ExchangeResult<TokenState> {
        let consumer_id = self.config.consumer_id.trim();
        let consumer_secret = self.config.consumer_secret.trim();
        if consumer_id.is_empty() || consumer_secret.is_empty() {
            return Err(ExchangeError::CredentialsMissing(
                "ConsumerID/ConsumerSecret required".to_string(),
            ));
        }

        debug!("Requesting new SSI access token");

        let url = format!("{}/{}", self.config.data_api_url, endpoint::ACCESS_TOKEN);
        let request = ApiRequest::post(url).with_body(json!({
            "consumerID": consumer_id,
            "consumerSecret": consumer_secret,
        }));
        let body = self.transport.send(&request).await?;
        let response: Value = serde_json::from_str(&body)?;

        // 인증 엔드포인트는 status/data 봉투가 아니라 responseCode와
        // 최상위 token을 반환함
        let response_code = match response.get("responseCode") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
            _ => -1,
        };
        if response_code != 0 {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("auth failed");
            return Err(ExchangeError::AuthFailed(message.to_string()));
        }

        let token = extract_token(&response).ok_or_else(|| {
            ExchangeError::InvalidCredentialResponse("empty access token".to_string())
        })?;

        let expires_at_ms = decode_jwt_exp_ms(&token).unwrap_or(now_ms + DEFAULT_TOKEN_TTL_MS);

        info!(
            expires_at_ms,
            "SSI access token refreshed"
        );

        Ok(TokenState {
            token,
            expires_at_ms,
        })
    }
}

/// 인증 응답에서 토큰을 추출합니다.
///
/// 최상위 `token`, 중첩된 `data.accessToken`, 최상위 `accessToken`
/// 순서로 시도합니다.
fn extract_token(response: &Value) -> Option<String> {
    let candidates = [
        response.get("token"),
        response.get("data").and_then(|d| d.get("accessToken")),
        response.get("accessToken"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// JWT 페이로드에서 만료 시각(밀리초)을 디코딩합니다.
///
/// 형식이 JWT가 아니거나 `exp` 클레임이 없으면 `None`을 반환합니다.
fn decode_jwt_exp_ms(token: &str) -> Option<i64> {
    let payload_b64 = token.split('.').nth(1)?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let claims: Value = serde_json::from_slice(&payload).ok()?;
    let exp = match claims.get("exp")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if exp <= 0 {
        return None;
    }
    Some(exp * 1000)
}
