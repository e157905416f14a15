//! HTTP 전송 계층.
//!
//! 커넥터의 모든 네트워크 호출은 [`Transport`] trait을 통해 이루어집니다.
//! 운영환경에서는 reqwest 기반 [`HttpTransport`]를 사용하고,
//! 테스트에서는 스크립트된 응답을 반환하는 목 구현으로 대체합니다.

use crate::error::{ExchangeError, ExchangeResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP 메서드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// 전송 계층에 전달되는 단일 API 요청.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP 메서드
    pub method: HttpMethod,
    /// 전체 URL
    pub url: String,
    /// 쿼리 파라미터
    pub query: Vec<(String, String)>,
    /// JSON 바디 (POST 요청용)
    pub body: Option<Value>,
    /// Bearer 토큰
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// GET 요청을 생성합니다.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// POST 요청을 생성합니다.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// 쿼리 파라미터를 추가합니다.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// JSON 바디를 설정합니다.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Bearer 토큰을 설정합니다.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// 요청을 전송하고 원시 응답 바디를 반환하는 전송 계층.
#[async_trait]
pub trait Transport: Send + Sync {
    /// 요청을 전송하고 응답 바디 문자열을 반환합니다.
    async fn send(&self, request: &ApiRequest) -> ExchangeResult<String>;
}

/// reqwest 기반 HTTP 전송 구현.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// 주어진 타임아웃으로 전송 계층을 생성합니다.
    pub fn new(timeout_secs: u64) -> ExchangeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> ExchangeResult<String> {
        debug!(method = ?request.method, url = %request.url, "Sending API request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ExchangeError::Broker {
                message: format!("HTTP {}: {}", status.as_u16(), text),
            });
        }

        Ok(text)
    }
}
