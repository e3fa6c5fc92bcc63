//! # Canonical Log Line ミドルウェア
//!
//! HTTP リクエスト完了時に、そのリクエストの要点を1行に集約した
//! サマリログを出力する tower Layer。
//! [Canonical Log Lines](https://brandur.org/canonical-log-lines) パターンに基づく。
//!
//! ## TraceLayer との分担
//!
//! - TraceLayer: リクエストスパン（method, uri, request_id）の管理
//! - CanonicalLogLineLayer: 完了サマリ（method, path, status, latency）
//!
//! TraceLayer のスパン内に配置すると、スパンフィールドが JSON ログにも含まれる。
//!
//! ## 出力レベル
//!
//! | 結果 | レベル |
//! |------|--------|
//! | 2xx〜4xx | INFO |
//! | 5xx | WARN |
//! | Service エラー | ERROR |

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use http::{Method, Request, Response};
use tower::{Layer, Service};

/// `/health` と `/health/ready` はログ対象外
fn is_health_check_path(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// Canonical Log Line を出力する Layer
///
/// ```text
/// TraceLayer → CanonicalLogLineLayer → handler
/// ```
#[derive(Clone, Debug)]
pub struct CanonicalLogLineLayer;

impl<S> Layer<S> for CanonicalLogLineLayer {
    type Service = CanonicalLogLineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CanonicalLogLineService { inner }
    }
}

#[derive(Clone, Debug)]
pub struct CanonicalLogLineService<S> {
    inner: S,
}

fn emit_response_line(method: &Method, path: &str, status: u16, latency_ms: u64) {
    if status >= 500 {
        tracing::warn!(
            log.r#type = "canonical",
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            http.latency_ms = latency_ms,
            "リクエスト完了（サーバーエラー）"
        );
    } else {
        tracing::info!(
            log.r#type = "canonical",
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            http.latency_ms = latency_ms,
            "リクエスト完了"
        );
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CanonicalLogLineService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // poll_ready 済みの inner を使うため clone と入れ替える
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let path = req.uri().path().to_owned();
        if is_health_check_path(&path) {
            return Box::pin(async move { inner.call(req).await });
        }

        let method = req.method().clone();
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => {
                    emit_response_line(&method, &path, response.status().as_u16(), latency_ms);
                }
                Err(err) => {
                    tracing::error!(
                        log.r#type = "canonical",
                        http.method = %method,
                        http.path = %path,
                        http.latency_ms = latency_ms,
                        error.message = %err,
                        "リクエスト処理エラー"
                    );
                }
            }

            result
        })
    }
}
