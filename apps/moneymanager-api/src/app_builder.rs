//! # アプリケーション構築
//!
//! State を受け取ってルーターとミドルウェアを組み立てる。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use moneymanager_shared::{
    canonical_log::CanonicalLogLineLayer,
    observability::{MakeRequestUuidV7, make_request_span},
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::handler::{
    ProfileState,
    ReadinessState,
    activate,
    get_profile,
    health_check,
    login,
    readiness_check,
    register,
};

/// ルーターを構築する
pub fn build_app(
    profile_state: Arc<ProfileState>,
    readiness_state: Arc<ReadinessState>,
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .route("/register", post(register))
        .route("/activate", get(activate))
        .route("/login", post(login))
        .route("/profile", get(get_profile))
        .with_state(profile_state)
        // レイヤーは下から上に適用される（最後に追加したものが最外）
        // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
        // 2. TraceLayer: request_id を含むスパンを作る
        // 3. CanonicalLogLineLayer: スパン内で1行サマリログを出力
        // 4. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CanonicalLogLineLayer)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
