//! # Money Manager API サーバー
//!
//! 家計簿アプリのプロフィール管理とメール通知を担当する API サーバー。
//!
//! ## 役割
//!
//! - **プロフィール登録**: 無効状態で保存し、有効化メールを送信
//! - **有効化**: メールのリンクに含まれるトークンを一度だけ受け付ける
//! - **ログイン**: パスワードを検証して JWT を発行
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `API_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `API_PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `JWT_SECRET` | **Yes** | JWT 署名鍵 |
//! | `JWT_EXPIRATION_HOURS` | No | トークン有効期間（デフォルト: `24`） |
//! | `ACTIVATION_BASE_URL` | No | 有効化リンクのベース URL（デフォルト: `http://localhost:8080`） |
//! | `MAIL_BACKEND` | No | `smtp` または `noop`（デフォルト: `smtp`） |
//! | `MAIL_HOST` ほか | No | SMTP 設定（送信のたびに読み込む） |
//! | `RUST_LOG` | No | ログフィルタ |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（メールは送信しない）
//! MAIL_BACKEND=noop cargo run -p moneymanager-api
//!
//! # 本番環境
//! DATABASE_URL=postgres://... JWT_SECRET=... cargo run -p moneymanager-api --release
//! ```

mod config;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use config::{ApiConfig, MailBackend};
use moneymanager_api::{
    app_builder::build_app,
    handler::{ProfileState, ReadinessState},
    usecase::{NotificationService, ProfileUseCaseImpl, TemplateRenderer},
};
use moneymanager_infra::{
    Argon2PasswordService,
    JwtTokenService,
    PasswordService,
    TokenService,
    db,
    notification::{
        EnvMailSettings,
        MailSender,
        MailSettingsSource,
        MailTransportAdapter,
        NoopMailSender,
        SmtpMailSender,
    },
    repository::{PostgresProfileRepository, ProfileRepository},
};
use moneymanager_shared::observability::TracingConfig;
use tokio::net::TcpListener;

const SERVICE_NAME: &str = "moneymanager-api";

/// API サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env(SERVICE_NAME);
    moneymanager_shared::observability::init_tracing(tracing_config);
    let _tracing_guard = tracing::info_span!("app", service = SERVICE_NAME).entered();

    // 設定読み込み
    let config = ApiConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "API サーバーを起動します: {}:{} (mail_backend={})",
        config.host,
        config.port,
        config.mail_backend
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    // マイグレーション実行
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;
    tracing::info!("マイグレーションを適用しました");

    // Readiness Check 用 State（pool が move される前に clone）
    let readiness_state = Arc::new(ReadinessState { pool: pool.clone() });

    // メール送信
    let mail_settings: Arc<dyn MailSettingsSource> = Arc::new(EnvMailSettings);
    let mail_sender = match config.mail_backend {
        MailBackend::Smtp => {
            MailSender::Controllable(Arc::new(SmtpMailSender::new(mail_settings.clone())))
        }
        MailBackend::Noop => MailSender::Basic(Arc::new(NoopMailSender)),
    };
    let notification =
        NotificationService::new(MailTransportAdapter::new(mail_sender, mail_settings));

    // 依存コンポーネントを初期化
    let profile_repository: Arc<dyn ProfileRepository> =
        Arc::new(PostgresProfileRepository::new(pool));
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.jwt_expiration_hours),
    ));
    let template_renderer =
        Arc::new(TemplateRenderer::new().context("メールテンプレートの読み込みに失敗しました")?);

    let profile_usecase = ProfileUseCaseImpl::new(
        profile_repository,
        password_service,
        token_service,
        notification,
        template_renderer,
        config.activation_base_url.clone(),
    );
    let profile_state = Arc::new(ProfileState {
        usecase: Arc::new(profile_usecase),
    });

    let app = build_app(profile_state, readiness_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
