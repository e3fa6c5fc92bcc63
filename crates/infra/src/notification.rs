//! # メール送信
//!
//! メッセージ記述子を実際のメールとして配送するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **二段構えの送信**: 接続レベルの制御ができる送信手段では、まず直接送信
//!   （配送イベントを観測できる経路）を試み、失敗したら標準の送信 API に
//!   フォールバックする
//! - **能力による分岐**: 送信手段は [`MailSender`] の 2 バリアントで表現する。
//!   `Basic` は標準送信のみ、`Controllable` はセッション制御も可能
//! - **設定は都度読み込み**: [`MailSettingsSource`] から送信のたびに設定を取得し、
//!   再起動なしで設定変更を反映する
//! - **環境変数切替**: `MAIL_BACKEND` で SMTP / Noop を選択する
//!
//! ## 送信フロー
//!
//! ```text
//! send(descriptor)
//!   ├─ 送信元解決 → メッセージ構築（失敗は Construction で即時返却）
//!   ├─ Controllable かつホスト設定あり
//!   │    open_session → connect → send_message → close
//!   │    └─ いずれかの失敗 / 配送先ゼロ → フォールバックへ
//!   └─ フォールバック: BasicSender::send
//!        └─ 失敗 → DeliveryError::Fallback
//! ```

mod adapter;
mod message;
mod noop;
mod observer;
mod settings;
mod smtp;
mod transport;

pub use adapter::{DeliveryPath, FallbackReason, MailTransportAdapter, SendReport};
pub use message::OutgoingMessage;
pub use noop::NoopMailSender;
pub use observer::{ChannelDeliveryObserver, DeliveryObserver, TracingDeliveryObserver};
pub use settings::{
    DEFAULT_PROTOCOL,
    DEFAULT_SENDER,
    DEFAULT_SMTP_PORT,
    EnvMailSettings,
    MailSettings,
    MailSettingsSource,
    StaticMailSettings,
};
pub use smtp::SmtpMailSender;
pub use transport::{
    BasicSender,
    ConnectionSettings,
    ControllableSender,
    DeliveryReport,
    MailSender,
    SessionCredentials,
    TransportSession,
};
