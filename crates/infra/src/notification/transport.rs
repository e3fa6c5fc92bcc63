//! 送信手段の抽象化
//!
//! 送信手段の能力を 2 段階のトレイトで表現する。
//!
//! | トレイト | 能力 |
//! |---------|------|
//! | [`BasicSender`] | 構築済みメッセージの標準送信のみ |
//! | [`ControllableSender`] | 上記に加え、接続設定の公開とセッションの生成 |
//!
//! アダプタは [`MailSender`] のバリアントで能力を判別する。

use std::sync::Arc;

use async_trait::async_trait;
use moneymanager_domain::notification::{DeliveryError, DeliveryEvent};

use super::message::OutgoingMessage;

/// 標準送信のみを提供する送信手段
#[async_trait]
pub trait BasicSender: Send + Sync {
    /// 構築済みメッセージを送信する（ブロッキング相当の高レベル API）
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError>;
}

/// 接続レベルの制御が可能な送信手段
pub trait ControllableSender: BasicSender {
    /// 現時点の接続設定を返す
    fn connection_settings(&self) -> ConnectionSettings;

    /// 指定プロトコルのセッションを生成する
    ///
    /// 未対応のプロトコルはエラーを返す。接続はまだ張らない。
    fn open_session(&self, protocol: &str) -> Result<Box<dyn TransportSession>, DeliveryError>;
}

/// 1 回の送信に閉じたトランスポートセッション
///
/// `connect` の後は成否にかかわらず `close` を呼ぶこと。
/// 未接続での `close` は何もしない。
#[async_trait]
pub trait TransportSession: Send {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        credentials: &SessionCredentials,
    ) -> Result<(), DeliveryError>;

    /// メッセージの全受信者に送信し、受信者ごとの受付結果を返す
    async fn send_message(
        &mut self,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReport, DeliveryError>;

    async fn close(&mut self);
}

/// 送信手段（能力別）
#[derive(Clone)]
pub enum MailSender {
    Basic(Arc<dyn BasicSender>),
    Controllable(Arc<dyn ControllableSender>),
}

impl MailSender {
    /// 高レベル API で送信する
    pub async fn send_basic(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        match self {
            Self::Basic(sender) => sender.send(message).await,
            Self::Controllable(sender) => sender.send(message).await,
        }
    }

    /// 接続設定（`Controllable` のみ）
    pub fn connection_settings(&self) -> Option<ConnectionSettings> {
        match self {
            Self::Basic(_) => None,
            Self::Controllable(sender) => Some(sender.connection_settings()),
        }
    }
}

impl std::fmt::Debug for MailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("MailSender::Basic"),
            Self::Controllable(_) => f.write_str("MailSender::Controllable"),
        }
    }
}

/// 接続設定
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host:     Option<String>,
    pub port:     u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub protocol: String,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl ConnectionSettings {
    /// 空白でないホスト名
    pub fn configured_host(&self) -> Option<&str> {
        self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    pub fn credentials(&self) -> SessionCredentials {
        SessionCredentials::from_parts(self.username.as_deref(), self.password.as_deref())
    }
}

/// セッション接続時の認証情報
#[derive(Clone, PartialEq, Eq)]
pub enum SessionCredentials {
    UsernamePassword { username: String, password: String },
    /// パスワードなし。認証コマンドは送らない
    UsernameOnly { username: String },
    Anonymous,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::UsernameOnly { username } => f
                .debug_struct("UsernameOnly")
                .field("username", username)
                .finish(),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl SessionCredentials {
    /// ユーザー名とパスワードの有無から認証方式を決める
    ///
    /// パスワードのみが設定されている場合は匿名接続になる。
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Self {
        let non_blank = |v: Option<&str>| v.filter(|v| !v.trim().is_empty()).map(str::to_string);

        match (non_blank(username), non_blank(password)) {
            (Some(username), Some(password)) => Self::UsernamePassword { username, password },
            (Some(username), None) => Self::UsernameOnly { username },
            (None, _) => Self::Anonymous,
        }
    }
}

/// 直接送信の受信者別結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 受け付けられた受信者
    pub valid_sent:   Vec<String>,
    /// 恒久的に拒否された受信者
    pub invalid:      Vec<String>,
    /// 一時的な理由で送れなかった受信者
    pub valid_unsent: Vec<String>,
}

impl DeliveryReport {
    pub fn event(&self) -> DeliveryEvent {
        DeliveryEvent::from_counts(
            self.valid_sent.len(),
            self.invalid.len(),
            self.valid_unsent.len(),
        )
    }
}
