//! SMTP 送信実装
//!
//! lettre を使用する。
//!
//! - 直接送信: [`AsyncSmtpConnection`] で `MAIL` / `RCPT` / `DATA` を個別に送り、
//!   受信者ごとの受付結果（250 / 5xx / 4xx）を数える
//! - 標準送信: [`AsyncSmtpTransport`] の `send` に任せる
//!
//! TLS は使わない（開発用の Mailpit やローカルリレーを想定）。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::AsyncSmtpConnection,
        commands::{Data, Mail, Rcpt},
        extension::ClientId,
    },
};
use moneymanager_domain::notification::DeliveryError;

use super::{
    message::OutgoingMessage,
    settings::MailSettingsSource,
    transport::{
        BasicSender,
        ConnectionSettings,
        ControllableSender,
        DeliveryReport,
        SessionCredentials,
        TransportSession,
    },
};

/// 接続・コマンド応答のタイムアウト
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// ホスト未設定時に標準送信が接続する先
const FALLBACK_HOST: &str = "localhost";

/// SMTP 送信
///
/// 設定は送信のたびに [`MailSettingsSource`] から読み込む。
#[derive(Clone)]
pub struct SmtpMailSender {
    settings: Arc<dyn MailSettingsSource>,
    timeout:  Duration,
}

impl SmtpMailSender {
    pub fn new(settings: Arc<dyn MailSettingsSource>) -> Self {
        Self {
            settings,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl BasicSender for SmtpMailSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let settings = self.settings.current();
        let host = settings.host.as_deref().unwrap_or(FALLBACK_HOST);

        // builder_dangerous: TLS なしで接続
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(settings.port)
            .timeout(Some(self.timeout));
        if let SessionCredentials::UsernamePassword { username, password } =
            SessionCredentials::from_parts(settings.username.as_deref(), settings.password.as_deref())
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        builder
            .build()
            .send(message.message().clone())
            .await
            .map_err(|e| DeliveryError::Transmission(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

impl ControllableSender for SmtpMailSender {
    fn connection_settings(&self) -> ConnectionSettings {
        let settings = self.settings.current();
        ConnectionSettings {
            host:     settings.host,
            port:     settings.port,
            username: settings.username,
            password: settings.password,
            protocol: settings.protocol,
        }
    }

    fn open_session(&self, protocol: &str) -> Result<Box<dyn TransportSession>, DeliveryError> {
        if !protocol.eq_ignore_ascii_case("smtp") {
            return Err(DeliveryError::Connection(format!(
                "未対応のプロトコルです: {protocol}"
            )));
        }

        Ok(Box::new(SmtpSession {
            connection: None,
            timeout:    self.timeout,
        }))
    }
}

/// 1 回の送信に閉じた SMTP セッション
struct SmtpSession {
    connection: Option<AsyncSmtpConnection>,
    timeout:    Duration,
}

#[async_trait]
impl TransportSession for SmtpSession {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        credentials: &SessionCredentials,
    ) -> Result<(), DeliveryError> {
        let hello = ClientId::Domain("localhost".to_string());
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (host.to_string(), port),
            Some(self.timeout),
            &hello,
            None,
            None,
        )
        .await
        .map_err(|e| DeliveryError::Connection(format!("{host}:{port} に接続できません: {e}")))?;

        if let SessionCredentials::UsernamePassword { username, password } = credentials {
            let credentials = Credentials::new(username.clone(), password.clone());
            if let Err(e) = connection
                .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
                .await
            {
                connection.abort().await;
                return Err(DeliveryError::Connection(format!("認証に失敗: {e}")));
            }
        }

        self.connection = Some(connection);
        Ok(())
    }

    async fn send_message(
        &mut self,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReport, DeliveryError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| DeliveryError::Transmission("未接続です".to_string()))?;
        let transmission = |e: lettre::transport::smtp::Error| {
            DeliveryError::Transmission(format!("SMTP 送信失敗: {e}"))
        };

        connection
            .command(Mail::new(message.from_address().cloned(), vec![]))
            .await
            .map_err(transmission)?;

        let mut report = DeliveryReport::default();
        for recipient in message.recipients() {
            match connection
                .command(Rcpt::new(recipient.clone(), vec![]))
                .await
            {
                Ok(_) => report.valid_sent.push(recipient.to_string()),
                Err(e) if e.is_permanent() => {
                    tracing::debug!(recipient = %recipient, error = %e, "受信者が拒否されました");
                    report.invalid.push(recipient.to_string());
                }
                Err(e) => {
                    tracing::debug!(recipient = %recipient, error = %e, "受信者に送信できませんでした");
                    report.valid_unsent.push(recipient.to_string());
                }
            }
        }

        if report.valid_sent.is_empty() {
            return Ok(report);
        }

        connection.command(Data).await.map_err(transmission)?;
        connection
            .message(&message.formatted())
            .await
            .map_err(transmission)?;

        Ok(report)
    }

    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if connection.quit().await.is_err() {
                connection.abort().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MailSettings, StaticMailSettings};

    fn sender(settings: MailSettings) -> SmtpMailSender {
        SmtpMailSender::new(Arc::new(StaticMailSettings::new(settings)))
    }

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailSender>();
    }

    #[test]
    fn test_接続設定は現在のメール設定を反映する() {
        let sender = sender(MailSettings {
            host: Some("smtp.example.com".to_string()),
            port: 2525,
            username: Some("svc@example.com".to_string()),
            ..MailSettings::default()
        });

        let connection = sender.connection_settings();

        assert_eq!(connection.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(connection.port, 2525);
        assert_eq!(connection.username.as_deref(), Some("svc@example.com"));
        assert_eq!(connection.protocol, "smtp");
    }

    #[test]
    fn test_smtp以外のプロトコルはセッションを開けない() {
        let sender = sender(MailSettings::default());

        assert!(sender.open_session("SMTP").is_ok());
        assert!(matches!(
            sender.open_session("imap"),
            Err(DeliveryError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_未接続のセッションは送信できない() {
        let sender = sender(MailSettings::default());
        let mut session = sender.open_session("smtp").unwrap();
        let descriptor = moneymanager_domain::notification::MessageDescriptor::new(
            "a@b.com", "Hi", "body", None,
        )
        .unwrap();
        let message = OutgoingMessage::build(&descriptor, None, "noreply@localhost").unwrap();

        let result = session.send_message(&message).await;

        assert!(matches!(result, Err(DeliveryError::Transmission(_))));
        session.close().await;
    }
}
