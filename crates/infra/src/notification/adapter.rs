//! メールトランスポートアダプタ
//!
//! 直接送信を試み、利用できなければ標準送信にフォールバックする。
//! 直接送信側の失敗はすべて吸収し、呼び出し元に返すのはメッセージ構築の失敗と
//! フォールバック送信の失敗のみ。
//!
//! 送信ごとに設定を読み込み、セッションも送信ごとに開くため、
//! 同じアダプタを複数タスクから同時に使ってよい。

use std::sync::Arc;

use lettre::Address;
use moneymanager_domain::notification::{
    DeliveryError,
    DeliveryEvent,
    DeliveryOutcome,
    MessageDescriptor,
    SenderIdentity,
    SenderSource,
};

use super::{
    message::OutgoingMessage,
    observer::{DeliveryObserver, TracingDeliveryObserver},
    settings::MailSettingsSource,
    transport::{ConnectionSettings, ControllableSender, MailSender},
};

/// フォールバックした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    /// 送信手段が接続制御を持たない
    BasicSenderOnly,
    /// ホストが設定されていない
    HostNotConfigured,
    /// セッションを開けなかった（未対応プロトコルなど）
    SessionUnavailable,
    ConnectFailed,
    /// 送信エラー、または受け付けられた受信者がいない
    TransmissionFailed,
}

/// 実際に使われた送信経路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Direct,
    Fallback(FallbackReason),
}

impl std::fmt::Display for DeliveryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Fallback(reason) => write!(f, "fallback({reason})"),
        }
    }
}

/// 送信結果
///
/// `outcome` は直接送信で観測できた場合のみ `Some`。
/// `absorbed` はフォールバックで吸収した直接送信側のエラー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub path:     DeliveryPath,
    pub outcome:  Option<DeliveryOutcome>,
    pub absorbed: Option<DeliveryError>,
}

impl SendReport {
    pub fn is_direct(&self) -> bool {
        self.path == DeliveryPath::Direct
    }
}

/// 直接送信が使えなかったときの理由と原因
struct DirectFailure {
    reason: FallbackReason,
    error:  Option<DeliveryError>,
}

impl DirectFailure {
    fn new(reason: FallbackReason, error: Option<DeliveryError>) -> Self {
        Self { reason, error }
    }
}

/// メールトランスポートアダプタ
#[derive(Clone)]
pub struct MailTransportAdapter {
    sender:    MailSender,
    settings:  Arc<dyn MailSettingsSource>,
    observers: Vec<Arc<dyn DeliveryObserver>>,
}

impl MailTransportAdapter {
    /// ログ出力の観測者を登録した状態で作成する
    pub fn new(sender: MailSender, settings: Arc<dyn MailSettingsSource>) -> Self {
        Self {
            sender,
            settings,
            observers: vec![Arc::new(TracingDeliveryObserver)],
        }
    }

    /// 観測者を追加する
    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// メッセージを送信する
    ///
    /// # エラー
    ///
    /// - [`DeliveryError::Construction`]: メッセージを組み立てられない
    /// - [`DeliveryError::Fallback`]: フォールバック送信が失敗した
    #[tracing::instrument(
        skip_all,
        fields(recipient = %descriptor.recipient(), path = tracing::field::Empty)
    )]
    pub async fn send(&self, descriptor: &MessageDescriptor) -> Result<SendReport, DeliveryError> {
        let settings = self.settings.current();
        let connection = self.sender.connection_settings();

        let sender = SenderIdentity::resolve(
            settings.from_address.as_deref(),
            connection.as_ref().and_then(|c| c.username.as_deref()),
        )
        .filter(usable_sender);
        match &sender {
            Some(identity) => tracing::debug!(
                from = %identity.address(),
                source = %identity.source(),
                "送信元を解決しました"
            ),
            None => tracing::debug!(
                default_sender = %settings.default_sender,
                "送信元が未設定のため既定の送信元を使用します"
            ),
        }

        let message = OutgoingMessage::build(descriptor, sender.as_ref(), &settings.default_sender)?;

        let failure = match (&self.sender, connection) {
            (MailSender::Controllable(controllable), Some(connection)) => {
                match self
                    .send_direct(controllable.as_ref(), &connection, &message)
                    .await
                {
                    Ok(outcome) => {
                        tracing::Span::current().record("path", "direct");
                        return Ok(SendReport {
                            path:     DeliveryPath::Direct,
                            outcome:  Some(outcome),
                            absorbed: None,
                        });
                    }
                    Err(failure) => failure,
                }
            }
            _ => DirectFailure::new(FallbackReason::BasicSenderOnly, None),
        };

        self.send_fallback(&message, failure).await
    }

    async fn send_direct(
        &self,
        sender: &dyn ControllableSender,
        connection: &ConnectionSettings,
        message: &OutgoingMessage,
    ) -> Result<DeliveryOutcome, DirectFailure> {
        let Some(host) = connection.configured_host() else {
            return Err(DirectFailure::new(FallbackReason::HostNotConfigured, None));
        };

        let mut session = sender
            .open_session(&connection.protocol)
            .map_err(|e| DirectFailure::new(FallbackReason::SessionUnavailable, Some(e)))?;

        if let Err(e) = session
            .connect(host, connection.port, &connection.credentials())
            .await
        {
            session.close().await;
            return Err(DirectFailure::new(FallbackReason::ConnectFailed, Some(e)));
        }

        let result = session.send_message(message).await;
        session.close().await;

        let report =
            result.map_err(|e| DirectFailure::new(FallbackReason::TransmissionFailed, Some(e)))?;
        let event = report.event();
        self.emit(&event);

        if event.outcome == DeliveryOutcome::NotDelivered {
            return Err(DirectFailure::new(
                FallbackReason::TransmissionFailed,
                Some(DeliveryError::Transmission(format!(
                    "受け付けられた受信者がいません (invalid={}, valid_unsent={})",
                    event.invalid, event.valid_unsent
                ))),
            ));
        }

        Ok(event.outcome)
    }

    async fn send_fallback(
        &self,
        message: &OutgoingMessage,
        failure: DirectFailure,
    ) -> Result<SendReport, DeliveryError> {
        let path = DeliveryPath::Fallback(failure.reason);
        tracing::Span::current().record("path", tracing::field::display(path));

        match &failure.error {
            Some(error) => tracing::warn!(
                reason = %failure.reason,
                error = %error,
                "直接送信に失敗したため標準送信にフォールバックします"
            ),
            None => tracing::debug!(reason = %failure.reason, "標準送信を使用します"),
        }

        self.sender.send_basic(message).await.map_err(|e| {
            tracing::error!(
                error = %e,
                absorbed = ?failure.error,
                "フォールバック送信に失敗しました"
            );
            DeliveryError::Fallback(e.cause().to_string())
        })?;

        Ok(SendReport {
            path,
            outcome: None,
            absorbed: failure.error,
        })
    }

    fn emit(&self, event: &DeliveryEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

/// トランスポートのユーザー名がアドレスとして使えるか
///
/// `apikey` のようなユーザー名は送信元にせず、既定の送信元に任せる。
fn usable_sender(identity: &SenderIdentity) -> bool {
    if identity.source() != SenderSource::TransportUsername
        || identity.address().parse::<Address>().is_ok()
    {
        return true;
    }

    tracing::warn!(
        username = %identity.address(),
        "トランスポートのユーザー名がアドレスではないため既定の送信元を使用します"
    );
    false
}

#[cfg(test)]
mod tests {
    use moneymanager_domain::notification::Attachment;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        mock::{RecordingBasicSender, ScriptedControllableSender},
        notification::{
            ChannelDeliveryObserver,
            DeliveryReport,
            MailSettings,
            SessionCredentials,
            StaticMailSettings,
        },
    };

    fn connection(host: Option<&str>) -> ConnectionSettings {
        ConnectionSettings {
            host:     host.map(str::to_string),
            port:     2525,
            username: Some("svc@example.com".to_string()),
            password: Some("secret".to_string()),
            protocol: "smtp".to_string(),
        }
    }

    fn settings(from_address: Option<&str>) -> Arc<StaticMailSettings> {
        Arc::new(StaticMailSettings::new(MailSettings {
            from_address: from_address.map(str::to_string),
            ..MailSettings::default()
        }))
    }

    fn descriptor(recipient: &str) -> MessageDescriptor {
        MessageDescriptor::new(recipient, "Welcome", "<p>Hi</p>", None).unwrap()
    }

    fn controllable_adapter(sender: &ScriptedControllableSender) -> MailTransportAdapter {
        MailTransportAdapter::new(
            MailSender::Controllable(Arc::new(sender.clone())),
            settings(None),
        )
    }

    #[tokio::test]
    async fn test_直接送信で全員に配送できる() {
        // Given
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let (observer, mut events) = ChannelDeliveryObserver::new();
        let adapter = controllable_adapter(&sender).with_observer(Arc::new(observer));

        // When
        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        // Then
        assert_eq!(report.path, DeliveryPath::Direct);
        assert_eq!(report.outcome, Some(DeliveryOutcome::Delivered));
        assert_eq!(report.absorbed, None);
        assert_eq!(sender.fallback_sent().len(), 0);
        assert_eq!(sender.direct_sent().len(), 1);
        assert_eq!(sender.direct_sent()[0].recipients, vec!["a@b.com".to_string()]);

        let event = events.try_recv().unwrap();
        assert_eq!(event.outcome, DeliveryOutcome::Delivered);
        assert_eq!(event.valid_sent, 1);
    }

    #[tokio::test]
    async fn test_直接送信では設定の認証情報で接続しセッションを閉じる() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = controllable_adapter(&sender);

        adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(sender.opened(), 1);
        assert_eq!(sender.connected(), 1);
        assert_eq!(sender.closed(), 1);
        assert_eq!(
            sender.credentials_used(),
            vec![SessionCredentials::UsernamePassword {
                username: "svc@example.com".to_string(),
                password: "secret".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_基本送信手段はセッションを開かずに標準送信する() {
        // Given
        let sender = RecordingBasicSender::new();
        let adapter =
            MailTransportAdapter::new(MailSender::Basic(Arc::new(sender.clone())), settings(None));

        // When
        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        // Then
        assert_eq!(
            report.path,
            DeliveryPath::Fallback(FallbackReason::BasicSenderOnly)
        );
        assert_eq!(report.outcome, None);
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_接続失敗時はフォールバックで1回だけ送信する() {
        // Given
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .fail_connect("connection refused");
        let adapter = controllable_adapter(&sender);

        // When
        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        // Then
        assert_eq!(report.path, DeliveryPath::Fallback(FallbackReason::ConnectFailed));
        assert_eq!(
            report.absorbed,
            Some(DeliveryError::Connection("connection refused".to_string()))
        );
        assert_eq!(sender.fallback_sent().len(), 1);
        assert_eq!(sender.direct_sent().len(), 0);
        assert_eq!(sender.closed(), 1);
    }

    #[tokio::test]
    async fn test_送信失敗時はセッションを閉じてフォールバックする() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .fail_transmission("connection reset");
        let adapter = controllable_adapter(&sender);

        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(
            report.path,
            DeliveryPath::Fallback(FallbackReason::TransmissionFailed)
        );
        assert_eq!(sender.connected(), 1);
        assert_eq!(sender.closed(), 1);
        assert_eq!(sender.fallback_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_誰にも配送されなければフォールバックする() {
        // Given
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .with_report(DeliveryReport {
                valid_sent:   vec![],
                invalid:      vec!["a@b.com".to_string()],
                valid_unsent: vec![],
            });
        let (observer, mut events) = ChannelDeliveryObserver::new();
        let adapter = controllable_adapter(&sender).with_observer(Arc::new(observer));

        // When
        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        // Then
        assert_eq!(
            report.path,
            DeliveryPath::Fallback(FallbackReason::TransmissionFailed)
        );
        assert!(matches!(report.absorbed, Some(DeliveryError::Transmission(_))));
        assert_eq!(events.try_recv().unwrap().outcome, DeliveryOutcome::NotDelivered);
        assert_eq!(sender.fallback_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_一部配送は成功として扱いフォールバックしない() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .with_report(DeliveryReport {
                valid_sent:   vec!["a@b.com".to_string()],
                invalid:      vec![],
                valid_unsent: vec!["c@d.com".to_string()],
            });
        let adapter = controllable_adapter(&sender);

        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(report.path, DeliveryPath::Direct);
        assert_eq!(report.outcome, Some(DeliveryOutcome::PartiallyDelivered));
        assert_eq!(sender.fallback_sent().len(), 0);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("   "))]
    #[tokio::test]
    async fn test_ホスト未設定ならセッションを開かない(#[case] host: Option<&str>) {
        let sender = ScriptedControllableSender::new(connection(host));
        let adapter = controllable_adapter(&sender);

        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(
            report.path,
            DeliveryPath::Fallback(FallbackReason::HostNotConfigured)
        );
        assert_eq!(sender.opened(), 0);
        assert_eq!(sender.fallback_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_未対応プロトコルはフォールバックする() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .unsupported_protocol();
        let adapter = controllable_adapter(&sender);

        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(
            report.path,
            DeliveryPath::Fallback(FallbackReason::SessionUnavailable)
        );
        assert_eq!(sender.connected(), 0);
        assert_eq!(sender.fallback_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_フォールバック失敗は原因付きで返す() {
        // Given
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")))
            .fail_connect("connection refused")
            .fail_fallback("relay unavailable");
        let adapter = controllable_adapter(&sender);

        // When
        let result = adapter.send(&descriptor("a@b.com")).await;

        // Then
        assert_eq!(
            result,
            Err(DeliveryError::Fallback("relay unavailable".to_string()))
        );
    }

    #[tokio::test]
    async fn test_送信元未設定ならトランスポートのユーザー名を使う() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = controllable_adapter(&sender);

        adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(
            sender.direct_sent()[0].from.as_deref(),
            Some("svc@example.com")
        );
    }

    #[tokio::test]
    async fn test_アドレスでないユーザー名は既定の送信元で送信する() {
        // Given: SendGrid のように API キー用の固定ユーザー名を使うリレー
        let sender = ScriptedControllableSender::new(ConnectionSettings {
            host:     Some("smtp.sendgrid.net".to_string()),
            port:     587,
            username: Some("apikey".to_string()),
            password: Some("SG.secret".to_string()),
            protocol: "smtp".to_string(),
        });
        let adapter = controllable_adapter(&sender);

        // When
        let report = adapter.send(&descriptor("a@b.com")).await.unwrap();

        // Then
        assert_eq!(report.path, DeliveryPath::Direct);
        assert_eq!(sender.direct_sent().len(), 1);
        assert_eq!(
            sender.direct_sent()[0].from.as_deref(),
            Some("noreply@localhost")
        );
    }

    #[tokio::test]
    async fn test_設定の送信元がユーザー名より優先される() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = MailTransportAdapter::new(
            MailSender::Controllable(Arc::new(sender.clone())),
            settings(Some("noreply@example.com")),
        );

        adapter.send(&descriptor("a@b.com")).await.unwrap();

        assert_eq!(
            sender.direct_sent()[0].from.as_deref(),
            Some("noreply@example.com")
        );
    }

    #[tokio::test]
    async fn test_添付はちょうど1つ含まれる() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = controllable_adapter(&sender);
        let attachment = Attachment::new("report.pdf", b"%PDF".to_vec()).unwrap();
        let descriptor =
            MessageDescriptor::new("a@b.com", "Report", "<p>attached</p>", Some(attachment))
                .unwrap();

        adapter.send(&descriptor).await.unwrap();

        let sent = sender.direct_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachment_filename.as_deref(), Some("report.pdf"));
    }

    #[tokio::test]
    async fn test_同時送信は互いに干渉しない() {
        // Given
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = controllable_adapter(&sender);
        let first = descriptor("first@example.com");
        let second = descriptor("second@example.com");

        // When
        let (r1, r2) = tokio::join!(adapter.send(&first), adapter.send(&second));

        // Then
        assert!(r1.unwrap().is_direct());
        assert!(r2.unwrap().is_direct());
        assert_eq!(sender.opened(), 2);
        assert_eq!(sender.closed(), 2);

        let mut recipients: Vec<Vec<String>> = sender
            .direct_sent()
            .into_iter()
            .map(|mail| mail.recipients)
            .collect();
        recipients.sort();
        assert_eq!(
            recipients,
            vec![
                vec!["first@example.com".to_string()],
                vec!["second@example.com".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_構築に失敗した場合は送信を試みない() {
        let sender = ScriptedControllableSender::new(connection(Some("smtp.example.com")));
        let adapter = MailTransportAdapter::new(
            MailSender::Controllable(Arc::new(sender.clone())),
            settings(Some("not an address")),
        );

        let result = adapter.send(&descriptor("a@b.com")).await;

        assert!(matches!(result, Err(DeliveryError::Construction(_))));
        assert_eq!(sender.opened(), 0);
        assert_eq!(sender.fallback_sent().len(), 0);
    }
}
