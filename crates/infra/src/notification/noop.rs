//! Noop 送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発やメール無効化時に使用する。

use async_trait::async_trait;
use moneymanager_domain::notification::DeliveryError;

use super::{message::OutgoingMessage, transport::BasicSender};

/// Noop 送信（ログ出力のみ）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailSender;

#[async_trait]
impl BasicSender for NoopMailSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let recipients: Vec<String> = message.recipients().iter().map(ToString::to_string).collect();
        tracing::info!(
            to = ?recipients,
            subject = %message.subject(),
            attachment = ?message.attachment_filename(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
