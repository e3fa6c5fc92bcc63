//! # 通知サービス
//!
//! メール通知の窓口。メッセージを組み立ててトランスポートアダプタに渡し、
//! 失敗を [`NotificationError`] にまとめて返す。
//!
//! ## エラーの扱い
//!
//! | 操作 | 組み立て失敗 | 送信失敗 |
//! |------|-------------|---------|
//! | [`notify`](NotificationService::notify) | `SendFailed` | `SendFailed` |
//! | [`notify_with_attachment`](NotificationService::notify_with_attachment) | `Construction` | `SendFailed` |
//!
//! 添付付き送信だけは組み立ての失敗をそのまま返す。

use moneymanager_domain::notification::{
    Attachment,
    DeliveryError,
    MessageDescriptor,
    NotificationError,
};
use moneymanager_infra::notification::{MailTransportAdapter, SendReport};
use moneymanager_shared::{event_log::event, log_business_event};

/// 通知サービス
#[derive(Clone)]
pub struct NotificationService {
    adapter: MailTransportAdapter,
}

impl NotificationService {
    pub fn new(adapter: MailTransportAdapter) -> Self {
        Self { adapter }
    }

    /// HTML 本文のメールを送信する
    ///
    /// どの段階で失敗しても [`NotificationError::SendFailed`] を返す。
    #[tracing::instrument(skip_all, fields(recipient = %recipient))]
    pub async fn notify(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        let result = match MessageDescriptor::new(recipient, subject, body, None) {
            Ok(descriptor) => self.adapter.send(&descriptor).await,
            Err(e) => Err(e),
        };

        record(recipient, result).map_err(|e| NotificationError::SendFailed(e.cause().to_string()))
    }

    /// 添付ファイル付きのメールを送信する
    ///
    /// メッセージを組み立てられない場合は [`NotificationError::Construction`] をそのまま返す。
    #[tracing::instrument(skip_all, fields(recipient = %recipient, filename = %filename))]
    pub async fn notify_with_attachment(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachment: Vec<u8>,
        filename: &str,
    ) -> Result<(), NotificationError> {
        let attachment = Attachment::new(filename, attachment).map_err(construction)?;
        let descriptor =
            MessageDescriptor::new(recipient, subject, body, Some(attachment)).map_err(construction)?;

        let result = self.adapter.send(&descriptor).await;

        record(recipient, result).map_err(|e| match e {
            DeliveryError::Construction(cause) => NotificationError::Construction(cause),
            other => NotificationError::SendFailed(other.cause().to_string()),
        })
    }
}

fn construction(e: DeliveryError) -> NotificationError {
    NotificationError::Construction(e.cause().to_string())
}

/// 送信結果をビジネスイベントとして記録する
fn record(
    recipient: &str,
    result: Result<SendReport, DeliveryError>,
) -> Result<(), DeliveryError> {
    match result {
        Ok(report) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.entity_type = event::entity_type::NOTIFICATION,
                event.result = event::result::SUCCESS,
                notification.recipient = %recipient,
                notification.path = %report.path,
                "通知メール送信成功"
            );
            Ok(())
        }
        Err(e) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.entity_type = event::entity_type::NOTIFICATION,
                event.result = event::result::FAILURE,
                notification.recipient = %recipient,
                error = %e,
                "通知メール送信失敗"
            );
            Err(e)
        }
    }
}
