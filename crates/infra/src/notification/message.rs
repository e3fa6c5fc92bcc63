//! 送信用メッセージ
//!
//! [`MessageDescriptor`] を lettre の [`Message`] に変換したもの。
//! 直接送信とフォールバックの両経路で同じインスタンスを使う。

use lettre::{
    Address,
    Message,
    address::Envelope,
    message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart, header::ContentType},
};
use moneymanager_domain::notification::{DeliveryError, MessageDescriptor, SenderIdentity};

/// 構築済みの送信用メッセージ
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    message:             Message,
    subject:             String,
    html_body:           String,
    sender:              Option<SenderIdentity>,
    attachment_filename: Option<String>,
}

impl OutgoingMessage {
    /// 記述子からメッセージを構築する
    ///
    /// 送信元が解決できていない場合は `default_sender` を From に使う。
    /// 本文は常に `text/html` として扱い、添付がある場合は
    /// `multipart/mixed` で本文と添付を 1 パートずつ格納する。
    pub fn build(
        descriptor: &MessageDescriptor,
        sender: Option<&SenderIdentity>,
        default_sender: &str,
    ) -> Result<Self, DeliveryError> {
        let from_address = sender.map_or(default_sender, SenderIdentity::address);
        let from: Mailbox = from_address.parse().map_err(|e| {
            DeliveryError::Construction(format!("送信元アドレスが不正です ({from_address}): {e}"))
        })?;
        let to: Mailbox = descriptor.recipient().as_str().parse().map_err(|e| {
            DeliveryError::Construction(format!(
                "宛先アドレスが不正です ({}): {e}",
                descriptor.recipient()
            ))
        })?;

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(descriptor.subject());

        let message = match descriptor.attachment() {
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(descriptor.body().to_string()),
            Some(attachment) => {
                let content_type = ContentType::parse(attachment.content_type()).map_err(|e| {
                    DeliveryError::Construction(format!("添付の Content-Type が不正です: {e}"))
                })?;
                let part = MimeAttachment::new(attachment.filename().to_string())
                    .body(attachment.bytes().to_vec(), content_type);

                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::html(descriptor.body().to_string()))
                        .singlepart(part),
                )
            }
        }
        .map_err(|e| DeliveryError::Construction(format!("メッセージの組み立てに失敗: {e}")))?;

        Ok(Self {
            message,
            subject: descriptor.subject().to_string(),
            html_body: descriptor.body().to_string(),
            sender: sender.cloned(),
            attachment_filename: descriptor.attachment().map(|a| a.filename().to_string()),
        })
    }

    /// lettre のメッセージ
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// SMTP エンベロープ（MAIL FROM / RCPT TO）
    pub fn envelope(&self) -> &Envelope {
        self.message.envelope()
    }

    /// 全受信者
    pub fn recipients(&self) -> &[Address] {
        self.envelope().to()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// エンコード前の HTML 本文
    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    /// 解決済みの送信元（未解決なら `None`）
    pub fn sender(&self) -> Option<&SenderIdentity> {
        self.sender.as_ref()
    }

    /// エンベロープ上の送信元アドレス
    pub fn from_address(&self) -> Option<&Address> {
        self.envelope().from()
    }

    pub fn attachment_filename(&self) -> Option<&str> {
        self.attachment_filename.as_deref()
    }

    /// RFC 5322 形式にエンコードしたメッセージ
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

#[cfg(test)]
mod tests {
    use moneymanager_domain::notification::{Attachment, SenderSource};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn formatted_text(message: &OutgoingMessage) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[rstest]
    fn test_添付なしはhtml単一パートになる() {
        let descriptor =
            MessageDescriptor::new("a@b.com", "Welcome", "<p>Hi</p>", None).unwrap();
        let sender = SenderIdentity::resolve(Some("noreply@example.com"), None).unwrap();

        let message = OutgoingMessage::build(&descriptor, Some(&sender), "x@localhost").unwrap();

        let text = formatted_text(&message);
        assert!(text.contains("Content-Type: text/html"));
        assert!(!text.contains("multipart/mixed"));
        assert_eq!(message.attachment_filename(), None);
        assert_eq!(
            message.from_address().map(ToString::to_string).as_deref(),
            Some("noreply@example.com")
        );
        assert_eq!(message.recipients().len(), 1);
        assert_eq!(message.recipients()[0].to_string(), "a@b.com");
    }

    #[rstest]
    fn test_添付ありはmultipartで添付を1つ含む() {
        let attachment = Attachment::new("report.pdf", b"%PDF-1.4".to_vec()).unwrap();
        let descriptor =
            MessageDescriptor::new("a@b.com", "Report", "<p>See attached</p>", Some(attachment))
                .unwrap();

        let message = OutgoingMessage::build(&descriptor, None, "noreply@localhost").unwrap();

        let text = formatted_text(&message);
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("application/pdf"));
        assert!(text.contains("filename=\"report.pdf\""));
        assert_eq!(message.attachment_filename(), Some("report.pdf"));
    }

    #[rstest]
    fn test_送信元未解決なら既定の送信元を使う() {
        let descriptor = MessageDescriptor::new("a@b.com", "Hi", "body", None).unwrap();

        let message = OutgoingMessage::build(&descriptor, None, "noreply@localhost").unwrap();

        assert_eq!(message.sender(), None);
        assert_eq!(
            message.from_address().map(ToString::to_string).as_deref(),
            Some("noreply@localhost")
        );
    }

    #[rstest]
    fn test_トランスポートのユーザー名から解決した送信元を保持する() {
        let descriptor = MessageDescriptor::new("a@b.com", "Hi", "body", None).unwrap();
        let sender = SenderIdentity::resolve(None, Some("svc@example.com")).unwrap();

        let message =
            OutgoingMessage::build(&descriptor, Some(&sender), "noreply@localhost").unwrap();

        assert_eq!(
            message.sender().map(SenderIdentity::source),
            Some(SenderSource::TransportUsername)
        );
        assert_eq!(
            message.from_address().map(ToString::to_string).as_deref(),
            Some("svc@example.com")
        );
    }

    #[rstest]
    fn test_送信元アドレスが不正なら構築エラー() {
        let descriptor = MessageDescriptor::new("a@b.com", "Hi", "body", None).unwrap();
        let sender = SenderIdentity::resolve(Some("not an address"), None).unwrap();

        let result = OutgoingMessage::build(&descriptor, Some(&sender), "noreply@localhost");

        assert!(matches!(result, Err(DeliveryError::Construction(_))));
    }
}
