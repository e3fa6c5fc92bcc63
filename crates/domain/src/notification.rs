//! # 通知
//!
//! メール通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`MessageDescriptor`] | 送信するメッセージの記述（宛先・件名・本文・添付） |
//! | [`Attachment`] | 添付ファイル（1 通につき最大 1 つ） |
//! | [`SenderIdentity`] | 送信元アドレス。送信のたびに解決する |
//! | [`DeliveryOutcome`] | 配送結果（全員 / 一部 / 配送なし） |
//! | [`DeliveryEvent`] | 配送結果と受信者数の組。観測用 |
//!
//! ## 設計方針
//!
//! - **構築時検証**: `MessageDescriptor` は宛先・件名が空でないことを保証する
//! - **不変**: 記述子は構築後に変更しない。送信試行が終われば破棄される
//! - **観測と契約の分離**: `DeliveryOutcome` はログ・イベント用であり、
//!   ファサードの成否（成功 / 失敗）には影響しない

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::Email;

/// 配送エラー
///
/// 送信経路の各段階で発生しうる失敗。`Connection` と `Transmission` は
/// 低レベル経路の失敗でありフォールバックで吸収される。呼び出し元に届くのは
/// `Fallback` と `Construction` のみ。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 低レベル接続に失敗（吸収される）
    #[error("トランスポート接続に失敗: {0}")]
    Connection(String),

    /// 接続後の送信に失敗（吸収される）
    #[error("トランスポート送信に失敗: {0}")]
    Transmission(String),

    /// フォールバック送信に失敗（呼び出し元に報告される）
    #[error("フォールバック送信に失敗: {0}")]
    Fallback(String),

    /// メッセージの構築に失敗（呼び出し元に報告される）
    #[error("メッセージの構築に失敗: {0}")]
    Construction(String),
}

impl DeliveryError {
    /// 根本原因の説明文を返す
    pub fn cause(&self) -> &str {
        match self {
            Self::Connection(cause)
            | Self::Transmission(cause)
            | Self::Fallback(cause)
            | Self::Construction(cause) => cause,
        }
    }

    /// フォールバックで吸収される種類かどうか
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Transmission(_))
    }
}

/// 通知ファサードが返すエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// メッセージの構築に失敗（添付付き送信でのみラップされずに返る）
    #[error("メッセージの構築に失敗: {0}")]
    Construction(String),

    /// メール送信に失敗
    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

/// 添付ファイル
///
/// ファイル名は必須。内容は空でもよい。
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    filename:     String,
    content_type: &'static str,
    bytes:        Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// 添付ファイルを作成する
    ///
    /// Content-Type はファイル名の拡張子から決める。
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DeliveryError> {
        let filename = filename.into().trim().to_string();
        if filename.is_empty() {
            return Err(DeliveryError::Construction(
                "添付ファイル名は必須です".to_string(),
            ));
        }

        Ok(Self {
            content_type: content_type_for(&filename),
            filename,
            bytes,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// 拡張子から Content-Type を推定する
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// メッセージ記述子
///
/// 本文は常に HTML として扱う（プレーンテキストも HTML として表示可能）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    recipient:  Email,
    subject:    String,
    body:       String,
    attachment: Option<Attachment>,
}

impl MessageDescriptor {
    /// メッセージ記述子を作成する
    ///
    /// # エラー
    ///
    /// 宛先がメールアドレスの形をしていない、または件名が空の場合は
    /// [`DeliveryError::Construction`] を返す。
    pub fn new(
        recipient: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> Result<Self, DeliveryError> {
        let recipient = Email::new(recipient)
            .map_err(|e| DeliveryError::Construction(format!("宛先が不正です: {e}")))?;

        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(DeliveryError::Construction("件名は必須です".to_string()));
        }

        Ok(Self {
            recipient,
            subject,
            body: body.into(),
            attachment,
        })
    }

    pub fn recipient(&self) -> &Email {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

/// 送信元アドレスの出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SenderSource {
    /// 設定で明示された送信元
    Configured,
    /// トランスポート認証情報のユーザー名
    TransportUsername,
}

/// 送信元アドレス
///
/// 送信のたびに解決し、キャッシュしない。設定を書き換えることもない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    address: String,
    source:  SenderSource,
}

impl SenderIdentity {
    /// 送信元を解決する
    ///
    /// 空白でない設定値を優先し、なければトランスポートのユーザー名を使う。
    /// どちらもなければ `None`（トランスポートの既定値に任せる）。
    pub fn resolve(configured: Option<&str>, transport_username: Option<&str>) -> Option<Self> {
        let non_blank = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(address) = non_blank(configured) {
            return Some(Self {
                address,
                source: SenderSource::Configured,
            });
        }

        non_blank(transport_username).map(|address| Self {
            address,
            source: SenderSource::TransportUsername,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn source(&self) -> SenderSource {
        self.source
    }
}

/// 配送結果
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryOutcome {
    /// 全受信者に配送された
    Delivered,
    /// 一部の受信者が拒否された
    PartiallyDelivered,
    /// 誰にも配送されなかった
    NotDelivered,
}

impl DeliveryOutcome {
    /// 受信者数から配送結果を決める
    pub fn from_counts(valid_sent: usize, invalid: usize, valid_unsent: usize) -> Self {
        match (valid_sent, invalid + valid_unsent) {
            (0, _) => Self::NotDelivered,
            (_, 0) => Self::Delivered,
            _ => Self::PartiallyDelivered,
        }
    }
}

/// 配送イベント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub outcome:      DeliveryOutcome,
    /// 受け付けられた受信者数
    pub valid_sent:   usize,
    /// 恒久的に拒否された受信者数
    pub invalid:      usize,
    /// 一時的な理由で送れなかった受信者数
    pub valid_unsent: usize,
}

impl DeliveryEvent {
    pub fn from_counts(valid_sent: usize, invalid: usize, valid_unsent: usize) -> Self {
        Self {
            outcome: DeliveryOutcome::from_counts(valid_sent, invalid, valid_unsent),
            valid_sent,
            invalid,
            valid_unsent,
        }
    }
}
