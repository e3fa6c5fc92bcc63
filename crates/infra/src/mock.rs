//! # テスト用モック
//!
//! ユースケース・アダプタのテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! moneymanager-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use moneymanager_domain::{
    notification::DeliveryError,
    profile::{ActivationToken, Email, Profile, ProfileId},
};

use crate::{
    error::InfraError,
    notification::{
        BasicSender,
        ConnectionSettings,
        ControllableSender,
        DeliveryReport,
        OutgoingMessage,
        SessionCredentials,
        TransportSession,
    },
    repository::ProfileRepository,
};

// ===== MockProfileRepository =====

#[derive(Clone, Default)]
pub struct MockProfileRepository {
    profiles: Arc<Mutex<Vec<Profile>>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: Profile) {
        self.profiles.lock().unwrap().push(profile);
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.profiles.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn insert(&self, profile: &Profile) -> Result<(), InfraError> {
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.iter().any(|p| p.email() == profile.email()) {
            return Err(InfraError::conflict("Profile", profile.email().as_str()));
        }
        profiles.push(profile.clone());
        Ok(())
    }

    async fn exists_by_email(&self, email: &Email) -> Result<bool, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.email() == email))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.email() == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned())
    }

    async fn find_by_activation_token(
        &self,
        token: &ActivationToken,
    ) -> Result<Option<Profile>, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.activation_token() == Some(token))
            .cloned())
    }

    async fn update_activation(
        &self,
        profile: &Profile,
        consumed: &ActivationToken,
    ) -> Result<bool, InfraError> {
        let mut profiles = self.profiles.lock().unwrap();
        let Some(stored) = profiles
            .iter_mut()
            .find(|p| p.id() == profile.id() && p.activation_token() == Some(consumed))
        else {
            return Ok(false);
        };
        *stored = profile.clone();
        Ok(true)
    }

    async fn delete(&self, id: &ProfileId) -> Result<(), InfraError> {
        self.profiles.lock().unwrap().retain(|p| p.id() != id);
        Ok(())
    }
}

// ===== メール送信 =====

/// 送信されたメールの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from:                Option<String>,
    pub recipients:          Vec<String>,
    pub subject:             String,
    pub attachment_filename: Option<String>,
    /// エンコード前の HTML 本文
    pub html_body:           String,
    /// RFC 5322 形式の本文（ヘッダ含む）
    pub raw:                 String,
}

impl From<&OutgoingMessage> for SentMail {
    fn from(message: &OutgoingMessage) -> Self {
        Self {
            from:                message.from_address().map(ToString::to_string),
            recipients:          message.recipients().iter().map(ToString::to_string).collect(),
            subject:             message.subject().to_string(),
            attachment_filename: message.attachment_filename().map(str::to_string),
            html_body:           message.html_body().to_string(),
            raw:                 String::from_utf8_lossy(&message.formatted()).into_owned(),
        }
    }
}

/// 送信内容を記録する標準送信手段
#[derive(Clone, Default)]
pub struct RecordingBasicSender {
    sent:    Arc<Mutex<Vec<SentMail>>>,
    failure: Option<String>,
}

impl RecordingBasicSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に失敗する送信手段
    pub fn failing(cause: impl Into<String>) -> Self {
        Self {
            sent:    Arc::default(),
            failure: Some(cause.into()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BasicSender for RecordingBasicSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        if let Some(cause) = &self.failure {
            return Err(DeliveryError::Transmission(cause.clone()));
        }
        self.sent.lock().unwrap().push(SentMail::from(message));
        Ok(())
    }
}

/// セッションの振る舞い
#[derive(Clone, Default)]
struct SessionScript {
    connect_error:        Option<String>,
    transmission_error:   Option<String>,
    report:               Option<DeliveryReport>,
    unsupported_protocol: bool,
}

#[derive(Default)]
struct SessionCounters {
    opened:      AtomicUsize,
    connected:   AtomicUsize,
    closed:      AtomicUsize,
    credentials: Mutex<Vec<SessionCredentials>>,
    direct_sent: Mutex<Vec<SentMail>>,
}

/// 筋書きどおりに振る舞う接続制御可能な送信手段
///
/// 直接送信とフォールバック送信の内容をそれぞれ記録する。
#[derive(Clone)]
pub struct ScriptedControllableSender {
    connection: ConnectionSettings,
    script:     SessionScript,
    fallback:   RecordingBasicSender,
    counters:   Arc<SessionCounters>,
}

impl ScriptedControllableSender {
    /// 全受信者を受け付けるセッションを開く送信手段
    pub fn new(connection: ConnectionSettings) -> Self {
        Self {
            connection,
            script: SessionScript::default(),
            fallback: RecordingBasicSender::new(),
            counters: Arc::default(),
        }
    }

    pub fn fail_connect(mut self, cause: impl Into<String>) -> Self {
        self.script.connect_error = Some(cause.into());
        self
    }

    pub fn fail_transmission(mut self, cause: impl Into<String>) -> Self {
        self.script.transmission_error = Some(cause.into());
        self
    }

    /// 直接送信の結果を固定する
    pub fn with_report(mut self, report: DeliveryReport) -> Self {
        self.script.report = Some(report);
        self
    }

    pub fn unsupported_protocol(mut self) -> Self {
        self.script.unsupported_protocol = true;
        self
    }

    pub fn fail_fallback(mut self, cause: impl Into<String>) -> Self {
        self.fallback = RecordingBasicSender::failing(cause);
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn connected(&self) -> usize {
        self.counters.connected.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn credentials_used(&self) -> Vec<SessionCredentials> {
        self.counters.credentials.lock().unwrap().clone()
    }

    pub fn direct_sent(&self) -> Vec<SentMail> {
        self.counters.direct_sent.lock().unwrap().clone()
    }

    pub fn fallback_sent(&self) -> Vec<SentMail> {
        self.fallback.sent()
    }
}

#[async_trait]
impl BasicSender for ScriptedControllableSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        self.fallback.send(message).await
    }
}

impl ControllableSender for ScriptedControllableSender {
    fn connection_settings(&self) -> ConnectionSettings {
        self.connection.clone()
    }

    fn open_session(&self, protocol: &str) -> Result<Box<dyn TransportSession>, DeliveryError> {
        if self.script.unsupported_protocol {
            return Err(DeliveryError::Connection(format!(
                "未対応のプロトコルです: {protocol}"
            )));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script:    self.script.clone(),
            counters:  self.counters.clone(),
            connected: false,
        }))
    }
}

struct ScriptedSession {
    script:    SessionScript,
    counters:  Arc<SessionCounters>,
    connected: bool,
}

#[async_trait]
impl TransportSession for ScriptedSession {
    async fn connect(
        &mut self,
        _host: &str,
        _port: u16,
        credentials: &SessionCredentials,
    ) -> Result<(), DeliveryError> {
        self.counters
            .credentials
            .lock()
            .unwrap()
            .push(credentials.clone());
        if let Some(cause) = &self.script.connect_error {
            return Err(DeliveryError::Connection(cause.clone()));
        }
        self.counters.connected.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn send_message(
        &mut self,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReport, DeliveryError> {
        if !self.connected {
            return Err(DeliveryError::Transmission("未接続です".to_string()));
        }
        if let Some(cause) = &self.script.transmission_error {
            return Err(DeliveryError::Transmission(cause.clone()));
        }

        let report = self.script.report.clone().unwrap_or_else(|| DeliveryReport {
            valid_sent: message.recipients().iter().map(ToString::to_string).collect(),
            ..DeliveryReport::default()
        });
        if !report.valid_sent.is_empty() {
            self.counters
                .direct_sent
                .lock()
                .unwrap()
                .push(SentMail::from(message));
        }
        Ok(report)
    }

    async fn close(&mut self) {
        self.connected = false;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
