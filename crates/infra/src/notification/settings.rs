//! メール設定
//!
//! 送信のたびに読み込む設定値。キャッシュしないため、環境変数の変更は
//! 次の送信から反映される。

/// SMTP ポートの既定値
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// プロトコル名の既定値
pub const DEFAULT_PROTOCOL: &str = "smtp";

/// 送信元が解決できなかった場合にトランスポートが使う送信元
pub const DEFAULT_SENDER: &str = "noreply@localhost";

/// メール設定
///
/// 空白のみの値は未設定として扱う。
#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// 送信元アドレスの明示指定
    pub from_address:   Option<String>,
    pub host:           Option<String>,
    pub port:           u16,
    pub username:       Option<String>,
    pub password:       Option<String>,
    pub protocol:       String,
    pub default_sender: String,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("from_address", &self.from_address)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("protocol", &self.protocol)
            .field("default_sender", &self.default_sender)
            .finish()
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from_address:   None,
            host:           None,
            port:           DEFAULT_SMTP_PORT,
            username:       None,
            password:       None,
            protocol:       DEFAULT_PROTOCOL.to_string(),
            default_sender: DEFAULT_SENDER.to_string(),
        }
    }
}

impl MailSettings {
    /// キー参照関数から設定を組み立てる
    ///
    /// | キー | 項目 | 既定値 |
    /// |------|------|--------|
    /// | `MAIL_FROM` | `from_address` | なし |
    /// | `SMTP_HOST` | `host` | なし |
    /// | `SMTP_PORT` | `port` | 25 |
    /// | `SMTP_USERNAME` | `username` | なし |
    /// | `SMTP_PASSWORD` | `password` | なし |
    /// | `SMTP_PROTOCOL` | `protocol` | `smtp` |
    /// | `MAIL_DEFAULT_SENDER` | `default_sender` | `noreply@localhost` |
    ///
    /// ポートが数値として解釈できない場合は既定値を使う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match value("SMTP_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "SMTP_PORT が不正なため既定値を使用します");
                DEFAULT_SMTP_PORT
            }),
            None => DEFAULT_SMTP_PORT,
        };

        Self {
            from_address: value("MAIL_FROM"),
            host: value("SMTP_HOST"),
            port,
            username: value("SMTP_USERNAME"),
            password: value("SMTP_PASSWORD"),
            protocol: value("SMTP_PROTOCOL").unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
            default_sender: value("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
        }
    }
}

/// メール設定の取得元
pub trait MailSettingsSource: Send + Sync {
    /// 現時点の設定を返す
    fn current(&self) -> MailSettings;
}

/// 環境変数から都度読み込む設定
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvMailSettings;

impl MailSettingsSource for EnvMailSettings {
    fn current(&self) -> MailSettings {
        MailSettings::from_lookup(|key| std::env::var(key).ok())
    }
}

/// 固定値の設定
#[derive(Debug, Clone)]
pub struct StaticMailSettings(MailSettings);

impl StaticMailSettings {
    pub fn new(settings: MailSettings) -> Self {
        Self(settings)
    }
}

impl MailSettingsSource for StaticMailSettings {
    fn current(&self) -> MailSettings {
        self.0.clone()
    }
}
