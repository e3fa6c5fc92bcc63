//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールの HTML 本文を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **HTML のみ**: 送信側は本文を常に HTML として扱う
//! - **自動エスケープ**: `.html` テンプレートでは tera が値をエスケープする

use tera::{Context, Tera};

const ACTIVATION_TEMPLATE: &str = "activation.html";
const ACTIVATION_SUBJECT: &str = "Activate your Money Manager account";

/// レンダリング済みのメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body:    String,
}

/// テンプレートレンダラー
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut engine = Tera::default();
        engine.add_raw_template(
            ACTIVATION_TEMPLATE,
            include_str!("../../../templates/notifications/activation.html"),
        )?;

        Ok(Self { engine })
    }

    /// アカウント有効化メールを生成する
    ///
    /// リンクは `{base_url}/activate?token={token}`。
    pub fn render_activation(
        &self,
        full_name: &str,
        base_url: &str,
        token: &str,
    ) -> Result<RenderedEmail, tera::Error> {
        let activation_url = activation_url(base_url, token);

        let mut context = Context::new();
        context.insert("full_name", full_name);
        context.insert("activation_url", &activation_url);

        Ok(RenderedEmail {
            subject: ACTIVATION_SUBJECT.to_string(),
            body:    self.engine.render(ACTIVATION_TEMPLATE, &context)?,
        })
    }
}

pub fn activation_url(base_url: &str, token: &str) -> String {
    format!("{}/activate?token={token}", base_url.trim_end_matches('/'))
}
