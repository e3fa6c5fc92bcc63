//! # 通知ユースケース
//!
//! メール通知の組み立てと送信をまとめる。
//!
//! - [`template_renderer`] - tera テンプレートによるメール本文の生成
//! - [`service`] - 通知の窓口（送信とエラーの集約）

pub mod service;
pub mod template_renderer;

pub use service::NotificationService;
pub use template_renderer::{RenderedEmail, TemplateRenderer};
