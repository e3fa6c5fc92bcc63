//! 配送イベントの観測
//!
//! 直接送信の結果（全員 / 一部 / 配送なし）を受け取る。
//! 観測結果は送信の成否には影響しない。

use moneymanager_domain::notification::{DeliveryEvent, DeliveryOutcome};
use tokio::sync::mpsc;

/// 配送イベントの観測者
pub trait DeliveryObserver: Send + Sync {
    fn on_event(&self, event: &DeliveryEvent);
}

/// 配送イベントをログに記録する観測者
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeliveryObserver;

impl DeliveryObserver for TracingDeliveryObserver {
    fn on_event(&self, event: &DeliveryEvent) {
        match event.outcome {
            DeliveryOutcome::Delivered => tracing::info!(
                outcome = %event.outcome,
                valid_sent = event.valid_sent,
                "メッセージを配送しました"
            ),
            DeliveryOutcome::PartiallyDelivered | DeliveryOutcome::NotDelivered => {
                tracing::warn!(
                    outcome = %event.outcome,
                    valid_sent = event.valid_sent,
                    invalid = event.invalid,
                    valid_unsent = event.valid_unsent,
                    "一部またはすべての受信者に配送できませんでした"
                )
            }
        }
    }
}

/// 配送イベントをチャネルへ転送する観測者
///
/// 受信側が破棄されている場合、イベントは捨てる。
#[derive(Debug, Clone)]
pub struct ChannelDeliveryObserver {
    tx: mpsc::UnboundedSender<DeliveryEvent>,
}

impl ChannelDeliveryObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DeliveryObserver for ChannelDeliveryObserver {
    fn on_event(&self, event: &DeliveryEvent) {
        let _ = self.tx.send(*event);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_チャネル観測者はイベントを転送する() {
        let (observer, mut rx) = ChannelDeliveryObserver::new();
        let event = DeliveryEvent::from_counts(1, 0, 0);

        observer.on_event(&event);

        assert_eq!(rx.recv().await, Some(event));
    }

    #[test]
    fn test_受信側が破棄されていてもパニックしない() {
        let (observer, rx) = ChannelDeliveryObserver::new();
        drop(rx);

        observer.on_event(&DeliveryEvent::from_counts(0, 1, 0));
    }
}
