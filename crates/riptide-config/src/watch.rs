//! Live configuration channel.
//!
//! Loops read one `Arc<Configuration>` per tick; reconfiguration swaps the
//! whole snapshot, so a reader never observes a half-updated value.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Configuration;

/// Writer half of the live configuration channel.
pub type ConfigSender = watch::Sender<Arc<Configuration>>;
/// Reader half of the live configuration channel.
pub type ConfigReceiver = watch::Receiver<Arc<Configuration>>;

/// Create a channel seeded with `config`.
#[must_use]
pub fn config_channel(config: Configuration) -> (ConfigSender, ConfigReceiver) {
    watch::channel(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replacement_is_observed_as_a_whole() {
        let (sender, mut receiver) = config_channel(Configuration::default());
        let before = Arc::clone(&receiver.borrow_and_update());

        sender.send_replace(Arc::new(Configuration {
            share_ratio_limit: 200,
            seed_time_limit: 3_600,
            ..Configuration::default()
        }));

        receiver.changed().await.expect("sender alive");
        let after = Arc::clone(&receiver.borrow_and_update());
        assert_eq!(before.share_ratio_limit, 0);
        assert_eq!((after.share_ratio_limit, after.seed_time_limit), (200, 3_600));
    }
}
