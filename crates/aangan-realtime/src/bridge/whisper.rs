//! Producer interface: announces created whispers to live subscribers.

use std::sync::Arc;

use tracing::debug;

use aangan_core::events::Whisper;
use aangan_core::result::AppResult;

use crate::channel::types::{GLOBAL_FEED_CHANNEL, zone_channel};
use crate::engine::PubSubEngine;

/// Called by the persistence layer after a whisper is stored.
#[derive(Debug, Clone)]
pub struct WhisperBridge {
    /// Engine the whispers are published to
    engine: Arc<PubSubEngine<Whisper>>,
}

impl WhisperBridge {
    /// Create a new bridge
    pub fn new(engine: Arc<PubSubEngine<Whisper>>) -> Self {
        Self { engine }
    }

    /// Validates `whisper` and publishes it to its zone channel and then to
    /// the global feed. Returns the channels published to.
    ///
    /// Fails only on validation; subscriber failures are isolated inside the
    /// engine.
    pub fn notify_whisper_created(&self, whisper: Whisper) -> AppResult<Vec<String>> {
        let whisper = Arc::new(whisper.validated()?);
        let zone = zone_channel(&whisper.zone);

        let zone_report = self.engine.publish(&zone, Arc::clone(&whisper));
        let feed_report = self.engine.publish(GLOBAL_FEED_CHANNEL, Arc::clone(&whisper));

        debug!(
            whisper_id = %whisper.id,
            zone = %zone,
            zone_delivered = zone_report.delivered,
            feed_delivered = feed_report.delivered,
            "Whisper broadcast"
        );

        Ok(vec![zone, GLOBAL_FEED_CHANNEL.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SubscribeOptions;
    use parking_lot::Mutex;

    #[test]
    fn test_publishes_to_zone_and_feed() {
        let engine = Arc::new(PubSubEngine::new(50));
        let bridge = WhisperBridge::new(Arc::clone(&engine));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for channel in ["tapri", GLOBAL_FEED_CHANNEL] {
            let seen = Arc::clone(&seen);
            let tag = channel.to_string();
            let _sub = engine.subscribe(
                channel,
                move |w: &Arc<Whisper>| {
                    seen.lock().push((tag.clone(), w.id.to_string()));
                    Ok(())
                },
                SubscribeOptions::default(),
            );
        }

        let channels = bridge
            .notify_whisper_created(Whisper::new(1, "hi", "happy", "Tapri"))
            .unwrap();
        assert_eq!(channels, vec!["tapri".to_string(), GLOBAL_FEED_CHANNEL.to_string()]);
        assert_eq!(
            *seen.lock(),
            vec![
                ("tapri".to_string(), "1".to_string()),
                (GLOBAL_FEED_CHANNEL.to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_shares_one_allocation() {
        let engine = Arc::new(PubSubEngine::new(50));
        let bridge = WhisperBridge::new(Arc::clone(&engine));
        bridge
            .notify_whisper_created(Whisper::new(2, "hello", "calm", "library"))
            .unwrap();

        let zone = engine.history("library");
        let feed = engine.history(GLOBAL_FEED_CHANNEL);
        assert!(Arc::ptr_eq(&zone[0], &feed[0]));
    }

    #[test]
    fn test_invalid_whisper_is_not_published() {
        let engine: Arc<PubSubEngine<Whisper>> = Arc::new(PubSubEngine::new(50));
        let bridge = WhisperBridge::new(Arc::clone(&engine));

        assert!(bridge
            .notify_whisper_created(Whisper::new(3, "", "happy", "tapri"))
            .is_err());
        assert!(bridge
            .notify_whisper_created(Whisper::new(4, "x", "happy", "__feed__"))
            .is_err());
        assert_eq!(engine.channel_count(), 0);
    }
}
