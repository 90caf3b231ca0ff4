//! Fans inbound deliveries out to consumer signal sinks.
//!
//! One registration per (channel, consumer tag). Order per channel is
//! preserved because the processor loop is the only dispatcher and the sinks
//! are FIFO; how long a consumer takes to handle a signal cannot reorder the
//! stream.

use std::collections::HashMap;

use anyhow::Result;
use log::{info, warn};
use wiremux_frame::frame;

use crate::consumer::ConsumerSignal;
use crate::error::ErrorKind;
use crate::message::DeliveredMessage;
use crate::model::{ChannelNumber, ConnectionError};
use crate::client_error;

pub(crate) type ConsumerSink = tokio::sync::mpsc::UnboundedSender<ConsumerSignal>;

#[derive(Default)]
pub(crate) struct ConsumerDispatcher {
    consumers: HashMap<(ChannelNumber, String), ConsumerSink>,
}

impl ConsumerDispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, channel: ChannelNumber, consumer_tag: &str, sink: ConsumerSink) -> Result<()> {
        let key = (channel, consumer_tag.to_string());

        if self.consumers.contains_key(&key) {
            return client_error!(
                Some(channel),
                ErrorKind::DuplicateConsumer,
                ConnectionError::NotAllowed as u16,
                format!("NOT_ALLOWED - Consumer tag {} is already in use", consumer_tag),
                frame::BASIC_CONSUME
            );
        }

        info!("Consumer {} registered on channel {}", consumer_tag, channel);

        self.consumers.insert(key, sink);

        Ok(())
    }

    /// Hands a delivery to its consumer. A delivery for an unknown consumer
    /// tag is dropped; that is the race between a cancel and an in-flight
    /// delivery, an anomaly but not fatal.
    pub(crate) fn dispatch(&mut self, channel: ChannelNumber, message: DeliveredMessage) {
        let key = (channel, message.consumer_tag.clone());

        match self.consumers.get(&key) {
            Some(sink) => {
                // A dropped stream means the handler is gone, same race as above.
                if sink.send(ConsumerSignal::Delivered(Box::new(message))).is_err() {
                    self.consumers.remove(&key);
                }
            }
            None => {
                warn!(
                    "Dropping delivery tag {} on channel {}: no consumer {}",
                    message.delivery_tag, channel, message.consumer_tag
                );
            }
        }
    }

    /// Removes a registration. Deliveries already handed to the sink are
    /// unaffected.
    pub(crate) fn cancel(&mut self, channel: ChannelNumber, consumer_tag: &str) -> bool {
        match self.consumers.remove(&(channel, consumer_tag.to_string())) {
            Some(sink) => {
                info!("Consumer {} cancelled on channel {}", consumer_tag, channel);

                let _ = sink.send(ConsumerSignal::Cancelled);

                true
            }
            None => false,
        }
    }

    /// Signals and removes every consumer of a channel when it closes.
    pub(crate) fn drop_channel(&mut self, channel: ChannelNumber, reply_code: u16, reply_text: &str) {
        self.consumers.retain(|(ch, _), sink| {
            if *ch == channel {
                let _ = sink.send(ConsumerSignal::ChannelClosed {
                    reply_code,
                    reply_text: reply_text.to_string(),
                    class_method: frame::CHANNEL_CLOSE,
                });

                false
            } else {
                true
            }
        });
    }

    /// Signals and removes every consumer when the connection goes away.
    pub(crate) fn drop_all(&mut self, reply_code: u16, reply_text: &str) {
        for (_, sink) in self.consumers.drain() {
            let _ = sink.send(ConsumerSignal::ConnectionClosed {
                reply_code,
                reply_text: reply_text.to_string(),
                class_method: frame::CONNECTION_CLOSE,
            });
        }
    }
}
