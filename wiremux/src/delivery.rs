//! Bookkeeping of unacknowledged deliveries of one channel.
//!
//! Every inbound delivery is recorded here in tag order before it reaches the
//! consumer. The tracker owns the prefetch window: deliveries beyond the
//! window are parked and become dispatchable one by one as acknowledgements
//! free slots.

use std::collections::{BTreeMap, VecDeque};

use anyhow::Result;
use bytes::Bytes;
use log::trace;
use wiremux_frame::frame;

use crate::error::ErrorKind;
use crate::message::DeliveredMessage;
use crate::model::{ChannelError, ChannelNumber, ConnectionError};
use crate::client_error;

/// A delivery which was dispatched or parked but not yet acknowledged.
#[derive(Debug)]
struct PendingDelivery {
    consumer_tag: String,
    payload: Bytes,
    /// Still waiting for a free prefetch slot, the consumer has not seen it.
    parked: bool,
}

/// What to do with a just recorded delivery.
#[derive(Debug)]
pub(crate) enum Dispatch {
    /// The prefetch window has room, hand the message to the consumer.
    Now(DeliveredMessage),
    /// Window is full, the message waits for an acknowledgement.
    Parked,
}

#[derive(Debug)]
pub(crate) struct DeliveryTracker {
    channel: ChannelNumber,
    unacked: BTreeMap<u64, PendingDelivery>,
    parked: VecDeque<DeliveredMessage>,
    /// Max dispatched-and-unacked deliveries, 0 means no limit.
    prefetch: u16,
    /// Deliveries the consumer has seen and not yet acked.
    in_flight: usize,
    last_tag: u64,
}

impl DeliveryTracker {
    pub(crate) fn new(channel: ChannelNumber) -> Self {
        Self {
            channel,
            unacked: BTreeMap::new(),
            parked: VecDeque::new(),
            prefetch: 0,
            in_flight: 0,
            last_tag: 0,
        }
    }

    fn window_open(&self) -> bool {
        self.prefetch == 0 || self.in_flight < self.prefetch as usize
    }

    /// Applies a new prefetch limit and returns the parked deliveries which
    /// became dispatchable by it.
    pub(crate) fn set_prefetch(&mut self, count: u16) -> Vec<DeliveredMessage> {
        trace!("Channel {} prefetch limit set to {}", self.channel, count);

        self.prefetch = count;

        self.release()
    }

    /// Records an inbound delivery. Tags must arrive strictly increasing,
    /// anything else is a protocol violation of the peer.
    pub(crate) fn record(&mut self, message: DeliveredMessage) -> Result<Dispatch> {
        let tag = message.delivery_tag;

        if tag <= self.last_tag {
            return client_error!(
                Some(self.channel),
                ErrorKind::ProtocolViolation,
                ConnectionError::CommandInvalid as u16,
                format!("COMMAND_INVALID - Delivery tag {} is not increasing", tag),
                frame::BASIC_DELIVER
            );
        }

        self.last_tag = tag;

        let dispatchable = self.window_open();

        self.unacked.insert(
            tag,
            PendingDelivery {
                consumer_tag: message.consumer_tag.clone(),
                payload: message.message.body.clone(),
                parked: !dispatchable,
            },
        );

        if dispatchable {
            self.in_flight += 1;

            Ok(Dispatch::Now(message))
        } else {
            trace!(
                "Channel {} parking delivery tag {} (window {}/{})",
                self.channel,
                tag,
                self.in_flight,
                self.prefetch
            );

            self.parked.push_back(message);

            Ok(Dispatch::Parked)
        }
    }

    /// Acknowledge a tag, or with `multiple` every tag up to and including
    /// it. Tag 0 with `multiple` acknowledges everything outstanding.
    pub(crate) fn ack(&mut self, delivery_tag: u64, multiple: bool) -> Result<Vec<DeliveredMessage>> {
        self.remove(delivery_tag, multiple, frame::BASIC_ACK)
    }

    pub(crate) fn nack(&mut self, delivery_tag: u64, multiple: bool) -> Result<Vec<DeliveredMessage>> {
        self.remove(delivery_tag, multiple, frame::BASIC_NACK)
    }

    pub(crate) fn reject(&mut self, delivery_tag: u64) -> Result<Vec<DeliveredMessage>> {
        self.remove(delivery_tag, false, frame::BASIC_REJECT)
    }

    /// Drops the parked deliveries of a cancelled consumer so they are not
    /// dispatched to nobody later. Already dispatched deliveries stay, they
    /// can still be acked. Returns how many were dropped.
    pub(crate) fn drop_consumer(&mut self, consumer_tag: &str) -> usize {
        let before = self.parked.len();

        self.parked.retain(|m| m.consumer_tag != consumer_tag);
        self.unacked
            .retain(|_, pending| !pending.parked || pending.consumer_tag != consumer_tag);

        before - self.parked.len()
    }

    /// Drops every pending entry, used when the channel reaches a terminal
    /// state. Redelivery is the server's business from here.
    pub(crate) fn clear(&mut self) {
        self.unacked.clear();
        self.parked.clear();
        self.in_flight = 0;
    }

    /// Payload bytes held by not yet acknowledged deliveries.
    pub(crate) fn pending_bytes(&self) -> usize {
        self.unacked.values().map(|p| p.payload.len()).sum()
    }

    /// Number of recorded, not yet acknowledged deliveries.
    pub(crate) fn outstanding(&self) -> usize {
        self.unacked.len()
    }

    /// Number of deliveries the consumer has seen and not yet acknowledged.
    /// Never exceeds the prefetch limit while one is set.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn remove(&mut self, delivery_tag: u64, multiple: bool, cm: u32) -> Result<Vec<DeliveredMessage>> {
        if multiple && delivery_tag == 0 {
            self.clear();

            return Ok(vec![]);
        }

        if !self.unacked.contains_key(&delivery_tag) {
            return client_error!(
                Some(self.channel),
                ErrorKind::UnknownDeliveryTag,
                ChannelError::PreconditionFailed as u16,
                format!("PRECONDITION_FAILED - Unknown delivery tag {}", delivery_tag),
                cm
            );
        }

        let tags: Vec<u64> = if multiple {
            self.unacked.range(..=delivery_tag).map(|(t, _)| *t).collect()
        } else {
            vec![delivery_tag]
        };

        for tag in tags {
            // A parked entry acked before dispatch is dropped unseen.
            if let Some(pending) = self.unacked.remove(&tag) {
                if pending.parked {
                    self.parked.retain(|m| m.delivery_tag != tag);
                } else {
                    self.in_flight -= 1;
                }
            }
        }

        Ok(self.release())
    }

    fn release(&mut self) -> Vec<DeliveredMessage> {
        let mut released = vec![];

        while self.window_open() {
            match self.parked.pop_front() {
                Some(message) => {
                    if let Some(pending) = self.unacked.get_mut(&message.delivery_tag) {
                        pending.parked = false;
                    }

                    self.in_flight += 1;
                    released.push(message);
                }
                None => break,
            }
        }

        released
    }
}
