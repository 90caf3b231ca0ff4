//! Per-channel protocol state.
//!
//! A slot lives from channel-open until the channel number is released. It
//! sequences the method and content frames of its channel, buffers publishes
//! while the server stopped the flow, and owns the delivery tracker.

use anyhow::Result;
use bytes::BytesMut;
use log::trace;
use wiremux_frame::frame::{self, ContentBodyFrame, ContentHeaderFrame};
use wiremux_frame::Envelope;

use crate::delivery::DeliveryTracker;
use crate::error::ErrorKind;
use crate::message::InboundMessage;
use crate::model::{ChannelNumber, ConnectionError};
use crate::client_error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ChannelState {
    /// Channel-open sent, waiting for the reply.
    Opening,
    Open,
    /// The server paused the content flow; publishes are buffered locally.
    FlowStopped,
    /// Channel-close sent, waiting for the reply.
    Closing,
    Closed,
    /// Protocol violation on this channel; terminal until reopened.
    Errored,
}

/// A content being received frame by frame, building step by step.
#[derive(Debug)]
struct DeliveredContent {
    message: InboundMessage,
    /// Total body length announced by the content header; `None` until the
    /// header arrived.
    body_size: Option<u64>,
    body: BytesMut,
}

#[derive(Debug)]
pub(crate) struct ChannelSlot {
    pub(crate) number: ChannelNumber,
    pub(crate) state: ChannelState,
    pub(crate) deliveries: DeliveryTracker,
    /// Prefetch values sent with Basic.Qos, applied when the ok arrives.
    pub(crate) pending_qos: Option<(u16, bool)>,
    pub(crate) confirm_mode: bool,
    /// Publishes held back while the flow is stopped.
    pub(crate) flow_buffer: Vec<Envelope>,
    in_delivery: Option<DeliveredContent>,
}

impl ChannelSlot {
    pub(crate) fn new(number: ChannelNumber, prefetch: u16) -> Self {
        let mut deliveries = DeliveryTracker::new(number);
        deliveries.set_prefetch(prefetch);

        Self {
            number,
            state: ChannelState::Opening,
            deliveries,
            pending_qos: None,
            confirm_mode: false,
            flow_buffer: vec![],
            in_delivery: None,
        }
    }

    pub(crate) fn set_state(&mut self, state: ChannelState) {
        trace!("Channel {} {:?} -> {:?}", self.number, self.state, state);

        self.state = state;
    }

    pub(crate) fn is_open(&self) -> bool {
        matches!(self.state, ChannelState::Open | ChannelState::FlowStopped)
    }

    /// A delivery or return method frame starts a content sequence. Starting
    /// one while the previous is unfinished breaks the framing rules.
    pub(crate) fn start_content(&mut self, message: InboundMessage) -> Result<()> {
        if self.in_delivery.is_some() {
            return self.unexpected_frame("Content frames interleaved with a method frame");
        }

        self.in_delivery = Some(DeliveredContent {
            message,
            body_size: None,
            body: BytesMut::new(),
        });

        Ok(())
    }

    pub(crate) fn on_content_header(&mut self, header: ContentHeaderFrame) -> Result<Option<InboundMessage>> {
        match &mut self.in_delivery {
            Some(content) if content.body_size.is_none() => {
                let body_size = header.body_size;

                content.body.reserve(body_size as usize);

                let properties = header.into();
                match &mut content.message {
                    InboundMessage::Delivered(dm) => dm.message.properties = properties,
                    InboundMessage::Returned(rm) => rm.message.properties = properties,
                }

                if body_size == 0 {
                    return Ok(self.finish_content());
                }

                content.body_size = Some(body_size);

                Ok(None)
            }
            _ => self.unexpected_frame("Content header without a pending method frame"),
        }
    }

    pub(crate) fn on_content_body(&mut self, body: ContentBodyFrame) -> Result<Option<InboundMessage>> {
        match &mut self.in_delivery {
            Some(content) => {
                let Some(body_size) = content.body_size else {
                    return self.unexpected_frame("Content body before the content header");
                };

                content.body.extend_from_slice(&body.body);

                let received = content.body.len() as u64;

                if received > body_size {
                    return self.unexpected_frame("Content body longer than announced");
                }

                if received == body_size {
                    return Ok(self.finish_content());
                }

                Ok(None)
            }
            None => self.unexpected_frame("Content body without a pending method frame"),
        }
    }

    /// Forgets the partial content and the flow buffer, used when the channel
    /// reaches a terminal state.
    pub(crate) fn reset(&mut self) {
        self.in_delivery = None;
        self.flow_buffer.clear();
        self.deliveries.clear();
    }

    fn finish_content(&mut self) -> Option<InboundMessage> {
        let content = self.in_delivery.take()?;

        let body = content.body.freeze();

        Some(match content.message {
            InboundMessage::Delivered(mut dm) => {
                dm.message.body = body;
                InboundMessage::Delivered(dm)
            }
            InboundMessage::Returned(mut rm) => {
                rm.message.body = body;
                InboundMessage::Returned(rm)
            }
        })
    }

    fn unexpected_frame<T>(&self, text: &str) -> Result<T> {
        client_error!(
            Some(self.number),
            ErrorKind::ProtocolViolation,
            ConnectionError::UnexpectedFrame as u16,
            format!("UNEXPECTED_FRAME - {}", text),
            frame::BASIC_DELIVER
        )
    }
}
