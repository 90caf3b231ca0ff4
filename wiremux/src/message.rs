use std::collections::HashMap;

use bytes::Bytes;
use wiremux_frame::frame::{ContentBodyFrame, ContentHeaderFrame, FieldValue};

use crate::model::{ChannelNumber, ClassId};

/// Body and properties of a message sent to or received from the server.
#[derive(Clone, Debug, Default)]
pub struct Content {
    pub body: Bytes,
    pub properties: MessageProperties,
}

/// Standard set of message properties
#[derive(Clone, Debug, Default)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: HashMap<String, String>,
    /// 1 - non-persistent, 2 - persistent
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<u64>,
    pub message_type: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
}

/// A delivered message.
///
/// With the `consumer_tag` and `delivery_tag` a client can send back
/// acknowledgements to the server, saying that the message successfully
/// arrived.
#[derive(Clone, Debug, Default)]
pub struct DeliveredMessage {
    pub message: Content,
    pub consumer_tag: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
}

/// A message returned to the client as unroutable.
#[derive(Clone, Debug, Default)]
pub struct ReturnedMessage {
    pub message: Content,
    pub reply_code: u16,
    pub reply_text: String,
    pub exchange: String,
    pub routing_key: String,
}

/// A message published by the client.
#[derive(Clone, Debug, Default)]
pub struct PublishedMessage {
    pub message: Content,
    pub mandatory: bool,
    pub immediate: bool,
}

impl From<&str> for PublishedMessage {
    fn from(value: &str) -> Self {
        Self {
            message: Content {
                body: Bytes::copy_from_slice(value.as_bytes()),
                properties: MessageProperties::default(),
            },
            ..Default::default()
        }
    }
}

impl PublishedMessage {
    pub fn text(mut self, value: &str) -> Self {
        self.message.body = Bytes::copy_from_slice(value.as_bytes());
        self
    }

    pub fn body(mut self, value: Bytes) -> Self {
        self.message.body = value;
        self
    }

    /// Condition for mandatory publishing. Mandatory messages are returned by
    /// the server if they cannot be routed to any queue.
    pub fn mandatory(mut self, value: bool) -> Self {
        self.mandatory = value;
        self
    }

    /// Condition for immediate publishing. Immediate messages fail if they
    /// cannot be sent to a consumer right away.
    pub fn immediate(mut self, value: bool) -> Self {
        self.immediate = value;
        self
    }
}

/// Internally it is comfortable to handle delivered or returned messages in
/// the same variable while their content frames are being collected.
#[derive(Debug)]
pub(crate) enum InboundMessage {
    Delivered(DeliveredMessage),
    Returned(ReturnedMessage),
}

/// Splits a content into a header frame and as many body frames as the
/// negotiated frame size requires.
pub(crate) fn to_content_frames(
    channel: ChannelNumber,
    class_id: ClassId,
    content: Content,
    frame_max: usize,
) -> Vec<wiremux_frame::frame::Frame> {
    let props = content.properties;

    let header = ContentHeaderFrame {
        channel,
        class_id,
        body_size: content.body.len() as u64,
        content_type: props.content_type,
        content_encoding: props.content_encoding,
        headers: if props.headers.is_empty() {
            None
        } else {
            Some(
                props
                    .headers
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::LongString(v)))
                    .collect(),
            )
        },
        delivery_mode: props.delivery_mode,
        priority: props.priority,
        correlation_id: props.correlation_id,
        reply_to: props.reply_to,
        expiration: props.expiration,
        message_id: props.message_id,
        timestamp: props.timestamp,
        message_type: props.message_type,
        user_id: props.user_id,
        app_id: props.app_id,
    };

    let mut frames = vec![header.frame()];

    let mut body = content.body;
    loop {
        let chunk = body.split_to(body.len().min(frame_max));

        frames.push(ContentBodyFrame { channel, body: chunk }.frame());

        if body.is_empty() {
            break;
        }
    }

    frames
}

impl From<ContentHeaderFrame> for MessageProperties {
    fn from(header: ContentHeaderFrame) -> Self {
        let headers = header
            .headers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| match v {
                FieldValue::LongString(s) => Some((k, s)),
                _ => None,
            })
            .collect();

        MessageProperties {
            content_type: header.content_type,
            content_encoding: header.content_encoding,
            headers,
            delivery_mode: header.delivery_mode,
            priority: header.priority,
            correlation_id: header.correlation_id,
            reply_to: header.reply_to,
            expiration: header.expiration,
            message_id: header.message_id,
            timestamp: header.timestamp,
            message_type: header.message_type,
            user_id: header.user_id,
            app_id: header.app_id,
        }
    }
}
