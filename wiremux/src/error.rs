use crate::model;
use std::fmt;

/// What went wrong, independent of the AMQP reply code which carried it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No free channel number left on the connection.
    ChannelExhausted,
    /// A frame or a call referred to a channel which is not open.
    UnknownChannel,
    /// The peer or the caller violated the protocol; the affected channel is
    /// unusable until reopened.
    ProtocolViolation,
    /// The transport went away; every channel is closed and every pending
    /// call fails with this kind exactly once.
    ConnectionLost,
    /// Acknowledgement for a delivery tag which was never recorded or is
    /// already acknowledged. Channel state is left untouched.
    UnknownDeliveryTag,
    /// A consumer tag is already registered on the channel.
    DuplicateConsumer,
}

/// Represents a connection or channel error. If `channel` is `None` it is a
/// connection error.
#[derive(Clone, Debug)]
pub struct ClientError {
    pub channel: Option<model::ChannelNumber>,
    pub kind: ErrorKind,
    pub code: u16,
    pub message: String,
    pub class_method: model::ClassMethod,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientError")
            .field("channel", &self.channel)
            .field("kind", &self.kind)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("class_method", &format!("{:08X}", &self.class_method))
            .finish()
    }
}

impl std::error::Error for ClientError {}

/// Shorthand for creating error results in async functions.
#[macro_export]
macro_rules! client_error {
    ($channel:expr, $kind:expr, $code:expr, $message:expr, $cm:expr) => {
        ::std::result::Result::Err(::anyhow::Error::new($crate::error::ClientError {
            channel: $channel,
            kind: $kind,
            code: $code,
            message: ::std::string::String::from($message),
            class_method: $cm,
        }))
    };
}
