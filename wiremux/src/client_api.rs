use std::fmt;
use std::time::Duration;

use anyhow::Result;
use log::error;
use tokio::sync::{mpsc, oneshot};
use wiremux_frame::frame::{self, Frame, MethodArgs};

use crate::channel_api::Channel;
use crate::config::ClientOptions;
use crate::dispatcher::ConsumerSink;
use crate::error::ErrorKind;
use crate::message::{Content, ReturnedMessage};
use crate::model::{ChannelError, ChannelNumber};
use crate::processor;
use crate::transport::TransportPipe;
use crate::client_error;

pub(crate) type ClientRequestSink = mpsc::Sender<ClientRequest>;
/// Notified with the server reply of an RPC style call.
pub(crate) type FrameResponse = oneshot::Sender<Result<MethodArgs>>;
/// Notified once a frame is handed to the transport; carries the
/// backpressure verdict of the outbound buffer.
pub(crate) type SentResponse = oneshot::Sender<Result<bool>>;
pub(crate) type OpenResponse = oneshot::Sender<Result<ChannelNumber>>;
pub(crate) type EventSink = mpsc::UnboundedSender<EventSignal>;

/// Represents a client request. It can be opening a channel, sending a frame,
/// consuming a queue, acking or publishing a message.
pub(crate) enum Param {
    OpenChannel {
        preferred: Option<ChannelNumber>,
        result: OpenResponse,
    },
    Frame(Frame),
    Consume(Box<Frame>, ConsumerSink),
    Publish(Box<Frame>, Content),
    Ack(Box<Frame>),
}

pub(crate) enum WaitFor {
    Nothing,
    SentOut(SentResponse),
    FrameResponse(FrameResponse),
}

/// Represents a client request, typically send a frame and wait for the
/// answer of the server.
pub(crate) struct ClientRequest {
    pub(crate) param: Param,
    pub(crate) response: WaitFor,
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Param::OpenChannel { preferred, .. } => write!(f, "Request{{OpenChannel={:?}}}", preferred),
            Param::Frame(frame) => write!(f, "Request{{Frame={:?}}}", frame),
            Param::Consume(frame, _) => write!(f, "Request{{Consume={:?}}}", frame),
            Param::Publish(frame, _) => write!(f, "Request{{Publish={:?}}}", frame),
            Param::Ack(frame) => write!(f, "Request{{Ack={:?}}}", frame),
        }
    }
}

/// Connection scope events which arrive outside any pending call: publisher
/// confirms, returned messages, flow control and close notifications, and
/// the drain signal after publish reported backpressure.
#[derive(Debug)]
pub enum EventSignal {
    BasicAck {
        channel: ChannelNumber,
        delivery_tag: u64,
        multiple: bool,
    },
    BasicReturn {
        channel: ChannelNumber,
        message: Box<ReturnedMessage>,
    },
    ChannelFlow {
        channel: ChannelNumber,
        active: bool,
    },
    /// The outbound buffer fell back below the low watermark; publishing may
    /// resume.
    Drain,
    ChannelClose {
        channel: ChannelNumber,
        code: u16,
        text: String,
    },
    ConnectionClose {
        code: u16,
        text: String,
    },
}

/// Listener of the connection scope [`EventSignal`] stream.
pub struct EventHandler {
    pub signal_stream: mpsc::UnboundedReceiver<EventSignal>,
}

impl EventHandler {
    pub async fn receive_event(&mut self, timeout: Duration) -> Option<EventSignal> {
        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);

        tokio::select! {
            signal = self.signal_stream.recv() => {
                signal
            }
            _ = &mut sleep => {
                None
            }
        }
    }
}

/// Handle of one connection. Channels are opened through it; dropping every
/// clone of the handle and its channels stops the connection task.
pub struct Client {
    request_sink: ClientRequestSink,
}

/// Wires a client core to a transport.
///
/// The caller owns the returned [`TransportPipe`]: it drains the outgoing
/// envelopes into its connection and feeds decoded inbound frames back. The
/// connection task is spawned on the current tokio runtime.
pub fn attach(options: ClientOptions) -> (Client, EventHandler, TransportPipe) {
    let (request_sink, request_stream) = mpsc::channel(1);
    let (outgoing_sink, outgoing_stream) = mpsc::channel(options.outgoing_buffer);
    let (incoming_sink, incoming_stream) = mpsc::channel(16);
    let (event_sink, signal_stream) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(e) = processor::event_loop(options, incoming_stream, request_stream, outgoing_sink, event_sink).await
        {
            error!("Error {:?}", e);
        }
    });

    (
        Client { request_sink },
        EventHandler { signal_stream },
        TransportPipe {
            outgoing: outgoing_stream,
            incoming: incoming_sink,
        },
    )
}

impl Client {
    /// Opens a channel on the lowest free channel number.
    pub async fn channel_open(&mut self) -> Result<Channel> {
        self.open(None).await
    }

    /// Opens a channel on an explicit channel number.
    pub async fn channel_open_num(&mut self, channel: ChannelNumber) -> Result<Channel> {
        self.open(Some(channel)).await
    }

    async fn open(&mut self, preferred: Option<ChannelNumber>) -> Result<Channel> {
        let (tx, rx) = oneshot::channel();

        let request = ClientRequest {
            param: Param::OpenChannel {
                preferred,
                result: tx,
            },
            response: WaitFor::Nothing,
        };

        if self.request_sink.send(request).await.is_err() {
            return client_error!(
                None,
                ErrorKind::ConnectionLost,
                0,
                "Connection closed by peer",
                frame::CHANNEL_OPEN
            );
        }

        match rx.await {
            Ok(Ok(number)) => Ok(Channel::new(number, self.request_sink.clone())),
            Ok(Err(e)) => Err(e),
            Err(_) => client_error!(
                None,
                ErrorKind::ConnectionLost,
                0,
                "Connection closed by peer",
                frame::CHANNEL_OPEN
            ),
        }
    }

    /// Closes the connection with a normal close handshake.
    pub async fn close(&mut self) -> Result<()> {
        let fr = frame::connection_close(ChannelError::Success as u16, "Normal close", 0);

        processor::call(&self.request_sink, fr).await?;

        Ok(())
    }
}
