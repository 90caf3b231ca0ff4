use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use wiremux_frame::frame;

use crate::channel_api::Channel;
use crate::client_api::{ClientRequest, ClientRequestSink, Param, WaitFor};
use crate::error::ErrorKind;
use crate::message::DeliveredMessage;
use crate::model::{ChannelNumber, ConnectionError};
use crate::processor;
use crate::client_error;

/// A signal arriving from the server during consuming a queue.
#[derive(Debug)]
pub enum ConsumerSignal {
    Delivered(Box<DeliveredMessage>),
    Cancelled,
    ChannelClosed {
        reply_code: u16,
        reply_text: String,
        class_method: u32,
    },
    ConnectionClosed {
        reply_code: u16,
        reply_text: String,
        class_method: u32,
    },
}

#[derive(Clone, Debug, Default)]
pub struct ConsumeOpts {
    /// The server considers deliveries acknowledged as it sends them.
    pub no_ack: bool,
    /// No other client may consume the queue.
    pub exclusive: bool,
    /// Don't deliver messages published on this same connection.
    pub no_local: bool,
}

impl ConsumeOpts {
    pub fn no_ack(mut self, mode: bool) -> Self {
        self.no_ack = mode;
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.exclusive = mode;
        self
    }

    pub fn no_local(mut self, mode: bool) -> Self {
        self.no_local = mode;
        self
    }
}

/// Consumer API for an active consume.
///
/// Obtained from [`Channel::basic_consume`]. Deliveries and the terminal
/// channel or connection close signals arrive on `signal_stream`, in the
/// exact order the server sent them.
pub struct ConsumerHandler {
    /// The channel the consume runs on.
    pub channel: ChannelNumber,
    /// Identifier of the consumer on the server.
    pub consumer_tag: String,
    client_sink: ClientRequestSink,
    pub signal_stream: mpsc::UnboundedReceiver<ConsumerSignal>,
}

impl ConsumerHandler {
    pub async fn receive(&mut self, timeout: Duration) -> Option<ConsumerSignal> {
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

    /// Acknowledges one delivery by its tag.
    pub async fn basic_ack(&self, delivery_tag: u64) -> Result<()> {
        processor::ack_send(
            &self.client_sink,
            frame::BasicAckArgs::default()
                .delivery_tag(delivery_tag)
                .multiple(false)
                .frame(self.channel),
        )
        .await
    }

    /// Acknowledges every outstanding delivery up to and including the tag.
    pub async fn basic_ack_multiple(&self, delivery_tag: u64) -> Result<()> {
        processor::ack_send(
            &self.client_sink,
            frame::BasicAckArgs::default()
                .delivery_tag(delivery_tag)
                .multiple(true)
                .frame(self.channel),
        )
        .await
    }

    pub async fn basic_nack(&self, delivery_tag: u64, multiple: bool, requeue: bool) -> Result<()> {
        processor::ack_send(
            &self.client_sink,
            frame::BasicNackArgs::default()
                .delivery_tag(delivery_tag)
                .multiple(multiple)
                .requeue(requeue)
                .frame(self.channel),
        )
        .await
    }

    pub async fn basic_reject(&self, delivery_tag: u64, requeue: bool) -> Result<()> {
        processor::ack_send(
            &self.client_sink,
            frame::BasicRejectArgs::default()
                .delivery_tag(delivery_tag)
                .requeue(requeue)
                .frame(self.channel),
        )
        .await
    }

    /// Stops the consume. Deliveries already queued on the signal stream are
    /// unaffected and can still be read and acked.
    pub async fn basic_cancel(self) -> Result<()> {
        let fr = frame::BasicCancelArgs::new(&self.consumer_tag).frame(self.channel);

        processor::call(&self.client_sink, fr).await?;

        Ok(())
    }
}

impl Channel {
    /// Start consuming a queue.
    ///
    /// It returns a `ConsumerHandler` with which the server events can be
    /// handled. Messages are delivered in the form of those events and also
    /// channel close or connection close events coming through that
    /// interface.
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use wiremux::{Channel, ConsumeOpts, ConsumerSignal};
    ///
    /// async fn consume(channel: Channel) {
    ///     let mut handler = channel.basic_consume("inbox", ConsumeOpts::default()).await.unwrap();
    ///
    ///     while let Some(signal) = handler.receive(Duration::from_secs(1)).await {
    ///         match signal {
    ///             ConsumerSignal::Delivered(m) => {
    ///                 handler.basic_ack(m.delivery_tag).await.unwrap();
    ///             }
    ///             ConsumerSignal::Cancelled | ConsumerSignal::ChannelClosed { .. } |
    ///                 ConsumerSignal::ConnectionClosed { .. } => {
    ///                 break;
    ///             }
    ///         }
    ///     }
    /// }
    /// ```
    pub async fn basic_consume(&self, queue_name: &str, opts: ConsumeOpts) -> Result<ConsumerHandler> {
        let consumer_tag = format!("wiremux-{}", rand::random::<u128>());

        let fr = frame::BasicConsumeArgs::default()
            .queue(queue_name)
            .consumer_tag(&consumer_tag)
            .no_ack(opts.no_ack)
            .exclusive(opts.exclusive)
            .no_local(opts.no_local)
            .frame(self.channel);

        // Buffer of the incoming deliveries and other signals like consumer
        // cancelled.
        let (signal_sink, signal_stream) = mpsc::unbounded_channel::<ConsumerSignal>();

        let handler = ConsumerHandler {
            channel: self.channel,
            consumer_tag,
            client_sink: self.sink.clone(),
            signal_stream,
        };

        let (tx, rx) = oneshot::channel();

        let request = ClientRequest {
            param: Param::Consume(Box::new(fr), signal_sink),
            response: WaitFor::FrameResponse(tx),
        };

        if self.sink.send(request).await.is_err() {
            return client_error!(
                Some(self.channel),
                ErrorKind::ConnectionLost,
                ConnectionError::ConnectionForced as u16,
                "Connection closed by peer",
                frame::BASIC_CONSUME
            );
        }

        match rx.await {
            Ok(Ok(_)) => Ok(handler),
            Ok(Err(e)) => Err(e),
            Err(_) => client_error!(
                Some(self.channel),
                ErrorKind::ConnectionLost,
                ConnectionError::ConnectionForced as u16,
                "Connection closed by peer",
                frame::BASIC_CONSUME
            ),
        }
    }
}
