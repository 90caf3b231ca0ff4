use anyhow::Result;
use tokio::sync::oneshot;
use wiremux_frame::frame::{self, FieldTable, MethodArgs};

use crate::client_api::{ClientRequest, ClientRequestSink, Param, WaitFor};
use crate::error::ErrorKind;
use crate::message::PublishedMessage;
use crate::model::{ChannelError, ChannelNumber, ConnectionError};
use crate::processor;
use crate::client_error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExchangeType {
    Direct,
    Topic,
    Fanout,
    Headers,
}

impl ExchangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Direct => "direct",
            ExchangeType::Topic => "topic",
            ExchangeType::Fanout => "fanout",
            ExchangeType::Headers => "headers",
        }
    }
}

impl std::str::FromStr for ExchangeType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeType::Direct),
            "topic" => Ok(ExchangeType::Topic),
            "fanout" => Ok(ExchangeType::Fanout),
            "headers" => Ok(ExchangeType::Headers),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExchangeDeclareOpts {
    pub passive: bool,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
}

impl ExchangeDeclareOpts {
    pub fn passive(mut self, mode: bool) -> Self {
        self.passive = mode;
        self
    }

    pub fn durable(mut self, mode: bool) -> Self {
        self.durable = mode;
        self
    }

    pub fn auto_delete(mut self, mode: bool) -> Self {
        self.auto_delete = mode;
        self
    }

    pub fn internal(mut self, mode: bool) -> Self {
        self.internal = mode;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueDeclareOpts {
    pub passive: bool,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

impl QueueDeclareOpts {
    pub fn passive(mut self, mode: bool) -> Self {
        self.passive = mode;
        self
    }

    pub fn durable(mut self, mode: bool) -> Self {
        self.durable = mode;
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.exclusive = mode;
        self
    }

    pub fn auto_delete(mut self, mode: bool) -> Self {
        self.auto_delete = mode;
        self
    }
}

/// Specify if a delete should happen only when the entity is unused.
pub struct IfUnused(pub bool);
/// Specify if a queue delete should happen only when the queue is empty.
pub struct IfEmpty(pub bool);
/// Specify if a prefetch limit applies to the whole connection.
pub struct Global(pub bool);

/// What the server declared for a queue.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueInfo {
    pub queue: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

/// Handle of one logical channel. Cheap to clone; every operation goes
/// through the connection task which owns the real channel state.
#[derive(Clone, Debug)]
pub struct Channel {
    pub channel: ChannelNumber,
    pub(crate) sink: ClientRequestSink,
}

impl Channel {
    pub(crate) fn new(channel: ChannelNumber, sink: ClientRequestSink) -> Channel {
        Channel { channel, sink }
    }

    /// Declare an exchange. Redeclaring with the same properties is a no-op,
    /// different properties invalidate the channel.
    pub async fn exchange_declare(
        &self,
        exchange_name: &str,
        exchange_type: ExchangeType,
        opts: ExchangeDeclareOpts,
    ) -> Result<()> {
        let fr = frame::ExchangeDeclareArgs::default()
            .exchange_name(exchange_name)
            .exchange_type(exchange_type.as_str())
            .passive(opts.passive)
            .durable(opts.durable)
            .auto_delete(opts.auto_delete)
            .internal(opts.internal)
            .frame(self.channel);

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    /// Delete an exchange.
    pub async fn exchange_delete(&self, exchange_name: &str, if_unused: IfUnused) -> Result<()> {
        let fr = frame::ExchangeDeleteArgs::default()
            .exchange_name(exchange_name)
            .if_unused(if_unused.0)
            .frame(self.channel);

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    /// Declare a queue and return what the server knows about it.
    pub async fn queue_declare(&self, queue_name: &str, opts: QueueDeclareOpts) -> Result<QueueInfo> {
        let fr = frame::QueueDeclareArgs::default()
            .name(queue_name)
            .passive(opts.passive)
            .durable(opts.durable)
            .exclusive(opts.exclusive)
            .auto_delete(opts.auto_delete)
            .frame(self.channel);

        match processor::call(&self.sink, fr).await? {
            MethodArgs::QueueDeclareOk(ok) => Ok(QueueInfo {
                queue: ok.name,
                message_count: ok.message_count,
                consumer_count: ok.consumer_count,
            }),
            other => self.unexpected_reply(other, frame::QUEUE_DECLARE),
        }
    }

    /// Bind a queue to an exchange. How the routing key is interpreted
    /// depends on the exchange type and is decided by the server.
    pub async fn queue_bind(&self, queue_name: &str, exchange_name: &str, routing_key: &str) -> Result<()> {
        let fr = frame::QueueBindArgs::new(queue_name, exchange_name, routing_key).frame(self.channel);

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    /// Bind with header arguments, used by headers exchanges.
    pub async fn queue_bind_with_arguments(
        &self,
        queue_name: &str,
        exchange_name: &str,
        routing_key: &str,
        args: FieldTable,
    ) -> Result<()> {
        let mut bind = frame::QueueBindArgs::new(queue_name, exchange_name, routing_key);
        bind.args = Some(args);

        processor::call(&self.sink, bind.frame(self.channel)).await?;

        Ok(())
    }

    pub async fn queue_unbind(&self, queue_name: &str, exchange_name: &str, routing_key: &str) -> Result<()> {
        let fr = frame::QueueUnbindArgs::new(queue_name, exchange_name, routing_key).frame(self.channel);

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    /// Drops the messages of a queue, returns how many were purged.
    pub async fn queue_purge(&self, queue_name: &str) -> Result<u32> {
        let fr = frame::QueuePurgeArgs {
            queue_name: queue_name.to_string(),
        }
        .frame(self.channel);

        match processor::call(&self.sink, fr).await? {
            MethodArgs::QueuePurgeOk(ok) => Ok(ok.message_count),
            other => self.unexpected_reply(other, frame::QUEUE_PURGE),
        }
    }

    /// Deletes a queue, returns how many messages were dropped with it.
    pub async fn queue_delete(&self, queue_name: &str, if_unused: IfUnused, if_empty: IfEmpty) -> Result<u32> {
        let fr = frame::QueueDeleteArgs::default()
            .queue_name(queue_name)
            .if_unused(if_unused.0)
            .if_empty(if_empty.0)
            .frame(self.channel);

        match processor::call(&self.sink, fr).await? {
            MethodArgs::QueueDeleteOk(ok) => Ok(ok.message_count),
            other => self.unexpected_reply(other, frame::QUEUE_DELETE),
        }
    }

    /// Caps how many deliveries may be in flight unacknowledged, 0 lifts the
    /// cap. Takes effect when the server confirms, for deliveries dispatched
    /// after that.
    pub async fn prefetch(&self, count: u16, global: Global) -> Result<()> {
        let fr = frame::BasicQosArgs::default()
            .prefetch_count(count)
            .global(global.0)
            .frame(self.channel);

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    /// Puts the channel in publisher confirm mode; server acks arrive as
    /// [`crate::EventSignal::BasicAck`] events.
    pub async fn confirm(&self) -> Result<()> {
        processor::call(&self.sink, frame::confirm_select(self.channel)).await?;

        Ok(())
    }

    /// Publishes a message, fire and forget.
    ///
    /// The returned boolean tells whether the outbound buffer stayed below
    /// its high watermark; on `false` the caller should pause publishing
    /// until the [`crate::EventSignal::Drain`] event.
    pub async fn basic_publish(
        &self,
        exchange_name: &str,
        routing_key: &str,
        message: PublishedMessage,
    ) -> Result<bool> {
        let fr = frame::BasicPublishArgs::new(exchange_name, routing_key)
            .mandatory(message.mandatory)
            .immediate(message.immediate)
            .frame(self.channel);

        let (tx, rx) = oneshot::channel();

        let request = ClientRequest {
            param: Param::Publish(Box::new(fr), message.message),
            response: WaitFor::SentOut(tx),
        };

        if self.sink.send(request).await.is_err() {
            return client_error!(
                Some(self.channel),
                ErrorKind::ConnectionLost,
                ConnectionError::ConnectionForced as u16,
                "Connection closed by peer",
                frame::BASIC_PUBLISH
            );
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => client_error!(
                Some(self.channel),
                ErrorKind::ConnectionLost,
                ConnectionError::ConnectionForced as u16,
                "Connection closed by peer",
                frame::BASIC_PUBLISH
            ),
        }
    }

    /// Publishes straight to a queue through the default exchange.
    pub async fn send_to_queue(&self, queue_name: &str, message: PublishedMessage) -> Result<bool> {
        self.basic_publish("", queue_name, message).await
    }

    /// Closes the channel. Closing an already closed channel is a no-op.
    pub async fn close(&self) -> Result<()> {
        let fr = frame::channel_close(
            self.channel,
            ChannelError::Success as u16,
            "Normal close",
            frame::CHANNEL_CLOSE,
        );

        processor::call(&self.sink, fr).await?;

        Ok(())
    }

    fn unexpected_reply<T>(&self, args: MethodArgs, cm: u32) -> Result<T> {
        client_error!(
            Some(self.channel),
            ErrorKind::ProtocolViolation,
            ConnectionError::CommandInvalid as u16,
            format!("COMMAND_INVALID - Unexpected reply {:?}", args),
            cm
        )
    }
}
