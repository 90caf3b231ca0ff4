//! The connection task.
//!
//! One loop per connection owns every piece of mutable state: the channel
//! table, the delivery trackers, the consumer registrations and the pending
//! call map. Inbound transport events and client requests are interleaved by
//! a `select!`, so state is only ever touched while processing exactly one
//! event. Nothing here needs a lock.

use std::collections::HashMap;

use anyhow::Result;
use futures::StreamExt;
use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use wiremux_frame::frame::{self, Frame, MethodArgs};
use wiremux_frame::Envelope;

use crate::client_api::{ClientRequest, ClientRequestSink, EventSignal, EventSink, FrameResponse, Param, WaitFor};
use crate::config::ClientOptions;
use crate::delivery::Dispatch;
use crate::dispatcher::ConsumerDispatcher;
use crate::error::{ClientError, ErrorKind};
use crate::message::{self, Content, DeliveredMessage, InboundMessage, ReturnedMessage};
use crate::model::{ChannelError, ChannelNumber, ClassId, ConnectionError};
use crate::registry::ChannelRegistry;
use crate::state::{ChannelSlot, ChannelState};
use crate::transport::TransportEvent;
use crate::client_error;

struct Processor {
    options: ClientOptions,
    registry: ChannelRegistry,
    dispatcher: ConsumerDispatcher,
    /// Pending RPC style calls, one per (channel, method class).
    feedback: HashMap<(ChannelNumber, ClassId), FrameResponse>,
    /// Channel opens waiting for their open-ok, by allocated number.
    pending_opens: HashMap<ChannelNumber, oneshot::Sender<Result<ChannelNumber>>>,
    outgoing: mpsc::Sender<Envelope>,
    event_sink: EventSink,
    /// Publish reported backpressure and no drain was emitted yet.
    draining: bool,
}

pub(crate) async fn event_loop(
    options: ClientOptions,
    incoming: mpsc::Receiver<TransportEvent>,
    mut requests: mpsc::Receiver<ClientRequest>,
    outgoing: mpsc::Sender<Envelope>,
    event_sink: EventSink,
) -> Result<()> {
    let mut processor = Processor {
        registry: ChannelRegistry::new(options.channel_max),
        dispatcher: ConsumerDispatcher::new(),
        feedback: HashMap::new(),
        pending_opens: HashMap::new(),
        outgoing,
        event_sink,
        draining: false,
        options,
    };

    let mut events = ReceiverStream::new(incoming);

    loop {
        processor.emit_drain_if_recovered();

        tokio::select! {
            event = events.next() => {
                match event {
                    Some(TransportEvent::Frame(fr)) => {
                        trace!("Incoming frame {:?}", fr);

                        processor.notify_waiter(&fr);

                        match processor.handle_in_frame(fr).await {
                            Ok(true) => (),
                            Ok(false) => break,
                            Err(e) => error!("Error {:?}", e),
                        }
                    }
                    Some(TransportEvent::Closed { code, text }) => {
                        info!("Transport closed: {} {}", code, text);

                        processor.shutdown(code, &text);
                        break;
                    }
                    None => {
                        processor.shutdown(
                            ConnectionError::ConnectionForced as u16,
                            "CONNECTION_FORCED - Transport dropped",
                        );
                        break;
                    }
                }
            }
            request = requests.recv() => {
                match request {
                    Some(request) => {
                        debug!("Incoming client request {:?}", request);

                        if let Err(e) = processor.handle_request(request).await {
                            error!("Error {:?}", e);
                        }
                    }
                    None => {
                        // every client handle is gone
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

impl Processor {
    /// Unblock a pending call when its reply frame arrives. Close frames
    /// unblock more broadly: a channel close fails every call pending on that
    /// channel, a connection close fails everything.
    fn notify_waiter(&mut self, fr: &Frame) {
        let Frame::Method(channel, cm, args) = fr else {
            return;
        };

        match *cm {
            frame::CHANNEL_OPEN_OK => {
                if let Some(tx) = self.pending_opens.remove(channel) {
                    let _ = tx.send(Ok(*channel));
                }
            }
            frame::CONNECTION_CLOSE => {
                if let MethodArgs::ConnectionClose(close) = args {
                    self.fail_all_waiters(ClientError {
                        channel: None,
                        kind: ErrorKind::ConnectionLost,
                        code: close.code,
                        message: close.text.clone(),
                        class_method: frame::unify_class_method(close.class_id, close.method_id),
                    });
                }
            }
            frame::CHANNEL_CLOSE => {
                if let MethodArgs::ChannelClose(close) = args {
                    self.fail_channel_waiters(
                        *channel,
                        ClientError {
                            channel: Some(*channel),
                            kind: ErrorKind::ProtocolViolation,
                            code: close.code,
                            message: close.text.clone(),
                            class_method: frame::unify_class_method(close.class_id, close.method_id),
                        },
                    );
                }
            }
            cm if is_reply(cm) => {
                if let Some(tx) = self.feedback.remove(&(*channel, frame::class_of(cm))) {
                    let _ = tx.send(Ok(args.clone()));
                }
            }
            _ => (),
        }
    }

    async fn handle_in_frame(&mut self, fr: Frame) -> Result<bool> {
        match fr {
            Frame::Method(channel, cm, args) => self.handle_in_method(channel, cm, args).await,
            Frame::ContentHeader(header) => {
                let channel = header.channel;

                let result = match self.registry.get_mut(channel) {
                    Some(slot) if slot.is_open() => slot.on_content_header(header),
                    Some(_) => return Ok(true),
                    None => {
                        warn!("Content header for unknown channel {}", channel);
                        return Ok(true);
                    }
                };

                self.finish_content(channel, result);

                Ok(true)
            }
            Frame::ContentBody(body) => {
                let channel = body.channel;

                let result = match self.registry.get_mut(channel) {
                    Some(slot) if slot.is_open() => slot.on_content_body(body),
                    Some(_) => return Ok(true),
                    None => {
                        warn!("Content body for unknown channel {}", channel);
                        return Ok(true);
                    }
                };

                self.finish_content(channel, result);

                Ok(true)
            }
            Frame::Heartbeat(_) => Ok(true),
        }
    }

    /// Handle method frames coming from the server side.
    async fn handle_in_method(&mut self, channel: ChannelNumber, cm: u32, args: MethodArgs) -> Result<bool> {
        match args {
            MethodArgs::ConnectionClose(close) => {
                info!("Server closes the connection: {} {}", close.code, close.text);

                self.send_out(frame::connection_close_ok(0).into()).await;
                self.shutdown(close.code, &close.text);

                Ok(false)
            }
            MethodArgs::ConnectionCloseOk => {
                self.shutdown(ChannelError::Success as u16, "Normal close");

                Ok(false)
            }
            MethodArgs::ChannelOpenOk => {
                if let Some(slot) = self.registry.get_mut(channel) {
                    slot.set_state(ChannelState::Open);
                }

                Ok(true)
            }
            MethodArgs::ChannelCloseOk => {
                if let Some(mut slot) = self.registry.remove(channel) {
                    log_dropped_deliveries(&slot);
                    slot.reset();
                }

                self.dispatcher
                    .drop_channel(channel, ChannelError::Success as u16, "Normal close");

                Ok(true)
            }
            MethodArgs::ChannelClose(close) => {
                warn!(
                    "Server closes channel {}: {} {}",
                    channel, close.code, close.text
                );

                if let Some(slot) = self.registry.get_mut(channel) {
                    log_dropped_deliveries(slot);
                    slot.set_state(ChannelState::Errored);
                    slot.reset();
                }

                self.dispatcher.drop_channel(channel, close.code, &close.text);
                self.send_out(frame::channel_close_ok(channel).into()).await;

                let _ = self.event_sink.send(EventSignal::ChannelClose {
                    channel,
                    code: close.code,
                    text: close.text,
                });

                Ok(true)
            }
            MethodArgs::ChannelFlow(flow) => {
                self.handle_channel_flow(channel, flow.active).await;

                Ok(true)
            }
            MethodArgs::BasicQosOk => {
                self.apply_pending_qos(channel);

                Ok(true)
            }
            MethodArgs::BasicConsumeOk(_) => Ok(true),
            MethodArgs::BasicCancelOk(ok) => {
                self.consumer_gone(channel, &ok.consumer_tag);

                Ok(true)
            }
            MethodArgs::BasicCancel(cancel) => {
                // server side cancel, e.g. the consumed queue was deleted
                info!("Server cancelled consumer {} on channel {}", cancel.consumer_tag, channel);

                self.consumer_gone(channel, &cancel.consumer_tag);

                if !cancel.no_wait {
                    self.send_out(frame::BasicCancelOkArgs::new(&cancel.consumer_tag).frame(channel).into())
                        .await;
                }

                Ok(true)
            }
            MethodArgs::BasicDeliver(deliver) => {
                let scaffold = InboundMessage::Delivered(DeliveredMessage {
                    message: Content::default(),
                    consumer_tag: deliver.consumer_tag,
                    delivery_tag: deliver.delivery_tag,
                    redelivered: deliver.redelivered,
                    exchange: deliver.exchange_name,
                    routing_key: deliver.routing_key,
                });

                self.start_content(channel, scaffold);

                Ok(true)
            }
            MethodArgs::BasicReturn(ret) => {
                let scaffold = InboundMessage::Returned(ReturnedMessage {
                    message: Content::default(),
                    reply_code: ret.reply_code,
                    reply_text: ret.reply_text,
                    exchange: ret.exchange_name,
                    routing_key: ret.routing_key,
                });

                self.start_content(channel, scaffold);

                Ok(true)
            }
            MethodArgs::BasicAck(ack) => {
                // publisher confirm mode
                let confirming = self
                    .registry
                    .get_mut(channel)
                    .map(|slot| slot.confirm_mode)
                    .unwrap_or(false);

                if confirming {
                    let _ = self.event_sink.send(EventSignal::BasicAck {
                        channel,
                        delivery_tag: ack.delivery_tag,
                        multiple: ack.multiple,
                    });
                } else {
                    warn!("Ack on channel {} which is not in confirm mode", channel);
                }

                Ok(true)
            }
            MethodArgs::ExchangeDeclareOk
            | MethodArgs::ExchangeDeleteOk
            | MethodArgs::QueueDeclareOk(_)
            | MethodArgs::QueueBindOk
            | MethodArgs::QueueUnbindOk
            | MethodArgs::QueuePurgeOk(_)
            | MethodArgs::QueueDeleteOk(_)
            | MethodArgs::ConfirmSelectOk => Ok(true),
            other => {
                warn!("Unexpected inbound frame {:08X} {:?}", cm, other);

                Ok(true)
            }
        }
    }

    async fn handle_request(&mut self, request: ClientRequest) -> Result<()> {
        match request.param {
            Param::OpenChannel { preferred, result } => match self.registry.open(preferred) {
                Ok(number) => {
                    self.send_out(frame::channel_open(number).into()).await;
                    self.pending_opens.insert(number, result);
                }
                Err(e) => {
                    let _ = result.send(Err(e));
                }
            },
            Param::Frame(fr) => self.handle_out_frame(fr, request.response).await,
            Param::Consume(fr, sink) => {
                let Frame::Method(channel, _, MethodArgs::BasicConsume(ref args)) = *fr else {
                    unreachable!("{:?}", fr);
                };

                if let Err(e) = self.rpc_precheck(channel, frame::BASIC_CONSUME) {
                    respond(request.response, Err(e));
                    return Ok(());
                }

                if let Err(e) = self.dispatcher.register(channel, &args.consumer_tag, sink) {
                    respond(request.response, Err(e));
                    return Ok(());
                }

                self.send_out((*fr).into()).await;
                self.register_waiter(channel, frame::BASIC_CONSUME, request.response);
            }
            Param::Publish(fr, content) => self.handle_publish(*fr, content, request.response).await,
            Param::Ack(fr) => self.handle_ack(*fr, request.response).await,
        }

        Ok(())
    }

    /// Handle frames initiated by the client api which follow the plain
    /// request/reply shape, plus the close calls with their idempotency.
    async fn handle_out_frame(&mut self, fr: Frame, wait_for: WaitFor) {
        let Frame::Method(channel, cm, ref args) = fr else {
            unreachable!("{:?}", fr);
        };

        match args {
            MethodArgs::ConnectionClose(_) => {
                self.send_out(fr.into()).await;
                self.register_waiter(0, frame::CONNECTION_CLOSE, wait_for);
            }
            MethodArgs::ChannelClose(_) => {
                match self.registry.get_mut(channel).map(|slot| slot.state) {
                    None | Some(ChannelState::Closed) | Some(ChannelState::Errored) => {
                        // nothing to hand-shake anymore, closing is idempotent
                        self.registry.remove(channel);

                        respond(wait_for, Ok(MethodArgs::ChannelCloseOk));
                    }
                    Some(ChannelState::Closing) => {
                        respond(wait_for, Ok(MethodArgs::ChannelCloseOk));
                    }
                    Some(_) => {
                        if let Some(slot) = self.registry.get_mut(channel) {
                            slot.set_state(ChannelState::Closing);
                        }

                        self.send_out(fr.into()).await;
                        self.register_waiter(channel, frame::CHANNEL_CLOSE, wait_for);
                    }
                }
            }
            MethodArgs::QueueDeclare(declare) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                if let Err(e) = self.registry.check_queue_declare(channel, declare) {
                    self.fail_channel(channel, &e);
                    respond(wait_for, Err(e));
                    return;
                }

                self.send_out(fr.into()).await;
                self.register_waiter(channel, frame::QUEUE_DECLARE, wait_for);
            }
            MethodArgs::ExchangeDeclare(declare) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                if let Err(e) = self.registry.check_exchange_declare(channel, declare) {
                    self.fail_channel(channel, &e);
                    respond(wait_for, Err(e));
                    return;
                }

                self.send_out(fr.into()).await;
                self.register_waiter(channel, frame::EXCHANGE_DECLARE, wait_for);
            }
            MethodArgs::QueueDelete(delete) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                self.registry.forget_queue(&delete.queue_name);

                self.send_out(fr.into()).await;
                self.register_waiter(channel, cm, wait_for);
            }
            MethodArgs::ExchangeDelete(delete) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                self.registry.forget_exchange(&delete.exchange_name);

                self.send_out(fr.into()).await;
                self.register_waiter(channel, cm, wait_for);
            }
            MethodArgs::BasicQos(qos) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                if let Some(slot) = self.registry.get_mut(channel) {
                    slot.pending_qos = Some((qos.prefetch_count, qos.global));
                }

                self.send_out(fr.into()).await;
                self.register_waiter(channel, cm, wait_for);
            }
            MethodArgs::ConfirmSelect(_) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                if let Some(slot) = self.registry.get_mut(channel) {
                    slot.confirm_mode = true;
                }

                self.send_out(fr.into()).await;
                self.register_waiter(channel, cm, wait_for);
            }
            MethodArgs::QueueBind(_) | MethodArgs::QueueUnbind(_) | MethodArgs::QueuePurge(_)
            | MethodArgs::BasicCancel(_) => {
                if let Err(e) = self.rpc_precheck(channel, cm) {
                    respond(wait_for, Err(e));
                    return;
                }

                self.send_out(fr.into()).await;
                self.register_waiter(channel, cm, wait_for);
            }
            _ => {
                warn!("Unexpected outgoing frame {:?}", fr);
            }
        }
    }

    async fn handle_publish(&mut self, fr: Frame, content: Content, wait_for: WaitFor) {
        let channel = fr.channel();

        let state = match self.registry.route(channel, frame::BASIC_PUBLISH) {
            Ok(slot) => slot.state,
            Err(e) => {
                respond_sent(wait_for, Err(e));
                return;
            }
        };

        match state {
            ChannelState::Open | ChannelState::FlowStopped => {
                let mut frames = vec![fr];
                frames.extend(message::to_content_frames(
                    channel,
                    frame::class_of(frame::BASIC_PUBLISH),
                    content,
                    self.options.frame_max,
                ));

                let envelope = Envelope::Frames(frames);

                if state == ChannelState::FlowStopped {
                    // server stopped the flow, hold the content back
                    if let Some(slot) = self.registry.get_mut(channel) {
                        slot.flow_buffer.push(envelope);
                    }

                    respond_sent(wait_for, Ok(false));
                    return;
                }

                self.send_out(envelope).await;

                let accepted = self.buffered() <= self.options.outgoing_high_water;

                if !accepted {
                    self.draining = true;
                }

                respond_sent(wait_for, Ok(accepted));
            }
            _ => {
                respond_sent(
                    wait_for,
                    client_error!(
                        Some(channel),
                        ErrorKind::ProtocolViolation,
                        ConnectionError::ChannelError as u16,
                        format!("CHANNEL_ERROR - Channel {} is not open ({:?})", channel, state),
                        frame::BASIC_PUBLISH
                    ),
                );
            }
        }
    }

    /// Acknowledgements are validated against the delivery tracker before
    /// anything goes out: a bogus tag is reported to the caller and changes
    /// nothing.
    async fn handle_ack(&mut self, fr: Frame, wait_for: WaitFor) {
        let channel = fr.channel();

        let result = match self.registry.route(channel, frame::BASIC_ACK) {
            Ok(slot) => match &fr {
                Frame::Method(_, _, MethodArgs::BasicAck(ack)) => slot.deliveries.ack(ack.delivery_tag, ack.multiple),
                Frame::Method(_, _, MethodArgs::BasicNack(nack)) => slot
                    .deliveries
                    .nack(nack.delivery_tag, nack.flags.contains(frame::BasicNackFlags::MULTIPLE)),
                Frame::Method(_, _, MethodArgs::BasicReject(reject)) => slot.deliveries.reject(reject.delivery_tag),
                other => {
                    unreachable!("{:?}", other);
                }
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(released) => {
                self.send_out(fr.into()).await;

                respond_sent(wait_for, Ok(true));

                // acking freed prefetch slots, parked deliveries may go out
                for message in released {
                    self.dispatcher.dispatch(channel, message);
                }
            }
            Err(e) => {
                respond_sent(wait_for, Err(e));
            }
        }
    }

    async fn handle_channel_flow(&mut self, channel: ChannelNumber, active: bool) {
        let flushes = match self.registry.get_mut(channel) {
            Some(slot) => {
                if active {
                    if slot.state == ChannelState::FlowStopped {
                        slot.set_state(ChannelState::Open);
                    }

                    slot.flow_buffer.drain(..).collect()
                } else {
                    if slot.state == ChannelState::Open {
                        slot.set_state(ChannelState::FlowStopped);
                    }

                    vec![]
                }
            }
            None => {
                warn!("Flow for unknown channel {}", channel);
                return;
            }
        };

        self.send_out(frame::channel_flow_ok(channel, active).into()).await;

        if !flushes.is_empty() {
            debug!("Flushing {} held publishes on channel {}", flushes.len(), channel);
        }

        for envelope in flushes {
            self.send_out(envelope).await;
        }

        let _ = self.event_sink.send(EventSignal::ChannelFlow { channel, active });
    }

    /// The delivery or return whose content finished assembling goes to its
    /// destination; a framing error poisons the channel.
    fn finish_content(&mut self, channel: ChannelNumber, result: Result<Option<InboundMessage>>) {
        match result {
            Ok(None) => (),
            Ok(Some(InboundMessage::Delivered(message))) => {
                let recorded = match self.registry.get_mut(channel) {
                    Some(slot) => slot.deliveries.record(message),
                    None => return,
                };

                match recorded {
                    Ok(Dispatch::Now(message)) => self.dispatcher.dispatch(channel, message),
                    Ok(Dispatch::Parked) => (),
                    Err(e) => self.fail_channel(channel, &e),
                }
            }
            Ok(Some(InboundMessage::Returned(message))) => {
                let _ = self.event_sink.send(EventSignal::BasicReturn {
                    channel,
                    message: Box::new(message),
                });
            }
            Err(e) => self.fail_channel(channel, &e),
        }
    }

    fn start_content(&mut self, channel: ChannelNumber, scaffold: InboundMessage) {
        let result = match self.registry.get_mut(channel) {
            Some(slot) if slot.is_open() => slot.start_content(scaffold),
            Some(_) => {
                debug!("Ignoring content on non-open channel {}", channel);
                return;
            }
            None => {
                warn!("Delivery for unknown channel {}", channel);
                return;
            }
        };

        if let Err(e) = result {
            self.fail_channel(channel, &e);
        }
    }

    fn apply_pending_qos(&mut self, channel: ChannelNumber) {
        let Some((count, global)) = self.registry.get_mut(channel).and_then(|slot| slot.pending_qos.take()) else {
            return;
        };

        let mut released = vec![];

        if global {
            self.registry.set_default_prefetch(count);

            for slot in self.registry.channels_mut() {
                let number = slot.number;

                for message in slot.deliveries.set_prefetch(count) {
                    released.push((number, message));
                }
            }
        } else if let Some(slot) = self.registry.get_mut(channel) {
            for message in slot.deliveries.set_prefetch(count) {
                released.push((channel, message));
            }
        }

        for (number, message) in released {
            self.dispatcher.dispatch(number, message);
        }
    }

    fn consumer_gone(&mut self, channel: ChannelNumber, consumer_tag: &str) {
        self.dispatcher.cancel(channel, consumer_tag);

        if let Some(slot) = self.registry.get_mut(channel) {
            let dropped = slot.deliveries.drop_consumer(consumer_tag);

            if dropped > 0 {
                debug!(
                    "Dropped {} parked deliveries of cancelled consumer {}",
                    dropped, consumer_tag
                );
            }
        }
    }

    /// A local protocol violation on one channel: the channel goes to its
    /// terminal errored state, its consumers and pending calls are told,
    /// siblings are untouched.
    fn fail_channel(&mut self, channel: ChannelNumber, cause: &anyhow::Error) {
        warn!("Channel {} failed: {:?}", channel, cause);

        let client_error = cause
            .downcast_ref::<ClientError>()
            .cloned()
            .unwrap_or_else(|| ClientError {
                channel: Some(channel),
                kind: ErrorKind::ProtocolViolation,
                code: ConnectionError::InternalError as u16,
                message: format!("{}", cause),
                class_method: 0,
            });

        if let Some(slot) = self.registry.get_mut(channel) {
            log_dropped_deliveries(slot);
            slot.set_state(ChannelState::Errored);
            slot.reset();
        }

        self.dispatcher
            .drop_channel(channel, client_error.code, &client_error.message);
        self.fail_channel_waiters(channel, client_error);
    }

    /// Force everything down when the transport is gone or the connection is
    /// closed. Every open channel becomes closed, every pending call fails
    /// exactly once, every consumer gets a terminal signal.
    fn shutdown(&mut self, code: u16, text: &str) {
        let closed = self.registry.close_all();

        if !closed.is_empty() {
            info!("Channels {:?} forced to closed", closed);
        }

        self.fail_all_waiters(ClientError {
            channel: None,
            kind: ErrorKind::ConnectionLost,
            code,
            message: text.to_string(),
            class_method: frame::CONNECTION_CLOSE,
        });

        self.dispatcher.drop_all(code, text);

        let _ = self.event_sink.send(EventSignal::ConnectionClose {
            code,
            text: text.to_string(),
        });
    }

    fn fail_all_waiters(&mut self, error: ClientError) {
        for (_, tx) in self.feedback.drain() {
            let _ = tx.send(Err(anyhow::Error::new(error.clone())));
        }

        for (_, tx) in self.pending_opens.drain() {
            let _ = tx.send(Err(anyhow::Error::new(error.clone())));
        }
    }

    fn fail_channel_waiters(&mut self, channel: ChannelNumber, error: ClientError) {
        let keys: Vec<_> = self
            .feedback
            .keys()
            .filter(|(ch, _)| *ch == channel)
            .cloned()
            .collect();

        for key in keys {
            if let Some(tx) = self.feedback.remove(&key) {
                let _ = tx.send(Err(anyhow::Error::new(error.clone())));
            }
        }

        if let Some(tx) = self.pending_opens.remove(&channel) {
            let _ = tx.send(Err(anyhow::Error::new(error)));
        }
    }

    /// RPC style calls need a live, open channel with no other call of the
    /// same kind in flight; the protocol is synchronous per channel for them.
    /// Checked before anything reaches the wire.
    fn rpc_precheck(&mut self, channel: ChannelNumber, cm: u32) -> Result<()> {
        let slot = self.registry.route(channel, cm)?;

        if !slot.is_open() {
            return client_error!(
                Some(channel),
                ErrorKind::ProtocolViolation,
                ConnectionError::ChannelError as u16,
                format!("CHANNEL_ERROR - Channel {} is not usable ({:?})", channel, slot.state),
                cm
            );
        }

        if self.feedback.contains_key(&(channel, frame::class_of(cm))) {
            return client_error!(
                Some(channel),
                ErrorKind::ProtocolViolation,
                ConnectionError::CommandInvalid as u16,
                "COMMAND_INVALID - Another call of this kind is pending on the channel",
                cm
            );
        }

        Ok(())
    }

    /// Only one call of a correlating kind may wait per channel; the
    /// protocol is synchronous per channel for RPC style calls.
    fn register_waiter(&mut self, channel: ChannelNumber, cm: u32, wait_for: WaitFor) {
        trace!("Register waiter on channel {} class {:02X}", channel, frame::class_of(cm));

        match wait_for {
            WaitFor::Nothing => (),
            WaitFor::SentOut(tx) => {
                let _ = tx.send(Ok(true));
            }
            WaitFor::FrameResponse(tx) => {
                let key = (channel, frame::class_of(cm));

                if self.feedback.contains_key(&key) {
                    let _ = tx.send(client_error!(
                        Some(channel),
                        ErrorKind::ProtocolViolation,
                        ConnectionError::CommandInvalid as u16,
                        "COMMAND_INVALID - Another call of this kind is pending on the channel",
                        cm
                    ));
                    return;
                }

                self.feedback.insert(key, tx);
            }
        }
    }

    async fn send_out(&mut self, envelope: Envelope) {
        if self.outgoing.send(envelope).await.is_err() {
            error!("Transport dropped the outgoing frame channel");
        }
    }

    fn buffered(&self) -> usize {
        self.outgoing.max_capacity() - self.outgoing.capacity()
    }

    fn emit_drain_if_recovered(&mut self) {
        if self.draining && self.buffered() <= self.options.outgoing_low_water {
            self.draining = false;

            let _ = self.event_sink.send(EventSignal::Drain);
        }
    }
}

fn log_dropped_deliveries(slot: &ChannelSlot) {
    let outstanding = slot.deliveries.outstanding();

    if outstanding > 0 {
        debug!(
            "Dropping {} unacked deliveries ({} bytes) on channel {}",
            outstanding,
            slot.deliveries.pending_bytes(),
            slot.number
        );
    }
}

/// Reply frames which unblock a pending call of their class.
fn is_reply(cm: u32) -> bool {
    matches!(
        cm,
        frame::CONNECTION_CLOSE_OK
            | frame::CHANNEL_CLOSE_OK
            | frame::EXCHANGE_DECLARE_OK
            | frame::EXCHANGE_DELETE_OK
            | frame::QUEUE_DECLARE_OK
            | frame::QUEUE_BIND_OK
            | frame::QUEUE_UNBIND_OK
            | frame::QUEUE_PURGE_OK
            | frame::QUEUE_DELETE_OK
            | frame::BASIC_QOS_OK
            | frame::BASIC_CONSUME_OK
            | frame::BASIC_CANCEL_OK
            | frame::CONFIRM_SELECT_OK
    )
}

fn respond(wait_for: WaitFor, result: Result<MethodArgs>) {
    match wait_for {
        WaitFor::Nothing => (),
        WaitFor::SentOut(tx) => {
            let _ = tx.send(result.map(|_| true));
        }
        WaitFor::FrameResponse(tx) => {
            let _ = tx.send(result);
        }
    }
}

fn respond_sent(wait_for: WaitFor, result: Result<bool>) {
    match wait_for {
        WaitFor::Nothing => (),
        WaitFor::SentOut(tx) => {
            let _ = tx.send(result);
        }
        WaitFor::FrameResponse(tx) => {
            let _ = tx.send(result.map(|_| MethodArgs::ChannelCloseOk));
        }
    }
}

/// Sends a frame and waits until its reply frame arrives.
pub(crate) async fn call(sink: &ClientRequestSink, fr: Frame) -> Result<MethodArgs> {
    let (tx, rx) = oneshot::channel();

    let request = ClientRequest {
        param: Param::Frame(fr),
        response: WaitFor::FrameResponse(tx),
    };

    if sink.send(request).await.is_err() {
        return connection_lost();
    }

    match rx.await {
        Ok(result) => result,
        Err(_) => connection_lost(),
    }
}

/// Sends an ack style frame and waits until the loop validated and wrote it.
pub(crate) async fn ack_send(sink: &ClientRequestSink, fr: Frame) -> Result<()> {
    let (tx, rx) = oneshot::channel();

    let request = ClientRequest {
        param: Param::Ack(Box::new(fr)),
        response: WaitFor::SentOut(tx),
    };

    if sink.send(request).await.is_err() {
        return connection_lost();
    }

    match rx.await {
        Ok(result) => result.map(|_| ()),
        Err(_) => connection_lost(),
    }
}

fn connection_lost<T>() -> Result<T> {
    client_error!(
        None,
        ErrorKind::ConnectionLost,
        ConnectionError::ConnectionForced as u16,
        "Connection closed by peer",
        0
    )
}
