use bitflags::bitflags;

use super::{Channel, FieldTable, Frame, MethodArgs};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct BasicConsumeFlags: u8 {
        const NO_LOCAL = 0b0000_0001;
        const NO_ACK = 0b0000_0010;
        const EXCLUSIVE = 0b0000_0100;
        const NO_WAIT = 0b0000_1000;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct BasicPublishFlags: u8 {
        const MANDATORY = 0b0000_0001;
        const IMMEDIATE = 0b0000_0010;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct BasicNackFlags: u8 {
        const MULTIPLE = 0b0000_0001;
        const REQUEUE = 0b0000_0010;
    }
}

impl Default for BasicConsumeFlags {
    fn default() -> Self {
        BasicConsumeFlags::empty()
    }
}

impl Default for BasicPublishFlags {
    fn default() -> Self {
        BasicPublishFlags::empty()
    }
}

impl Default for BasicNackFlags {
    fn default() -> Self {
        BasicNackFlags::empty()
    }
}

/// In-flight delivery window of a channel, or of the whole connection if
/// `global` is set. A `prefetch_count` of 0 lifts the limit.
#[derive(Clone, Debug, Default)]
pub struct BasicQosArgs {
    pub prefetch_size: u32,
    pub prefetch_count: u16,
    pub global: bool,
}

impl BasicQosArgs {
    pub fn prefetch_count(mut self, count: u16) -> Self {
        self.prefetch_count = count;
        self
    }

    pub fn global(mut self, mode: bool) -> Self {
        self.global = mode;
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_QOS, MethodArgs::BasicQos(self))
    }
}

pub fn basic_qos_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::BASIC_QOS_OK, MethodArgs::BasicQosOk)
}

#[derive(Clone, Debug, Default)]
pub struct BasicConsumeArgs {
    pub queue: String,
    pub consumer_tag: String,
    pub flags: BasicConsumeFlags,
    pub args: Option<FieldTable>,
}

impl BasicConsumeArgs {
    pub fn queue(mut self, queue: &str) -> Self {
        self.queue = queue.to_string();
        self
    }

    pub fn consumer_tag(mut self, consumer_tag: &str) -> Self {
        self.consumer_tag = consumer_tag.to_string();
        self
    }

    pub fn no_ack(mut self, mode: bool) -> Self {
        self.flags.set(BasicConsumeFlags::NO_ACK, mode);
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.flags.set(BasicConsumeFlags::EXCLUSIVE, mode);
        self
    }

    pub fn no_local(mut self, mode: bool) -> Self {
        self.flags.set(BasicConsumeFlags::NO_LOCAL, mode);
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_CONSUME, MethodArgs::BasicConsume(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicConsumeOkArgs {
    pub consumer_tag: String,
}

impl BasicConsumeOkArgs {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_string(),
        }
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_CONSUME_OK, MethodArgs::BasicConsumeOk(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicCancelArgs {
    pub consumer_tag: String,
    pub no_wait: bool,
}

impl BasicCancelArgs {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_string(),
            no_wait: false,
        }
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_CANCEL, MethodArgs::BasicCancel(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicCancelOkArgs {
    pub consumer_tag: String,
}

impl BasicCancelOkArgs {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_string(),
        }
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_CANCEL_OK, MethodArgs::BasicCancelOk(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicPublishArgs {
    pub exchange_name: String,
    pub routing_key: String,
    pub flags: BasicPublishFlags,
}

impl BasicPublishArgs {
    pub fn new(exchange_name: &str, routing_key: &str) -> Self {
        Self {
            exchange_name: exchange_name.to_string(),
            routing_key: routing_key.to_string(),
            flags: BasicPublishFlags::default(),
        }
    }

    pub fn mandatory(mut self, mode: bool) -> Self {
        self.flags.set(BasicPublishFlags::MANDATORY, mode);
        self
    }

    pub fn immediate(mut self, mode: bool) -> Self {
        self.flags.set(BasicPublishFlags::IMMEDIATE, mode);
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_PUBLISH, MethodArgs::BasicPublish(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicDeliverArgs {
    pub consumer_tag: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange_name: String,
    pub routing_key: String,
}

impl BasicDeliverArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_DELIVER, MethodArgs::BasicDeliver(self))
    }
}

/// An unroutable mandatory message coming back from the server, followed by
/// its content frames.
#[derive(Clone, Debug, Default)]
pub struct BasicReturnArgs {
    pub reply_code: u16,
    pub reply_text: String,
    pub exchange_name: String,
    pub routing_key: String,
}

impl BasicReturnArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_RETURN, MethodArgs::BasicReturn(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicAckArgs {
    pub delivery_tag: u64,
    pub multiple: bool,
}

impl BasicAckArgs {
    pub fn delivery_tag(mut self, tag: u64) -> Self {
        self.delivery_tag = tag;
        self
    }

    pub fn multiple(mut self, mode: bool) -> Self {
        self.multiple = mode;
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_ACK, MethodArgs::BasicAck(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicNackArgs {
    pub delivery_tag: u64,
    pub flags: BasicNackFlags,
}

impl BasicNackArgs {
    pub fn delivery_tag(mut self, tag: u64) -> Self {
        self.delivery_tag = tag;
        self
    }

    pub fn multiple(mut self, mode: bool) -> Self {
        self.flags.set(BasicNackFlags::MULTIPLE, mode);
        self
    }

    pub fn requeue(mut self, mode: bool) -> Self {
        self.flags.set(BasicNackFlags::REQUEUE, mode);
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_NACK, MethodArgs::BasicNack(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicRejectArgs {
    pub delivery_tag: u64,
    pub requeue: bool,
}

impl BasicRejectArgs {
    pub fn delivery_tag(mut self, tag: u64) -> Self {
        self.delivery_tag = tag;
        self
    }

    pub fn requeue(mut self, mode: bool) -> Self {
        self.requeue = mode;
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::BASIC_REJECT, MethodArgs::BasicReject(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfirmSelectArgs {
    pub no_wait: bool,
}

pub fn confirm_select(channel: Channel) -> Frame {
    Frame::Method(
        channel,
        super::CONFIRM_SELECT,
        MethodArgs::ConfirmSelect(ConfirmSelectArgs::default()),
    )
}

pub fn confirm_select_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::CONFIRM_SELECT_OK, MethodArgs::ConfirmSelectOk)
}
