use bitflags::bitflags;

use super::{Channel, FieldTable, Frame, MethodArgs};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct QueueDeclareFlags: u8 {
        const PASSIVE = 0b0000_0001;
        const DURABLE = 0b0000_0010;
        const EXCLUSIVE = 0b0000_0100;
        const AUTO_DELETE = 0b0000_1000;
        const NO_WAIT = 0b0001_0000;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct QueueDeleteFlags: u8 {
        const IF_UNUSED = 0b0000_0001;
        const IF_EMPTY = 0b0000_0010;
        const NO_WAIT = 0b0000_0100;
    }
}

impl Default for QueueDeclareFlags {
    fn default() -> Self {
        QueueDeclareFlags::empty()
    }
}

impl Default for QueueDeleteFlags {
    fn default() -> Self {
        QueueDeleteFlags::empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueDeclareArgs {
    pub name: String,
    pub flags: QueueDeclareFlags,
    pub args: Option<FieldTable>,
}

impl QueueDeclareArgs {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn passive(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeclareFlags::PASSIVE, mode);
        self
    }

    pub fn durable(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeclareFlags::DURABLE, mode);
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeclareFlags::EXCLUSIVE, mode);
        self
    }

    pub fn auto_delete(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeclareFlags::AUTO_DELETE, mode);
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_DECLARE, MethodArgs::QueueDeclare(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueDeclareOkArgs {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

impl QueueDeclareOkArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_DECLARE_OK, MethodArgs::QueueDeclareOk(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueBindArgs {
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    pub args: Option<FieldTable>,
}

impl QueueBindArgs {
    pub fn new(queue_name: &str, exchange_name: &str, routing_key: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            exchange_name: exchange_name.to_string(),
            routing_key: routing_key.to_string(),
            args: None,
        }
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_BIND, MethodArgs::QueueBind(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueUnbindArgs {
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
}

impl QueueUnbindArgs {
    pub fn new(queue_name: &str, exchange_name: &str, routing_key: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            exchange_name: exchange_name.to_string(),
            routing_key: routing_key.to_string(),
        }
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_UNBIND, MethodArgs::QueueUnbind(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueuePurgeArgs {
    pub queue_name: String,
}

impl QueuePurgeArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_PURGE, MethodArgs::QueuePurge(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueuePurgeOkArgs {
    pub message_count: u32,
}

impl QueuePurgeOkArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_PURGE_OK, MethodArgs::QueuePurgeOk(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueDeleteArgs {
    pub queue_name: String,
    pub flags: QueueDeleteFlags,
}

impl QueueDeleteArgs {
    pub fn queue_name(mut self, name: &str) -> Self {
        self.queue_name = name.to_string();
        self
    }

    pub fn if_unused(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeleteFlags::IF_UNUSED, mode);
        self
    }

    pub fn if_empty(mut self, mode: bool) -> Self {
        self.flags.set(QueueDeleteFlags::IF_EMPTY, mode);
        self
    }

    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_DELETE, MethodArgs::QueueDelete(self))
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueDeleteOkArgs {
    pub message_count: u32,
}

impl QueueDeleteOkArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::QUEUE_DELETE_OK, MethodArgs::QueueDeleteOk(self))
    }
}

pub fn queue_bind_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::QUEUE_BIND_OK, MethodArgs::QueueBindOk)
}

pub fn queue_unbind_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::QUEUE_UNBIND_OK, MethodArgs::QueueUnbindOk)
}
