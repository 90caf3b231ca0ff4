//! Owner of the channel table of one connection.
//!
//! Channel numbers are allocated here and nowhere else: the lowest unused
//! number starting from 1, bounded by the negotiated channel-max, reusable
//! only after the slot is fully gone. The registry also keeps the connection
//! scope view of declared queues and exchanges so a conflicting redeclare is
//! caught before any frame goes out.

use std::collections::HashMap;

use anyhow::Result;
use log::debug;
use wiremux_frame::frame::{self, ExchangeDeclareArgs, ExchangeDeclareFlags, QueueDeclareArgs, QueueDeclareFlags};

use crate::error::ErrorKind;
use crate::model::{ChannelError, ChannelNumber, ConnectionError};
use crate::state::{ChannelSlot, ChannelState};
use crate::client_error;

/// The properties of a queue as declared, compared field-wise on redeclare.
#[derive(Debug, PartialEq)]
struct QueueDeclaration {
    durable: bool,
    exclusive: bool,
    auto_delete: bool,
}

impl From<&QueueDeclareArgs> for QueueDeclaration {
    fn from(args: &QueueDeclareArgs) -> Self {
        Self {
            durable: args.flags.contains(QueueDeclareFlags::DURABLE),
            exclusive: args.flags.contains(QueueDeclareFlags::EXCLUSIVE),
            auto_delete: args.flags.contains(QueueDeclareFlags::AUTO_DELETE),
        }
    }
}

#[derive(Debug, PartialEq)]
struct ExchangeDeclaration {
    exchange_type: String,
    durable: bool,
    auto_delete: bool,
    internal: bool,
}

impl From<&ExchangeDeclareArgs> for ExchangeDeclaration {
    fn from(args: &ExchangeDeclareArgs) -> Self {
        Self {
            exchange_type: args.exchange_type.clone(),
            durable: args.flags.contains(ExchangeDeclareFlags::DURABLE),
            auto_delete: args.flags.contains(ExchangeDeclareFlags::AUTO_DELETE),
            internal: args.flags.contains(ExchangeDeclareFlags::INTERNAL),
        }
    }
}

pub(crate) struct ChannelRegistry {
    channels: HashMap<ChannelNumber, ChannelSlot>,
    channel_max: u16,
    /// Connection wide prefetch limit set by a global qos, seeds new slots.
    default_prefetch: u16,
    queues: HashMap<String, QueueDeclaration>,
    exchanges: HashMap<String, ExchangeDeclaration>,
}

impl ChannelRegistry {
    pub(crate) fn new(channel_max: u16) -> Self {
        Self {
            channels: HashMap::new(),
            channel_max,
            default_prefetch: 0,
            queues: HashMap::new(),
            exchanges: HashMap::new(),
        }
    }

    /// Allocates a channel number and creates its slot in `Opening` state.
    pub(crate) fn open(&mut self, preferred: Option<ChannelNumber>) -> Result<ChannelNumber> {
        let number = match preferred {
            Some(0) => {
                return client_error!(
                    None,
                    ErrorKind::ProtocolViolation,
                    ConnectionError::CommandInvalid as u16,
                    "COMMAND_INVALID - Channel 0 is reserved for the connection",
                    frame::CHANNEL_OPEN
                )
            }
            Some(n) if n > self.channel_max => {
                return client_error!(
                    None,
                    ErrorKind::ChannelExhausted,
                    ConnectionError::ResourceError as u16,
                    "RESOURCE_ERROR - Channel number is too large",
                    frame::CHANNEL_OPEN
                )
            }
            Some(n) if self.channels.contains_key(&n) => {
                return client_error!(
                    Some(n),
                    ErrorKind::ProtocolViolation,
                    ConnectionError::ChannelError as u16,
                    "CHANNEL_ERROR - Channel is already open",
                    frame::CHANNEL_OPEN
                )
            }
            Some(n) => n,
            None => match (1..=self.channel_max).find(|n| !self.channels.contains_key(n)) {
                Some(n) => n,
                None => {
                    return client_error!(
                        None,
                        ErrorKind::ChannelExhausted,
                        ConnectionError::ResourceError as u16,
                        "RESOURCE_ERROR - No free channel number on the connection",
                        frame::CHANNEL_OPEN
                    )
                }
            },
        };

        debug!("Allocating channel {}", number);

        self.channels
            .insert(number, ChannelSlot::new(number, self.default_prefetch));

        Ok(number)
    }

    pub(crate) fn get_mut(&mut self, channel: ChannelNumber) -> Option<&mut ChannelSlot> {
        self.channels.get_mut(&channel)
    }

    /// Finds the slot an inbound frame belongs to.
    pub(crate) fn route(&mut self, channel: ChannelNumber, cm: u32) -> Result<&mut ChannelSlot> {
        match self.channels.get_mut(&channel) {
            Some(slot) => Ok(slot),
            None => client_error!(
                Some(channel),
                ErrorKind::UnknownChannel,
                ConnectionError::ChannelError as u16,
                format!("CHANNEL_ERROR - No open channel {}", channel),
                cm
            ),
        }
    }

    /// Releases a channel number for reuse.
    pub(crate) fn remove(&mut self, channel: ChannelNumber) -> Option<ChannelSlot> {
        self.channels.remove(&channel)
    }

    /// Forces every channel to its terminal state when the transport drops.
    /// Returns the numbers which were still live.
    pub(crate) fn close_all(&mut self) -> Vec<ChannelNumber> {
        let mut closed = vec![];

        for (number, slot) in self.channels.iter_mut() {
            if slot.state != ChannelState::Closed {
                slot.set_state(ChannelState::Closed);
                closed.push(*number);
            }

            slot.reset();
        }

        closed.sort_unstable();
        closed
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut ChannelSlot> {
        self.channels.values_mut()
    }

    pub(crate) fn set_default_prefetch(&mut self, count: u16) {
        self.default_prefetch = count;
    }

    /// Checks a queue declare against what this connection already declared.
    /// A passive declare is an existence check, decided by the server.
    pub(crate) fn check_queue_declare(&mut self, channel: ChannelNumber, args: &QueueDeclareArgs) -> Result<()> {
        if args.flags.contains(QueueDeclareFlags::PASSIVE) {
            return Ok(());
        }

        let declaration = QueueDeclaration::from(args);

        match self.queues.get(&args.name) {
            Some(existing) if *existing != declaration => client_error!(
                Some(channel),
                ErrorKind::ProtocolViolation,
                ChannelError::PreconditionFailed as u16,
                format!(
                    "PRECONDITION_FAILED - Queue '{}' exists but properties are different",
                    args.name
                ),
                frame::QUEUE_DECLARE
            ),
            _ => {
                self.queues.insert(args.name.clone(), declaration);

                Ok(())
            }
        }
    }

    pub(crate) fn check_exchange_declare(&mut self, channel: ChannelNumber, args: &ExchangeDeclareArgs) -> Result<()> {
        if args.flags.contains(ExchangeDeclareFlags::PASSIVE) {
            return Ok(());
        }

        let declaration = ExchangeDeclaration::from(args);

        match self.exchanges.get(&args.exchange_name) {
            Some(existing) if *existing != declaration => client_error!(
                Some(channel),
                ErrorKind::ProtocolViolation,
                ChannelError::PreconditionFailed as u16,
                format!(
                    "PRECONDITION_FAILED - Exchange '{}' exists but properties are different",
                    args.exchange_name
                ),
                frame::EXCHANGE_DECLARE
            ),
            _ => {
                self.exchanges.insert(args.exchange_name.clone(), declaration);

                Ok(())
            }
        }
    }

    pub(crate) fn forget_queue(&mut self, name: &str) {
        self.queues.remove(name);
    }

    pub(crate) fn forget_exchange(&mut self, name: &str) {
        self.exchanges.remove(name);
    }
}
