//! AMQP compatible message-channel client core.
//!
//! wiremux is the part of a messaging client between the caller facing
//! channel API and the wire: it multiplexes logical channels over one
//! connection, tracks delivery acknowledgements for at-least-once consuming,
//! and dispatches inbound messages to consumers in arrival order. It does not
//! speak bytes; a transport collaborator exchanges already decoded frames
//! through the [`TransportPipe`] returned by [`attach`].
//!
//! RPC style calls (declares, binds, qos, close) suspend the caller until the
//! reply frame arrives. Publishing never suspends; it reports backpressure
//! through its boolean result and the [`EventSignal::Drain`] event. Consuming
//! yields an unbounded, cancellable stream of signals per consumer.

mod channel_api;
pub use channel_api::{
    Channel, ExchangeDeclareOpts, ExchangeType, Global, IfEmpty, IfUnused, QueueDeclareOpts, QueueInfo,
};

mod client_api;
pub use client_api::{attach, Client, EventHandler, EventSignal};

mod config;
pub use config::ClientOptions;

mod consumer;
pub use consumer::{ConsumeOpts, ConsumerHandler, ConsumerSignal};

pub mod error;
pub use error::{ClientError, ErrorKind};

mod message;
pub use message::{Content, DeliveredMessage, MessageProperties, PublishedMessage, ReturnedMessage};

mod model;
pub use model::{ChannelError, ChannelNumber, ConnectionError};

mod transport;
pub use transport::{TransportEvent, TransportPipe};

mod delivery;
mod dispatcher;
mod processor;
mod registry;
mod state;
