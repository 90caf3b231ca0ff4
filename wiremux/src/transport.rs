//! The seam between the client core and whatever moves frames on the wire.
//!
//! The core never sees bytes. A transport implementation drains `outgoing`
//! envelopes, writes them in order (one writer at a time), and pushes every
//! decoded inbound frame into `incoming`. Frames of different channels may be
//! interleaved on the wire, the frames of one envelope may not.

use tokio::sync::mpsc;
use wiremux_frame::{frame::Frame, Envelope};

/// What the transport reports to the core.
#[derive(Debug)]
pub enum TransportEvent {
    /// A decoded inbound frame; the frame itself carries its channel number.
    Frame(Frame),
    /// The underlying connection went away for the given reason. Dropping the
    /// `incoming` sender has the same effect as sending this.
    Closed { code: u16, text: String },
}

/// The transport's half of the connection, returned by [`crate::attach`].
pub struct TransportPipe {
    /// Envelopes the core wants written, in order.
    pub outgoing: mpsc::Receiver<Envelope>,
    /// Feed decoded inbound frames and the closed signal here.
    pub incoming: mpsc::Sender<TransportEvent>,
}
