//! Decoded frame vocabulary of the wiremux client core.
//!
//! Frames here are already structured values: the crate defines what travels
//! between the core and a frame transport, not how it is serialized. Byte
//! level framing belongs to the transport implementation.

pub mod frame;

use frame::Frame;

/// A unit of writing on the transport.
///
/// `Frames` is an atomic sequence (a method frame followed by its content
/// header and bodies) which the transport must not interleave with other
/// frames of the same channel.
pub enum Envelope {
    Frame(Frame),
    Frames(Vec<Frame>),
}

impl From<Frame> for Envelope {
    fn from(f: Frame) -> Self {
        Envelope::Frame(f)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Frame(fr) => write!(f, "{:?}", fr),
            Envelope::Frames(frs) => f.debug_list().entries(frs.iter()).finish(),
        }
    }
}
