/// Per-connection tuning of the client core.
///
/// The defaults match the usual tune values of an AMQP 0.9 handshake; the
/// watermarks drive the backpressure boolean of publish and the drain event.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// The highest channel number the connection may open.
    pub channel_max: u16,
    /// Outgoing content bodies are split into frames of at most this size.
    pub frame_max: usize,
    /// Depth of the outbound frame buffer towards the transport.
    pub outgoing_buffer: usize,
    /// Publish reports backpressure once more than this many envelopes are
    /// buffered.
    pub outgoing_high_water: usize,
    /// A drain event fires when a backpressured buffer falls back to this
    /// many envelopes.
    pub outgoing_low_water: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            channel_max: 2047,
            frame_max: 131_072,
            outgoing_buffer: 64,
            outgoing_high_water: 48,
            outgoing_low_water: 16,
        }
    }
}

impl ClientOptions {
    pub fn channel_max(mut self, value: u16) -> Self {
        self.channel_max = value;
        self
    }

    pub fn frame_max(mut self, value: usize) -> Self {
        self.frame_max = value;
        self
    }

    pub fn outgoing_buffer(mut self, value: usize) -> Self {
        self.outgoing_buffer = value;
        self
    }

    pub fn outgoing_high_water(mut self, value: usize) -> Self {
        self.outgoing_high_water = value;
        self
    }

    pub fn outgoing_low_water(mut self, value: usize) -> Self {
        self.outgoing_low_water = value;
        self
    }
}
