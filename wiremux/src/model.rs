use wiremux_frame::frame;

/// Logical channel number multiplexed on a connection
pub type ChannelNumber = frame::Channel;
/// Method class id
pub type ClassId = frame::ClassId;
/// Combined class id and method id
pub type ClassMethod = frame::ClassMethod;

/// Reply codes in connection scope.
#[derive(Debug)]
pub enum ConnectionError {
    /// The peer forced the connection to close.
    ConnectionForced = 320,
    /// A frame was sent which didn't fit in the normal order.
    CommandInvalid = 503,
    /// A frame referred to a non-existing or not-opened channel.
    ChannelError = 504,
    /// An unexpected content header or body frame arrived.
    UnexpectedFrame = 505,
    /// The limits agreed for the connection were exceeded.
    ResourceError = 506,
    /// The peer tried to work with an entity in a way which is not allowed.
    NotAllowed = 530,
    /// The peer tried to use a not implemented functionality.
    NotImplemented = 540,
    /// The request couldn't be fulfilled because of an intermittent error.
    InternalError = 541,
}

/// Reply codes in channel scope.
#[derive(Debug)]
pub enum ChannelError {
    /// Denotes successful execution like connection or channel closed.
    Success = 200,
    /// The mandatory message cannot be routed to queues.
    NoRoute = 312,
    /// The client tried to access a resource it didn't have access to.
    AccessRefused = 403,
    /// Queue or exchange cannot be found.
    NotFound = 404,
    /// The resource is locked by another client.
    ResourceLocked = 405,
    /// The work on the resource is refused, mostly because of validation errors.
    PreconditionFailed = 406,
}
