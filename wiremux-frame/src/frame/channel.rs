use super::{split_class_method, Channel, ClassMethod, Frame, MethodArgs};

#[derive(Clone, Debug, Default)]
pub struct ChannelCloseArgs {
    pub code: u16,
    pub text: String,
    pub class_id: u16,
    pub method_id: u16,
}

impl ChannelCloseArgs {
    pub fn frame(self, channel: Channel) -> Frame {
        Frame::Method(channel, super::CHANNEL_CLOSE, MethodArgs::ChannelClose(self))
    }
}

/// Pause or resume the flow of content on a channel. Sent by the server when
/// it cannot keep up, also the reply the peer sends back as flow-ok.
#[derive(Clone, Debug, Default)]
pub struct ChannelFlowArgs {
    pub active: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ChannelFlowOkArgs {
    pub active: bool,
}

pub fn channel_open(channel: Channel) -> Frame {
    Frame::Method(channel, super::CHANNEL_OPEN, MethodArgs::ChannelOpen)
}

pub fn channel_open_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::CHANNEL_OPEN_OK, MethodArgs::ChannelOpenOk)
}

pub fn channel_flow(channel: Channel, active: bool) -> Frame {
    Frame::Method(
        channel,
        super::CHANNEL_FLOW,
        MethodArgs::ChannelFlow(ChannelFlowArgs { active }),
    )
}

pub fn channel_flow_ok(channel: Channel, active: bool) -> Frame {
    Frame::Method(
        channel,
        super::CHANNEL_FLOW_OK,
        MethodArgs::ChannelFlowOk(ChannelFlowOkArgs { active }),
    )
}

pub fn channel_close(channel: Channel, code: u16, text: &str, cm: ClassMethod) -> Frame {
    let (class_id, method_id) = split_class_method(cm);

    ChannelCloseArgs {
        code,
        text: text.to_string(),
        class_id,
        method_id,
    }
    .frame(channel)
}

pub fn channel_close_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::CHANNEL_CLOSE_OK, MethodArgs::ChannelCloseOk)
}
