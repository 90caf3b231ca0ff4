use super::{split_class_method, Channel, ClassMethod, Frame, MethodArgs};

#[derive(Clone, Debug, Default)]
pub struct ConnectionCloseArgs {
    pub code: u16,
    pub text: String,
    pub class_id: u16,
    pub method_id: u16,
}

impl ConnectionCloseArgs {
    pub fn frame(self) -> Frame {
        Frame::Method(0, super::CONNECTION_CLOSE, MethodArgs::ConnectionClose(self))
    }
}

pub fn connection_close(code: u16, text: &str, cm: ClassMethod) -> Frame {
    let (class_id, method_id) = split_class_method(cm);

    ConnectionCloseArgs {
        code,
        text: text.to_string(),
        class_id,
        method_id,
    }
    .frame()
}

pub fn connection_close_ok(channel: Channel) -> Frame {
    Frame::Method(channel, super::CONNECTION_CLOSE_OK, MethodArgs::ConnectionCloseOk)
}
