use std::time::Duration;

use crate::helper::{self, expect_and_reply};
use wiremux::{ClientOptions, EventSignal, PublishedMessage};
use wiremux_frame::frame::{self, Frame, MethodArgs};

#[tokio::test]
async fn publish_writes_one_atomic_frame_sequence() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let accepted = channel
        .basic_publish("prices", "stock.nwse", PublishedMessage::from("150.99").mandatory(true))
        .await
        .unwrap();

    assert!(accepted);

    let frames = peer.recv_content().await;
    assert_eq!(frames.len(), 3);

    match &frames[0] {
        Frame::Method(ch, cm, MethodArgs::BasicPublish(publish)) => {
            assert_eq!(*ch, channel.channel);
            assert_eq!(*cm, frame::BASIC_PUBLISH);
            assert_eq!(publish.exchange_name, "prices");
            assert_eq!(publish.routing_key, "stock.nwse");
            assert!(publish.flags.contains(frame::BasicPublishFlags::MANDATORY));
        }
        other => panic!("{other:?} is not a basic publish"),
    }

    assert!(matches!(&frames[1], Frame::ContentHeader(h) if h.body_size == 6));
    assert!(matches!(&frames[2], Frame::ContentBody(b) if b.body.as_ref() == b"150.99"));
}

#[tokio::test]
async fn send_to_queue_uses_the_default_exchange() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    channel
        .send_to_queue("inbox", PublishedMessage::from("hi"))
        .await
        .unwrap();

    let frames = peer.recv_content().await;

    match &frames[0] {
        Frame::Method(_, _, MethodArgs::BasicPublish(publish)) => {
            assert_eq!(publish.exchange_name, "");
            assert_eq!(publish.routing_key, "inbox");
        }
        other => panic!("{other:?} is not a basic publish"),
    }
}

#[tokio::test]
async fn backpressure_and_drain_signal() {
    let options = ClientOptions::default()
        .outgoing_buffer(2)
        .outgoing_high_water(1)
        .outgoing_low_water(1);

    let (mut client, mut events, mut peer) = helper::connect_with(options);
    let channel = helper::open_channel(&mut client, &mut peer).await;

    // first write stays below the high watermark
    assert!(channel
        .basic_publish("", "inbox", PublishedMessage::from("a"))
        .await
        .unwrap());

    // second write fills the buffer, backpressure
    assert!(!channel
        .basic_publish("", "inbox", PublishedMessage::from("b"))
        .await
        .unwrap());

    // the transport catches up
    peer.recv_content().await;
    peer.recv_content().await;

    // next write is accepted again and the drain event fires
    assert!(channel
        .basic_publish("", "inbox", PublishedMessage::from("c"))
        .await
        .unwrap());

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::Drain) => (),
        other => panic!("{other:?} is not a drain event"),
    }
}

#[tokio::test]
async fn flow_stop_buffers_publishes_until_resume() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    peer.send_frame(frame::channel_flow(ch, false)).await;

    // the client confirms the stop
    let (_, cm, args) = peer.recv_method().await;
    assert_eq!(cm, frame::CHANNEL_FLOW_OK);
    assert!(matches!(args, MethodArgs::ChannelFlowOk(ok) if !ok.active));

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::ChannelFlow { active: false, .. }) => (),
        other => panic!("{other:?} is not a flow stop event"),
    }

    // publishing is held back locally
    let accepted = channel
        .basic_publish("", "inbox", PublishedMessage::from("held"))
        .await
        .unwrap();
    assert!(!accepted);

    peer.send_frame(frame::channel_flow(ch, true)).await;

    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::CHANNEL_FLOW_OK);

    // the held publish is flushed, in order
    let frames = peer.recv_content().await;
    assert!(matches!(&frames[2], Frame::ContentBody(b) if b.body.as_ref() == b"held"));

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::ChannelFlow { active: true, .. }) => (),
        other => panic!("{other:?} is not a flow resume event"),
    }
}

#[tokio::test]
async fn publisher_confirm_acks_arrive_as_events() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    tokio::join!(
        async { channel.confirm().await.unwrap() },
        expect_and_reply(&mut peer, frame::CONFIRM_SELECT, frame::confirm_select_ok(ch))
    );

    channel
        .basic_publish("", "inbox", PublishedMessage::from("sure?"))
        .await
        .unwrap();
    peer.recv_content().await;

    peer.send_frame(
        frame::BasicAckArgs::default()
            .delivery_tag(1)
            .multiple(false)
            .frame(ch),
    )
    .await;

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::BasicAck {
            channel,
            delivery_tag: 1,
            multiple: false,
        }) => assert_eq!(channel, ch),
        other => panic!("{other:?} is not a publish confirm"),
    }
}

#[tokio::test]
async fn returned_message_arrives_as_an_event() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    peer.send_frame(
        frame::BasicReturnArgs {
            reply_code: 312,
            reply_text: "NO_ROUTE".to_string(),
            exchange_name: "prices".to_string(),
            routing_key: "nowhere".to_string(),
        }
        .frame(ch),
    )
    .await;

    peer.send_frame(
        frame::ContentHeaderFrame {
            channel: ch,
            class_id: 0x3C,
            body_size: 4,
            ..Default::default()
        }
        .frame(),
    )
    .await;

    peer.send_frame(
        frame::ContentBodyFrame {
            channel: ch,
            body: bytes::Bytes::from_static(b"lost"),
        }
        .frame(),
    )
    .await;

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::BasicReturn { channel, message }) => {
            assert_eq!(channel, ch);
            assert_eq!(message.reply_code, 312);
            assert_eq!(message.message.body.as_ref(), b"lost");
        }
        other => panic!("{other:?} is not a returned message"),
    }
}
