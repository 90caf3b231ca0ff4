use std::time::Duration;

use crate::helper::{self, expect_and_reply, start_consumer};
use wiremux::{ConsumerSignal, ErrorKind, Global};
use wiremux_frame::frame::{self, MethodArgs};

fn delivered_tag(signal: Option<ConsumerSignal>) -> u64 {
    match signal {
        Some(ConsumerSignal::Delivered(message)) => message.delivery_tag,
        other => panic!("{other:?} is not a delivery"),
    }
}

#[tokio::test]
async fn deliveries_arrive_in_server_order() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    for tag in 1..=3 {
        peer.deliver(ch, &ctag, tag, &format!("message {tag}")).await;
    }

    for expected in 1..=3 {
        assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), expected);
    }
}

#[tokio::test]
async fn delivered_content_is_assembled() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    peer.deliver(ch, &ctag, 1, "payload bytes").await;

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::Delivered(message)) => {
            assert_eq!(message.consumer_tag, ctag);
            assert_eq!(message.message.body.as_ref(), b"payload bytes");
            assert!(!message.redelivered);
        }
        other => panic!("{other:?} is not a delivery"),
    }
}

#[tokio::test]
async fn ack_reaches_the_wire() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    peer.deliver(ch, &ctag, 1, "m").await;
    handler.receive(Duration::from_secs(1)).await.unwrap();

    handler.basic_ack(1).await.unwrap();

    let (number, cm, args) = peer.recv_method().await;
    assert_eq!(number, ch);
    assert_eq!(cm, frame::BASIC_ACK);
    assert!(matches!(args, MethodArgs::BasicAck(ack) if ack.delivery_tag == 1 && !ack.multiple));
}

#[tokio::test]
async fn unknown_tag_ack_fails_and_changes_nothing() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    peer.deliver(ch, &ctag, 1, "m").await;
    handler.receive(Duration::from_secs(1)).await.unwrap();

    let err = helper::to_client_error(handler.basic_ack(9).await);
    assert_eq!(err.kind, ErrorKind::UnknownDeliveryTag);

    // the bogus ack never reached the wire, the real one still works
    handler.basic_ack(1).await.unwrap();

    let (_, cm, args) = peer.recv_method().await;
    assert_eq!(cm, frame::BASIC_ACK);
    assert!(matches!(args, MethodArgs::BasicAck(ack) if ack.delivery_tag == 1));
}

#[tokio::test]
async fn cumulative_ack_acknowledges_everything_up_to_the_tag() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    for tag in 1..=4 {
        peer.deliver(ch, &ctag, tag, "m").await;
        handler.receive(Duration::from_secs(1)).await.unwrap();
    }

    handler.basic_ack_multiple(3).await.unwrap();

    let (_, cm, args) = peer.recv_method().await;
    assert_eq!(cm, frame::BASIC_ACK);
    assert!(matches!(args, MethodArgs::BasicAck(ack) if ack.delivery_tag == 3 && ack.multiple));

    // tags 1..3 are spent now, tag 4 is still ackable
    let err = helper::to_client_error(handler.basic_ack(2).await);
    assert_eq!(err.kind, ErrorKind::UnknownDeliveryTag);

    handler.basic_ack(4).await.unwrap();
}

#[tokio::test]
async fn prefetch_window_parks_and_acks_release_one_by_one() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    tokio::join!(
        async { channel.prefetch(2, Global(false)).await.unwrap() },
        expect_and_reply(&mut peer, frame::BASIC_QOS, frame::basic_qos_ok(ch))
    );

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    for tag in 1..=3 {
        peer.deliver(ch, &ctag, tag, "m").await;
    }

    assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), 1);
    assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), 2);

    // window is full, the third delivery is parked
    assert!(handler.receive(Duration::from_millis(200)).await.is_none());

    handler.basic_ack(1).await.unwrap();

    // exactly one more becomes eligible
    assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), 3);
    assert!(handler.receive(Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn global_prefetch_seeds_new_channels() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    tokio::join!(
        async { channel.prefetch(1, Global(true)).await.unwrap() },
        expect_and_reply(&mut peer, frame::BASIC_QOS, frame::basic_qos_ok(ch))
    );

    let channel2 = helper::open_channel(&mut client, &mut peer).await;
    let ch2 = channel2.channel;

    let mut handler = start_consumer(&channel2, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    peer.deliver(ch2, &ctag, 1, "m").await;
    peer.deliver(ch2, &ctag, 2, "m").await;

    assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), 1);
    assert!(handler.receive(Duration::from_millis(200)).await.is_none());

    handler.basic_ack(1).await.unwrap();
    assert_eq!(delivered_tag(handler.receive(Duration::from_secs(1)).await), 2);
}

#[tokio::test]
async fn server_side_cancel_signals_the_consumer() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    peer.send_frame(frame::BasicCancelArgs::new(&ctag).frame(ch)).await;

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::Cancelled) => (),
        other => panic!("{other:?} is not a cancel signal"),
    }

    // the client confirms the server side cancel
    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::BASIC_CANCEL_OK);
}

#[tokio::test]
async fn client_cancel_stops_the_consume() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    tokio::join!(
        async { handler.basic_cancel().await.unwrap() },
        expect_and_reply(
            &mut peer,
            frame::BASIC_CANCEL,
            frame::BasicCancelOkArgs::new(&ctag).frame(ch),
        )
    );

    // a late in-flight delivery is dropped, not fatal
    peer.deliver(ch, &ctag, 1, "late").await;

    // the channel still works
    tokio::join!(
        async {
            channel
                .queue_declare("other", wiremux::QueueDeclareOpts::default())
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "other".to_string(),
                ..Default::default()
            }
            .frame(ch),
        )
    );
}

#[tokio::test]
async fn cancel_frees_the_registration_for_a_fresh_consume() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let handler = start_consumer(&channel, &mut peer, "inbox").await;
    let ctag = handler.consumer_tag.clone();

    tokio::join!(
        async { handler.basic_cancel().await.unwrap() },
        expect_and_reply(
            &mut peer,
            frame::BASIC_CANCEL,
            frame::BasicCancelOkArgs::new(&ctag).frame(ch),
        )
    );

    let _handler = start_consumer(&channel, &mut peer, "inbox").await;
}
