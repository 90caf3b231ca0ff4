use std::time::Duration;

use crate::helper::{self, expect_and_reply, start_consumer};
use wiremux::{ClientOptions, ConsumerSignal, ErrorKind, EventSignal, QueueDeclareOpts};
use wiremux_frame::frame;

#[tokio::test]
async fn transport_loss_fails_everything_exactly_once() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;

    // an rpc is waiting for its reply when the transport goes away
    let pending = tokio::spawn({
        let channel = channel.clone();
        async move { channel.queue_declare("inbox", QueueDeclareOpts::default()).await }
    });

    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::QUEUE_DECLARE);

    peer.drop_connection(320, "CONNECTION_FORCED - network split").await;

    let err = helper::to_client_error(pending.await.unwrap());
    assert_eq!(err.kind, ErrorKind::ConnectionLost);
    assert_eq!(err.code, 320);

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::ConnectionClosed { reply_code: 320, .. }) => (),
        other => panic!("{other:?} is not a connection closed signal"),
    }

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::ConnectionClose { code: 320, .. }) => (),
        other => panic!("{other:?} is not a connection close event"),
    }

    // everything after the loss fails with the same kind
    let err = helper::to_client_error(channel.queue_bind("inbox", "events", "").await);
    assert_eq!(err.kind, ErrorKind::ConnectionLost);

    let err = helper::to_client_error(client.channel_open().await);
    assert_eq!(err.kind, ErrorKind::ConnectionLost);
}

#[tokio::test]
async fn server_connection_close_fails_pending_calls() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let pending = tokio::spawn({
        let channel = channel.clone();
        async move { channel.queue_declare("inbox", QueueDeclareOpts::default()).await }
    });

    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::QUEUE_DECLARE);

    peer.send_frame(frame::connection_close(320, "CONNECTION_FORCED - shutting down", 0))
        .await;

    let err = helper::to_client_error(pending.await.unwrap());
    assert_eq!(err.kind, ErrorKind::ConnectionLost);

    // the client confirms the close before going down
    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::CONNECTION_CLOSE_OK);

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::ConnectionClose { code: 320, .. }) => (),
        other => panic!("{other:?} is not a connection close event"),
    }
}

#[tokio::test]
async fn clean_connection_close_signals_consumers() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;

    tokio::join!(
        async { client.close().await.unwrap() },
        expect_and_reply(&mut peer, frame::CONNECTION_CLOSE, frame::connection_close_ok(0))
    );

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::ConnectionClosed { reply_code: 200, .. }) => (),
        other => panic!("{other:?} is not a connection closed signal"),
    }
}

#[tokio::test]
async fn channel_close_is_idempotent() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;

    tokio::join!(
        async { channel.close().await.unwrap() },
        expect_and_reply(&mut peer, frame::CHANNEL_CLOSE, frame::channel_close_ok(ch))
    );

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::ChannelClosed { reply_code: 200, .. }) => (),
        other => panic!("{other:?} is not a channel closed signal"),
    }

    // the second close has nothing to hand-shake
    channel.close().await.unwrap();
}

#[tokio::test]
async fn server_channel_close_errors_the_channel() {
    let (mut client, mut events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let mut handler = start_consumer(&channel, &mut peer, "inbox").await;

    peer.send_frame(frame::channel_close(
        ch,
        406,
        "PRECONDITION_FAILED - queue exists with other properties",
        frame::QUEUE_DECLARE,
    ))
    .await;

    // close is confirmed
    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::CHANNEL_CLOSE_OK);

    match handler.receive(Duration::from_secs(1)).await {
        Some(ConsumerSignal::ChannelClosed { reply_code: 406, .. }) => (),
        other => panic!("{other:?} is not a channel closed signal"),
    }

    match events.receive_event(Duration::from_secs(1)).await {
        Some(EventSignal::ChannelClose { code: 406, .. }) => (),
        other => panic!("{other:?} is not a channel close event"),
    }

    // the channel stays unusable until reopened
    let err = helper::to_client_error(channel.queue_bind("inbox", "events", "").await);
    assert_eq!(err.kind, ErrorKind::ProtocolViolation);

    // siblings are unaffected
    let channel2 = helper::open_channel(&mut client, &mut peer).await;

    tokio::join!(
        async {
            channel2
                .queue_declare("other", QueueDeclareOpts::default())
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
            .frame(channel2.channel),
        )
    );
}

#[tokio::test]
async fn channel_numbers_are_exhausted_at_channel_max() {
    let options = ClientOptions::default().channel_max(2);
    let (mut client, _events, mut peer) = helper::connect_with(options);

    let first = helper::open_channel(&mut client, &mut peer).await;
    let second = helper::open_channel(&mut client, &mut peer).await;

    assert_eq!(first.channel, 1);
    assert_eq!(second.channel, 2);

    let err = helper::to_client_error(client.channel_open().await);
    assert_eq!(err.kind, ErrorKind::ChannelExhausted);
}

#[tokio::test]
async fn channel_number_is_reused_only_after_full_close() {
    let (mut client, _events, mut peer) = helper::connect();

    let first = helper::open_channel(&mut client, &mut peer).await;
    let second = helper::open_channel(&mut client, &mut peer).await;

    assert_eq!(first.channel, 1);
    assert_eq!(second.channel, 2);

    tokio::join!(
        async { first.close().await.unwrap() },
        expect_and_reply(&mut peer, frame::CHANNEL_CLOSE, frame::channel_close_ok(1))
    );

    let third = helper::open_channel(&mut client, &mut peer).await;
    assert_eq!(third.channel, 1);
}

#[tokio::test]
async fn explicit_channel_numbers() {
    let (mut client, _events, mut peer) = helper::connect();

    let (channel, _) = tokio::join!(
        async { client.channel_open_num(7).await.unwrap() },
        async {
            let (number, cm, _) = peer.recv_method().await;
            assert_eq!(cm, frame::CHANNEL_OPEN);
            assert_eq!(number, 7);

            peer.send_frame(frame::channel_open_ok(7)).await;
        }
    );

    assert_eq!(channel.channel, 7);

    // the taken number cannot be opened again
    let err = helper::to_client_error(client.channel_open_num(7).await);
    assert_eq!(err.kind, ErrorKind::ProtocolViolation);
}
