use crate::helper::{self, expect_and_reply};
use wiremux::{ErrorKind, ExchangeDeclareOpts, ExchangeType, IfEmpty, IfUnused, QueueDeclareOpts, QueueInfo};
use wiremux_frame::frame;

#[tokio::test]
async fn queue_declare_returns_server_counts() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let queue = helper::unique_name("inbox");

    let (info, _) = tokio::join!(
        async {
            channel
                .queue_declare(&queue, QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: queue.clone(),
                message_count: 12,
                consumer_count: 1,
            }
            .frame(channel.channel),
        )
    );

    assert_eq!(
        info,
        QueueInfo {
            queue: queue.clone(),
            message_count: 12,
            consumer_count: 1,
        }
    );
}

#[tokio::test]
async fn identical_redeclare_gives_the_same_result() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let reply = || {
        frame::QueueDeclareOkArgs {
            name: "inbox".to_string(),
            message_count: 3,
            consumer_count: 0,
        }
        .frame(channel.channel)
    };

    let (first, _) = tokio::join!(
        async {
            channel
                .queue_declare("inbox", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(&mut peer, frame::QUEUE_DECLARE, reply())
    );

    let (second, _) = tokio::join!(
        async {
            channel
                .queue_declare("inbox", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(&mut peer, frame::QUEUE_DECLARE, reply())
    );

    assert_eq!(first, second);
}

#[tokio::test]
async fn conflicting_redeclare_errors_the_channel_locally() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;

    let (_, _) = tokio::join!(
        async {
            channel
                .queue_declare("inbox", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "inbox".to_string(),
                ..Default::default()
            }
            .frame(channel.channel),
        )
    );

    // different durability, rejected before any frame goes out
    let err = helper::to_client_error(channel.queue_declare("inbox", QueueDeclareOpts::default()).await);

    assert_eq!(err.kind, ErrorKind::ProtocolViolation);
    assert_eq!(err.channel, Some(channel.channel));

    // the channel is poisoned from now on
    let err = helper::to_client_error(channel.queue_bind("inbox", "events", "").await);
    assert_eq!(err.kind, ErrorKind::ProtocolViolation);

    // a fresh channel is unaffected and may use the original properties
    let channel2 = helper::open_channel(&mut client, &mut peer).await;

    tokio::join!(
        async {
            channel2
                .queue_declare("inbox", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "inbox".to_string(),
                ..Default::default()
            }
            .frame(2),
        )
    );
}

#[tokio::test]
async fn exchange_declare_bind_and_cleanup() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    tokio::join!(
        async {
            channel
                .exchange_declare("prices", ExchangeType::Direct, ExchangeDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(&mut peer, frame::EXCHANGE_DECLARE, frame::exchange_declare_ok(ch))
    );

    tokio::join!(
        async {
            channel
                .queue_declare("price-queue", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "price-queue".to_string(),
                ..Default::default()
            }
            .frame(ch),
        )
    );

    tokio::join!(
        async { channel.queue_bind("price-queue", "prices", "").await.unwrap() },
        async {
            let args = expect_and_reply(&mut peer, frame::QUEUE_BIND, frame::queue_bind_ok(ch)).await;

            match args {
                frame::MethodArgs::QueueBind(bind) => {
                    assert_eq!(bind.queue_name, "price-queue");
                    assert_eq!(bind.exchange_name, "prices");
                }
                other => panic!("{other:?} is not a queue bind"),
            }
        }
    );

    tokio::join!(
        async { channel.queue_unbind("price-queue", "prices", "").await.unwrap() },
        expect_and_reply(&mut peer, frame::QUEUE_UNBIND, frame::queue_unbind_ok(ch))
    );

    let (purged, _) = tokio::join!(
        async { channel.queue_purge("price-queue").await.unwrap() },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_PURGE,
            frame::QueuePurgeOkArgs { message_count: 2 }.frame(ch),
        )
    );
    assert_eq!(purged, 2);

    let (deleted, _) = tokio::join!(
        async {
            channel
                .queue_delete("price-queue", IfUnused(false), IfEmpty(false))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DELETE,
            frame::QueueDeleteOkArgs { message_count: 0 }.frame(ch),
        )
    );
    assert_eq!(deleted, 0);

    tokio::join!(
        async { channel.exchange_delete("prices", IfUnused(false)).await.unwrap() },
        expect_and_reply(&mut peer, frame::EXCHANGE_DELETE, frame::exchange_delete_ok(ch))
    );
}

#[tokio::test]
async fn deleted_queue_may_be_redeclared_with_other_properties() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    tokio::join!(
        async {
            channel
                .queue_declare("tmp", QueueDeclareOpts::default().durable(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "tmp".to_string(),
                ..Default::default()
            }
            .frame(ch),
        )
    );

    tokio::join!(
        async {
            channel.queue_delete("tmp", IfUnused(false), IfEmpty(false)).await.unwrap();
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DELETE,
            frame::QueueDeleteOkArgs { message_count: 0 }.frame(ch),
        )
    );

    tokio::join!(
        async {
            channel
                .queue_declare("tmp", QueueDeclareOpts::default().auto_delete(true))
                .await
                .unwrap()
        },
        expect_and_reply(
            &mut peer,
            frame::QUEUE_DECLARE,
            frame::QueueDeclareOkArgs {
                name: "tmp".to_string(),
                ..Default::default()
            }
            .frame(ch),
        )
    );
}

#[tokio::test]
async fn only_one_call_of_a_kind_may_wait_per_channel() {
    let (mut client, _events, mut peer) = helper::connect();
    let channel = helper::open_channel(&mut client, &mut peer).await;
    let ch = channel.channel;

    let first = tokio::spawn({
        let channel = channel.clone();
        async move { channel.queue_declare("a", QueueDeclareOpts::default()).await }
    });

    // the first declare is on the wire, not replied yet
    let (_, cm, _) = peer.recv_method().await;
    assert_eq!(cm, frame::QUEUE_DECLARE);

    // a second declare on the same channel fails fast, nothing is sent
    let second = channel.queue_declare("b", QueueDeclareOpts::default()).await;
    assert_eq!(helper::to_client_error(second).kind, ErrorKind::ProtocolViolation);

    peer.send_frame(
        frame::QueueDeclareOkArgs {
            name: "a".to_string(),
            ..Default::default()
        }
        .frame(ch),
    )
    .await;

    assert!(first.await.unwrap().is_ok());
}
