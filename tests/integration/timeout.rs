//! A 100ms deadline elapses while the
//! peer never replies, and a reply that arrives afterward is dropped
//! silently instead of resurrecting the completed call.

use std::time::Duration;

use bytes::BytesMut;
use rpc_core::InvokeError;
use rpc_protocol::{Packet, PacketCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

#[tokio::test]
async fn a_call_past_its_deadline_fails_with_timeout() {
    let config = rpc_test_utils::short_timeout_config(Duration::from_millis(100));
    let (client, _peer) = rpc_test_utils::client_with_raw_peer(config).await;

    let err = client.invoke::<String, _>("slow", ()).await.unwrap_err();
    assert!(matches!(err, InvokeError::Timeout));
}

#[tokio::test]
async fn a_reply_that_arrives_after_the_deadline_is_silently_dropped() {
    let config = rpc_test_utils::short_timeout_config(Duration::from_millis(80));
    let (client, mut peer) = rpc_test_utils::client_with_raw_peer(config).await;

    let err = client.invoke::<String, _>("slow", ()).await.unwrap_err();
    assert!(matches!(err, InvokeError::Timeout));

    let mut buf = BytesMut::new();
    let mut codec = PacketCodec::default();
    let request = loop {
        let mut chunk = [0u8; 256];
        let n = peer.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(packet) = codec.decode(&mut buf).unwrap() {
            break packet;
        }
    };

    let late_reply = Packet::reply_to(&request, br#""too late""#.to_vec());
    let mut out = BytesMut::new();
    codec.encode(late_reply, &mut out).unwrap();
    peer.write_all(&out).await.unwrap();

    // Give the reader loop a moment to process the late reply; it must not
    // resurrect the already-completed call or disturb the connection.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.is_connected());
}
