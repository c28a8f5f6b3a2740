//! A single request/reply frame pair, checked against the wire byte-for-byte.

use bytes::BytesMut;
use rpc_core::RpcConfig;
use rpc_protocol::{Packet, PacketCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

#[tokio::test]
async fn happy_path_echo_matches_the_documented_wire_scenario() {
    let (client, mut peer) = rpc_test_utils::client_with_raw_peer(RpcConfig::new()).await;

    let call = tokio::spawn(async move { client.invoke::<String, _>("echo", ("hi",)).await });

    let mut buf = BytesMut::new();
    let mut codec = PacketCodec::default();
    let request = loop {
        let mut chunk = [0u8; 256];
        let n = peer.read(&mut chunk).await.unwrap();
        assert!(n > 0, "peer closed before a full request frame arrived");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(packet) = codec.decode(&mut buf).unwrap() {
            break packet;
        }
    };

    assert_eq!(request.api_name, "echo");
    assert_eq!(request.packet_id, 1);
    assert!(request.is_from_client);
    assert!(!request.is_exception);
    assert_eq!(request.body, br#"["hi"]"#.to_vec());

    // Reply echoing the same id and direction flag, per the echo rule.
    let reply = Packet::reply_to(&request, br#""hi""#.to_vec());
    let mut out = BytesMut::new();
    codec.encode(reply, &mut out).unwrap();
    peer.write_all(&out).await.unwrap();

    let result = call.await.unwrap().unwrap();
    assert_eq!(result, "hi");
}
