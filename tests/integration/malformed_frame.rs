//! An injected frame whose declared
//! `total_length` is absurd is a fatal `ProtocolError` — the connection
//! closes and every pending call resolves as `Shutdown`.

use rpc_core::{InvokeError, RpcConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn a_malformed_frame_closes_the_connection_and_shuts_down_pending_calls() {
    let (client, mut peer) = rpc_test_utils::client_with_raw_peer(RpcConfig::new()).await;

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.invoke::<String, _>("slow", ()).await })
    };

    // Drain the outgoing request so it doesn't get mistaken for the frame
    // we're about to inject, then send a declared length past the max.
    let mut drain = [0u8; 256];
    let _ = peer.read(&mut drain).await.unwrap();

    peer.write_all(&0xFFFF_FFFFu32.to_be_bytes()).await.unwrap();
    peer.flush().await.unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, InvokeError::Shutdown));
    assert!(!client.is_connected());
}
