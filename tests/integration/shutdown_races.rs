//! Several calls are pending when the
//! transport drops; every one of them must resolve as `Shutdown`.

use std::time::Duration;

use rpc_core::{InvokeError, RpcConfig};

#[tokio::test]
async fn dropping_the_connection_resolves_every_pending_call_as_shutdown() {
    let (client, peer) = rpc_test_utils::client_with_raw_peer(RpcConfig::new()).await;

    let calls: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.invoke::<String, _>("slow", ()).await })
        })
        .collect();

    // Let all three calls park before the peer disappears.
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(peer);

    for call in calls {
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, InvokeError::Shutdown));
    }

    assert!(!client.is_connected());
}
