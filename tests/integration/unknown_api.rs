//! Calling an API the peer never registered yields a `RemoteError` naming it.

use rpc_core::{InvokeError, RpcConfig};

#[tokio::test]
async fn invoking_an_unregistered_api_returns_a_remote_error_naming_it() {
    let (client, _server) = rpc_test_utils::connected_echo_pair(RpcConfig::new()).await;

    let err = client.invoke::<i64, _>("nope", ()).await.unwrap_err();

    match err {
        InvokeError::Remote(message) => assert!(message.contains("nope")),
        other => panic!("expected RemoteError, got {other:?}"),
    }
}
