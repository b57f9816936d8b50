//! CONNECT tunnelling through the proxy.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;

use common::{read_head, read_until_close, TestProxy, TEST_TIMEOUT};

const ESTABLISHED: &str = "HTTP/1.1 200 Connection established\r\n\r\n";

#[tokio::test]
async fn test_connect_round_trip() {
    let target = common::start_tcp_echo().await;
    let proxy = TestProxy::start().await;

    let mut client = proxy.connect().await;
    client
        .write_all(format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n").as_bytes())
        .await
        .unwrap();
    assert_eq!(read_head(&mut client).await, ESTABLISHED);

    // Opaque bytes, including ones that look nothing like HTTP.
    let payloads: [&[u8]; 3] = [b"\x16\x03\x01\x02\x00", b"first", &[0u8; 4096]];
    for payload in payloads {
        client.write_all(payload).await.unwrap();
        let mut echoed = vec![0u8; payload.len()];
        tokio::time::timeout(TEST_TIMEOUT, client.read_exact(&mut echoed))
            .await
            .expect("tunnel stalled")
            .unwrap();
        assert_eq!(echoed, payload);
    }
}

#[tokio::test]
async fn test_bytes_pipelined_after_connect_are_relayed() {
    let target = common::start_tcp_echo().await;
    let proxy = TestProxy::start().await;

    let mut client = proxy.connect().await;
    client
        .write_all(format!("CONNECT {target} HTTP/1.1\r\n\r\nearly-bytes").as_bytes())
        .await
        .unwrap();
    assert_eq!(read_head(&mut client).await, ESTABLISHED);

    let mut echoed = [0u8; 11];
    tokio::time::timeout(TEST_TIMEOUT, client.read_exact(&mut echoed))
        .await
        .expect("tunnel stalled")
        .unwrap();
    assert_eq!(&echoed, b"early-bytes");
}

#[tokio::test]
async fn test_target_close_ends_tunnel() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"server hello").await.unwrap();
        // dropped: closes the target side
    });

    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;
    client
        .write_all(format!("CONNECT {target} HTTP/1.1\r\n\r\n").as_bytes())
        .await
        .unwrap();
    assert_eq!(read_head(&mut client).await, ESTABLISHED);

    let rest = read_until_close(&mut client).await;
    assert_eq!(rest, b"server hello");
}

#[tokio::test]
async fn test_connect_to_unreachable_target_gets_502() {
    let target = common::closed_port().await;
    let proxy = TestProxy::start().await;

    let mut client = proxy.connect().await;
    client
        .write_all(format!("CONNECT {target} HTTP/1.1\r\n\r\n").as_bytes())
        .await
        .unwrap();

    let response = read_until_close(&mut client).await;
    assert_eq!(response, b"HTTP/1.1 502 Bad Gateway\r\n\r\n");
}

#[tokio::test]
async fn test_concurrent_tunnels_are_independent() {
    let proxy = TestProxy::start().await;

    let mut tasks = Vec::new();
    for i in 0..10u8 {
        let target = common::start_tcp_echo().await;
        let mut client = proxy.connect().await;
        tasks.push(tokio::spawn(async move {
            client
                .write_all(format!("CONNECT {target} HTTP/1.1\r\n\r\n").as_bytes())
                .await
                .unwrap();
            assert_eq!(read_head(&mut client).await, ESTABLISHED);

            let payload = vec![i; 1024];
            client.write_all(&payload).await.unwrap();
            let mut echoed = vec![0u8; payload.len()];
            client.read_exact(&mut echoed).await.unwrap();
            assert_eq!(echoed, payload);
        }));
    }

    for task in tasks {
        tokio::time::timeout(TEST_TIMEOUT, task)
            .await
            .expect("tunnel stalled")
            .unwrap();
    }
}
