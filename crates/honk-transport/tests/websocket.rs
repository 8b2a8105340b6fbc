//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an ephemeral port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use honk_transport::{Connection, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    async fn connect_client(url: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().get() > 0);

        // --- Server sends JSON, client receives a text frame ---
        server_conn
            .send(br#"{"type":"add"}"#)
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        match msg {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"add"}"#),
            other => panic!("expected text frame, got {other:?}"),
        }

        // --- Client sends, server receives ---
        client_ws
            .send(Message::Text(r#"{"type":"enter","name":"amy"}"#.into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"enter","name":"amy"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.unwrap();

        server_conn.send(&[0xff, 0xfe]).await.unwrap();

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(matches!(msg, Message::Binary(_)));
    }

    #[tokio::test]
    async fn test_websocket_accept_records_request_uri() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let _client_ws =
            connect_client(&format!("ws://{addr}/?room=pond")).await;
        let server_conn = server_handle.await.unwrap();

        assert_eq!(server_conn.request_target(), "/?room=pond");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
