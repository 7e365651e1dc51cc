//! Server start/stop lifecycle tests
use anyhow::Result;

use lobby_lib::{ErrorCode, EventKind, LobbyEvent};

use crate::ws_client::WebSocketTestClient;
use crate::ws_test_harness::{test_config, TestEnvironment};

#[tokio::test]
async fn test_start_announces_status_and_url() -> Result<()> {
    let mut env = TestEnvironment::new();
    let (_, mut rx) = env
        .lobby
        .bus
        .channel(&[EventKind::ServerStatusChanged, EventKind::ServerUrlChanged]);

    let addr = env.start().await?;
    assert!(env.lobby.server.is_running().await);
    assert_eq!(env.lobby.server.local_addr().await, Some(addr));

    let expected_url = format!("ws://127.0.0.1:{}/ws", addr.port());
    assert_eq!(
        rx.recv().await,
        Some(LobbyEvent::ServerStatusChanged { is_online: true })
    );
    assert_eq!(
        rx.recv().await,
        Some(LobbyEvent::ServerUrlChanged {
            url: expected_url.clone()
        })
    );
    assert_eq!(env.lobby.monitor.server_url(), expected_url);

    env.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_double_start_is_rejected() -> Result<()> {
    let mut env = TestEnvironment::new();
    env.start().await?;

    let err = env.lobby.server.start().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServerAlreadyRunning);
    assert!(env.lobby.server.is_running().await);

    env.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_resets_state() -> Result<()> {
    let mut env = TestEnvironment::new();
    env.start().await?;
    let _a = env.connect_client("a").await?;
    assert!(env.wait_for_count(1, 2000).await);

    env.stop().await?;

    assert!(!env.lobby.server.is_running().await);
    assert!(!env.lobby.monitor.is_online());
    let snapshot = env.lobby.monitor.snapshot().await;
    assert_eq!(snapshot.connected_count, 0);
    assert!(!snapshot.is_online);
    Ok(())
}

#[tokio::test]
async fn test_stop_when_not_running() -> Result<()> {
    let env = TestEnvironment::new();
    let (_, mut rx) = env.lobby.bus.channel(&EventKind::ALL);

    let err = env.lobby.server.stop().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServerNotRunning);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_restart_announces_again() -> Result<()> {
    let mut env = TestEnvironment::new();
    let (_, mut rx) = env.lobby.bus.channel(&[EventKind::ServerStatusChanged]);

    env.start().await?;
    env.stop().await?;
    env.start().await?;

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        statuses.push(event);
    }
    assert_eq!(
        statuses,
        vec![
            LobbyEvent::ServerStatusChanged { is_online: true },
            LobbyEvent::ServerStatusChanged { is_online: false },
            LobbyEvent::ServerStatusChanged { is_online: true },
        ]
    );

    let _client = env.connect_client("after-restart").await?;
    env.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_bind_failure_is_reported() -> Result<()> {
    let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = blocker.local_addr()?.port();

    let mut config = test_config(10);
    config.server.port = port;
    let lobby = lobby_lib::Lobby::from_config(&config);

    let err = lobby.server.start().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::WebSocketBindFailed);
    assert!(!lobby.server.is_running().await);
    assert!(!lobby.monitor.is_online());

    let err = lobby.server.stop().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServerNotRunning);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_stop_and_start_stay_consistent() -> Result<()> {
    let env = TestEnvironment::new();
    let server = &env.lobby.server;
    server.start().await?;
    let (_, mut rx) = env.lobby.bus.channel(&[EventKind::ServerStatusChanged]);

    let (stopped, started) = tokio::join!(server.stop(), server.start());
    assert!(stopped.is_ok());

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        statuses.push(event);
    }
    assert_eq!(server.is_running().await, env.lobby.monitor.is_online());

    match started {
        Ok(addr) => {
            assert_eq!(
                statuses,
                vec![
                    LobbyEvent::ServerStatusChanged { is_online: false },
                    LobbyEvent::ServerStatusChanged { is_online: true },
                ]
            );

            let client = WebSocketTestClient::new("next-cycle");
            client.connect(&format!("ws://{}/ws", addr)).await?;
            assert!(client
                .wait_for(|m| m.starts_with("Connection succeed"), 2000)
                .await
                .is_some());
            assert_eq!(server.connected_count().await, 1);
            server.stop().await?;
        }
        Err(err) => {
            assert_eq!(err.code, ErrorCode::ServerAlreadyRunning);
            assert_eq!(
                statuses,
                vec![LobbyEvent::ServerStatusChanged { is_online: false }]
            );
        }
    }
    assert!(!env.lobby.monitor.is_online());
    Ok(())
}

#[tokio::test]
async fn test_start_rejects_unbounded_timeout() -> Result<()> {
    let mut config = test_config(10);
    config.server.timeout_seconds = u64::MAX;
    let env = TestEnvironment::with_config(config);
    let (_, mut rx) = env.lobby.bus.channel(&EventKind::ALL);

    let err = env.lobby.server.start().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(!env.lobby.server.is_running().await);
    assert!(rx.try_recv().is_err());
    Ok(())
}
