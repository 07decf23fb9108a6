use std::time::Duration;

use telemetry_peers::master::{MasterOptions, MockMaster};
use telemetry_peers::slaver::{self, SlaverOptions};
use telemetry_relay::{RelayConfig, RelayServer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

async fn next_line<R>(lines: &mut Lines<R>) -> String
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    tokio::time::timeout(READ_TIMEOUT, lines.next_line())
        .await
        .expect("timed out waiting for line")
        .unwrap()
        .expect("connection closed")
}

async fn accept_lines(listener: &TcpListener) -> Lines<BufReader<TcpStream>> {
    let (stream, _) = tokio::time::timeout(READ_TIMEOUT, listener.accept())
        .await
        .expect("no connection")
        .unwrap();
    BufReader::new(stream).lines()
}

#[tokio::test]
async fn test_slaver_sends_heartbeats_and_reconnects() {
    let fake_master = TcpListener::bind("127.0.0.1:0").await.unwrap();
    tokio::spawn(slaver::run(SlaverOptions {
        master_addr: fake_master.local_addr().unwrap().to_string(),
        interval: Duration::from_millis(20),
        reconnect_delay: Duration::from_millis(20),
    }));

    let mut lines = accept_lines(&fake_master).await;
    assert_eq!(next_line(&mut lines).await, "SLAVER_STATUS ISALIVE");
    assert_eq!(next_line(&mut lines).await, "SLAVER_STATUS ISALIVE");
    drop(lines);

    let mut lines = accept_lines(&fake_master).await;
    assert_eq!(next_line(&mut lines).await, "SLAVER_STATUS ISALIVE");
}

#[tokio::test]
async fn test_master_announces_and_forwards() {
    let fake_relay = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let master = MockMaster::bind(MasterOptions {
        server_addr: fake_relay.local_addr().unwrap().to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        reconnect_delay: Duration::from_millis(20),
    })
    .await
    .unwrap();
    let master_addr = master.local_addr().unwrap();
    tokio::spawn(master.run());

    let mut relay_side = accept_lines(&fake_relay).await;
    assert_eq!(next_line(&mut relay_side).await, "MASTER_STATUS CONNECTED");

    let mut slaver = TcpStream::connect(master_addr).await.unwrap();
    slaver.write_all(b"SLAVER_STATUS ISALIVE\n").await.unwrap();
    assert_eq!(next_line(&mut relay_side).await, "SLAVER_STATUS ISALIVE");

    // Relay restart: the master reconnects and announces again
    drop(relay_side);
    let mut relay_side = accept_lines(&fake_relay).await;
    assert_eq!(next_line(&mut relay_side).await, "MASTER_STATUS CONNECTED");
}

#[tokio::test]
async fn test_master_drops_lines_queued_while_relay_down() {
    let fake_relay = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let master = MockMaster::bind(MasterOptions {
        server_addr: fake_relay.local_addr().unwrap().to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        reconnect_delay: Duration::from_millis(300),
    })
    .await
    .unwrap();
    let master_addr = master.local_addr().unwrap();
    tokio::spawn(master.run());

    let mut relay_side = accept_lines(&fake_relay).await;
    assert_eq!(next_line(&mut relay_side).await, "MASTER_STATUS CONNECTED");
    let mut slaver = TcpStream::connect(master_addr).await.unwrap();
    slaver.write_all(b"SLAVER_STATUS ISALIVE\n").await.unwrap();
    assert_eq!(next_line(&mut relay_side).await, "SLAVER_STATUS ISALIVE");

    drop(relay_side);
    tokio::time::sleep(Duration::from_millis(100)).await;
    for _ in 0..3 {
        slaver.write_all(b"SLAVER_STATUS ISALIVE\n").await.unwrap();
    }

    let mut relay_side = accept_lines(&fake_relay).await;
    assert_eq!(next_line(&mut relay_side).await, "MASTER_STATUS CONNECTED");
    let backlog = tokio::time::timeout(Duration::from_millis(200), relay_side.next_line()).await;
    assert!(backlog.is_err(), "stale line forwarded: {backlog:?}");

    slaver.write_all(b"SLAVER_STATUS ISALIVE\n").await.unwrap();
    assert_eq!(next_line(&mut relay_side).await, "SLAVER_STATUS ISALIVE");
}

#[tokio::test]
async fn test_full_chain_reaches_ui() {
    let config = RelayConfig {
        ui_addr: "127.0.0.1:0".to_string(),
        master_addr: "127.0.0.1:0".to_string(),
        sweep_interval_ms: 50,
        slaver_timeout_ms: 1000,
        seed_demo_sessions: false,
        ..RelayConfig::default()
    };
    let server = RelayServer::bind(&config).await.unwrap();
    let ui_addr = server.ui_addr().unwrap();
    let relay_master_addr = server.master_addr().unwrap();
    tokio::spawn(server.run());

    let ui = TcpStream::connect(ui_addr).await.unwrap();
    let (ui_read, mut ui_write) = ui.into_split();
    let mut ui_lines = BufReader::new(ui_read).lines();
    ui_write.write_all(b"PING\n").await.unwrap();
    assert_eq!(next_line(&mut ui_lines).await, "ERROR: UNKNOWN_COMMAND");

    let master = MockMaster::bind(MasterOptions {
        server_addr: relay_master_addr.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        reconnect_delay: Duration::from_millis(50),
    })
    .await
    .unwrap();
    let master_addr = master.local_addr().unwrap();
    tokio::spawn(master.run());

    tokio::spawn(slaver::run(SlaverOptions {
        master_addr: master_addr.to_string(),
        interval: Duration::from_millis(100),
        reconnect_delay: Duration::from_millis(50),
    }));

    assert_eq!(next_line(&mut ui_lines).await, "MASTER_STATUS CONNECTED");
    assert_eq!(next_line(&mut ui_lines).await, "SLAVER_STATUS CONNECTED");
}
