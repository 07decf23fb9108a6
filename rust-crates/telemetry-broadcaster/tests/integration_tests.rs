use std::time::Duration;

use telemetry_broadcaster::{BroadcastEvent, Client, ClientManager, LinkState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Accept one TCP connection and wrap its write half as a client
async fn connect_pair(listener: &TcpListener) -> (Client, BufReader<TcpStream>) {
    let addr = listener.local_addr().unwrap();
    let (remote, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let (stream, _) = accepted.unwrap();
    let (_read, write) = stream.into_split();
    (Client::new(write), BufReader::new(remote.unwrap()))
}

async fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for line")
        .unwrap();
    line.trim_end().to_string()
}

#[tokio::test]
async fn test_broadcast_to_multiple_clients() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let manager = ClientManager::new();

    let (client1, mut reader1) = connect_pair(&listener).await;
    let (client2, mut reader2) = connect_pair(&listener).await;

    manager.register(&client1, async { Vec::new() }).await.unwrap();
    manager.register(&client2, async { Vec::new() }).await.unwrap();

    let delivered = manager
        .broadcast(&BroadcastEvent::MasterStatus(LinkState::Connected))
        .await;
    assert_eq!(delivered, 2);

    assert_eq!(read_line(&mut reader1).await, "MASTER_STATUS CONNECTED");
    assert_eq!(read_line(&mut reader2).await, "MASTER_STATUS CONNECTED");
}

#[tokio::test]
async fn test_catch_up_precedes_later_broadcasts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let manager = ClientManager::new();
    let (client, mut reader) = connect_pair(&listener).await;

    manager
        .register(&client, async {
            vec![
                BroadcastEvent::MasterStatus(LinkState::Connected),
                BroadcastEvent::SlaverStatus(LinkState::Connected),
            ]
        })
        .await
        .unwrap();
    manager
        .broadcast(&BroadcastEvent::SlaverStatus(LinkState::Disconnected))
        .await;

    assert_eq!(read_line(&mut reader).await, "MASTER_STATUS CONNECTED");
    assert_eq!(read_line(&mut reader).await, "SLAVER_STATUS CONNECTED");
    assert_eq!(read_line(&mut reader).await, "SLAVER_STATUS DISCONNECTED");
}

#[tokio::test]
async fn test_unregistered_client_receives_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let manager = ClientManager::new();

    let (kept, mut kept_reader) = connect_pair(&listener).await;
    let (gone, mut gone_reader) = connect_pair(&listener).await;
    manager.register(&kept, async { Vec::new() }).await.unwrap();
    manager.register(&gone, async { Vec::new() }).await.unwrap();

    manager.unregister(gone.id()).await;
    manager
        .broadcast(&BroadcastEvent::SlaverStatus(LinkState::Connected))
        .await;

    assert_eq!(read_line(&mut kept_reader).await, "SLAVER_STATUS CONNECTED");

    let mut line = String::new();
    let silent = tokio::time::timeout(Duration::from_millis(200), gone_reader.read_line(&mut line)).await;
    assert!(silent.is_err(), "unregistered client got: {line}");
}

#[tokio::test]
async fn test_concurrent_registration_and_broadcast() {
    let manager = ClientManager::new();
    let mut readers = Vec::new();
    let mut tasks = Vec::new();

    for _ in 0..16 {
        let (local, remote) = tokio::io::duplex(4096);
        readers.push(BufReader::new(remote).lines());
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let client = Client::new(local);
            manager.register(&client, async { Vec::new() }).await.unwrap();
            client
        }));
    }

    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await.unwrap());
    }
    assert_eq!(manager.client_count().await, 16);

    let delivered = manager
        .broadcast(&BroadcastEvent::MasterStatus(LinkState::Disconnected))
        .await;
    assert_eq!(delivered, 16);

    for lines in readers.iter_mut() {
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "MASTER_STATUS DISCONNECTED"
        );
    }
    drop(clients);
}
