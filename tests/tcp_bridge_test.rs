use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uart_matmul::domain::model::WordWidth;
use uart_matmul::{DeviceOpener, MatmulEngine, MatrixGenerator, SerialSession, TransferSettings, UartError};

/// ser2net 類型的橋接後面接一個 16-bit 乘法器
async fn spawn_bridge() -> Result<(String, tokio::task::JoinHandle<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("tcp://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut header = [0u8; 1];
        socket.read_exact(&mut header).await.unwrap();
        let n = header[0] as usize;
        let mut operands = vec![0u8; 2 * n * n];
        socket.read_exact(&mut operands).await.unwrap();

        let (a, b) = operands.split_at(n * n);
        let mut response = Vec::with_capacity(2 * n * n);
        for row in 0..n {
            for col in 0..n {
                let value: u16 = (0..n)
                    .map(|k| a[row * n + k] as u16 * b[k * n + col] as u16)
                    .sum();
                response.extend_from_slice(&value.to_be_bytes());
            }
        }
        socket.write_all(&response).await.unwrap();

        let mut request = header.to_vec();
        request.extend_from_slice(&operands);
        request
    });

    Ok((address, handle))
}

#[tokio::test]
async fn test_session_over_tcp_bridge() -> Result<()> {
    let (address, bridge) = spawn_bridge().await?;

    let mut settings = TransferSettings {
        port: address,
        settle_delay: Duration::ZERO,
        byte_delay: Duration::from_millis(1),
        ..TransferSettings::default()
    };
    settings.set_word_width(WordWidth::Word);

    let opener = DeviceOpener::from_settings(&settings);
    let engine = MatmulEngine::new(
        SerialSession::new(opener, settings),
        MatrixGenerator::new(Some(2024)),
    )
    .with_verification(true);

    let report = engine.run(3).await?;
    let request = bridge.await?;

    assert_eq!(request.len(), 1 + 2 * 9);
    assert!(report.outcome.is_complete());
    assert!(report.verification.unwrap().matched);
    Ok(())
}

#[tokio::test]
async fn test_refused_bridge_is_port_unavailable() -> Result<()> {
    // 先綁定再釋放，取得一個沒人監聽的埠
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("tcp://{}", listener.local_addr()?);
    drop(listener);

    let settings = TransferSettings {
        port: address.clone(),
        ..TransferSettings::default()
    };
    let engine = MatmulEngine::new(
        SerialSession::new(DeviceOpener::from_settings(&settings), settings),
        MatrixGenerator::default(),
    );

    match engine.run(2).await {
        Err(UartError::PortUnavailable { port, .. }) => assert_eq!(port, address),
        other => panic!("expected PortUnavailable, got {:?}", other.map(|r| r.size)),
    }
    Ok(())
}
