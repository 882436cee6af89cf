// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Passive Sensu client socket for testing deliveries

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct MockSensu {
    pub port: u16,
    pub received: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockSensu {
    /// Start listening on a random local port. Every connection is read to
    /// EOF and parsed as one JSON check result.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock sensu");
        let port = listener.local_addr().expect("Failed to get local addr").port();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let received = received_clone.clone();
                tokio::spawn(async move {
                    let mut body = Vec::new();
                    if socket.read_to_end(&mut body).await.is_ok() {
                        if let Ok(payload) = serde_json::from_slice(&body) {
                            received.lock().expect("lock poisoned").push(payload);
                        }
                    }
                });
            }
        });

        Self { port, received }
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.received.lock().expect("lock poisoned").clone()
    }

    /// Output lines of every payload received so far, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.payloads()
            .iter()
            .flat_map(|payload| {
                payload["output"]
                    .as_str()
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Wait until at least `count` payloads arrived or the timeout elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.payloads().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.payloads()
    }
}
