// File: local.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{BoxError, StubEnv, StubOrchestrator};
use log::{debug, trace, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_REQUEST_HEAD: usize = 16 * 1024;

struct Listener {
    port: u16,
    task: JoinHandle<()>,
}

/// In-process echo listeners, one task per port, answering in the same
/// format as the whoami containers.
pub struct LocalEchoOrchestrator {
    bind_addr: IpAddr,
    shutdown: Option<watch::Sender<bool>>,
    listeners: Vec<Listener>,
}

impl Default for LocalEchoOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEchoOrchestrator {
    pub fn new() -> Self {
        Self::with_bind_addr(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    pub fn with_bind_addr(bind_addr: IpAddr) -> Self {
        Self {
            bind_addr,
            shutdown: None,
            listeners: Vec::new(),
        }
    }

    pub fn bound_ports(&self) -> Vec<u16> {
        self.listeners.iter().map(|l| l.port).collect()
    }

    fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}

impl StubOrchestrator for LocalEchoOrchestrator {
    async fn start(&mut self, ports: &[u16], env: &StubEnv) -> Result<(), BoxError> {
        self.stop().await?;
        let (shutdown, signal) = watch::channel(false);
        self.shutdown = Some(shutdown);
        let hostname: Arc<str> = Arc::from(env.expected_hostname());

        for &port in ports {
            let listener = TcpListener::bind(SocketAddr::new(self.bind_addr, port))
                .await
                .map_err(|e| format!("unable to listen on {}:{}: {}", self.bind_addr, port, e))?;
            debug!("Echo listener bound on {}:{}", self.bind_addr, port);
            let task = tokio::spawn(accept_loop(listener, Arc::clone(&hostname), signal.clone()));
            self.listeners.push(Listener { port, task });
        }
        Ok(())
    }

    /// Returns once every listener task has finished and its socket is closed.
    async fn stop(&mut self) -> Result<(), BoxError> {
        self.signal_shutdown();
        for listener in self.listeners.drain(..) {
            if let Err(e) = listener.task.await {
                warn!("Echo listener on port {} failed: {}", listener.port, e);
            }
        }
        Ok(())
    }

    fn stop_in_background(&mut self) {
        self.signal_shutdown();
        for listener in self.listeners.drain(..) {
            listener.task.abort();
        }
    }
}

impl Drop for LocalEchoOrchestrator {
    fn drop(&mut self) {
        self.stop_in_background();
    }
}

async fn accept_loop(listener: TcpListener, hostname: Arc<str>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    // Served inline: a stub answers one probe at a time.
                    if let Err(e) = serve(stream, peer, &hostname).await {
                        debug!("Echo connection from {} failed: {}", peer, e);
                    }
                }
                Err(e) => warn!("Echo listener accept failed: {}", e),
            },
        }
    }
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// Body the stub sends back: identity lines, then the request line and
/// headers exactly as received.
pub fn echo_body(hostname: &str, local: SocketAddr, peer: SocketAddr, request_head: &str) -> String {
    let mut lines = vec![
        format!("Hostname: {}", hostname),
        format!("IP: {}", local.ip()),
        format!("RemoteAddr: {}", peer),
    ];
    lines.extend(
        request_head
            .split("\r\n")
            .take_while(|line| !line.is_empty())
            .map(str::to_string),
    );
    let mut body = lines.join("\r\n");
    body.push_str("\r\n");
    body
}

async fn serve(mut stream: TcpStream, peer: SocketAddr, hostname: &str) -> std::io::Result<()> {
    let head = timeout(REQUEST_READ_TIMEOUT, read_request_head(&mut stream)).await??;
    trace!("Echo request from {}: {:?}", peer, head);
    let body = echo_body(hostname, stream.local_addr()?, peer, &head);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;

    // The client closes first after `Connection: close`, so TIME_WAIT stays
    // on its ephemeral port and not on the stub port.
    let mut rest = [0u8; 256];
    let _ = timeout(REQUEST_READ_TIMEOUT, async {
        while stream.read(&mut rest).await? > 0 {}
        Ok::<_, std::io::Error>(())
    })
    .await;
    Ok(())
}
