// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers like a whoami container: identity lines, then the request line
/// and headers it received.
pub struct EchoResponder {
    pub hostname: Option<String>,
    pub fixed_path: Option<String>,
    pub delay: Option<Duration>,
}

impl EchoResponder {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: Some(hostname.to_string()),
            fixed_path: None,
            delay: None,
        }
    }
}

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = match &self.fixed_path {
            Some(fixed) => fixed.clone(),
            None => request.url.path().to_string(),
        };

        let mut body = String::new();
        if let Some(hostname) = &self.hostname {
            body.push_str(&format!("Hostname: {}\r\n", hostname));
        }
        body.push_str("IP: 127.0.0.1\r\n");
        body.push_str(&format!("{} {} HTTP/1.1\r\n", request.method, path));
        for (name, value) in request.headers.iter() {
            body.push_str(&format!(
                "{}: {}\r\n",
                name,
                value.to_str().unwrap_or_default()
            ));
        }
        let template = ResponseTemplate::new(200).set_body_string(body);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

pub async fn setup_echo_server(responder: EchoResponder) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(responder)
        .mount(&server)
        .await;
    server
}

/// Ports the OS reports free right now.
pub fn free_ports(count: usize) -> Vec<u16> {
    let listeners: Vec<TcpListener> = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect()
}

pub fn all_rebindable(ports: &[u16]) -> bool {
    ports
        .iter()
        .all(|&port| TcpListener::bind(("127.0.0.1", port)).is_ok())
}
