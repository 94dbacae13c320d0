// File: probe.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::echo::{parse_echo_response, EchoResponseRecord};
use crate::error::{ValidationError, ValidationOutcome};
use log::{debug, trace};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::time::Duration;

/// Renders random bytes as lowercase hex.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 16 random bytes used as the request path, so an echoed path can only
/// come from this very request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequestNonce(String);

impl EchoRequestNonce {
    pub fn generate() -> Self {
        Self(random_hex(16))
    }

    pub fn path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl From<&str> for EchoRequestNonce {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EchoRequestNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    host: String,
    port: u16,
    expected_hostname: Option<String>,
    stripped_path_prefix: Option<String>,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            expected_hostname: None,
            stripped_path_prefix: None,
        }
    }

    pub fn with_expected_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.expected_hostname = Some(hostname.into());
        self
    }

    /// Prefix a reverse proxy strips before forwarding. An empty prefix means
    /// none; a missing leading slash is added.
    pub fn with_stripped_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.stripped_path_prefix = if prefix.is_empty() {
            None
        } else if prefix.starts_with('/') {
            Some(prefix)
        } else {
            Some(format!("/{}", prefix))
        };
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn expected_hostname(&self) -> Option<&str> {
        self.expected_hostname.as_deref()
    }

    pub fn stripped_path_prefix(&self) -> Option<&str> {
        self.stripped_path_prefix.as_deref()
    }

    pub fn url_for(&self, nonce: &EchoRequestNonce) -> String {
        format!("http://{}:{}{}", self.host, self.port, nonce.path())
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Checks a decoded echo against the request that produced it.
pub fn validate_echo(
    record: &EchoResponseRecord,
    nonce: &EchoRequestNonce,
    target: &ProbeTarget,
) -> ValidationOutcome {
    let observed = record.http_path().ok_or_else(|| {
        ValidationError::Protocol("echo server did not return an HTTP path".to_string())
    })?;
    let observed = match target.stripped_path_prefix() {
        Some(prefix) => format!("{}{}", prefix, observed),
        None => observed.to_string(),
    };
    let expected = nonce.path();
    if observed != expected {
        return Err(ValidationError::PathMismatch { expected, observed });
    }

    // A repeated Hostname means more than one listener answered.
    let hostname = record.hostname().ok_or(ValidationError::MissingHostname)?;
    if let Some(expected) = target.expected_hostname() {
        if hostname.as_scalar() != Some(expected) {
            return Err(ValidationError::HostnameMismatch {
                expected: expected.to_string(),
                observed: hostname.to_string(),
            });
        }
    }
    Ok(())
}

/// Issues single echo round trips. The connect timeout bounds the TCP
/// connect; the read timeout bounds every wait for data once connected.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(0)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub async fn probe(&self, target: &ProbeTarget) -> ValidationOutcome<EchoResponseRecord> {
        debug!("Testing echo connection to {}", target);
        let nonce = EchoRequestNonce::generate();
        let url = target.url_for(&nonce);

        let body = self.fetch(&url).await?;
        trace!("Echo body from {}: {:?}", target, body);
        let record = parse_echo_response(&body)?;
        validate_echo(&record, &nonce, target)?;

        debug!("Echo server at {} responded correctly", target);
        Ok(record)
    }

    async fn fetch(&self, url: &str) -> ValidationOutcome<String> {
        let connectivity = |source: reqwest::Error| ValidationError::Connectivity {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(connectivity)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::Protocol(format!(
                "{} answered with HTTP status {}",
                url, status
            )));
        }

        response.text().await.map_err(connectivity)
    }
}
