// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// LAN listener port = public port + this offset for forwarded ingress ports.
pub const FORWARD_PORT_OFFSET: u16 = 7000;

pub const DEFAULT_LAN_PORTS: [u16; 6] = [80, 443, 7080, 7443, 8080, 9000];
pub const DEFAULT_FORWARDED_PUBLIC_PORTS: [u16; 2] = [80, 443];
pub const DEFAULT_SUBDOMAINS: [&str; 5] = ["ddns", "traefik", "portainer", "hub", "whoami"];
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

pub const ENV_STABLE_PUBLIC_DNS_NAME: &str = "HUB_STABLE_PUBLIC_DNS_NAME";
pub const ENV_PARENT_DNS_DOMAIN: &str = "HUB_PARENT_DNS_DOMAIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForwardRule {
    pub public_port: u16,
    pub lan_port: u16,
}

impl ForwardRule {
    pub fn with_offset(public_port: u16) -> Self {
        Self {
            public_port,
            lan_port: public_port + FORWARD_PORT_OFFSET,
        }
    }
}

/// Tunables for the probe run. Built once from defaults and CLI flags and
/// never mutated after the checks start.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    connect_timeout: Duration,
    read_timeout: Duration,
    settle_delay: Duration,
    lan_ports: Vec<u16>,
    forward_rules: Vec<ForwardRule>,
    subdomains: Vec<String>,
    public_ip_url: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeSettings {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(4),
            lan_ports: DEFAULT_LAN_PORTS.to_vec(),
            forward_rules: DEFAULT_FORWARDED_PUBLIC_PORTS
                .iter()
                .map(|&port| ForwardRule::with_offset(port))
                .collect(),
            subdomains: DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_connect_timeout(&mut self, connect_timeout: Duration) {
        self.connect_timeout = connect_timeout;
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.read_timeout = read_timeout;
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn set_settle_delay(&mut self, settle_delay: Duration) {
        self.settle_delay = settle_delay;
    }

    pub fn lan_ports(&self) -> &[u16] {
        &self.lan_ports
    }

    pub fn set_lan_ports(&mut self, lan_ports: Vec<u16>) {
        self.lan_ports = lan_ports;
    }

    pub fn forward_rules(&self) -> &[ForwardRule] {
        &self.forward_rules
    }

    pub fn set_forward_rules(&mut self, forward_rules: Vec<ForwardRule>) {
        self.forward_rules = forward_rules;
    }

    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    pub fn set_subdomains(&mut self, subdomains: Vec<String>) {
        self.subdomains = subdomains;
    }

    pub fn public_ip_url(&self) -> &str {
        &self.public_ip_url
    }

    pub fn set_public_ip_url(&mut self, public_ip_url: String) {
        self.public_ip_url = public_ip_url;
    }
}

#[derive(Debug, Default, Deserialize)]
struct HubSettingsFile {
    stable_public_dns_name: Option<String>,
    parent_dns_domain: Option<String>,
}

/// The hub's DNS identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubSettings {
    pub stable_public_dns_name: String,
    pub parent_dns_domain: String,
}

impl HubSettings {
    /// Reads the optional JSON settings file, then lets the process
    /// environment override individual values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read hub settings {}", path.display()))?;
                serde_json::from_str::<HubSettingsFile>(&text)
                    .with_context(|| format!("Failed to parse hub settings {}", path.display()))?
            }
            None => HubSettingsFile::default(),
        };

        let pick = |key: &str, from_file: Option<String>| -> Result<String> {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or(from_file)
                .map(|v| v.trim().trim_end_matches('.').to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    anyhow!(
                        "{} is not configured (set it in the settings file or the environment)",
                        key
                    )
                })
        };

        Ok(Self {
            stable_public_dns_name: pick(ENV_STABLE_PUBLIC_DNS_NAME, file.stable_public_dns_name)?,
            parent_dns_domain: pick(ENV_PARENT_DNS_DOMAIN, file.parent_dns_domain)?,
        })
    }

    pub fn subdomain_names(&self, subdomains: &[String]) -> Vec<String> {
        subdomains
            .iter()
            .map(|sub| format!("{}.{}", sub, self.parent_dns_domain))
            .collect()
    }
}
