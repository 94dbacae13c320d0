// File: discovery.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{ValidationError, ValidationOutcome};
use log::debug;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

const ROUTE_TABLE: &str = "/proc/net/route";

/// Where this host sits on the network.
pub trait AddressDiscovery {
    async fn public_ip(&self) -> ValidationOutcome<IpAddr>;
    fn lan_ip(&self) -> ValidationOutcome<IpAddr>;
    fn gateway_lan_ip(&self) -> ValidationOutcome<IpAddr>;
    fn default_interface(&self) -> ValidationOutcome<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoute {
    pub interface: String,
    pub gateway: Ipv4Addr,
}

/// Finds the default route in the kernel's `/proc/net/route` table, where
/// addresses are little-endian hex.
pub fn parse_default_route(table: &str) -> Option<DefaultRoute> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[1] != "00000000" {
            return None;
        }
        let gateway = u32::from_str_radix(fields[2], 16).ok()?;
        Some(DefaultRoute {
            interface: fields[0].to_string(),
            gateway: Ipv4Addr::from(gateway.swap_bytes()),
        })
    })
}

pub struct SystemDiscovery {
    client: reqwest::Client,
    public_ip_url: String,
}

impl SystemDiscovery {
    pub fn new(public_ip_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            public_ip_url: public_ip_url.into(),
        })
    }

    fn default_route(&self) -> ValidationOutcome<DefaultRoute> {
        let table = fs::read_to_string(ROUTE_TABLE)
            .map_err(|e| ValidationError::discovery("the default route", e))?;
        parse_default_route(&table)
            .ok_or_else(|| ValidationError::discovery("the default route", "no default route found"))
    }
}

impl AddressDiscovery for SystemDiscovery {
    async fn public_ip(&self) -> ValidationOutcome<IpAddr> {
        debug!("Querying public IP address from {}", self.public_ip_url);
        let text = self
            .client
            .get(&self.public_ip_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ValidationError::discovery("the public IP address", e))?
            .text()
            .await
            .map_err(|e| ValidationError::discovery("the public IP address", e))?;
        text.trim()
            .parse()
            .map_err(|e| ValidationError::discovery("the public IP address", e))
    }

    fn lan_ip(&self) -> ValidationOutcome<IpAddr> {
        // Connecting a UDP socket sends nothing; it only picks the outbound
        // interface address.
        let socket = UdpSocket::bind("0.0.0.0:0")
            .and_then(|s| s.connect("8.8.8.8:80").map(|_| s))
            .map_err(|e| ValidationError::discovery("the LAN IP address", e))?;
        socket
            .local_addr()
            .map(|addr| addr.ip())
            .map_err(|e| ValidationError::discovery("the LAN IP address", e))
    }

    fn gateway_lan_ip(&self) -> ValidationOutcome<IpAddr> {
        self.default_route().map(|route| IpAddr::V4(route.gateway))
    }

    fn default_interface(&self) -> ValidationOutcome<String> {
        self.default_route().map(|route| route.interface)
    }
}
