// File: precheck.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::{HubSettings, ProbeSettings};
use crate::discovery::AddressDiscovery;
use crate::dns::{resolve_single, DnsResolver, DnsValidator};
use crate::porttest::{PortTestPlan, PortTester};
use crate::probe::Prober;
use crate::report::{DnsCheck, NetworkReport};
use crate::stub::StubOrchestrator;
use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

/// Runs every network prerequisite check in order and stops at the first
/// failure.
pub async fn run_prechecks<D, R, O>(
    hub: &HubSettings,
    settings: &ProbeSettings,
    discovery: &D,
    resolver: &R,
    orchestrator: O,
) -> Result<NetworkReport>
where
    D: AddressDiscovery,
    R: DnsResolver,
    O: StubOrchestrator,
{
    let started_at = Utc::now();
    let mut warnings = Vec::new();

    let stable_public_ip = resolve_single(resolver, &hub.stable_public_dns_name)
        .await
        .with_context(|| {
            format!(
                "Stable public DNS name {} must resolve to exactly one IP address",
                hub.stable_public_dns_name
            )
        })?;

    let gateway_public_ip = discovery.public_ip().await?;
    if gateway_public_ip != stable_public_ip {
        let msg = format!(
            "Gateway's public IP address {} does not match stable public IP address {} (VLAN tunnel?)",
            gateway_public_ip, stable_public_ip
        );
        warn!("{}", msg);
        warnings.push(msg);
    }
    let gateway_lan_ip = discovery.gateway_lan_ip()?;
    let lan_ip = discovery.lan_ip()?;
    let default_interface = discovery.default_interface()?;

    info!("Testing network prerequisites for this project");
    info!("Traefik DNS domain: {}", hub.parent_dns_domain);

    let validator = DnsValidator::new(resolver, stable_public_ip);
    let mut dns_checks = Vec::new();
    for hostname in hub.subdomain_names(settings.subdomains()) {
        let address = validator.validate(&hostname).await?;
        dns_checks.push(DnsCheck { hostname, address });
    }

    info!("Testing availability and connectivity of all public and LAN-local hub ports using temporary echo stub servers");
    let prober = Prober::new(settings.connect_timeout(), settings.read_timeout())
        .context("Failed to build HTTP client")?;
    let plan = PortTestPlan::from(settings);
    let port_checks = PortTester::new(&prober)
        .run(
            orchestrator,
            &stable_public_ip.to_string(),
            &lan_ip.to_string(),
            &plan,
        )
        .await?;

    Ok(NetworkReport {
        stable_public_dns_name: hub.stable_public_dns_name.clone(),
        stable_public_ip,
        gateway_public_ip,
        lan_ip,
        gateway_lan_ip,
        default_interface,
        parent_dns_domain: hub.parent_dns_domain.clone(),
        dns_checks,
        port_checks,
        warnings,
        started_at,
        finished_at: Utc::now(),
    })
}
