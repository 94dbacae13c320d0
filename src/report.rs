// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::porttest::{PortCheck, PortCheckKind};
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::io::Write;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsCheck {
    pub hostname: String,
    pub address: IpAddr,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub stable_public_dns_name: String,
    pub stable_public_ip: IpAddr,
    pub gateway_public_ip: IpAddr,
    pub lan_ip: IpAddr,
    pub gateway_lan_ip: IpAddr,
    pub default_interface: String,
    pub parent_dns_domain: String,
    pub dns_checks: Vec<DnsCheck>,
    pub port_checks: Vec<PortCheck>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NetworkReport {
    pub fn lan_ports(&self) -> Vec<u16> {
        self.port_checks
            .iter()
            .filter(|c| c.kind == PortCheckKind::Lan)
            .map(|c| c.port)
            .collect()
    }

    pub fn forwarded(&self) -> impl Iterator<Item = (&PortCheck, &str, u16)> {
        self.port_checks.iter().filter_map(|c| match &c.kind {
            PortCheckKind::Forwarded { lan_host, lan_port } => Some((c, lan_host.as_str(), *lan_port)),
            PortCheckKind::Lan => None,
        })
    }
}

pub enum ReportFormat {
    Text,
    Json,
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate_report<W: Write>(
        report: &NetworkReport,
        out: &mut W,
        format: ReportFormat,
    ) -> Result<()> {
        match format {
            ReportFormat::Text => Self::generate_text_report(report, out),
            ReportFormat::Json => Self::generate_json_report(report, out),
        }
    }

    pub fn generate_text_report<W: Write>(report: &NetworkReport, out: &mut W) -> Result<()> {
        writeln!(out)?;
        let names: Vec<&str> = report.dns_checks.iter().map(|c| c.hostname.as_str()).collect();
        writeln!(
            out,
            "{} [{}] all resolve to {}",
            "✓".green().bold(),
            names.join(", "),
            report.stable_public_ip
        )?;
        let ports: Vec<String> = report.lan_ports().iter().map(|p| p.to_string()).collect();
        writeln!(
            out,
            "{} Ports [{}] are all available for use.",
            "✓".green().bold(),
            ports.join(", ")
        )?;
        for (check, lan_host, lan_port) in report.forwarded() {
            writeln!(
                out,
                "{} Port forwarding from {}:{} to {}:{} is working.",
                "✓".green().bold(),
                check.host,
                check.port,
                lan_host,
                lan_port
            )?;
        }
        writeln!(out, "DDNS stable public DNS name: {}", report.stable_public_dns_name)?;
        writeln!(out, "DDNS current public IP address: {}", report.stable_public_ip)?;
        writeln!(out, "LAN default route interface: {}", report.default_interface)?;
        writeln!(out, "LAN IP address: {}", report.lan_ip)?;
        writeln!(out, "Gateway LAN IP address: {}", report.gateway_lan_ip)?;
        writeln!(out, "Gateway Public IP address: {}", report.gateway_public_ip)?;

        for warning in &report.warnings {
            writeln!(out)?;
            writeln!(out, "{} {}", "⚠".yellow().bold(), warning.yellow())?;
        }
        Ok(())
    }

    pub fn generate_json_report<W: Write>(report: &NetworkReport, out: &mut W) -> Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| anyhow::anyhow!("Failed to serialize report to JSON: {}", e))?;
        writeln!(out, "{}", json)?;
        Ok(())
    }
}
