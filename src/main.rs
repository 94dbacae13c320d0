// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use ingress_precheck::cli::Cli;
use ingress_precheck::config::HubSettings;
use ingress_precheck::discovery::SystemDiscovery;
use ingress_precheck::dns::PublicDnsResolver;
use ingress_precheck::precheck::run_prechecks;
use ingress_precheck::report::{NetworkReport, ReportGenerator};
use ingress_precheck::stub::{ComposeOrchestrator, LocalEchoOrchestrator, StubOrchestrator};
use log::debug;
use simple_logger::SimpleLogger;
use std::io;
use std::process::ExitCode;

async fn execute<O: StubOrchestrator>(cli: &Cli, orchestrator: O) -> Result<NetworkReport> {
    let hub = HubSettings::load(cli.config.as_deref()).context("Failed to load hub settings")?;
    debug!("Hub settings: {:?}", hub);

    let settings = cli.probe_settings();
    let discovery = SystemDiscovery::new(
        settings.public_ip_url(),
        settings.connect_timeout() + settings.read_timeout(),
    )
    .context("Failed to build HTTP client")?;
    let resolver = PublicDnsResolver::new();

    run_prechecks(&hub, &settings, &discovery, &resolver, orchestrator).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = SimpleLogger::new()
        .with_level(cli.loglevel.to_level_filter())
        .init()
    {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let result = if cli.local_stubs {
        execute(&cli, LocalEchoOrchestrator::new()).await
    } else {
        execute(&cli, ComposeOrchestrator::new(&cli.compose_file)).await
    };

    match result {
        Ok(report) => {
            let mut stderr = io::stderr();
            if let Err(e) = ReportGenerator::generate_report(&report, &mut stderr, cli.format.into())
            {
                eprintln!("{} Failed to write report: {:#}", "✗".red().bold(), e);
                return ExitCode::FAILURE;
            }
            eprintln!();
            eprintln!("{}", "All network prerequisite tests passed!".green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
