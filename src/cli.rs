// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ProbeSettings;
use crate::report::ReportFormat;
use crate::stub::compose::DEFAULT_COMPOSE_FILE;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error | Self::Critical => log::LevelFilter::Error,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Test network and port configuration prerequisites for this project",
)]
pub struct Cli {
    #[arg(
        long = "loglevel",
        value_enum,
        ignore_case = true,
        default_value = "warning",
        help = "Provide logging level"
    )]
    pub loglevel: LogLevel,

    #[arg(long = "config", help = "JSON file with hub DNS settings")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "connect-timeout",
        default_value = "5",
        value_parser = parse_seconds,
        help = "Probe connect timeout in seconds"
    )]
    pub connect_timeout: Duration,

    #[arg(
        long = "read-timeout",
        default_value = "5",
        value_parser = parse_seconds,
        help = "Probe read timeout in seconds"
    )]
    pub read_timeout: Duration,

    #[arg(
        long = "settle-delay",
        default_value = "4",
        value_parser = parse_seconds,
        help = "Seconds to wait for stub listeners to start"
    )]
    pub settle_delay: Duration,

    #[arg(
        long = "local-stubs",
        help = "Serve the stub listeners in-process instead of via docker compose"
    )]
    pub local_stubs: bool,

    #[arg(long = "compose-file", default_value = DEFAULT_COMPOSE_FILE)]
    pub compose_file: PathBuf,

    #[arg(long = "public-ip-url", help = "Endpoint that returns this host's public IP")]
    pub public_ip_url: Option<String>,

    #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[arg(long = "no-color", help = "Disable colored output")]
    pub no_color: bool,
}

/// Non-negative, finite seconds, fractions allowed.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("`{}` must be a finite, non-negative number of seconds", value))
}

impl Cli {
    pub fn probe_settings(&self) -> ProbeSettings {
        let mut settings = ProbeSettings::new();
        settings.set_connect_timeout(self.connect_timeout);
        settings.set_read_timeout(self.read_timeout);
        settings.set_settle_delay(self.settle_delay);
        if let Some(url) = &self.public_ip_url {
            settings.set_public_ip_url(url.clone());
        }
        settings
    }
}
