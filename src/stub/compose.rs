// File: compose.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{BoxError, StubEnv, StubOrchestrator};
use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

pub const DEFAULT_COMPOSE_FILE: &str = "data/hub_port_test/docker-compose.yml";
pub const COMPOSE_PROJECT: &str = "hub-port-test";

// `up` may pull the whoami image on first use.
const COMPOSE_TIMEOUT: Duration = Duration::from_secs(300);

// `- "8080:80"`, `- 8080:80/tcp`, `- "0.0.0.0:8080:80"`
static PUBLISHED_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*-\s*["']?(?:[\d.]+:)?(?P<host>\d+):\d+(?:/tcp)?["']?\s*$"#)
        .expect("published port pattern is valid")
});

/// Host ports a compose stack file publishes.
pub fn published_ports(stack: &str) -> BTreeSet<u16> {
    PUBLISHED_PORT
        .captures_iter(stack)
        .filter_map(|caps| caps["host"].parse().ok())
        .collect()
}

/// Runs the stub listeners as a docker compose stack of whoami containers.
/// The stack file decides which ports are published; `start` refuses a port
/// list the stack file does not publish and passes the hostname suffix
/// through the environment.
#[derive(Debug, Clone)]
pub struct ComposeOrchestrator {
    compose_file: PathBuf,
    project: String,
    env: Option<StubEnv>,
}

impl ComposeOrchestrator {
    pub fn new(compose_file: impl Into<PathBuf>) -> Self {
        Self {
            compose_file: compose_file.into(),
            project: COMPOSE_PROJECT.to_string(),
            env: None,
        }
    }

    pub fn compose_args(&self, action: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "-p".to_string(),
            self.project.clone(),
        ];
        args.extend(action.iter().map(|a| a.to_string()));
        args
    }

    fn command(&self, action: &[&str]) -> TokioCommand {
        let mut command = TokioCommand::new("docker");
        command.args(self.compose_args(action));
        if let Some(env) = &self.env {
            command.env("HOSTNAME_SUFFIX", &env.hostname_suffix);
        }
        command
    }

    async fn run(&self, action: &[&str]) -> Result<Output, BoxError> {
        debug!("Running docker {}", self.compose_args(action).join(" "));

        let output = timeout(COMPOSE_TIMEOUT, self.command(action).output())
            .await
            .map_err(|_| format!("docker compose {} timed out", action.join(" ")))??;
        trace!(
            "docker compose {:?} exited with {}: {}",
            action,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "docker compose {} failed ({}): {}",
                action.join(" "),
                output.status,
                stderr.trim()
            )
            .into());
        }
        Ok(output)
    }

    async fn check_published_ports(&self, ports: &[u16]) -> Result<(), BoxError> {
        let stack = tokio::fs::read_to_string(&self.compose_file)
            .await
            .map_err(|e| {
                format!(
                    "port test stack file {} does not exist or is unreadable: {}",
                    self.compose_file.display(),
                    e
                )
            })?;
        let published = published_ports(&stack);
        let missing: Vec<u16> = ports
            .iter()
            .copied()
            .filter(|port| !published.contains(port))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "port test stack file {} does not publish ports {:?} (it publishes {:?})",
                self.compose_file.display(),
                missing,
                published
            )
            .into());
        }
        Ok(())
    }
}

impl StubOrchestrator for ComposeOrchestrator {
    async fn start(&mut self, ports: &[u16], env: &StubEnv) -> Result<(), BoxError> {
        self.check_published_ports(ports).await?;
        debug!(
            "Bringing up {} for ports {:?}",
            self.compose_file.display(),
            ports
        );
        self.env = Some(env.clone());
        // Leftovers from an interrupted run would hold the ports.
        self.run(&["down", "--remove-orphans"]).await?;
        self.run(&["up", "-d"]).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BoxError> {
        if self.env.is_none() {
            return Ok(());
        }
        self.run(&["down", "--remove-orphans"]).await?;
        self.env = None;
        Ok(())
    }

    fn stop_in_background(&mut self) {
        if self.env.is_none() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No runtime left to run docker compose down; stop the stack by hand");
            return;
        }
        // The spawned child keeps running after its handle is dropped.
        match self.command(&["down", "--remove-orphans"]).spawn() {
            Ok(_) => debug!("docker compose down started in the background"),
            Err(e) => warn!("Unable to start docker compose down: {}", e),
        }
        self.env = None;
    }
}
