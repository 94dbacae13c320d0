// File: porttest.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::{ForwardRule, ProbeSettings};
use crate::error::{ValidationError, ValidationOutcome};
use crate::probe::{ProbeTarget, Prober};
use crate::stub::{StubEnv, StubEnvironment, StubOrchestrator};
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;

/// Which ports to probe and which gateway forwards to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortTestPlan {
    pub lan_ports: Vec<u16>,
    pub forward_rules: Vec<ForwardRule>,
    pub settle_delay: Duration,
}

impl From<&ProbeSettings> for PortTestPlan {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            lan_ports: settings.lan_ports().to_vec(),
            forward_rules: settings.forward_rules().to_vec(),
            settle_delay: settings.settle_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortCheckKind {
    Lan,
    Forwarded { lan_host: String, lan_port: u16 },
}

/// A probe that passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCheck {
    pub host: String,
    pub port: u16,
    #[serde(flatten)]
    pub kind: PortCheckKind,
}

impl PortCheck {
    pub fn describe(&self) -> String {
        match &self.kind {
            PortCheckKind::Lan => format!("Test for hub LAN port {}:{}", self.host, self.port),
            PortCheckKind::Forwarded { lan_host, lan_port } => format!(
                "Test for Gateway public port {}:{} forwarding to {}:{}",
                self.host, self.port, lan_host, lan_port
            ),
        }
    }
}

/// Runs every LAN and forwarded-port probe against one stub environment.
pub struct PortTester<'a> {
    prober: &'a Prober,
}

impl<'a> PortTester<'a> {
    pub fn new(prober: &'a Prober) -> Self {
        Self { prober }
    }

    /// Stops at the first failing probe. The stub listeners are torn down
    /// whether this returns `Ok` or `Err`.
    pub async fn run<O: StubOrchestrator>(
        &self,
        orchestrator: O,
        public_ip: &str,
        lan_ip: &str,
        plan: &PortTestPlan,
    ) -> ValidationOutcome<Vec<PortCheck>> {
        let stub =
            StubEnvironment::acquire(orchestrator, &plan.lan_ports, StubEnv::generate()).await?;
        let expected_hostname = stub.expected_hostname();

        debug!("Letting stub listeners settle for {:?}", plan.settle_delay);
        tokio::time::sleep(plan.settle_delay).await;

        let result = self
            .check_all(public_ip, lan_ip, plan, &expected_hostname)
            .await;

        if let Err(e) = stub.release().await {
            warn!("Failed to stop stub echo listeners: {}", e);
        }
        if result.is_ok() {
            debug!("All port tests passed!");
        }
        result
    }

    async fn check_all(
        &self,
        public_ip: &str,
        lan_ip: &str,
        plan: &PortTestPlan,
        expected_hostname: &str,
    ) -> ValidationOutcome<Vec<PortCheck>> {
        let mut checks = Vec::with_capacity(plan.lan_ports.len() + plan.forward_rules.len());

        for &port in &plan.lan_ports {
            let check = PortCheck {
                host: lan_ip.to_string(),
                port,
                kind: PortCheckKind::Lan,
            };
            self.check(check, expected_hostname, &mut checks).await?;
        }

        for rule in &plan.forward_rules {
            let check = PortCheck {
                host: public_ip.to_string(),
                port: rule.public_port,
                kind: PortCheckKind::Forwarded {
                    lan_host: lan_ip.to_string(),
                    lan_port: rule.lan_port,
                },
            };
            self.check(check, expected_hostname, &mut checks).await?;
        }
        Ok(checks)
    }

    async fn check(
        &self,
        check: PortCheck,
        expected_hostname: &str,
        checks: &mut Vec<PortCheck>,
    ) -> ValidationOutcome {
        let target =
            ProbeTarget::new(check.host.clone(), check.port).with_expected_hostname(expected_hostname);
        match self.prober.probe(&target).await {
            Ok(_) => {
                info!("{} passed!", check.describe());
                checks.push(check);
                Ok(())
            }
            Err(e) => Err(ValidationError::PortTestFailed {
                host: check.host.clone(),
                port: check.port,
                description: check.describe(),
                source: Box::new(e),
            }),
        }
    }
}
