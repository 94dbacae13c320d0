// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

pub mod compose;
pub mod local;

use crate::error::{ValidationError, ValidationOutcome};
use crate::probe::random_hex;
use log::{debug, info, warn};

pub use compose::ComposeOrchestrator;
pub use local::LocalEchoOrchestrator;

/// Stub listeners report `Hostname: port-test<suffix>`.
pub const STUB_HOSTNAME_PREFIX: &str = "port-test";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Settings handed to the stub listeners when they start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEnv {
    pub hostname_suffix: String,
}

impl StubEnv {
    /// A fresh `-<32 hex chars>` suffix, so answers from a stale or
    /// concurrently running stub never match.
    pub fn generate() -> Self {
        Self {
            hostname_suffix: format!("-{}", random_hex(16)),
        }
    }

    pub fn expected_hostname(&self) -> String {
        format!("{}{}", STUB_HOSTNAME_PREFIX, self.hostname_suffix)
    }
}

/// Starts and stops the echo listeners. Both calls must be idempotent:
/// `stop` runs after a failed or partial `start`. When the listeners must go
/// away without an `.await`, `stop_in_background` signals them to shut down
/// and returns at once.
pub trait StubOrchestrator {
    async fn start(&mut self, ports: &[u16], env: &StubEnv) -> Result<(), BoxError>;
    async fn stop(&mut self) -> Result<(), BoxError>;
    fn stop_in_background(&mut self);
}

impl<T: StubOrchestrator + ?Sized> StubOrchestrator for &mut T {
    async fn start(&mut self, ports: &[u16], env: &StubEnv) -> Result<(), BoxError> {
        (**self).start(ports, env).await
    }

    async fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop().await
    }

    fn stop_in_background(&mut self) {
        (**self).stop_in_background()
    }
}

/// Live echo listeners on a port matrix. `release` stops them and waits;
/// a guard dropped without `release` (panic, cancelled future) still
/// signals them to stop.
pub struct StubEnvironment<O: StubOrchestrator> {
    orchestrator: O,
    env: StubEnv,
    ports: Vec<u16>,
    released: bool,
}

impl<O: StubOrchestrator> StubEnvironment<O> {
    pub async fn acquire(
        mut orchestrator: O,
        ports: &[u16],
        env: StubEnv,
    ) -> ValidationOutcome<Self> {
        info!(
            "Starting stub echo listeners on ports {:?} (hostname {})",
            ports,
            env.expected_hostname()
        );

        if let Err(e) = orchestrator.start(ports, &env).await {
            if let Err(stop_err) = orchestrator.stop().await {
                warn!("Cleanup after failed stub start also failed: {}", stop_err);
            }
            return Err(ValidationError::environment_start(
                "check to ensure the production ingress stack (Traefik) is not running",
                Some(e),
            ));
        }

        Ok(Self {
            orchestrator,
            env,
            ports: ports.to_vec(),
            released: false,
        })
    }

    pub fn expected_hostname(&self) -> String {
        self.env.expected_hostname()
    }

    /// Stops the listeners; once this returns the ports are free again.
    pub async fn release(mut self) -> Result<(), BoxError> {
        self.released = true;
        debug!("Stopping stub echo listeners on ports {:?}", self.ports);
        self.orchestrator.stop().await
    }
}

impl<O: StubOrchestrator> Drop for StubEnvironment<O> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "Stub echo listeners on ports {:?} were not released, stopping them in the background",
            self.ports
        );
        self.orchestrator.stop_in_background();
    }
}
