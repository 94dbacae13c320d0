// File: dns.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{ValidationError, ValidationOutcome};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use log::{debug, info};
use std::collections::BTreeSet;
use std::net::IpAddr;

pub trait DnsResolver {
    async fn resolve(&self, hostname: &str) -> ValidationOutcome<BTreeSet<IpAddr>>;
}

/// Queries public DNS directly so a stale local cache cannot hide a wrong
/// record. Only IPv4 answers are kept.
pub struct PublicDnsResolver {
    resolver: TokioAsyncResolver,
}

impl PublicDnsResolver {
    pub fn new() -> Self {
        let mut opts = ResolverOpts::default();
        opts.use_hosts_file = false;
        opts.cache_size = 0;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::google(), opts),
        }
    }
}

impl Default for PublicDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver for PublicDnsResolver {
    async fn resolve(&self, hostname: &str) -> ValidationOutcome<BTreeSet<IpAddr>> {
        debug!("Resolving {} against public DNS", hostname);
        match self.resolver.lookup_ip(hostname).await {
            Ok(lookup) => Ok(lookup.iter().filter(|ip| ip.is_ipv4()).collect()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(BTreeSet::new()),
                _ => Err(ValidationError::Resolution {
                    hostname: hostname.to_string(),
                    source: Box::new(e),
                }),
            },
        }
    }
}

/// Resolves `hostname` and insists on exactly one address.
pub async fn resolve_single<R: DnsResolver>(
    resolver: &R,
    hostname: &str,
) -> ValidationOutcome<IpAddr> {
    let addresses = resolver.resolve(hostname).await?;
    let mut iter = addresses.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(ValidationError::NoResolution {
            hostname: hostname.to_string(),
        }),
        (Some(address), None) => Ok(*address),
        (Some(_), Some(_)) => Err(ValidationError::AmbiguousResolution {
            hostname: hostname.to_string(),
            addresses: addresses.into_iter().collect(),
        }),
    }
}

/// Confirms public names resolve to exactly the expected address. Being
/// among several answers is not enough; a single-homed deployment should
/// never publish more than one.
pub struct DnsValidator<'a, R> {
    resolver: &'a R,
    expected: IpAddr,
}

impl<'a, R: DnsResolver> DnsValidator<'a, R> {
    pub fn new(resolver: &'a R, expected: IpAddr) -> Self {
        Self { resolver, expected }
    }

    pub async fn validate(&self, hostname: &str) -> ValidationOutcome<IpAddr> {
        info!(
            "Testing whether public DNS name {} resolves to {}",
            hostname, self.expected
        );
        let observed = resolve_single(self.resolver, hostname).await?;
        if observed != self.expected {
            return Err(ValidationError::WrongTarget {
                hostname: hostname.to_string(),
                expected: self.expected,
                observed,
            });
        }
        info!(
            "Public DNS name {} resolves correctly to {}",
            hostname, self.expected
        );
        Ok(observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticResolver(HashMap<&'static str, Vec<&'static str>>);

    impl DnsResolver for StaticResolver {
        async fn resolve(&self, hostname: &str) -> ValidationOutcome<BTreeSet<IpAddr>> {
            Ok(self
                .0
                .get(hostname)
                .map(|addrs| addrs.iter().map(|a| a.parse().unwrap()).collect())
                .unwrap_or_default())
        }
    }

    fn resolver() -> StaticResolver {
        StaticResolver(HashMap::from([
            ("good.example.com", vec!["1.2.3.4"]),
            ("multi.example.com", vec!["1.2.3.4", "1.2.3.5"]),
            ("other.example.com", vec!["1.2.3.5"]),
        ]))
    }

    fn expected() -> IpAddr {
        "1.2.3.4".parse().unwrap()
    }

    #[tokio::test]
    async fn test_single_matching_address_passes() {
        let resolver = resolver();
        let validator = DnsValidator::new(&resolver, expected());
        assert_eq!(
            validator.validate("good.example.com").await.unwrap(),
            expected()
        );
    }

    #[tokio::test]
    async fn test_multiple_addresses_are_ambiguous() {
        let resolver = resolver();
        let validator = DnsValidator::new(&resolver, expected());
        match validator.validate("multi.example.com").await {
            Err(ValidationError::AmbiguousResolution { addresses, .. }) => {
                assert_eq!(addresses.len(), 2)
            }
            other => panic!("expected AmbiguousResolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_addresses_is_no_resolution() {
        let resolver = resolver();
        let validator = DnsValidator::new(&resolver, expected());
        assert!(matches!(
            validator.validate("missing.example.com").await,
            Err(ValidationError::NoResolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_address_is_wrong_target() {
        let resolver = resolver();
        let validator = DnsValidator::new(&resolver, expected());
        match validator.validate("other.example.com").await {
            Err(ValidationError::WrongTarget {
                expected: e,
                observed,
                ..
            }) => {
                assert_eq!(e, expected());
                assert_eq!(observed, "1.2.3.5".parse::<IpAddr>().unwrap());
            }
            other => panic!("expected WrongTarget, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_single() {
        let resolver = resolver();
        assert_eq!(
            resolve_single(&resolver, "good.example.com").await.unwrap(),
            expected()
        );
        assert!(resolve_single(&resolver, "multi.example.com").await.is_err());
    }
}
