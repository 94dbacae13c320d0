// File: echo.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{ValidationError, ValidationOutcome};
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<verb>GET|POST)\s+(?P<path>.*\S)\s+HTTP/(?P<version>\d+\.\d+)\s*$")
        .expect("request line pattern is valid")
});

// CRLF, LF, bare CR and the other Unicode line boundaries.
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\r\n|[\n\r\x0b\x0c\x1c\x1d\x1e\x{85}\x{2028}\x{2029}]")
        .expect("line break pattern is valid")
});

/// A header as echoed back by a stub listener. Headers that were sent more
/// than once keep every value in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl HeaderValue {
    fn push(&mut self, value: String) {
        match self {
            Self::Scalar(first) => {
                let first = std::mem::take(first);
                *self = Self::Sequence(vec![first, value]);
            }
            Self::Sequence(values) => values.push(value),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Sequence(_) => None,
        }
    }

    /// Every value received, in arrival order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Scalar(value) => vec![value.as_str()],
            Self::Sequence(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values().join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EchoResponseRecord {
    http_verb: Option<String>,
    http_path: Option<String>,
    http_version: Option<String>,
    headers: Vec<(String, HeaderValue)>,
}

impl EchoResponseRecord {
    pub fn http_verb(&self) -> Option<&str> {
        self.http_verb.as_deref()
    }

    pub fn http_path(&self) -> Option<&str> {
        self.http_path.as_deref()
    }

    pub fn http_version(&self) -> Option<&str> {
        self.http_version.as_deref()
    }

    /// Case-sensitive lookup; names are kept exactly as received.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Headers in order of first occurrence.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.headers.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn hostname(&self) -> Option<&HeaderValue> {
        self.header("Hostname")
    }

    fn insert(&mut self, name: String, value: String) {
        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => existing.push(value),
            None => self.headers.push((name, HeaderValue::Scalar(value))),
        }
    }
}

/// Decodes the plain-text body a stub listener sends back: one request line
/// plus `Name: value` lines.
pub fn parse_echo_response(response: &str) -> ValidationOutcome<EchoResponseRecord> {
    let mut record = EchoResponseRecord::default();

    for line in LINE_BREAK.split(response) {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = REQUEST_LINE.captures(line) {
            record.http_verb = Some(caps["verb"].to_string());
            record.http_path = Some(caps["path"].to_string());
            record.http_version = Some(caps["version"].to_string());
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(ValidationError::MalformedResponse {
                line: line.to_string(),
            });
        };
        trace!("echo header {:?} = {:?}", name.trim(), value.trim());
        record.insert(name.trim().to_string(), value.trim().to_string());
    }

    Ok(record)
}
