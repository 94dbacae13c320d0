// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(async_fn_in_trait)]

pub mod cli;
pub mod config;
pub mod discovery;
pub mod dns;
pub mod echo;
pub mod error;
pub mod porttest;
pub mod precheck;
pub mod probe;
pub mod report;
pub mod stub;

#[cfg(test)]
mod report_tests;
