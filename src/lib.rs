// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod aggregate;
pub mod alerts;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod das;
pub mod db;
pub mod error;
pub mod logging;
pub mod mei_limit;
pub mod models;
pub mod store;
pub mod subscription;
pub mod utils;
