// ABOUTME: Core types and constants for the Chatline streaming chat backend
// ABOUTME: Foundation crate with the error taxonomy, chat/usage models, and configuration defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![deny(unsafe_code)]

//! # Chatline Core
//!
//! Foundation crate providing shared types and constants for the Chatline
//! server. It changes rarely so the server crate can rebuild incrementally.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and stable `ErrorCode`s
//! - **constants**: Defaults for the configuration surface and wire names
//! - **models**: Identifiers, conversation turns, message and usage records

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants and configuration defaults organized by domain
pub mod constants;

/// Core data models (identifiers, turns, message and usage records)
pub mod models;
