// ABOUTME: Re-export of the shared error taxonomy from chatline-core
// ABOUTME: Lets server modules import errors through crate::errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! Error types used across the server; see [`chatline_core::errors`]

pub use chatline_core::errors::*;
