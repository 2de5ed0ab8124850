// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors that can arise while decoding a wire payload into a protocol
/// type. The caller's disposition for every variant is the same: emit
/// `SlaveDiedWithUnknownError` and terminate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedMessage {
    #[error("IO check payload specified both the (input, expectedOutput) and (text) encodings")]
    AmbiguousIoEncoding,
    #[error("IO check payload specified neither the (input, expectedOutput) nor (text) encoding")]
    MissingIoEncoding,
    #[error("unrecognized check type: {0}")]
    UnknownCheckKind(String),
    #[error("invalid JSON frame: {0}")]
    InvalidJson(String),
}
