// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Length-prefixed JSON framing and a background reader/writer message
//! client over a local TCP socket.

pub mod client;
pub mod codec;

pub use client::{InboundResult, MessageClient};
pub use codec::{CodecError, MessageCodec};
