// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Change feeds and streams.
//!
//! A change feed is the net row-level delta between two resolved data states
//! of one object. It is stateless: the same interval always yields the same
//! records. Streams are named offsets that remember where a consumer left off.

mod feed;
mod stream;

pub use feed::{diff, ChangeAction, ChangeMode, ChangeRecord};
pub use stream::{Stream, StreamRegistry};
