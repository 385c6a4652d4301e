// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Condition a backend checks at the moment it applies a write.
///
/// Backends serialize writes per document, so evaluating the condition at
/// apply time makes concurrent conditional writes to the same document
/// mutually exclusive. A write whose condition does not hold fails its task
/// with [`crate::TaskErrorKind::PreconditionFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WritePrecondition {
    #[default]
    None,
    /// Document must not exist yet
    Absent,
    /// Document must exist and carry exactly this version
    VersionEquals(Vec<u8>),
}

impl WritePrecondition {
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn holds_for(&self, current_version: Option<&[u8]>) -> bool {
        match self {
            Self::None => true,
            Self::Absent => current_version.is_none(),
            Self::VersionEquals(expected) => current_version == Some(expected.as_slice()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
