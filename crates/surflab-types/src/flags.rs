//! Label behavior flags.
//!
//! Flags are consumed downstream by rendering and export, never by the
//! cache. Adding an already-set flag is a no-op, which is what lets flag
//! patch tables be applied blindly at every scene open.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bit set of label behavior flags.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelFlags(u32);

impl LabelFlags {
    /// No flags set.
    pub const NONE: LabelFlags = LabelFlags(0);
    /// The short axis of objects with this label points toward the viewer
    /// (signs, billboards).
    pub const SHORT_AXIS_TOWARDS_FRONT: LabelFlags = LabelFlags(1 << 0);
    /// Objects with this label have no meaningful orientation (ground,
    /// vegetation, wires).
    pub const UNORIENTABLE: LabelFlags = LabelFlags(1 << 1);

    /// Check whether every flag in `other` is set.
    pub fn contains(self, other: LabelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the given flags. Idempotent.
    pub fn insert(&mut self, other: LabelFlags) {
        self.0 |= other.0;
    }

    /// Clear the given flags.
    pub fn remove(&mut self, other: LabelFlags) {
        self.0 &= !other.0;
    }

    /// Check whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reconstruct from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl BitOr for LabelFlags {
    type Output = LabelFlags;

    fn bitor(self, rhs: LabelFlags) -> LabelFlags {
        LabelFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LabelFlags {
    fn bitor_assign(&mut self, rhs: LabelFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for LabelFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "LabelFlags(NONE)");
        }
        let mut names = Vec::new();
        if self.contains(LabelFlags::SHORT_AXIS_TOWARDS_FRONT) {
            names.push("SHORT_AXIS_TOWARDS_FRONT");
        }
        if self.contains(LabelFlags::UNORIENTABLE) {
            names.push("UNORIENTABLE");
        }
        write!(f, "LabelFlags({})", names.join("|"))
    }
}
