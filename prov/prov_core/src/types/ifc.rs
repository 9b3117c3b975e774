//! Information-flow-control labels.
//!
//! A label is a bounded, ordered sequence of opaque 64-bit tags with an
//! explicit count. The array layout (32 tags, `u8` count) is shared with
//! graph decoders and must not change.
//!
//! Labels have no lock of their own; they are mutated only while the lock of
//! the owning provenance entry is held.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LabelError;

/// Maximum number of tags in one label.
pub const IFC_LABEL_MAX_SIZE: usize = 32;

/// A fixed-capacity, append-only-until-cleared tag set.
///
/// No duplicate suppression is performed: adding the same tag twice stores
/// it twice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLabel")]
pub struct IfcLabel {
    tags: [u64; IFC_LABEL_MAX_SIZE],
    size: u8,
}

// Wire form, checked before it becomes a label.
#[derive(Deserialize)]
struct RawLabel {
    tags: [u64; IFC_LABEL_MAX_SIZE],
    size: u8,
}

impl TryFrom<RawLabel> for IfcLabel {
    type Error = LabelError;

    fn try_from(raw: RawLabel) -> Result<Self, Self::Error> {
        if raw.size as usize > IFC_LABEL_MAX_SIZE {
            return Err(LabelError::CapacityExceeded {
                capacity: IFC_LABEL_MAX_SIZE,
            });
        }
        Ok(Self {
            tags: raw.tags,
            size: raw.size,
        })
    }
}

impl IfcLabel {
    /// An empty label.
    pub const fn new() -> Self {
        Self {
            tags: [0; IFC_LABEL_MAX_SIZE],
            size: 0,
        }
    }

    /// Append a tag.
    ///
    /// Fails with [`LabelError::CapacityExceeded`] when the label already holds
    /// [`IFC_LABEL_MAX_SIZE`] tags, in which case the label is unchanged.
    pub fn add(&mut self, tag: u64) -> Result<(), LabelError> {
        let size = self.size as usize;
        if size >= IFC_LABEL_MAX_SIZE {
            return Err(LabelError::CapacityExceeded {
                capacity: IFC_LABEL_MAX_SIZE,
            });
        }
        self.tags[size] = tag;
        self.size += 1;
        Ok(())
    }

    /// Whether the tag is present.
    pub fn contains(&self, tag: u64) -> bool {
        self.as_slice().contains(&tag)
    }

    /// Number of tags.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Whether the label holds no tags.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Remove every tag.
    pub fn clear(&mut self) {
        self.tags = [0; IFC_LABEL_MAX_SIZE];
        self.size = 0;
    }

    /// Tags in insertion order.
    pub fn as_slice(&self) -> &[u64] {
        &self.tags[..self.size as usize]
    }

    /// Iterate over the tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.as_slice().iter().copied()
    }
}

impl Default for IfcLabel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IfcLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Wire slot numbers of the six labels.
pub mod slot {
    /// Secrecy label.
    pub const SECRECY: u8 = 1;
    /// Integrity label.
    pub const INTEGRITY: u8 = 2;
    /// Provisional secrecy label.
    pub const SECRECY_P: u8 = 1;
    /// Provisional integrity label.
    pub const INTEGRITY_P: u8 = 2;
    /// Next secrecy label.
    pub const SECRECY_N: u8 = 3;
    /// Next integrity label.
    pub const INTEGRITY_N: u8 = 4;
}

/// One of the six labels attached to an IFC-bearing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSlot {
    /// Current secrecy tags.
    Secrecy,
    /// Current integrity tags.
    Integrity,
    /// Provisional secrecy tags.
    SecrecyProvisional,
    /// Provisional integrity tags.
    IntegrityProvisional,
    /// Secrecy tags staged for the next commit.
    SecrecyNext,
    /// Integrity tags staged for the next commit.
    IntegrityNext,
}

impl LabelSlot {
    /// Resolve a committed-label slot number (`SECRECY` or `INTEGRITY`).
    pub fn committed(number: u8) -> Result<Self, LabelError> {
        match number {
            slot::SECRECY => Ok(Self::Secrecy),
            slot::INTEGRITY => Ok(Self::Integrity),
            other => Err(LabelError::UnknownSlot(other)),
        }
    }

    /// Resolve a staged-label slot number (provisional or next).
    pub fn staged(number: u8) -> Result<Self, LabelError> {
        match number {
            slot::SECRECY_P => Ok(Self::SecrecyProvisional),
            slot::INTEGRITY_P => Ok(Self::IntegrityProvisional),
            slot::SECRECY_N => Ok(Self::SecrecyNext),
            slot::INTEGRITY_N => Ok(Self::IntegrityNext),
            other => Err(LabelError::UnknownSlot(other)),
        }
    }

    /// Wire slot number.
    pub fn number(self) -> u8 {
        match self {
            Self::Secrecy => slot::SECRECY,
            Self::Integrity => slot::INTEGRITY,
            Self::SecrecyProvisional => slot::SECRECY_P,
            Self::IntegrityProvisional => slot::INTEGRITY_P,
            Self::SecrecyNext => slot::SECRECY_N,
            Self::IntegrityNext => slot::INTEGRITY_N,
        }
    }
}

/// The six labels of one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IfcContext {
    /// Secrecy tags.
    pub secrecy: IfcLabel,
    /// Integrity tags.
    pub integrity: IfcLabel,
    /// Provisional secrecy tags.
    pub secrecy_p: IfcLabel,
    /// Provisional integrity tags.
    pub integrity_p: IfcLabel,
    /// Next secrecy tags.
    pub secrecy_n: IfcLabel,
    /// Next integrity tags.
    pub integrity_n: IfcLabel,
}

impl IfcContext {
    /// Borrow one label.
    pub fn label(&self, slot: LabelSlot) -> &IfcLabel {
        match slot {
            LabelSlot::Secrecy => &self.secrecy,
            LabelSlot::Integrity => &self.integrity,
            LabelSlot::SecrecyProvisional => &self.secrecy_p,
            LabelSlot::IntegrityProvisional => &self.integrity_p,
            LabelSlot::SecrecyNext => &self.secrecy_n,
            LabelSlot::IntegrityNext => &self.integrity_n,
        }
    }

    /// Mutably borrow one label.
    pub fn label_mut(&mut self, slot: LabelSlot) -> &mut IfcLabel {
        match slot {
            LabelSlot::Secrecy => &mut self.secrecy,
            LabelSlot::Integrity => &mut self.integrity,
            LabelSlot::SecrecyProvisional => &mut self.secrecy_p,
            LabelSlot::IntegrityProvisional => &mut self.integrity_p,
            LabelSlot::SecrecyNext => &mut self.secrecy_n,
            LabelSlot::IntegrityNext => &mut self.integrity_n,
        }
    }

    /// Whether all six labels are empty.
    pub fn is_empty(&self) -> bool {
        [
            &self.secrecy,
            &self.integrity,
            &self.secrecy_p,
            &self.integrity_p,
            &self.secrecy_n,
            &self.integrity_n,
        ]
        .iter()
        .all(|label| label.is_empty())
    }
}
