//! Integer bitmask encoding for multi-valued attributes.
//!
//! A mask is a nullable `i32` column. Bit `b` is set iff the subject carries the
//! reference item whose `bit_index` is `b`. Only bits `0..=30` are usable so a
//! mask always stays a non-negative 31-bit value.

pub mod filter;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filter::{matches_all, matches_any, matches_none, paginate_filtered, FilteredPage};

/// Highest usable bit position.
pub const MAX_BIT_INDEX: i32 = 30;

/// Number of usable bit positions per mask.
pub const MASK_WIDTH: usize = (MAX_BIT_INDEX + 1) as usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("bit index {0} is outside the supported range 0..={MAX_BIT_INDEX}")]
    BitIndexOutOfRange(i64),

    #[error("malformed mask value: {0}")]
    MalformedMask(i64),
}

/// A validated bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct BitIndex(u8);

impl BitIndex {
    pub fn new(index: i64) -> Result<Self, MaskError> {
        if (0..=MAX_BIT_INDEX as i64).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(MaskError::BitIndexOutOfRange(index))
        }
    }

    pub fn get(self) -> i32 {
        self.0 as i32
    }

    /// The single-bit mask for this position.
    pub fn bit(self) -> i32 {
        1 << self.0
    }

    /// All positions, lowest first.
    pub fn all() -> impl Iterator<Item = BitIndex> {
        (0..=MAX_BIT_INDEX as u8).map(BitIndex)
    }
}

impl TryFrom<i64> for BitIndex {
    type Error = MaskError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for BitIndex {
    type Error = MaskError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl From<BitIndex> for i32 {
    fn from(value: BitIndex) -> Self {
        value.get()
    }
}

impl std::fmt::Display for BitIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that owns a stable id and a bit position.
pub trait BitIndexed {
    fn id(&self) -> i32;
    fn bit_index(&self) -> BitIndex;
}

/// Validate a raw mask coming from the outside world (query strings, JSON).
pub fn check_mask(raw: i64) -> Result<i32, MaskError> {
    if raw < 0 || raw > i32::MAX as i64 {
        return Err(MaskError::MalformedMask(raw));
    }
    Ok(raw as i32)
}

/// OR together the bits of every selected item. Unknown ids are ignored.
pub fn encode<T: BitIndexed>(selected_ids: &HashSet<i32>, items: &[T]) -> i32 {
    items
        .iter()
        .filter(|item| selected_ids.contains(&item.id()))
        .fold(0, |mask, item| mask | item.bit_index().bit())
}

/// A stored mask with `None` read as empty. Negative values are malformed.
fn stored(mask: Option<i32>) -> Result<i32, MaskError> {
    match mask {
        Some(m) if m < 0 => Err(MaskError::MalformedMask(m as i64)),
        other => Ok(other.unwrap_or(0)),
    }
}

/// Items whose bit is set in `mask`, in the order of `items`.
///
/// `None` and `0` both decode to nothing. Bits without a matching item are
/// ignored.
pub fn decode<'a, T: BitIndexed>(mask: Option<i32>, items: &'a [T]) -> Result<Vec<&'a T>, MaskError> {
    let mask = stored(mask)?;
    Ok(items.iter().filter(|item| mask & item.bit_index().bit() != 0).collect())
}

pub fn contains<T: BitIndexed>(mask: Option<i32>, item: &T) -> Result<bool, MaskError> {
    Ok(stored(mask)? & item.bit_index().bit() != 0)
}

pub fn count_set_bits(mask: Option<i32>) -> Result<u32, MaskError> {
    Ok(stored(mask)?.count_ones())
}

pub fn set_bit(mask: Option<i32>, index: BitIndex) -> i32 {
    mask.unwrap_or(0) | index.bit()
}

pub fn clear_bit(mask: Option<i32>, index: BitIndex) -> i32 {
    mask.unwrap_or(0) & !index.bit()
}

/// Combine several positions into one mask.
pub fn bits_of<I: IntoIterator<Item = BitIndex>>(indexes: I) -> i32 {
    indexes.into_iter().fold(0, |mask, index| mask | index.bit())
}

/// Lowest position not used by any item, if one is left.
pub fn lowest_free_bit<T: BitIndexed>(items: &[T]) -> Option<BitIndex> {
    let used = bits_of(items.iter().map(BitIndexed::bit_index));
    BitIndex::all().find(|index| used & index.bit() == 0)
}

/// Per-item coverage over a set of subject masks.
#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub id: i32,
    pub bit_index: BitIndex,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub subjects: usize,
    /// Subjects whose mask has never been set.
    pub unset: usize,
    pub average_attributes: f64,
    pub items: Vec<Coverage>,
}

/// Fails on the first malformed mask.
pub fn coverage<T: BitIndexed>(masks: &[Option<i32>], items: &[T]) -> Result<CoverageReport, MaskError> {
    let subjects = masks.len();
    let percent = |count: usize| {
        if subjects == 0 {
            0.0
        } else {
            (count as f64 * 10000.0 / subjects as f64).round() / 100.0
        }
    };

    let mut total_bits = 0u64;
    for mask in masks {
        total_bits += count_set_bits(*mask)? as u64;
    }
    let average_attributes = if subjects == 0 { 0.0 } else { total_bits as f64 / subjects as f64 };

    let items = items
        .iter()
        .map(|item| {
            let count = masks.iter().filter(|mask| matches!(contains(**mask, item), Ok(true))).count();
            Coverage { id: item.id(), bit_index: item.bit_index(), count, percentage: percent(count) }
        })
        .collect();

    Ok(CoverageReport {
        subjects,
        unset: masks.iter().filter(|mask| mask.is_none()).count(),
        average_attributes,
        items,
    })
}
