// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::types::*;
use super::ElfError;
use core::cmp;

/// Half-open virtual address range `[vaddr_begin, vaddr_end)` covered by a
/// segment's memory image.
#[derive(PartialEq, Eq, Debug, Default, Clone, Copy)]
pub struct ElfAddrRange {
    pub vaddr_begin: Elf64Addr,
    pub vaddr_end: Elf64Addr,
}

impl ElfAddrRange {
    pub fn is_empty(&self) -> bool {
        self.vaddr_end <= self.vaddr_begin
    }

    /// Whether `vaddr` falls inside the range.
    pub fn contains(&self, vaddr: Elf64Addr) -> bool {
        self.vaddr_begin <= vaddr && vaddr < self.vaddr_end
    }
}

impl TryFrom<(Elf64Addr, Elf64Xword)> for ElfAddrRange {
    type Error = ElfError;

    /// Builds the range starting at `.0` spanning `.1` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidAddressRange`] if the end wraps around.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use elf_reader::{ElfAddrRange, ElfError};
    ///
    /// let range = ElfAddrRange::try_from((0x400000, 0x2000)).unwrap();
    /// assert!(range.contains(0x401fff));
    /// assert!(!range.contains(0x402000));
    ///
    /// assert_eq!(
    ///     ElfAddrRange::try_from((u64::MAX, 2)),
    ///     Err(ElfError::InvalidAddressRange)
    /// );
    /// ```
    fn try_from((vaddr_begin, size): (Elf64Addr, Elf64Xword)) -> Result<Self, Self::Error> {
        let vaddr_end = vaddr_begin
            .checked_add(size)
            .ok_or(ElfError::InvalidAddressRange)?;
        Ok(Self {
            vaddr_begin,
            vaddr_end,
        })
    }
}

/// Disjoint ranges are ordered by address. Overlapping, non-identical
/// ranges are unordered, which is how segment overlaps get detected.
impl PartialOrd for ElfAddrRange {
    fn partial_cmp(&self, other: &ElfAddrRange) -> Option<cmp::Ordering> {
        if self == other {
            Some(cmp::Ordering::Equal)
        } else if self.vaddr_end <= other.vaddr_begin {
            Some(cmp::Ordering::Less)
        } else if self.vaddr_begin >= other.vaddr_end {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_range_order() {
        let text = ElfAddrRange::try_from((0x1000, 0x1000)).unwrap();
        let data = ElfAddrRange::try_from((0x3000, 0x800)).unwrap();
        let overlap = ElfAddrRange::try_from((0x1800, 0x1000)).unwrap();

        assert!(text < data);
        assert!(data > text);
        assert_eq!(text.partial_cmp(&overlap), None);
        assert_eq!(text.partial_cmp(&text), Some(cmp::Ordering::Equal));
    }

    #[test]
    fn test_addr_range_empty() {
        assert!(ElfAddrRange::try_from((0x1000, 0)).unwrap().is_empty());
        let inverted = ElfAddrRange {
            vaddr_begin: 0x2000,
            vaddr_end: 0x1000,
        };
        assert!(inverted.is_empty());
        assert!(!inverted.contains(0x1800));
    }
}
