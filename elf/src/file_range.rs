// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::types::*;
use super::ElfError;

/// A byte range within the ELF file, e.g. the contents of a section.
///
/// In mathematical notation, the range is [offset_begin, offset_end)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfFileRange {
    pub offset_begin: Elf64Off,
    pub offset_end: Elf64Off,
}

impl ElfFileRange {
    /// Length of the range in bytes, as a buffer size.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidFileRange`] if the range is inverted or
    /// does not fit into the host's address space.
    pub fn len(&self) -> Result<usize, ElfError> {
        self.offset_end
            .checked_sub(self.offset_begin)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(ElfError::InvalidFileRange)
    }

    pub fn is_empty(&self) -> bool {
        self.offset_end <= self.offset_begin
    }
}

impl TryFrom<(Elf64Off, Elf64Xword)> for ElfFileRange {
    type Error = ElfError;

    /// Tries to create an [`ElfFileRange`] from a tuple of [`(Elf64Off, Elf64Xword)`].
    ///
    ///
    /// # Errors
    ///
    /// Returns an [`ElfError::InvalidFileRange`] if the calculation of `offset_end`
    /// results in an invalid file range.
    fn try_from(value: (Elf64Off, Elf64Xword)) -> Result<Self, Self::Error> {
        let offset_begin = value.0;
        let offset_end = offset_begin
            .checked_add(value.1)
            .ok_or(ElfError::InvalidFileRange)?;
        Ok(Self {
            offset_begin,
            offset_end,
        })
    }
}
