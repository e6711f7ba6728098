// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::types::*;
use super::ElfAddrRange;
use super::ElfError;
use super::ElfPhdr;

use core::cmp;

/// A `PT_LOAD` segment's memory image along with the part of the file
/// backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoadSegment {
    vaddr_range: ElfAddrRange,
    p_offset: Elf64Off,
    p_filesz: Elf64Xword,
}

/// The loadable segments of an ELF file, sorted by address. Translates
/// virtual addresses found in the dynamic segment back into file offsets.
#[derive(Debug, Default, PartialEq)]
pub struct LoadSegments {
    segments: Vec<LoadSegment>,
}

impl LoadSegments {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Collects all non-empty `PT_LOAD` segments from `phdrs`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidAddressRange`] for a wrapping segment and
    /// [`ElfError::LoadSegmentConflict`] if two segments overlap.
    pub fn from_phdrs(phdrs: &[ElfPhdr]) -> Result<Self, ElfError> {
        let mut load_segments = Self::new();
        for phdr in phdrs.iter().filter(|phdr| phdr.p_type == ElfPhdr::PT_LOAD) {
            let vaddr_range = phdr.vaddr_range()?;
            if vaddr_range.is_empty() {
                continue;
            }
            load_segments.try_insert(LoadSegment {
                vaddr_range,
                p_offset: phdr.p_offset,
                p_filesz: phdr.p_filesz,
            })?;
        }
        Ok(load_segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the first segment ending after `vaddr_begin`, i.e. the
    /// only candidate that may contain or follow it.
    fn first_ending_after(&self, vaddr_begin: Elf64Addr) -> usize {
        self.segments
            .partition_point(|segment| segment.vaddr_range.vaddr_end <= vaddr_begin)
    }

    fn try_insert(&mut self, segment: LoadSegment) -> Result<(), ElfError> {
        let i = self.first_ending_after(segment.vaddr_range.vaddr_begin);
        if let Some(next) = self.segments.get(i) {
            if segment.vaddr_range.partial_cmp(&next.vaddr_range) != Some(cmp::Ordering::Less) {
                log::warn!(
                    "load segment {:#x}..{:#x} overlaps {:#x}..{:#x}",
                    segment.vaddr_range.vaddr_begin,
                    segment.vaddr_range.vaddr_end,
                    next.vaddr_range.vaddr_begin,
                    next.vaddr_range.vaddr_end
                );
                return Err(ElfError::LoadSegmentConflict);
            }
        }
        self.segments.insert(i, segment);
        Ok(())
    }

    /// Maps the virtual address `vaddr` to the file offset backing it, using
    /// the loadable segment containing it:
    /// `p_offset + (vaddr - p_vaddr)`.
    ///
    /// # Errors
    ///
    /// - [`ElfError::UnmappedVaddrRange`]: no loadable segment contains `vaddr`.
    /// - [`ElfError::UnbackedVaddrRange`]: `vaddr` lies in the zero-filled
    ///   tail of its segment (`p_filesz < p_memsz`).
    pub fn vaddr_to_file_offset(&self, vaddr: Elf64Addr) -> Result<Elf64Off, ElfError> {
        let segment = self
            .segments
            .get(self.first_ending_after(vaddr))
            .filter(|segment| segment.vaddr_range.contains(vaddr))
            .ok_or(ElfError::UnmappedVaddrRange)?;
        let offset_in_segment = vaddr - segment.vaddr_range.vaddr_begin;

        if offset_in_segment >= segment.p_filesz {
            return Err(ElfError::UnbackedVaddrRange);
        }
        segment
            .p_offset
            .checked_add(offset_in_segment)
            .ok_or(ElfError::InvalidFileRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(offset: Elf64Off, vaddr: Elf64Addr, filesz: Elf64Xword, memsz: Elf64Xword) -> ElfPhdr {
        ElfPhdr {
            p_type: ElfPhdr::PT_LOAD,
            p_offset: offset,
            p_vaddr: vaddr,
            p_paddr: vaddr,
            p_filesz: filesz,
            p_memsz: memsz,
            p_align: 0x1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_load_segments() {
        // Out of order, plus an empty segment that is skipped.
        let phdrs = [
            load(0x2000, 0x3000, 0x1000, 0x1000),
            load(0, 0x5000, 0, 0),
            load(0, 0x1000, 0x1000, 0x1000),
        ];
        let load_segments = LoadSegments::from_phdrs(&phdrs).unwrap();
        assert_eq!(load_segments.len(), 2);
        assert_eq!(load_segments.vaddr_to_file_offset(0x1500), Ok(0x500));
        assert_eq!(load_segments.vaddr_to_file_offset(0x3010), Ok(0x2010));
        assert_eq!(
            load_segments.vaddr_to_file_offset(0x2500),
            Err(ElfError::UnmappedVaddrRange)
        );

        let overlapping = [
            load(0, 0x1000, 0x1000, 0x1000),
            load(0x1000, 0x1800, 0x1000, 0x1000),
        ];
        assert_eq!(
            LoadSegments::from_phdrs(&overlapping),
            Err(ElfError::LoadSegmentConflict)
        );
    }

    #[test]
    fn test_vaddr_to_file_offset() {
        // Text at offset 0, data with a different offset/vaddr delta and a
        // zero-filled .bss tail.
        let phdrs = [
            load(0, 0x400000, 0x1000, 0x1000),
            load(0x1000, 0x401e00, 0x300, 0x800),
        ];
        let load_segments = LoadSegments::from_phdrs(&phdrs).unwrap();

        assert_eq!(load_segments.vaddr_to_file_offset(0x400010), Ok(0x10));
        assert_eq!(load_segments.vaddr_to_file_offset(0x401e20), Ok(0x1020));
        assert_eq!(
            load_segments.vaddr_to_file_offset(0x402200),
            Err(ElfError::UnbackedVaddrRange)
        );
        assert_eq!(
            load_segments.vaddr_to_file_offset(0x10),
            Err(ElfError::UnmappedVaddrRange)
        );
        assert_eq!(
            load_segments.vaddr_to_file_offset(0x402600),
            Err(ElfError::UnmappedVaddrRange)
        );
    }

    #[test]
    fn test_translation_is_self_contained() {
        // The table keeps what it needs from the segment table it was built
        // from; later changes to that table don't matter.
        let mut phdrs = vec![load(0x200, 0x10000, 0x100, 0x100)];
        let load_segments = LoadSegments::from_phdrs(&phdrs).unwrap();
        phdrs.clear();
        assert_eq!(load_segments.vaddr_to_file_offset(0x10010), Ok(0x210));

        assert_eq!(
            LoadSegments::new().vaddr_to_file_offset(0x10010),
            Err(ElfError::UnmappedVaddrRange)
        );
    }
}
