// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::Widen;
use super::types::*;
use super::{ElfClass, ElfError};
use std::io::{Read, Seek, SeekFrom};

/// Positioned reads from the underlying ELF file. Every access seeks first
/// and insists on receiving the exact number of bytes requested; a short
/// read is reported as [`ElfError::TruncatedRead`].
#[derive(Debug)]
pub struct RawReader<R> {
    inner: R,
}

impl<R: Read + Seek> RawReader<R> {
    /// Creates a new [`RawReader`] over `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads `len` bytes starting at file offset `offset`.
    ///
    /// The buffer grows with the data actually read, so a bogus length taken
    /// from a corrupted header can't trigger a huge up-front allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if seeking or reading fails and
    /// [`ElfError::TruncatedRead`] if the file ends early.
    pub fn read_bytes(&mut self, offset: Elf64Off, len: usize) -> Result<Vec<u8>, ElfError> {
        let wanted = u64::try_from(len).map_err(|_| ElfError::InvalidFileRange)?;
        self.inner.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::new();
        let got = (&mut self.inner).take(wanted).read_to_end(&mut buf)?;
        if got != len {
            log::debug!("short read at {offset:#x}: wanted {len} bytes, got {got}");
            return Err(ElfError::TruncatedRead);
        }
        Ok(buf)
    }

    /// Reads a single record of type `T` for the given `class` at `offset`.
    ///
    /// # Errors
    ///
    /// See [`RawReader::read_bytes`].
    pub fn read_record<T: Widen>(
        &mut self,
        class: ElfClass,
        offset: Elf64Off,
    ) -> Result<T, ElfError> {
        let buf = self.read_bytes(offset, T::entry_size(class))?;
        T::decode(class, &buf)
    }

    /// Reads `count` consecutive records of type `T` starting at `offset`,
    /// widening each one to the unified representation.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidFileRange`] if the table size overflows,
    /// otherwise see [`RawReader::read_bytes`].
    pub fn read_table<T: Widen>(
        &mut self,
        class: ElfClass,
        offset: Elf64Off,
        count: usize,
    ) -> Result<Vec<T>, ElfError> {
        let entsize = T::entry_size(class);
        let len = count
            .checked_mul(entsize)
            .ok_or(ElfError::InvalidFileRange)?;
        let buf = self.read_bytes(offset, len)?;
        buf.chunks_exact(entsize)
            .map(|entry_buf| T::decode(class, entry_buf))
            .collect()
    }
}
