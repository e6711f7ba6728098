// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::types::*;
use super::ElfError;

use core::ffi;

/// Represents an ELF string table ([`ElfStrtab`]) containing strings
/// used within the ELF file, e.g. section or symbol names.
///
/// The table owns its bytes; every string handed out is a view into them
/// and can't outlive the table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ElfStrtab {
    strtab_buf: Vec<u8>,
}

impl ElfStrtab {
    /// Creates a new [`ElfStrtab`] instance from the provided string table buffer
    pub fn new(strtab_buf: Vec<u8>) -> Self {
        Self { strtab_buf }
    }

    /// Size of the table in bytes.
    pub fn len(&self) -> usize {
        self.strtab_buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strtab_buf.is_empty()
    }

    /// The raw table contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.strtab_buf
    }

    /// Retrieves a string from the string table by its index.
    ///
    /// # Arguments
    ///
    /// - `index`: The index of the string to retrieve.
    ///
    /// # Returns
    ///
    /// - [`Result<&ffi::CStr, ElfError>`]: A [`Result`] containing the string as a CStr reference
    ///   if found, or an [`ElfError`] if the index is out of bounds or the string is not
    ///   NUL-terminated within the table.
    pub fn get_str(&self, index: Elf64Word) -> Result<&ffi::CStr, ElfError> {
        let index = usize::try_from(index).map_err(|_| ElfError::InvalidStrtabString)?;
        if index >= self.strtab_buf.len() {
            return Err(ElfError::InvalidStrtabString);
        }

        ffi::CStr::from_bytes_until_nul(&self.strtab_buf[index..])
            .map_err(|_| ElfError::InvalidStrtabString)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_str() {
        let strtab = ElfStrtab::new(b"\0.text\0.data\0unterminated".to_vec());
        assert_eq!(strtab.get_str(0).unwrap().to_bytes(), b"");
        assert_eq!(strtab.get_str(1).unwrap().to_bytes(), b".text");
        // Suffixes of other strings are valid names, too.
        assert_eq!(strtab.get_str(3).unwrap().to_bytes(), b"ext");
        assert_eq!(strtab.get_str(7).unwrap().to_bytes(), b".data");
        assert_eq!(strtab.get_str(13), Err(ElfError::InvalidStrtabString));
        assert_eq!(strtab.get_str(100), Err(ElfError::InvalidStrtabString));
    }
}
