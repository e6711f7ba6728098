// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Sym, Elf64Sym, Widen};
use super::types::*;
use super::ElfError;
use super::ElfShdr;
use super::ElfStrtab;

use core::ffi;
use core::ops::Deref;

/// Represents an ELF symbol ([`ElfSym`]) within the symbol table,
/// widened to the 64-bit shape.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ElfSym {
    /// Name of the symbol as an index into the string table
    pub st_name: Elf64Word,
    /// Symbol type and binding attributes
    pub st_info: Elf64char,
    /// Symbol visibility
    pub st_other: Elf64char,
    /// Section index associated with the symbol
    pub st_shndx: Elf64Half,
    /// Value or address of the symbol
    pub st_value: Elf64Addr,
    /// Size of the symbol in bytes
    pub st_size: Elf64Xword,
}

impl ElfSym {
    /// Indicates an undefined symbol
    pub const STN_UNDEF: Elf64Word = 0;

    pub const STB_LOCAL: Elf64char = 0;
    pub const STB_GLOBAL: Elf64char = 1;
    pub const STB_WEAK: Elf64char = 2;
    pub const STB_GNU_UNIQUE: Elf64char = 10;

    pub const STT_NOTYPE: Elf64char = 0;
    pub const STT_OBJECT: Elf64char = 1;
    pub const STT_FUNC: Elf64char = 2;
    pub const STT_SECTION: Elf64char = 3;
    pub const STT_FILE: Elf64char = 4;
    pub const STT_COMMON: Elf64char = 5;
    pub const STT_TLS: Elf64char = 6;
    pub const STT_GNU_IFUNC: Elf64char = 10;

    pub const STV_DEFAULT: Elf64char = 0;
    pub const STV_INTERNAL: Elf64char = 1;
    pub const STV_HIDDEN: Elf64char = 2;
    pub const STV_PROTECTED: Elf64char = 3;

    /// Symbol binding (`STB_*`), the upper nibble of `st_info`
    pub fn bind(&self) -> Elf64char {
        self.st_info >> 4
    }

    /// Symbol type (`STT_*`), the lower nibble of `st_info`
    pub fn sym_type(&self) -> Elf64char {
        self.st_info & 0xf
    }

    /// Symbol visibility (`STV_*`)
    pub fn visibility(&self) -> Elf64char {
        self.st_other & 0x3
    }

    /// Whether the symbol is defined in this object rather than imported.
    pub fn is_defined(&self) -> bool {
        Elf64Word::from(self.st_shndx) != ElfShdr::SHN_UNDEF
    }
}

impl From<Elf32Sym> for ElfSym {
    fn from(sym: Elf32Sym) -> Self {
        Self {
            st_name: sym.st_name,
            st_info: sym.st_info,
            st_other: sym.st_other,
            st_shndx: sym.st_shndx,
            st_value: sym.st_value.into(),
            st_size: sym.st_size.into(),
        }
    }
}

impl From<Elf64Sym> for ElfSym {
    fn from(sym: Elf64Sym) -> Self {
        Self {
            st_name: sym.st_name,
            st_info: sym.st_info,
            st_other: sym.st_other,
            st_shndx: sym.st_shndx,
            st_value: sym.st_value,
            st_size: sym.st_size,
        }
    }
}

impl Widen for ElfSym {
    type Narrow = Elf32Sym;
    type Wide = Elf64Sym;
}

/// A dynamic symbol paired with its name from the dynamic string table.
#[derive(Debug, Clone, Copy)]
pub struct Symbol<'a> {
    index: usize,
    sym: &'a ElfSym,
    name: &'a ffi::CStr,
}

impl<'a> Symbol<'a> {
    /// Resolves the name of `sym`, the `index`th entry of its symbol
    /// table, through `strtab`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidStrtabString`] if the name offset is out of
    /// bounds or the name is not NUL-terminated within the table.
    pub fn new(index: usize, sym: &'a ElfSym, strtab: &'a ElfStrtab) -> Result<Self, ElfError> {
        let name = strtab.get_str(sym.st_name)?;
        Ok(Self { index, sym, name })
    }

    /// Index of the symbol in the dynamic symbol table
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sym(&self) -> &'a ElfSym {
        self.sym
    }

    pub fn name(&self) -> &'a ffi::CStr {
        self.name
    }
}

impl Deref for Symbol<'_> {
    type Target = ElfSym;

    fn deref(&self) -> &ElfSym {
        self.sym
    }
}
