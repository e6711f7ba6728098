// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Shdr, Elf64Shdr, Widen};
use super::types::*;
use super::ElfError;
use super::ElfFileRange;
use super::ElfStrtab;
use bitflags::bitflags;

use core::ffi;
use core::ops::Deref;

bitflags! {
    /// Flags associated with an ELF section header (e.g.,
    /// writable, contains null-terminated string, etc.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ElfShdrFlags : Elf64Xword {
        const WRITE            = 0x001;
        const ALLOC            = 0x002;
        const EXECINSTR        = 0x004;
        const MERGE            = 0x010;
        const STRINGS          = 0x020;
        const INFO_LINK        = 0x040;
        const LINK_ORDER       = 0x080;
        const OS_NONCONFORMING = 0x100;
        const GROUP            = 0x200;
        const TLS              = 0x400;
        const COMPRESSED       = 0x800;

        const _ = !0;
    }
}

/// An ELF section header, widened to the 64-bit shape
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfShdr {
    /// Offset of the section name in the section name string table
    pub sh_name: Elf64Word,
    pub sh_type: Elf64Word,
    pub sh_flags: ElfShdrFlags,
    pub sh_addr: Elf64Addr,
    pub sh_offset: Elf64Off,
    /// Size of the section
    pub sh_size: Elf64Xword,
    /// Link to another section
    pub sh_link: Elf64Word,
    /// Additional section information
    pub sh_info: Elf64Word,
    /// Address alignment constraint
    pub sh_addralign: Elf64Xword,
    /// Size of each entry
    pub sh_entsize: Elf64Xword,
}

impl ElfShdr {
    /// Represents an undefined section index
    pub const SHN_UNDEF: Elf64Word = 0;
    /// Start of the reserved section index range
    pub const SHN_LORESERVE: Elf64Word = 0xff00;
    /// Represents an absolute section index
    pub const SHN_ABS: Elf64Word = 0xfff1;
    /// Represents a common symbol section index
    pub const SHN_COMMON: Elf64Word = 0xfff2;
    /// Represents an extended section index
    pub const SHN_XINDEX: Elf64Word = 0xffff;

    pub const SHT_NULL: Elf64Word = 0;
    pub const SHT_PROGBITS: Elf64Word = 1;
    pub const SHT_SYMTAB: Elf64Word = 2;
    /// Represents a string table section type
    pub const SHT_STRTAB: Elf64Word = 3;
    /// Relocations with addend
    pub const SHT_RELA: Elf64Word = 4;
    /// Legacy (SysV) symbol hash table
    pub const SHT_HASH: Elf64Word = 5;
    pub const SHT_DYNAMIC: Elf64Word = 6;
    pub const SHT_NOTE: Elf64Word = 7;
    /// Represents a section with no associated data in the ELF file
    pub const SHT_NOBITS: Elf64Word = 8;
    /// Relocations without addend
    pub const SHT_REL: Elf64Word = 9;
    pub const SHT_SHLIB: Elf64Word = 10;
    /// Dynamic linker symbol table
    pub const SHT_DYNSYM: Elf64Word = 11;
    pub const SHT_INIT_ARRAY: Elf64Word = 14;
    pub const SHT_FINI_ARRAY: Elf64Word = 15;
    pub const SHT_PREINIT_ARRAY: Elf64Word = 16;
    pub const SHT_GROUP: Elf64Word = 17;
    pub const SHT_SYMTAB_SHNDX: Elf64Word = 18;
    /// GNU-style symbol hash table
    pub const SHT_GNU_HASH: Elf64Word = 0x6ffffff6;
    pub const SHT_GNU_VERDEF: Elf64Word = 0x6ffffffd;
    pub const SHT_GNU_VERNEED: Elf64Word = 0x6ffffffe;
    pub const SHT_GNU_VERSYM: Elf64Word = 0x6fffffff;

    /// Returns the file range of the ELF section.
    ///
    /// `SHT_NOBITS` sections occupy no space in the file, their range is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidFileRange`] if the range wraps around.
    pub fn file_range(&self) -> Result<ElfFileRange, ElfError> {
        if self.sh_type != Self::SHT_NOBITS {
            ElfFileRange::try_from((self.sh_offset, self.sh_size))
        } else {
            ElfFileRange::try_from((self.sh_offset, 0))
        }
    }

    /// Number of `entsize` sized entries stored in the section.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidFileRange`] if the section does not fit
    /// into the host's address space.
    pub fn entry_count(&self, entsize: usize) -> Result<usize, ElfError> {
        if entsize == 0 {
            return Ok(0);
        }
        Ok(self.file_range()?.len()? / entsize)
    }
}

impl From<Elf32Shdr> for ElfShdr {
    fn from(shdr: Elf32Shdr) -> Self {
        Self {
            sh_name: shdr.sh_name,
            sh_type: shdr.sh_type,
            sh_flags: ElfShdrFlags::from_bits_retain(shdr.sh_flags.into()),
            sh_addr: shdr.sh_addr.into(),
            sh_offset: shdr.sh_offset.into(),
            sh_size: shdr.sh_size.into(),
            sh_link: shdr.sh_link,
            sh_info: shdr.sh_info,
            sh_addralign: shdr.sh_addralign.into(),
            sh_entsize: shdr.sh_entsize.into(),
        }
    }
}

impl From<Elf64Shdr> for ElfShdr {
    fn from(shdr: Elf64Shdr) -> Self {
        Self {
            sh_name: shdr.sh_name,
            sh_type: shdr.sh_type,
            sh_flags: ElfShdrFlags::from_bits_retain(shdr.sh_flags),
            sh_addr: shdr.sh_addr,
            sh_offset: shdr.sh_offset,
            sh_size: shdr.sh_size,
            sh_link: shdr.sh_link,
            sh_info: shdr.sh_info,
            sh_addralign: shdr.sh_addralign,
            sh_entsize: shdr.sh_entsize,
        }
    }
}

impl Widen for ElfShdr {
    type Narrow = Elf32Shdr;
    type Wide = Elf64Shdr;
}

/// A section header paired with its name resolved through the section
/// name string table.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    index: usize,
    shdr: &'a ElfShdr,
    name: Option<&'a ffi::CStr>,
}

impl<'a> Section<'a> {
    /// Index of the section in the section header table
    pub fn index(&self) -> usize {
        self.index
    }

    /// The underlying section header
    pub fn header(&self) -> &'a ElfShdr {
        self.shdr
    }

    /// The section name, [`None`] if the file has no section name string
    /// table.
    pub fn name(&self) -> Option<&'a ffi::CStr> {
        self.name
    }

    /// Checks whether the section is called exactly `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.name
            .is_some_and(|section_name| section_name.to_bytes() == name.as_bytes())
    }
}

impl Deref for Section<'_> {
    type Target = ElfShdr;

    fn deref(&self) -> &ElfShdr {
        self.shdr
    }
}

/// Iterator over the sections of an ELF file, resolving each name on the
/// way.
#[derive(Debug, Clone)]
pub struct SectionIter<'a> {
    /// The section header table being iterated
    shdrs: &'a [ElfShdr],
    /// Section name string table, if any
    shstrtab: Option<&'a ElfStrtab>,
    /// Next index to be retrieved
    next: usize,
}

impl<'a> SectionIter<'a> {
    /// Creates a new [`SectionIter`] over `shdrs`, resolving names through
    /// `shstrtab`.
    pub fn new(shdrs: &'a [ElfShdr], shstrtab: Option<&'a ElfStrtab>) -> Self {
        Self {
            shdrs,
            shstrtab,
            next: 0,
        }
    }

    /// Returns the section at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Section<'a>> {
        let shdr = self.shdrs.get(index)?;
        let name = self
            .shstrtab
            .and_then(|shstrtab| shstrtab.get_str(shdr.sh_name).ok());
        Some(Section { index, shdr, name })
    }

    /// Finds the first section called exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Option<Section<'a>> {
        self.clone().find(|section| section.has_name(name))
    }
}

impl<'a> Iterator for SectionIter<'a> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Section<'a>> {
        let section = self.get(self.next)?;
        self.next += 1;
        Some(section)
    }
}
