// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Ehdr, Elf64Ehdr, Widen};
use super::types::*;
use super::ElfError;
use core::mem;

/// Record width of an ELF file (`EI_CLASS`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// 32-bit objects (`ELFCLASS32`)
    Elf32,
    /// 64-bit objects (`ELFCLASS64`)
    #[default]
    Elf64,
}

/// Data encoding of an ELF file (`EI_DATA`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    /// Two's complement, little endian (`ELFDATA2LSB`)
    #[default]
    Lsb,
    /// Two's complement, big endian (`ELFDATA2MSB`)
    Msb,
}

/// The identification block found at the very beginning of an ELF file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfIdent {
    /// Record width of the file
    pub class: ElfClass,
    /// Byte order of the file
    pub data: ElfData,
    /// Format version (`EI_VERSION`)
    pub version: Elf64char,
    /// OS/ABI tag (`EI_OSABI`)
    pub osabi: Elf64char,
    /// ABI version (`EI_ABIVERSION`)
    pub abiversion: Elf64char,
}

impl ElfIdent {
    /// Size of the identification block
    pub const SIZE: usize = 16;

    const EI_MAG0: usize = 0;
    const EI_CLASS: usize = 4;
    const EI_DATA: usize = 5;
    const EI_VERSION: usize = 6;
    const EI_OSABI: usize = 7;
    const EI_ABIVERSION: usize = 8;

    pub const ELFMAG: [Elf64char; 4] = [0x7f, b'E', b'L', b'F'];

    pub const ELFCLASS32: Elf64char = 1;
    pub const ELFCLASS64: Elf64char = 2;

    pub const ELFDATA2LSB: Elf64char = 1;
    pub const ELFDATA2MSB: Elf64char = 2;

    pub const ELFOSABI_NONE: Elf64char = 0;
    pub const ELFOSABI_GNU: Elf64char = 3;
    pub const ELFOSABI_FREEBSD: Elf64char = 9;
    pub const ELFOSABI_STANDALONE: Elf64char = 255;

    /// Parses and validates an identification block.
    ///
    /// # Errors
    ///
    /// - [`ElfError::TruncatedRead`]: `buf` is shorter than [`ElfIdent::SIZE`].
    /// - [`ElfError::UnrecognizedMagic`]: the magic bytes don't match.
    /// - [`ElfError::UnsupportedClass`]: `EI_CLASS` is neither 32 nor 64 bit.
    /// - [`ElfError::UnsupportedEndianess`]: `EI_DATA` is neither LSB nor MSB.
    pub fn parse(buf: &[u8]) -> Result<Self, ElfError> {
        if buf.len() < Self::SIZE {
            return Err(ElfError::TruncatedRead);
        }
        if buf[Self::EI_MAG0..(Self::EI_MAG0 + mem::size_of_val(&Self::ELFMAG))] != Self::ELFMAG {
            return Err(ElfError::UnrecognizedMagic);
        }

        let class = match buf[Self::EI_CLASS] {
            Self::ELFCLASS32 => ElfClass::Elf32,
            Self::ELFCLASS64 => ElfClass::Elf64,
            _ => return Err(ElfError::UnsupportedClass),
        };
        let data = match buf[Self::EI_DATA] {
            Self::ELFDATA2LSB => ElfData::Lsb,
            Self::ELFDATA2MSB => ElfData::Msb,
            _ => return Err(ElfError::UnsupportedEndianess),
        };

        Ok(Self {
            class,
            data,
            version: buf[Self::EI_VERSION],
            osabi: buf[Self::EI_OSABI],
            abiversion: buf[Self::EI_ABIVERSION],
        })
    }
}

/// Header of an ELF file, widened to the 64-bit shape regardless of the
/// class the file was written in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfHdr {
    /// The type of ELF file
    pub e_type: Elf64Half,
    /// The target architecture of the ELF file
    pub e_machine: Elf64Half,
    /// The version of the ELF file
    pub e_version: Elf64Word,
    /// The virtual address of the program entry point
    pub e_entry: Elf64Addr,
    /// The file offset to the start of the program header table
    pub e_phoff: Elf64Off,
    /// The file offset to the start of the section header table
    pub e_shoff: Elf64Off,
    /// Processor-specific flags associated with the file
    pub e_flags: Elf64Word,
    /// The size of the ELF header
    pub e_ehsize: Elf64Half,
    /// The size of a program header entry
    pub e_phentsize: Elf64Half,
    /// The number of program header entries
    pub e_phnum: Elf64Half,
    /// The size of a section header entry
    pub e_shentsize: Elf64Half,
    /// The number of section header entries (overflowed to a Word-sized entry when needed)
    pub e_shnum: Elf64Word, // The on-disk entry is a Half, on overflow it's read from section
    // table entry zero
    /// The section header table index of the section name string table
    pub e_shstrndx: Elf64Word, // The on-disk entry is a Half, SHN_XINDEX redirects to section
                               // table entry zero
}

impl ElfHdr {
    pub const ET_NONE: Elf64Half = 0;
    pub const ET_REL: Elf64Half = 1;
    pub const ET_EXEC: Elf64Half = 2;
    pub const ET_DYN: Elf64Half = 3;
    pub const ET_CORE: Elf64Half = 4;

    pub const EM_386: Elf64Half = 3;
    pub const EM_ARM: Elf64Half = 40;
    pub const EM_X86_64: Elf64Half = 62;
    pub const EM_AARCH64: Elf64Half = 183;
    pub const EM_RISCV: Elf64Half = 243;

    pub const EV_CURRENT: Elf64Word = 1;
}

impl From<Elf32Ehdr> for ElfHdr {
    fn from(hdr: Elf32Ehdr) -> Self {
        Self {
            e_type: hdr.e_type,
            e_machine: hdr.e_machine,
            e_version: hdr.e_version,
            e_entry: hdr.e_entry.into(),
            e_phoff: hdr.e_phoff.into(),
            e_shoff: hdr.e_shoff.into(),
            e_flags: hdr.e_flags,
            e_ehsize: hdr.e_ehsize,
            e_phentsize: hdr.e_phentsize,
            e_phnum: hdr.e_phnum,
            e_shentsize: hdr.e_shentsize,
            e_shnum: hdr.e_shnum.into(),
            e_shstrndx: hdr.e_shstrndx.into(),
        }
    }
}

impl From<Elf64Ehdr> for ElfHdr {
    fn from(hdr: Elf64Ehdr) -> Self {
        Self {
            e_type: hdr.e_type,
            e_machine: hdr.e_machine,
            e_version: hdr.e_version,
            e_entry: hdr.e_entry,
            e_phoff: hdr.e_phoff,
            e_shoff: hdr.e_shoff,
            e_flags: hdr.e_flags,
            e_ehsize: hdr.e_ehsize,
            e_phentsize: hdr.e_phentsize,
            e_phnum: hdr.e_phnum,
            e_shentsize: hdr.e_shentsize,
            e_shnum: hdr.e_shnum.into(),
            e_shstrndx: hdr.e_shstrndx.into(),
        }
    }
}

impl Widen for ElfHdr {
    type Narrow = Elf32Ehdr;
    type Wide = Elf64Ehdr;
}
