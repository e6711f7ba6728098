// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Phdr, Elf64Phdr, Widen};
use super::types::*;
use super::ElfAddrRange;
use super::ElfError;
use bitflags::bitflags;

bitflags! {
/// Attributes of an ELF program header, to specify whether
/// the segment is readable, writable, and/or executable
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ElfPhdrFlags : Elf64Word {
        const EXECUTE = 0x01;
        const WRITE   = 0x02;
        const READ    = 0x04;

        // OS and processor specific bits are kept as-is.
        const _ = !0;
    }
}

/// Program header entry (segment descriptor) of an ELF file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfPhdr {
    /// Type of the program header entry
    pub p_type: Elf64Word,
    /// Flags specifying the attributes of the segment
    pub p_flags: ElfPhdrFlags,
    /// Offset in the ELF file where the segment data begins
    pub p_offset: Elf64Off,
    /// Virtual address at which the segment should be loaded into memory
    pub p_vaddr: Elf64Addr,
    /// Physical address at which the segment should be loaded (for systems with separate physical memory)
    pub p_paddr: Elf64Addr,
    /// Size of the segment in the ELF file (may be smaller than `p_memsz`)
    pub p_filesz: Elf64Xword,
    /// Size of the segment in memory (may include additional padding)
    pub p_memsz: Elf64Xword,
    /// Alignment of the segment in memory and in the file
    pub p_align: Elf64Xword,
}

impl ElfPhdr {
    /// Represents a null program header type
    pub const PT_NULL: Elf64Word = 0;
    /// Represents a loadable segment program header type
    pub const PT_LOAD: Elf64Word = 1;
    /// Represents a dynamic segment program header type
    pub const PT_DYNAMIC: Elf64Word = 2;
    /// Represents a interpreter program header type
    pub const PT_INTERP: Elf64Word = 3;
    /// Represents a Note program header type
    pub const PT_NOTE: Elf64Word = 4;
    /// Represents a Shared Library program header type
    pub const PT_SHLIB: Elf64Word = 5;
    /// Represents the Program Header Table itself
    pub const PT_PHDR: Elf64Word = 6;
    /// Thread-local storage template
    pub const PT_TLS: Elf64Word = 7;
    /// GCC `.eh_frame_hdr` segment
    pub const PT_GNU_EH_FRAME: Elf64Word = 0x6474e550;
    /// Stack executability
    pub const PT_GNU_STACK: Elf64Word = 0x6474e551;
    /// Read-only after relocation
    pub const PT_GNU_RELRO: Elf64Word = 0x6474e552;
    /// GNU property notes
    pub const PT_GNU_PROPERTY: Elf64Word = 0x6474e553;
    /// Processor-specific entries lower bound
    pub const PT_LOPROC: Elf64Word = 0x70000000;
    /// Processor-specific entries upper bound
    pub const PT_HIPROC: Elf64Word = 0x7fffffff;

    /// Returns the virtual address range of the segment as an [`ElfAddrRange`].
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidAddressRange`] if the range wraps around.
    pub fn vaddr_range(&self) -> Result<ElfAddrRange, ElfError> {
        ElfAddrRange::try_from((self.p_vaddr, self.p_memsz))
    }
}

impl From<Elf32Phdr> for ElfPhdr {
    fn from(phdr: Elf32Phdr) -> Self {
        Self {
            p_type: phdr.p_type,
            p_flags: ElfPhdrFlags::from_bits_retain(phdr.p_flags),
            p_offset: phdr.p_offset.into(),
            p_vaddr: phdr.p_vaddr.into(),
            p_paddr: phdr.p_paddr.into(),
            p_filesz: phdr.p_filesz.into(),
            p_memsz: phdr.p_memsz.into(),
            p_align: phdr.p_align.into(),
        }
    }
}

impl From<Elf64Phdr> for ElfPhdr {
    fn from(phdr: Elf64Phdr) -> Self {
        Self {
            p_type: phdr.p_type,
            p_flags: ElfPhdrFlags::from_bits_retain(phdr.p_flags),
            p_offset: phdr.p_offset,
            p_vaddr: phdr.p_vaddr,
            p_paddr: phdr.p_paddr,
            p_filesz: phdr.p_filesz,
            p_memsz: phdr.p_memsz,
            p_align: phdr.p_align,
        }
    }
}

impl Widen for ElfPhdr {
    type Narrow = Elf32Phdr;
    type Wide = Elf64Phdr;
}
