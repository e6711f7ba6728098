// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

//! On-disk record layouts for both ELF classes.
//!
//! The records are plain `#[repr(C)]` images of the structures found in the
//! file and are decoded in host byte order. Every unified type exposed by
//! this crate names its 32-bit and 64-bit record through [`Widen`], so the
//! class-specific layouts never show up in the rest of the API.

use super::types::*;
use super::{ElfClass, ElfError};
use core::mem;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// A unified type decoded from one of two class-specific on-disk records.
///
/// The records themselves are internal to the crate:
///
/// ```compile_fail
/// use elf_reader::layout::Elf64Sym;
/// ```
pub trait Widen: Sized {
    /// The ELFCLASS32 record.
    type Narrow: FromBytes + Into<Self>;
    /// The ELFCLASS64 record.
    type Wide: FromBytes + Into<Self>;

    /// Size of one on-disk record for `class`.
    fn entry_size(class: ElfClass) -> usize {
        match class {
            ElfClass::Elf32 => mem::size_of::<Self::Narrow>(),
            ElfClass::Elf64 => mem::size_of::<Self::Wide>(),
        }
    }

    /// Decodes one record of `class` from `buf` and widens it.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::TruncatedRead`] if `buf` does not hold exactly
    /// one record.
    fn decode(class: ElfClass, buf: &[u8]) -> Result<Self, ElfError> {
        match class {
            ElfClass::Elf32 => Self::Narrow::read_from_bytes(buf)
                .map(Into::into)
                .map_err(|_| ElfError::TruncatedRead),
            ElfClass::Elf64 => Self::Wide::read_from_bytes(buf)
                .map(Into::into)
                .map_err(|_| ElfError::TruncatedRead),
        }
    }
}

/// Address-sized words, e.g. `.init_array` entries or GNU hash bloom words.
impl Widen for u64 {
    type Narrow = u32;
    type Wide = u64;
}

/// Words that are 32 bits wide in both classes, e.g. hash buckets.
impl Widen for u32 {
    type Narrow = u32;
    type Wide = u32;
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Ehdr {
    pub e_ident: [Elf64char; 16],
    pub e_type: Elf32Half,
    pub e_machine: Elf32Half,
    pub e_version: Elf32Word,
    pub e_entry: Elf32Addr,
    pub e_phoff: Elf32Off,
    pub e_shoff: Elf32Off,
    pub e_flags: Elf32Word,
    pub e_ehsize: Elf32Half,
    pub e_phentsize: Elf32Half,
    pub e_phnum: Elf32Half,
    pub e_shentsize: Elf32Half,
    pub e_shnum: Elf32Half,
    pub e_shstrndx: Elf32Half,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Ehdr {
    pub e_ident: [Elf64char; 16],
    pub e_type: Elf64Half,
    pub e_machine: Elf64Half,
    pub e_version: Elf64Word,
    pub e_entry: Elf64Addr,
    pub e_phoff: Elf64Off,
    pub e_shoff: Elf64Off,
    pub e_flags: Elf64Word,
    pub e_ehsize: Elf64Half,
    pub e_phentsize: Elf64Half,
    pub e_phnum: Elf64Half,
    pub e_shentsize: Elf64Half,
    pub e_shnum: Elf64Half,
    pub e_shstrndx: Elf64Half,
}

/// Note the different placement of `p_flags` compared to [`Elf64Phdr`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Phdr {
    pub p_type: Elf32Word,
    pub p_offset: Elf32Off,
    pub p_vaddr: Elf32Addr,
    pub p_paddr: Elf32Addr,
    pub p_filesz: Elf32Word,
    pub p_memsz: Elf32Word,
    pub p_flags: Elf32Word,
    pub p_align: Elf32Word,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Phdr {
    pub p_type: Elf64Word,
    pub p_flags: Elf64Word,
    pub p_offset: Elf64Off,
    pub p_vaddr: Elf64Addr,
    pub p_paddr: Elf64Addr,
    pub p_filesz: Elf64Xword,
    pub p_memsz: Elf64Xword,
    pub p_align: Elf64Xword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Shdr {
    pub sh_name: Elf32Word,
    pub sh_type: Elf32Word,
    pub sh_flags: Elf32Word,
    pub sh_addr: Elf32Addr,
    pub sh_offset: Elf32Off,
    pub sh_size: Elf32Word,
    pub sh_link: Elf32Word,
    pub sh_info: Elf32Word,
    pub sh_addralign: Elf32Word,
    pub sh_entsize: Elf32Word,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Shdr {
    pub sh_name: Elf64Word,
    pub sh_type: Elf64Word,
    pub sh_flags: Elf64Xword,
    pub sh_addr: Elf64Addr,
    pub sh_offset: Elf64Off,
    pub sh_size: Elf64Xword,
    pub sh_link: Elf64Word,
    pub sh_info: Elf64Word,
    pub sh_addralign: Elf64Xword,
    pub sh_entsize: Elf64Xword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Sym {
    pub st_name: Elf32Word,
    pub st_value: Elf32Addr,
    pub st_size: Elf32Word,
    pub st_info: Elf64char,
    pub st_other: Elf64char,
    pub st_shndx: Elf32Half,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Sym {
    pub st_name: Elf64Word,
    pub st_info: Elf64char,
    pub st_other: Elf64char,
    pub st_shndx: Elf64Half,
    pub st_value: Elf64Addr,
    pub st_size: Elf64Xword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Dyn {
    pub d_tag: Elf32Sword,
    pub d_un: Elf32Word,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Dyn {
    pub d_tag: Elf64Sxword,
    pub d_un: Elf64Xword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Rel {
    pub r_offset: Elf32Addr,
    pub r_info: Elf32Word,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Rel {
    pub r_offset: Elf64Addr,
    pub r_info: Elf64Xword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf32Rela {
    pub r_offset: Elf32Addr,
    pub r_info: Elf32Word,
    pub r_addend: Elf32Sword,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Elf64Rela {
    pub r_offset: Elf64Addr,
    pub r_info: Elf64Xword,
    pub r_addend: Elf64Sxword,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(mem::size_of::<Elf32Ehdr>(), 52);
        assert_eq!(mem::size_of::<Elf64Ehdr>(), 64);
        assert_eq!(mem::size_of::<Elf32Phdr>(), 32);
        assert_eq!(mem::size_of::<Elf64Phdr>(), 56);
        assert_eq!(mem::size_of::<Elf32Shdr>(), 40);
        assert_eq!(mem::size_of::<Elf64Shdr>(), 64);
        assert_eq!(mem::size_of::<Elf32Sym>(), 16);
        assert_eq!(mem::size_of::<Elf64Sym>(), 24);
        assert_eq!(mem::size_of::<Elf32Dyn>(), 8);
        assert_eq!(mem::size_of::<Elf64Dyn>(), 16);
        assert_eq!(mem::size_of::<Elf32Rel>(), 8);
        assert_eq!(mem::size_of::<Elf64Rel>(), 16);
        assert_eq!(mem::size_of::<Elf32Rela>(), 12);
        assert_eq!(mem::size_of::<Elf64Rela>(), 24);
    }

    #[test]
    fn test_word_widening() {
        assert_eq!(u64::entry_size(ElfClass::Elf32), 4);
        assert_eq!(u64::entry_size(ElfClass::Elf64), 8);
        assert_eq!(u32::entry_size(ElfClass::Elf64), 4);

        let narrow = 0x1234_5678u32;
        let wide = 0x1234_5678u64;
        assert_eq!(
            u64::decode(ElfClass::Elf32, narrow.as_bytes()),
            u64::decode(ElfClass::Elf64, wide.as_bytes())
        );
        assert_eq!(
            u64::decode(ElfClass::Elf64, narrow.as_bytes()),
            Err(ElfError::TruncatedRead)
        );
    }
}
