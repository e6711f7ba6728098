// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Dyn, Elf64Dyn, Widen};
use super::types::*;
use super::ElfError;

/// One entry of the dynamic segment, widened to the 64-bit shape.
///
/// Whether `d_un` holds an integer (`d_val`) or an address (`d_ptr`)
/// depends on the tag.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct ElfDyn {
    pub d_tag: Elf64Sxword,
    pub d_un: Elf64Xword,
}

impl ElfDyn {
    /// Marks the end of the dynamic array
    pub const DT_NULL: Elf64Sxword = 0;
    /// String table offset of a needed library name
    pub const DT_NEEDED: Elf64Sxword = 1;
    pub const DT_PLTRELSZ: Elf64Sxword = 2;
    pub const DT_PLTGOT: Elf64Sxword = 3;
    /// Address of the SysV hash table
    pub const DT_HASH: Elf64Sxword = 4;
    /// Address of the dynamic string table
    pub const DT_STRTAB: Elf64Sxword = 5;
    /// Address of the dynamic symbol table
    pub const DT_SYMTAB: Elf64Sxword = 6;
    pub const DT_RELA: Elf64Sxword = 7;
    pub const DT_RELASZ: Elf64Sxword = 8;
    pub const DT_RELAENT: Elf64Sxword = 9;
    /// Size of the dynamic string table
    pub const DT_STRSZ: Elf64Sxword = 10;
    /// Size of one dynamic symbol table entry
    pub const DT_SYMENT: Elf64Sxword = 11;
    pub const DT_INIT: Elf64Sxword = 12;
    pub const DT_FINI: Elf64Sxword = 13;
    /// String table offset of the shared object's name
    pub const DT_SONAME: Elf64Sxword = 14;
    pub const DT_RPATH: Elf64Sxword = 15;
    pub const DT_SYMBOLIC: Elf64Sxword = 16;
    pub const DT_REL: Elf64Sxword = 17;
    pub const DT_RELSZ: Elf64Sxword = 18;
    pub const DT_RELENT: Elf64Sxword = 19;
    pub const DT_PLTREL: Elf64Sxword = 20;
    pub const DT_DEBUG: Elf64Sxword = 21;
    pub const DT_TEXTREL: Elf64Sxword = 22;
    pub const DT_JMPREL: Elf64Sxword = 23;
    pub const DT_BIND_NOW: Elf64Sxword = 24;
    pub const DT_INIT_ARRAY: Elf64Sxword = 25;
    pub const DT_FINI_ARRAY: Elf64Sxword = 26;
    pub const DT_INIT_ARRAYSZ: Elf64Sxword = 27;
    pub const DT_FINI_ARRAYSZ: Elf64Sxword = 28;
    pub const DT_RUNPATH: Elf64Sxword = 29;
    pub const DT_FLAGS: Elf64Sxword = 30;
    pub const DT_PREINIT_ARRAY: Elf64Sxword = 32;
    pub const DT_PREINIT_ARRAYSZ: Elf64Sxword = 33;
    pub const DT_SYMTAB_SHNDX: Elf64Sxword = 34;
    pub const DT_LOOS: Elf64Sxword = 0x6000000d;
    pub const DT_HIOS: Elf64Sxword = 0x6ffff000;
    pub const DT_GNU_HASH: Elf64Sxword = 0x6ffffef5;
    pub const DT_VERSYM: Elf64Sxword = 0x6ffffff0;
    pub const DT_RELACOUNT: Elf64Sxword = 0x6ffffff9;
    pub const DT_RELCOUNT: Elf64Sxword = 0x6ffffffa;
    pub const DT_FLAGS_1: Elf64Sxword = 0x6ffffffb;
    pub const DT_VERDEF: Elf64Sxword = 0x6ffffffc;
    pub const DT_VERDEFNUM: Elf64Sxword = 0x6ffffffd;
    pub const DT_VERNEED: Elf64Sxword = 0x6ffffffe;
    pub const DT_VERNEEDNUM: Elf64Sxword = 0x6fffffff;
    pub const DT_LOPROC: Elf64Sxword = 0x70000000;
    pub const DT_HIPROC: Elf64Sxword = 0x7fffffff;

    /// The entry's value interpreted as an integer
    pub fn d_val(&self) -> Elf64Xword {
        self.d_un
    }

    /// The entry's value interpreted as a virtual address
    pub fn d_ptr(&self) -> Elf64Addr {
        self.d_un
    }
}

impl From<Elf32Dyn> for ElfDyn {
    fn from(dyn_entry: Elf32Dyn) -> Self {
        Self {
            d_tag: dyn_entry.d_tag.into(),
            d_un: dyn_entry.d_un.into(),
        }
    }
}

impl From<Elf64Dyn> for ElfDyn {
    fn from(dyn_entry: Elf64Dyn) -> Self {
        Self {
            d_tag: dyn_entry.d_tag,
            d_un: dyn_entry.d_un,
        }
    }
}

impl Widen for ElfDyn {
    type Narrow = Elf32Dyn;
    type Wide = Elf64Dyn;
}

/// The linking metadata extracted from the dynamic segment.
///
/// Addresses are kept as found in the file, i.e. as virtual addresses;
/// string references are offsets into the dynamic string table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DynamicInfo {
    /// Virtual address of the dynamic string table (DT_STRTAB)
    pub strtab: Elf64Addr,
    /// Size of the dynamic string table (DT_STRSZ)
    pub strsz: Elf64Xword,
    /// Virtual address of the dynamic symbol table (DT_SYMTAB)
    pub symtab: Elf64Addr,
    /// Size of each symbol table entry (DT_SYMENT)
    pub syment: Elf64Xword,
    /// Name of the shared object (DT_SONAME)
    pub soname: Option<Elf64Word>,
    /// Names of the needed libraries in file order (DT_NEEDED)
    pub needed: Vec<Elf64Word>,
}

impl DynamicInfo {
    /// Extracts the linking metadata from the dynamic entries.
    ///
    /// Entries past the first `DT_NULL` are ignored. Tags other than the
    /// ones collected here are accepted and left alone.
    ///
    /// # Errors
    ///
    /// - [`ElfError::DynamicFieldConflict`]: a single valued tag shows up
    ///   more than once.
    /// - [`ElfError::MissingDynamicStrtab`]: `DT_STRTAB` or `DT_STRSZ` is
    ///   missing or zero.
    /// - [`ElfError::MissingDynamicSymtab`]: `DT_SYMTAB` or `DT_SYMENT` is
    ///   missing.
    /// - [`ElfError::InvalidStrtabString`]: a string reference doesn't fit
    ///   a string table offset.
    pub fn from_entries(entries: &[ElfDyn]) -> Result<Self, ElfError> {
        let mut strtab: Option<Elf64Xword> = None;
        let mut strsz: Option<Elf64Xword> = None;
        let mut symtab: Option<Elf64Xword> = None;
        let mut syment: Option<Elf64Xword> = None;
        let mut soname: Option<Elf64Xword> = None;

        let mut fields = [
            (ElfDyn::DT_STRTAB, &mut strtab),
            (ElfDyn::DT_STRSZ, &mut strsz),
            (ElfDyn::DT_SYMTAB, &mut symtab),
            (ElfDyn::DT_SYMENT, &mut syment),
            (ElfDyn::DT_SONAME, &mut soname),
        ];
        let mut needed = Vec::new();

        for entry in entries {
            if entry.d_tag == ElfDyn::DT_NULL {
                break;
            }

            if entry.d_tag == ElfDyn::DT_NEEDED {
                needed.push(strtab_offset(entry.d_val())?);
            } else if let Some(field) = fields.iter_mut().find(|f| f.0 == entry.d_tag) {
                if field.1.is_some() {
                    return Err(ElfError::DynamicFieldConflict);
                }
                *field.1 = Some(entry.d_val());
            }
        }

        let strtab = strtab
            .filter(|strtab| *strtab != 0)
            .ok_or(ElfError::MissingDynamicStrtab)?;
        let strsz = strsz
            .filter(|strsz| *strsz != 0)
            .ok_or(ElfError::MissingDynamicStrtab)?;
        let symtab = symtab.ok_or(ElfError::MissingDynamicSymtab)?;
        let syment = syment.ok_or(ElfError::MissingDynamicSymtab)?;
        let soname = soname.map(strtab_offset).transpose()?;

        Ok(Self {
            strtab,
            strsz,
            symtab,
            syment,
            soname,
            needed,
        })
    }
}

fn strtab_offset(d_val: Elf64Xword) -> Result<Elf64Word, ElfError> {
    Elf64Word::try_from(d_val).map_err(|_| ElfError::InvalidStrtabString)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(d_tag: Elf64Sxword, d_un: Elf64Xword) -> ElfDyn {
        ElfDyn { d_tag, d_un }
    }

    #[test]
    fn test_dyn_widening() {
        // Tags are signed, values are not.
        let narrow = Elf32Dyn {
            d_tag: -2,
            d_un: 0x8000_0000,
        };
        let dyn_entry = ElfDyn::from(narrow);
        assert_eq!(dyn_entry.d_tag, -2);
        assert_eq!(dyn_entry.d_ptr(), 0x8000_0000);

        let narrow = Elf32Dyn {
            d_tag: ElfDyn::DT_GNU_HASH as Elf32Sword,
            d_un: 0x1f0,
        };
        let wide = Elf64Dyn {
            d_tag: ElfDyn::DT_GNU_HASH,
            d_un: 0x1f0,
        };
        assert_eq!(ElfDyn::from(narrow), ElfDyn::from(wide));
    }

    #[test]
    fn test_dynamic_info() {
        let entries = [
            entry(ElfDyn::DT_NEEDED, 1),
            entry(ElfDyn::DT_SONAME, 11),
            entry(ElfDyn::DT_NEEDED, 22),
            entry(ElfDyn::DT_STRTAB, 0x400),
            entry(ElfDyn::DT_STRSZ, 0x40),
            entry(ElfDyn::DT_SYMTAB, 0x300),
            entry(ElfDyn::DT_SYMENT, 24),
            entry(ElfDyn::DT_FLAGS_1, 0x08000000),
            entry(ElfDyn::DT_NEEDED, 1),
            entry(ElfDyn::DT_NULL, 0),
            // Past the terminator.
            entry(ElfDyn::DT_NEEDED, 33),
        ];
        let info = DynamicInfo::from_entries(&entries).unwrap();
        assert_eq!(info.strtab, 0x400);
        assert_eq!(info.strsz, 0x40);
        assert_eq!(info.symtab, 0x300);
        assert_eq!(info.syment, 24);
        assert_eq!(info.soname, Some(11));
        // Order and duplicates preserved.
        assert_eq!(info.needed, vec![1, 22, 1]);
    }

    #[test]
    fn test_dynamic_info_errors() {
        let complete = [
            entry(ElfDyn::DT_STRTAB, 0x400),
            entry(ElfDyn::DT_STRSZ, 0x40),
            entry(ElfDyn::DT_SYMTAB, 0x300),
            entry(ElfDyn::DT_SYMENT, 24),
        ];

        assert_eq!(
            DynamicInfo::from_entries(&complete[1..]),
            Err(ElfError::MissingDynamicStrtab)
        );
        assert_eq!(
            DynamicInfo::from_entries(&complete[..2]),
            Err(ElfError::MissingDynamicSymtab)
        );

        let mut zero_strsz = complete;
        zero_strsz[1].d_un = 0;
        assert_eq!(
            DynamicInfo::from_entries(&zero_strsz),
            Err(ElfError::MissingDynamicStrtab)
        );

        let mut duplicate = complete.to_vec();
        duplicate.push(entry(ElfDyn::DT_SYMTAB, 0x500));
        assert_eq!(
            DynamicInfo::from_entries(&duplicate),
            Err(ElfError::DynamicFieldConflict)
        );

        let mut huge_soname = complete.to_vec();
        huge_soname.push(entry(ElfDyn::DT_SONAME, 1 << 32));
        assert_eq!(
            DynamicInfo::from_entries(&huge_soname),
            Err(ElfError::InvalidStrtabString)
        );
    }
}
