// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::layout::{Elf32Rel, Elf32Rela, Elf64Rel, Elf64Rela, Widen};
use super::reader::RawReader;
use super::types::*;
use super::{ElfClass, ElfError, ElfShdr, Section, SectionIter};

use std::io::{Read, Seek};

/// Splits an ELFCLASS32 `r_info` into relocation type and symbol index.
fn split_info32(r_info: Elf32Word) -> (Elf64Word, Elf64Word) {
    (r_info & 0xff, r_info >> 8)
}

/// Splits an ELFCLASS64 `r_info` into relocation type and symbol index.
fn split_info64(r_info: Elf64Xword) -> (Elf64Word, Elf64Word) {
    let r_type = (r_info & 0xffff_ffff) as Elf64Word;
    let r_sym = (r_info >> 32) as Elf64Word;
    (r_type, r_sym)
}

/// Represents a relocation entry without addend ([`ElfRel`])
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfRel {
    /// Location the relocation should be applied at
    pub r_offset: Elf64Addr,
    /// Architecture specific relocation type
    pub r_type: Elf64Word,
    /// Index of the referenced symbol
    pub r_sym: Elf64Word,
}

impl From<Elf32Rel> for ElfRel {
    fn from(rel: Elf32Rel) -> Self {
        let (r_type, r_sym) = split_info32(rel.r_info);
        Self {
            r_offset: rel.r_offset.into(),
            r_type,
            r_sym,
        }
    }
}

impl From<Elf64Rel> for ElfRel {
    fn from(rel: Elf64Rel) -> Self {
        let (r_type, r_sym) = split_info64(rel.r_info);
        Self {
            r_offset: rel.r_offset,
            r_type,
            r_sym,
        }
    }
}

impl Widen for ElfRel {
    type Narrow = Elf32Rel;
    type Wide = Elf64Rel;
}

/// Represents a relocation entry with addend ([`ElfRela`])
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElfRela {
    /// Location the relocation should be applied at
    pub r_offset: Elf64Addr,
    /// Architecture specific relocation type
    pub r_type: Elf64Word,
    /// Index of the referenced symbol
    pub r_sym: Elf64Word,
    /// The value to add to the target symbol's value during relocation
    pub r_addend: Elf64Sxword,
}

impl From<Elf32Rela> for ElfRela {
    fn from(rela: Elf32Rela) -> Self {
        let (r_type, r_sym) = split_info32(rela.r_info);
        Self {
            r_offset: rela.r_offset.into(),
            r_type,
            r_sym,
            r_addend: rela.r_addend.into(),
        }
    }
}

impl From<Elf64Rela> for ElfRela {
    fn from(rela: Elf64Rela) -> Self {
        let (r_type, r_sym) = split_info64(rela.r_info);
        Self {
            r_offset: rela.r_offset,
            r_type,
            r_sym,
            r_addend: rela.r_addend,
        }
    }
}

impl Widen for ElfRela {
    type Narrow = Elf32Rela;
    type Wide = Elf64Rela;
}

/// The relocation entries of an ELF file, grouped by whether they belong
/// to the PLT and whether they carry an addend.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Relocations {
    rel: Vec<ElfRel>,
    rela: Vec<ElfRela>,
    plt_rel: Vec<ElfRel>,
    plt_rela: Vec<ElfRela>,
}

impl Relocations {
    /// Section names holding PLT relocations
    pub const PLT_SECTIONS: [&'static str; 2] = [".rel.plt", ".rela.plt"];
    /// Section names holding all other dynamic relocations
    pub const DYN_SECTIONS: [&'static str; 2] = [".rel.dyn", ".rela.dyn"];

    /// Reads all `SHT_REL` and `SHT_RELA` sections in `sections`.
    ///
    /// # Errors
    ///
    /// - [`ElfError::InvalidRelocationEntrySize`]: a section's `sh_entsize`
    ///   doesn't match the entry size for `class`.
    /// - [`ElfError::UnrecognizedRelocationSection`]: a relocation section
    ///   has neither a PLT nor a dynamic relocation section name.
    ///
    /// Otherwise any error from reading the file.
    pub fn read<R: Read + Seek>(
        reader: &mut RawReader<R>,
        class: ElfClass,
        sections: SectionIter<'_>,
    ) -> Result<Self, ElfError> {
        let mut relocations = Self::default();

        for section in sections {
            match section.sh_type {
                ElfShdr::SHT_REL => {
                    let entries: Vec<ElfRel> = read_entries(reader, class, &section)?;
                    if is_plt(&section)? {
                        relocations.plt_rel.extend(entries);
                    } else {
                        relocations.rel.extend(entries);
                    }
                }
                ElfShdr::SHT_RELA => {
                    let entries: Vec<ElfRela> = read_entries(reader, class, &section)?;
                    if is_plt(&section)? {
                        relocations.plt_rela.extend(entries);
                    } else {
                        relocations.rela.extend(entries);
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "relocations: {} rel, {} rela, {} plt rel, {} plt rela",
            relocations.rel.len(),
            relocations.rela.len(),
            relocations.plt_rel.len(),
            relocations.plt_rela.len()
        );
        Ok(relocations)
    }

    /// Non-PLT relocations without addend
    pub fn rel(&self) -> &[ElfRel] {
        &self.rel
    }

    /// Non-PLT relocations with addend
    pub fn rela(&self) -> &[ElfRela] {
        &self.rela
    }

    /// PLT relocations without addend
    pub fn plt_rel(&self) -> &[ElfRel] {
        &self.plt_rel
    }

    /// PLT relocations with addend
    pub fn plt_rela(&self) -> &[ElfRela] {
        &self.plt_rela
    }
}

/// Classifies a relocation section by its name.
fn is_plt(section: &Section<'_>) -> Result<bool, ElfError> {
    if Relocations::PLT_SECTIONS
        .iter()
        .any(|name| section.has_name(name))
    {
        Ok(true)
    } else if Relocations::DYN_SECTIONS
        .iter()
        .any(|name| section.has_name(name))
    {
        Ok(false)
    } else {
        log::warn!(
            "unrecognized relocation section {:?}",
            section.name().unwrap_or_default()
        );
        Err(ElfError::UnrecognizedRelocationSection)
    }
}

fn read_entries<T: Widen, R: Read + Seek>(
    reader: &mut RawReader<R>,
    class: ElfClass,
    section: &Section<'_>,
) -> Result<Vec<T>, ElfError> {
    let entsize = T::entry_size(class);
    if usize::try_from(section.sh_entsize).ok() != Some(entsize) {
        return Err(ElfError::InvalidRelocationEntrySize);
    }
    let count = section.entry_count(entsize)?;
    reader.read_table(class, section.sh_offset, count)
}
