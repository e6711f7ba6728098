// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::reader::RawReader;
use super::types::*;
use super::{ElfClass, ElfError, Section, SectionIter, Widen};

use std::io::{Read, Seek};

/// Addresses of the functions to run when an object is loaded
/// (initializers) and unloaded (finalizers), in the order they're run.
///
/// The addresses are taken as found in the file, i.e. relative to the
/// object being loaded at its base address.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitFini {
    initializers: Vec<Elf64Addr>,
    finalizers: Vec<Elf64Addr>,
}

impl InitFini {
    pub const PREINIT_ARRAY: &'static str = ".preinit_array";
    pub const INIT: &'static str = ".init";
    pub const INIT_ARRAY: &'static str = ".init_array";
    pub const FINI_ARRAY: &'static str = ".fini_array";
    pub const FINI: &'static str = ".fini";

    /// Puts the parts into execution order.
    ///
    /// Initializers run as `preinit_array`, `init`, `init_array`, each
    /// array front to back. Finalizers run as `fini_array` back to front,
    /// then `fini`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use elf_reader::InitFini;
    ///
    /// let init_fini = InitFini::assemble(&[0xa], Some(0xb), &[0xc, 0xd], &[0x1, 0x2], Some(0x3));
    /// assert_eq!(init_fini.initializers(), &[0xa, 0xb, 0xc, 0xd]);
    /// assert_eq!(init_fini.finalizers(), &[0x2, 0x1, 0x3]);
    /// ```
    pub fn assemble(
        preinit_array: &[Elf64Addr],
        init: Option<Elf64Addr>,
        init_array: &[Elf64Addr],
        fini_array: &[Elf64Addr],
        fini: Option<Elf64Addr>,
    ) -> Self {
        let initializers = preinit_array
            .iter()
            .copied()
            .chain(init)
            .chain(init_array.iter().copied())
            .collect();
        let finalizers = fini_array.iter().rev().copied().chain(fini).collect();
        Self {
            initializers,
            finalizers,
        }
    }

    /// Collects the lifecycle functions from the sections in `sections`,
    /// found by name. Any of them may be missing.
    ///
    /// # Errors
    ///
    /// Returns any error from reading the arrays.
    pub fn read<R: Read + Seek>(
        reader: &mut RawReader<R>,
        class: ElfClass,
        sections: SectionIter<'_>,
    ) -> Result<Self, ElfError> {
        let read_array = |reader: &mut RawReader<R>, name| match sections.find_by_name(name) {
            Some(section) => read_addresses(reader, class, &section),
            None => Ok(Vec::new()),
        };
        let preinit_array = read_array(reader, Self::PREINIT_ARRAY)?;
        let init_array = read_array(reader, Self::INIT_ARRAY)?;
        let fini_array = read_array(reader, Self::FINI_ARRAY)?;

        let init = sections.find_by_name(Self::INIT).map(|section| section.sh_addr);
        let fini = sections.find_by_name(Self::FINI).map(|section| section.sh_addr);

        let init_fini = Self::assemble(&preinit_array, init, &init_array, &fini_array, fini);
        log::debug!(
            "{} initializers, {} finalizers",
            init_fini.initializers.len(),
            init_fini.finalizers.len()
        );
        Ok(init_fini)
    }

    pub fn initializers(&self) -> &[Elf64Addr] {
        &self.initializers
    }

    pub fn finalizers(&self) -> &[Elf64Addr] {
        &self.finalizers
    }
}

fn read_addresses<R: Read + Seek>(
    reader: &mut RawReader<R>,
    class: ElfClass,
    section: &Section<'_>,
) -> Result<Vec<Elf64Addr>, ElfError> {
    let count = section.entry_count(Elf64Addr::entry_size(class))?;
    reader.read_table(class, section.sh_offset, count)
}
