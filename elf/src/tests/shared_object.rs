// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

//! End-to-end decoding of complete shared objects.

use super::image::*;
use crate::{ElfClass, ElfError, ElfFile, ElfHdr, ElfSym};
use std::io::Cursor;

fn open(class: ElfClass, tweaks: &Tweaks) -> ElfFile<Cursor<Vec<u8>>> {
    ElfFile::from_reader(Cursor::new(shared_object(class, tweaks)))
}

fn parsed(class: ElfClass) -> ElfFile<Cursor<Vec<u8>>> {
    let mut elf = open(class, &Tweaks::default());
    assert!(!elf.error(), "{}", elf.error_message());
    assert!(elf.parse_dynamic_segment(), "{}", elf.error_message());
    assert!(!elf.error());
    elf
}

#[test]
fn test_shared_object64() {
    let elf = parsed(ElfClass::Elf64);
    assert!(elf.is_64_bit());
    assert!(!elf.is_32_bit());
    assert_eq!(elf.base_address(), Some(BASE));
    assert_eq!(elf.soname().unwrap().to_bytes(), b"libdemo.so");

    let needed = elf.needed_libraries();
    assert_eq!(needed.len(), 1);
    assert_eq!(needed[0].to_bytes(), b"libc.so.6");

    let sym = elf.get_symbol("demo_fn").unwrap();
    assert_eq!(sym.index(), 1);
    assert_eq!(sym.name().to_bytes(), b"demo_fn");
    assert_eq!(sym.st_value, DEMO_FN);
    assert_eq!(sym.sym_type(), ElfSym::STT_FUNC);
    assert!(sym.is_defined());
    assert!(elf.hash_index().gnu().is_some());
    assert!(elf.hash_index().sysv().is_some());
}

#[test]
fn test_shared_object32() {
    let elf = parsed(ElfClass::Elf32);
    assert!(elf.is_32_bit());
    assert_eq!(elf.header().e_machine, ElfHdr::EM_386);
    assert_eq!(elf.soname().unwrap().to_bytes(), b"libdemo.so");
    assert_eq!(elf.needed_libraries().len(), 1);

    let sym = elf.get_symbol("demo_fn").unwrap();
    assert_eq!(sym.st_value, DEMO_FN);
    assert_eq!(sym.st_size, 16);
}

#[test]
fn test_class_equivalence() {
    let elf32 = parsed(ElfClass::Elf32);
    let elf64 = parsed(ElfClass::Elf64);

    assert_eq!(elf32.soname(), elf64.soname());
    assert_eq!(elf32.needed_libraries(), elf64.needed_libraries());

    let syms32: Vec<_> = elf32.dynamic_symbols().collect();
    let syms64: Vec<_> = elf64.dynamic_symbols().collect();
    assert_eq!(syms32.len(), 3);
    assert_eq!(syms32.len(), syms64.len());
    for (sym32, sym64) in syms32.iter().zip(syms64.iter()) {
        assert_eq!(sym32.name(), sym64.name());
        assert_eq!(sym32.st_value, sym64.st_value);
        assert_eq!(sym32.st_size, sym64.st_size);
        assert_eq!(sym32.st_info, sym64.st_info);
        assert_eq!(sym32.st_other, sym64.st_other);
    }

    // ELFCLASS32 images carry REL, ELFCLASS64 ones RELA.
    let rel = elf32.relocations()[0];
    let rela = elf64.relocations_with_addend()[0];
    assert_eq!(rel.r_offset, rela.r_offset);
    assert_eq!(rel.r_type, rela.r_type);
    assert_eq!(rel.r_sym, rela.r_sym);

    assert_eq!(
        &elf32.initializers()[1..],
        &elf64.initializers()[1..],
        "init_array entries differ"
    );
    assert_eq!(
        &elf32.finalizers()[..2],
        &elf64.finalizers()[..2],
        "fini_array entries differ"
    );
}

#[test]
fn test_missing_symbol() {
    let elf = parsed(ElfClass::Elf64);
    assert!(elf.get_symbol("no_such_symbol").is_none());
    assert!(elf.get_symbol("").is_none());
    assert!(!elf.error());
}

#[test]
fn test_sysv_fallback() {
    for class in [ElfClass::Elf32, ElfClass::Elf64] {
        let tweaks = Tweaks {
            gnu_hash: false,
            ..Default::default()
        };
        let mut elf = open(class, &tweaks);
        assert!(elf.parse_dynamic_segment());
        assert!(elf.hash_index().gnu().is_none());
        assert_eq!(elf.get_symbol("demo_fn").unwrap().index(), 1);
        assert_eq!(elf.get_symbol("other_sym").unwrap().index(), 2);
        assert!(elf.get_symbol("no_such_symbol").is_none());
    }
}

#[test]
fn test_no_hash_table() {
    let tweaks = Tweaks {
        gnu_hash: false,
        sysv_hash: false,
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf64, &tweaks);
    assert!(elf.parse_dynamic_segment());
    assert!(elf.get_symbol("demo_fn").is_none());
    // Still reachable by index.
    assert_eq!(elf.symbol(1).unwrap().name().to_bytes(), b"demo_fn");
}

#[test]
fn test_init_fini() {
    let elf = parsed(ElfClass::Elf64);
    let init = elf.section_by_name(".init").unwrap().sh_addr;
    let fini = elf.section_by_name(".fini").unwrap().sh_addr;

    assert_eq!(
        elf.initializers(),
        &[init, INIT_ARRAY[0], INIT_ARRAY[1]]
    );
    assert_eq!(
        elf.finalizers(),
        &[FINI_ARRAY[1], FINI_ARRAY[0], fini]
    );
}

#[test]
fn test_relocation_groups() {
    let elf = parsed(ElfClass::Elf64);
    assert!(elf.relocations().is_empty());
    assert!(elf.plt_relocations().is_empty());

    let rela = elf.relocations_with_addend();
    assert_eq!(rela.len(), 1);
    assert_eq!(rela[0].r_offset, RELATIVE_TARGET);
    assert_eq!(rela[0].r_type, R_RELATIVE);
    assert_eq!(rela[0].r_sym, 0);

    let plt = elf.plt_relocations_with_addend();
    assert_eq!(plt.len(), 1);
    assert_eq!(plt[0].r_offset, JUMP_SLOT_TARGET);
    assert_eq!(plt[0].r_type, R_JUMP_SLOT);
    assert_eq!(elf.symbol(plt[0].r_sym as usize).unwrap().name().to_bytes(), b"other_sym");

    let elf = parsed(ElfClass::Elf32);
    assert_eq!(elf.relocations().len(), 1);
    assert_eq!(elf.plt_relocations().len(), 1);
    assert!(elf.relocations_with_addend().is_empty());
    assert!(elf.plt_relocations_with_addend().is_empty());
    assert_eq!(elf.plt_relocations()[0].r_sym, 2);
}

#[test]
fn test_symtab_offset_mismatch() {
    let tweaks = Tweaks {
        symtab_skew: 8,
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf64, &tweaks);
    assert!(!elf.parse_dynamic_segment());
    assert!(elf.error());
    assert_eq!(elf.last_error(), Some(ElfError::SymtabOffsetMismatch));
}

#[test]
fn test_unrecognized_relocation_section() {
    let tweaks = Tweaks {
        plt_section_name: Some(".rela.text"),
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf64, &tweaks);
    assert!(!elf.error());
    assert!(!elf.parse_dynamic_segment());
    assert_eq!(
        elf.last_error(),
        Some(ElfError::UnrecognizedRelocationSection)
    );
}

#[test]
fn test_missing_strtab() {
    let tweaks = Tweaks {
        strtab_entry: false,
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf32, &tweaks);
    assert!(!elf.parse_dynamic_segment());
    assert_eq!(elf.last_error(), Some(ElfError::MissingDynamicStrtab));
    assert!(!elf.error_message().is_empty());
}

#[test]
fn test_no_dynamic_segment() {
    let tweaks = Tweaks {
        dynamic: false,
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf64, &tweaks);
    assert!(!elf.parse_dynamic_segment());
    assert!(!elf.error());
    assert!(elf.dynamic_entries().is_empty());
    assert!(elf.soname().is_none());
    assert!(elf.get_symbol("demo_fn").is_none());
}

#[test]
fn test_nonexistent_file() {
    let mut elf = ElfFile::open("/nonexistent/libdemo.so");
    assert!(elf.error());
    assert_eq!(elf.error_message(), "file does not exist");
    assert!(ElfFile::try_open("/nonexistent/libdemo.so").is_err());

    // Nothing to parse without a file.
    assert!(!elf.parse_dynamic_segment());
    assert_eq!(elf.last_error(), Some(ElfError::FileNotOpen));
}

#[test]
fn test_clear_error() {
    let tweaks = Tweaks {
        strtab_entry: false,
        ..Default::default()
    };
    let mut elf = open(ElfClass::Elf64, &tweaks);
    assert!(!elf.parse_dynamic_segment());
    assert!(elf.error());
    elf.clear_error();
    assert!(!elf.error());
    assert_eq!(elf.error_message(), "");
    assert_eq!(elf.last_error(), None);
}

#[test]
fn test_sections() {
    let elf = parsed(ElfClass::Elf64);
    let names: Vec<_> = elf
        .sections()
        .skip(1)
        .filter_map(|section| section.name())
        .map(|name| name.to_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            ".text",
            ".init",
            ".fini",
            ".dynsym",
            ".hash",
            ".gnu.hash",
            ".rela.dyn",
            ".rela.plt",
            ".dynstr",
            ".init_array",
            ".fini_array",
            ".dynamic",
            ".shstrtab",
        ]
    );
    let dynstr = elf.section_by_name(".dynstr").unwrap();
    assert_eq!(dynstr.sh_addr, dynstr.sh_offset + BASE + DATA_BIAS);
    assert_eq!(elf.dynamic_string_table().as_bytes(), DYNSTR);
}
