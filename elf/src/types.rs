// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

// Unified (widened) representation.
pub type Elf64Addr = u64;
pub type Elf64Off = u64;
pub type Elf64Half = u16;
pub type Elf64Word = u32;
pub type Elf64Sword = i32;
pub type Elf64Xword = u64;
pub type Elf64Sxword = i64;
pub type Elf64char = u8;

// On-disk ELFCLASS32 fields.
pub type Elf32Addr = u32;
pub type Elf32Off = u32;
pub type Elf32Half = u16;
pub type Elf32Word = u32;
pub type Elf32Sword = i32;
