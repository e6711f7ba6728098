// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

//! Reader for ELF executables, shared objects and relocatable objects.
//!
//! Both ELFCLASS32 and ELFCLASS64 files are supported. Every record read
//! from the file is widened into a single 64-bit shaped representation, so
//! the class never shows up in the API beyond [`ElfFile::is_32_bit`] and
//! friends. Records are decoded in host byte order, a file of the other
//! byte order is not converted.
//!
//! Opening a file decodes the file header, the segment table and the
//! section table. The dynamic linking metadata (needed libraries, dynamic
//! symbols, symbol hash tables, relocations and initializer/finalizer
//! lists) is decoded on demand by [`ElfFile::parse_dynamic_segment`].
//!
//! ```no_run
//! use elf_reader::ElfFile;
//!
//! let mut elf = ElfFile::open("/usr/lib/libdemo.so");
//! if elf.parse_dynamic_segment() {
//!     for lib in elf.needed_libraries() {
//!         println!("needs {}", lib.to_string_lossy());
//!     }
//!     if let Some(sym) = elf.get_symbol("demo_fn") {
//!         println!("demo_fn at {:#x}", sym.st_value);
//!     }
//! } else if elf.error() {
//!     eprintln!("{}", elf.error_message());
//! }
//! ```

mod addr_range;
mod dynamic;
mod error;
mod file;
mod file_range;
mod hash;
mod header;
mod init_fini;
mod layout;
mod load_segments;
mod program_header;
mod reader;
mod relocation;
mod section_header;
mod strtab;
mod syms;
mod types;

pub use addr_range::ElfAddrRange;
pub use dynamic::{DynamicInfo, ElfDyn};
pub use error::{ElfError, ErrorKind};
pub use file::ElfFile;
pub use file_range::ElfFileRange;
pub use hash::{elf_hash, gnu_hash, GnuHashTable, HashIndex, SysvHashTable};
pub use header::{ElfClass, ElfData, ElfHdr, ElfIdent};
pub use init_fini::InitFini;
pub use layout::Widen;
pub use load_segments::LoadSegments;
pub use program_header::{ElfPhdr, ElfPhdrFlags};
pub use reader::RawReader;
pub use relocation::{ElfRel, ElfRela, Relocations};
pub use section_header::{ElfShdr, ElfShdrFlags, Section, SectionIter};
pub use strtab::ElfStrtab;
pub use syms::{ElfSym, Symbol};
pub use types::*;
