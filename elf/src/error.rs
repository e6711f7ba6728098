// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use std::error;
use std::fmt;
use std::io;

/// Coarse classification of an [`ElfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file violates the object format.
    Format,
    /// The file could not be opened, seeked or read in full.
    Io,
}

/// Errors while reading ELF files, e.g. a bad identification block,
/// inconsistent table metadata or a truncated read. The [`fmt::Display`]
/// trait is implemented to allow formatting error instances.
///
/// # Examples
///
/// To format an [`ElfError`] as a string, you can use the `to_string()`method
/// or the `format!` macro, like this:
///
/// ```rust
/// use elf_reader::{ElfError, ErrorKind};
///
/// let error = ElfError::SymtabOffsetMismatch;
/// assert_eq!(error.to_string(), "symbol table offsets don't match");
/// assert_eq!(error.kind(), ErrorKind::Format);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    // I/O
    Io(io::ErrorKind),
    TruncatedRead,
    FileNotOpen,

    // Identification and file header
    UnrecognizedMagic,
    UnsupportedClass,
    UnsupportedEndianess,
    InvalidPhdrSize,
    InvalidShdrSize,

    // Tables and ranges
    InvalidSectionIndex,
    IncompatibleSectionType,
    InvalidStrtabString,
    InvalidFileRange,
    InvalidAddressRange,
    LoadSegmentConflict,
    UnmappedVaddrRange,
    UnbackedVaddrRange,

    // Dynamic segment
    InvalidDynamicSize,
    DynamicFieldConflict,
    MissingDynamicStrtab,
    MissingDynamicSymtab,
    MissingDynsymSection,
    SymtabOffsetMismatch,
    InvalidSymbolEntrySize,

    // Hash tables
    InvalidHashTable,
    DuplicateHashTable,

    // Relocations
    InvalidRelocationEntrySize,
    UnrecognizedRelocationSection,
}

impl ElfError {
    /// Returns whether this error is a format violation or an I/O failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::TruncatedRead | Self::FileNotOpen => ErrorKind::Io,
            _ => ErrorKind::Format,
        }
    }
}

impl From<io::Error> for ElfError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::TruncatedRead,
            kind => Self::Io(kind),
        }
    }
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(io::ErrorKind::NotFound) => {
                write!(f, "file does not exist")
            }
            Self::Io(kind) => {
                write!(f, "I/O error: {kind}")
            }
            Self::TruncatedRead => {
                write!(f, "ELF file too short")
            }
            Self::FileNotOpen => {
                write!(f, "binary file is not open")
            }

            Self::UnrecognizedMagic => {
                write!(f, "not an ELF file")
            }
            Self::UnsupportedClass => {
                write!(f, "unsupported ELF class")
            }
            Self::UnsupportedEndianess => {
                write!(f, "unsupported ELF endianess")
            }
            Self::InvalidPhdrSize => {
                write!(f, "invalid ELF program header size")
            }
            Self::InvalidShdrSize => {
                write!(f, "invalid ELF section header size")
            }

            Self::InvalidSectionIndex => {
                write!(f, "invalid ELF section index")
            }
            Self::IncompatibleSectionType => {
                write!(f, "unexpected ELF section type")
            }
            Self::InvalidStrtabString => {
                write!(f, "invalid ELF strtab string")
            }
            Self::InvalidFileRange => {
                write!(f, "invalid ELF file range")
            }
            Self::InvalidAddressRange => {
                write!(f, "invalid ELF address range")
            }
            Self::LoadSegmentConflict => {
                write!(f, "ELF PT_LOAD segment conflict")
            }
            Self::UnmappedVaddrRange => {
                write!(f, "reference to unmapped ELF address range")
            }
            Self::UnbackedVaddrRange => {
                write!(f, "reference ELF address range not backed by file")
            }

            Self::InvalidDynamicSize => {
                write!(f, "invalid dynamic segment size")
            }
            Self::DynamicFieldConflict => {
                write!(f, "conflicting fields in ELF dynamic section")
            }
            Self::MissingDynamicStrtab => {
                write!(f, "failed to find dynamic string table")
            }
            Self::MissingDynamicSymtab => {
                write!(f, "failed to find symbol table")
            }
            Self::MissingDynsymSection => {
                write!(f, "failed to find dynamic symbol table")
            }
            Self::SymtabOffsetMismatch => {
                write!(f, "symbol table offsets don't match")
            }
            Self::InvalidSymbolEntrySize => {
                write!(f, "invalid ELF symbol entry size")
            }

            Self::InvalidHashTable => {
                write!(f, "invalid ELF hash table")
            }
            Self::DuplicateHashTable => {
                write!(f, "multiple ELF hash tables of the same kind")
            }

            Self::InvalidRelocationEntrySize => {
                write!(f, "invalid ELF relocation entry size")
            }
            Self::UnrecognizedRelocationSection => {
                write!(f, "unrecognized ELF relocation section")
            }
        }
    }
}

impl error::Error for ElfError {}
