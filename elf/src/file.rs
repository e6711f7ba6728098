// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

use super::reader::RawReader;
use super::types::*;
use super::{
    DynamicInfo, ElfClass, ElfData, ElfDyn, ElfError, ElfHdr, ElfIdent, ElfPhdr, ElfRel,
    ElfRela, ElfShdr, ElfStrtab, ElfSym, HashIndex, InitFini, LoadSegments, Relocations,
    Section, SectionIter, Symbol, Widen,
};

use core::ffi;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Sentinel for "no loadable segment", never handed out as an address.
const NO_BASE_ADDRESS: Elf64Addr = Elf64Addr::MAX;

/// This struct represents an ELF file being read. It owns the underlying
/// file handle along with everything decoded from it: the file header,
/// the segment and section tables and, once
/// [`parse_dynamic_segment()`](ElfFile::parse_dynamic_segment) ran, the
/// dynamic linking metadata.
///
/// Names handed out by the accessors are views into string tables owned
/// by the [`ElfFile`], they can't outlive it.
///
/// Failures are recorded rather than returned by [`ElfFile::open`] and
/// [`ElfFile::parse_dynamic_segment`]: check [`ElfFile::error`] before
/// trusting anything populated by or after the failing step. The `try_*`
/// variants return a [`Result`] instead.
#[derive(Debug)]
pub struct ElfFile<R = File> {
    /// [`None`] if the file couldn't be opened
    reader: Option<RawReader<R>>,
    ident: ElfIdent,
    elf_hdr: ElfHdr,
    phdrs: Vec<ElfPhdr>,
    /// Lowest virtual address of all `PT_LOAD` segments
    base_address: Elf64Addr,
    shdrs: Vec<ElfShdr>,
    /// The section header string table may not be present
    sh_strtab: Option<ElfStrtab>,
    dynamic: Vec<ElfDyn>,
    dynamic_info: DynamicInfo,
    dyn_strtab: ElfStrtab,
    dyn_syms: Vec<ElfSym>,
    hash_index: HashIndex,
    relocations: Relocations,
    init_fini: InitFini,
    error: Option<ElfError>,
}

impl ElfFile<File> {
    /// Opens the file at `path` and decodes its identification, file
    /// header, segment table and section table.
    ///
    /// Never fails: problems are recorded, see [`ElfFile::error`].
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::from_reader(file),
            Err(err) => {
                log::warn!("failed to open {}: {err}", path.display());
                let mut elf_file = Self::new(None);
                elf_file.record(err.into());
                elf_file
            }
        }
    }

    /// Like [`ElfFile::open`], but returns the first failure.
    ///
    /// # Errors
    ///
    /// Returns an [`ElfError`] if the file can't be opened or read, or is
    /// not a valid ELF file.
    pub fn try_open<P: AsRef<Path>>(path: P) -> Result<Self, ElfError> {
        Self::try_from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> ElfFile<R> {
    /// Decodes the ELF file accessible through `inner`, see
    /// [`ElfFile::open`].
    pub fn from_reader(inner: R) -> Self {
        let mut elf_file = Self::new(Some(RawReader::new(inner)));
        if let Err(err) = elf_file.load() {
            elf_file.record(err);
        }
        elf_file
    }

    /// Like [`ElfFile::from_reader`], but returns the first failure.
    ///
    /// # Errors
    ///
    /// Returns an [`ElfError`] if reading fails or `inner` doesn't hold a
    /// valid ELF file.
    pub fn try_from_reader(inner: R) -> Result<Self, ElfError> {
        let mut elf_file = Self::new(Some(RawReader::new(inner)));
        elf_file.load()?;
        Ok(elf_file)
    }

    /// Reads identification, file header, segment and section tables.
    fn load(&mut self) -> Result<(), ElfError> {
        let reader = self.reader.as_mut().ok_or(ElfError::FileNotOpen)?;

        // Nothing else gets read unless the identification block is sane.
        let ident_buf = reader.read_bytes(0, ElfIdent::SIZE)?;
        self.ident = ElfIdent::parse(&ident_buf)?;
        let class = self.ident.class;
        if (self.ident.data == ElfData::Msb && cfg!(target_endian = "little"))
            || (self.ident.data == ElfData::Lsb && cfg!(target_endian = "big"))
        {
            log::warn!("byte order of the file differs from the host's, values will be garbled");
        }

        self.elf_hdr = reader.read_record(class, 0)?;
        log::debug!(
            "{:?} file: type {}, machine {}, {} segments, {} sections",
            class,
            self.elf_hdr.e_type,
            self.elf_hdr.e_machine,
            self.elf_hdr.e_phnum,
            self.elf_hdr.e_shnum
        );

        self.phdrs = read_phdrs(reader, class, &self.elf_hdr)?;
        self.base_address = self
            .phdrs
            .iter()
            .filter(|phdr| phdr.p_type == ElfPhdr::PT_LOAD)
            .map(|phdr| phdr.p_vaddr)
            .min()
            .unwrap_or(NO_BASE_ADDRESS);
        if self.base_address == NO_BASE_ADDRESS {
            log::debug!("no loadable segment");
        }

        self.shdrs = read_shdrs(reader, class, &self.elf_hdr)?;
        self.sh_strtab = read_sh_strtab(reader, &self.elf_hdr, &self.shdrs)?;
        Ok(())
    }

    /// Decodes the dynamic segment and everything hanging off it: dynamic
    /// string and symbol tables, symbol hash tables, relocations and the
    /// initializer and finalizer lists.
    ///
    /// # Returns
    ///
    /// `true` on success. `false` if the file has no dynamic segment or
    /// decoding failed; in the latter case the failure is recorded, see
    /// [`ElfFile::error`].
    pub fn parse_dynamic_segment(&mut self) -> bool {
        match self.try_parse_dynamic_segment() {
            Ok(found) => found,
            Err(err) => {
                self.record(err);
                false
            }
        }
    }

    /// Like [`ElfFile::parse_dynamic_segment`], but returns the failure.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if there is no dynamic segment, `Ok(true)` once it has
    /// been decoded.
    ///
    /// # Errors
    ///
    /// - [`ElfError::InvalidDynamicSize`]: the segment size is not a
    ///   multiple of the entry size.
    /// - [`ElfError::MissingDynamicStrtab`], [`ElfError::MissingDynamicSymtab`]:
    ///   required dynamic entries are missing.
    /// - [`ElfError::UnmappedVaddrRange`], [`ElfError::UnbackedVaddrRange`]:
    ///   a table address doesn't translate to a file offset.
    /// - [`ElfError::InvalidSymbolEntrySize`]: `DT_SYMENT` doesn't match the
    ///   class.
    /// - [`ElfError::MissingDynsymSection`]: there is no `SHT_DYNSYM` section.
    /// - [`ElfError::SymtabOffsetMismatch`]: `DT_SYMTAB` and the `SHT_DYNSYM`
    ///   section disagree about the location of the symbol table.
    ///
    /// Otherwise any error from reading the hash tables, relocations and
    /// lifecycle arrays, or the file itself.
    pub fn try_parse_dynamic_segment(&mut self) -> Result<bool, ElfError> {
        let class = self.ident.class;
        let reader = self.reader.as_mut().ok_or(ElfError::FileNotOpen)?;

        let Some(dyn_phdr) = self
            .phdrs
            .iter()
            .find(|phdr| phdr.p_type == ElfPhdr::PT_DYNAMIC)
        else {
            log::debug!("no dynamic segment");
            return Ok(false);
        };

        let entsize = ElfDyn::entry_size(class);
        let filesz =
            usize::try_from(dyn_phdr.p_filesz).map_err(|_| ElfError::InvalidDynamicSize)?;
        if filesz % entsize != 0 {
            return Err(ElfError::InvalidDynamicSize);
        }
        self.dynamic = reader.read_table(class, dyn_phdr.p_offset, filesz / entsize)?;

        let info = DynamicInfo::from_entries(&self.dynamic)?;
        let load_segments = LoadSegments::from_phdrs(&self.phdrs)?;

        let strtab_offset = load_segments.vaddr_to_file_offset(info.strtab)?;
        let strsz = usize::try_from(info.strsz).map_err(|_| ElfError::InvalidFileRange)?;
        let dyn_strtab = ElfStrtab::new(reader.read_bytes(strtab_offset, strsz)?);
        if let Some(soname) = info.soname {
            dyn_strtab.get_str(soname)?;
        }
        for needed in info.needed.iter() {
            dyn_strtab.get_str(*needed)?;
        }
        self.dyn_strtab = dyn_strtab;
        self.dynamic_info = info;

        let syment = ElfSym::entry_size(class);
        if usize::try_from(self.dynamic_info.syment).ok() != Some(syment) {
            return Err(ElfError::InvalidSymbolEntrySize);
        }
        let symtab_offset = load_segments.vaddr_to_file_offset(self.dynamic_info.symtab)?;
        let dynsym = self
            .shdrs
            .iter()
            .find(|shdr| shdr.sh_type == ElfShdr::SHT_DYNSYM)
            .ok_or(ElfError::MissingDynsymSection)?;
        if dynsym.sh_offset != symtab_offset {
            log::warn!(
                "DT_SYMTAB maps to offset {symtab_offset:#x}, dynamic symbol section is at {:#x}",
                dynsym.sh_offset
            );
            return Err(ElfError::SymtabOffsetMismatch);
        }

        let nsyms = dynsym.entry_count(syment)?;
        let dyn_syms: Vec<ElfSym> = reader.read_table(class, symtab_offset, nsyms)?;
        for sym in dyn_syms.iter() {
            self.dyn_strtab.get_str(sym.st_name)?;
        }
        self.dyn_syms = dyn_syms;

        self.hash_index = HashIndex::read(reader, class, &self.shdrs, self.dyn_syms.len())?;

        let sections = SectionIter::new(&self.shdrs, self.sh_strtab.as_ref());
        self.relocations = Relocations::read(reader, class, sections.clone())?;
        self.init_fini = InitFini::read(reader, class, sections)?;

        log::info!(
            "dynamic segment: {} entries, soname {:?}, {} needed, {} symbols",
            self.dynamic.len(),
            self.soname(),
            self.dynamic_info.needed.len(),
            self.dyn_syms.len()
        );
        Ok(true)
    }
}

impl<R> ElfFile<R> {
    fn new(reader: Option<RawReader<R>>) -> Self {
        Self {
            reader,
            ident: ElfIdent::default(),
            elf_hdr: ElfHdr::default(),
            phdrs: Vec::new(),
            base_address: NO_BASE_ADDRESS,
            shdrs: Vec::new(),
            sh_strtab: None,
            dynamic: Vec::new(),
            dynamic_info: DynamicInfo::default(),
            dyn_strtab: ElfStrtab::default(),
            dyn_syms: Vec::new(),
            hash_index: HashIndex::default(),
            relocations: Relocations::default(),
            init_fini: InitFini::default(),
            error: None,
        }
    }

    fn record(&mut self, err: ElfError) {
        log::debug!("recorded error: {err}");
        self.error = Some(err);
    }

    /// Whether an error has been recorded.
    pub fn error(&self) -> bool {
        self.error.is_some()
    }

    /// Describes the recorded error, empty if there is none.
    pub fn error_message(&self) -> String {
        self.error.map(|err| err.to_string()).unwrap_or_default()
    }

    /// The recorded error, if any.
    pub fn last_error(&self) -> Option<ElfError> {
        self.error
    }

    /// Forgets the recorded error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn ident(&self) -> &ElfIdent {
        &self.ident
    }

    pub fn is_32_bit(&self) -> bool {
        self.ident.class == ElfClass::Elf32
    }

    pub fn is_64_bit(&self) -> bool {
        self.ident.class == ElfClass::Elf64
    }

    pub fn is_little_endian(&self) -> bool {
        self.ident.data == ElfData::Lsb
    }

    pub fn is_big_endian(&self) -> bool {
        self.ident.data == ElfData::Msb
    }

    /// The file header, widened to the 64-bit shape
    pub fn header(&self) -> &ElfHdr {
        &self.elf_hdr
    }

    pub fn program_headers(&self) -> &[ElfPhdr] {
        &self.phdrs
    }

    /// Lowest virtual address of all loadable segments, [`None`] if there
    /// is no loadable segment.
    pub fn base_address(&self) -> Option<Elf64Addr> {
        (self.base_address != NO_BASE_ADDRESS).then_some(self.base_address)
    }

    pub fn section_headers(&self) -> &[ElfShdr] {
        &self.shdrs
    }

    /// The section header string table, if present
    pub fn section_name_table(&self) -> Option<&ElfStrtab> {
        self.sh_strtab.as_ref()
    }

    /// Iterates over all sections along with their names.
    pub fn sections(&self) -> SectionIter<'_> {
        SectionIter::new(&self.shdrs, self.sh_strtab.as_ref())
    }

    /// Finds the first section called exactly `name`.
    pub fn section_by_name(&self, name: &str) -> Option<Section<'_>> {
        self.sections().find_by_name(name)
    }

    /// All entries of the dynamic segment, including `DT_NULL` ones
    pub fn dynamic_entries(&self) -> &[ElfDyn] {
        &self.dynamic
    }

    pub fn dynamic_info(&self) -> &DynamicInfo {
        &self.dynamic_info
    }

    pub fn dynamic_string_table(&self) -> &ElfStrtab {
        &self.dyn_strtab
    }

    /// Name of the shared object (`DT_SONAME`), if it has one
    pub fn soname(&self) -> Option<&ffi::CStr> {
        self.dynamic_info
            .soname
            .and_then(|soname| self.dyn_strtab.get_str(soname).ok())
    }

    /// Names of the libraries the object depends on (`DT_NEEDED`), in file
    /// order
    pub fn needed_libraries(&self) -> Vec<&ffi::CStr> {
        self.dynamic_info
            .needed
            .iter()
            .filter_map(|needed| self.dyn_strtab.get_str(*needed).ok())
            .collect()
    }

    /// Iterates over the dynamic symbol table, starting with the reserved
    /// undefined symbol at index 0.
    pub fn dynamic_symbols(&self) -> impl Iterator<Item = Symbol<'_>> + '_ {
        self.dyn_syms
            .iter()
            .enumerate()
            .filter_map(|(index, sym)| Symbol::new(index, sym, &self.dyn_strtab).ok())
    }

    /// The dynamic symbol at `index`
    pub fn symbol(&self, index: usize) -> Option<Symbol<'_>> {
        let sym = self.dyn_syms.get(index)?;
        Symbol::new(index, sym, &self.dyn_strtab).ok()
    }

    /// Looks up the dynamic symbol called `name` through the symbol hash
    /// tables, preferring the GNU one.
    ///
    /// Not finding the symbol is not an error; [`None`] is also returned if
    /// the file has no hash table.
    pub fn get_symbol(&self, name: &str) -> Option<Symbol<'_>> {
        let index = self
            .hash_index
            .lookup(name.as_bytes(), &self.dyn_syms, &self.dyn_strtab)?;
        self.symbol(index)
    }

    pub fn hash_index(&self) -> &HashIndex {
        &self.hash_index
    }

    /// Non-PLT relocations without addend
    pub fn relocations(&self) -> &[ElfRel] {
        self.relocations.rel()
    }

    /// Non-PLT relocations with addend
    pub fn relocations_with_addend(&self) -> &[ElfRela] {
        self.relocations.rela()
    }

    /// PLT relocations without addend
    pub fn plt_relocations(&self) -> &[ElfRel] {
        self.relocations.plt_rel()
    }

    /// PLT relocations with addend
    pub fn plt_relocations_with_addend(&self) -> &[ElfRela] {
        self.relocations.plt_rela()
    }

    /// Functions to run at load time, in order
    pub fn initializers(&self) -> &[Elf64Addr] {
        self.init_fini.initializers()
    }

    /// Functions to run at unload time, in order
    pub fn finalizers(&self) -> &[Elf64Addr] {
        self.init_fini.finalizers()
    }
}

fn read_phdrs<R: Read + Seek>(
    reader: &mut RawReader<R>,
    class: ElfClass,
    elf_hdr: &ElfHdr,
) -> Result<Vec<ElfPhdr>, ElfError> {
    if elf_hdr.e_phnum == 0 {
        return Ok(Vec::new());
    }
    if usize::from(elf_hdr.e_phentsize) != ElfPhdr::entry_size(class) {
        return Err(ElfError::InvalidPhdrSize);
    }
    reader.read_table(class, elf_hdr.e_phoff, usize::from(elf_hdr.e_phnum))
}

fn read_shdrs<R: Read + Seek>(
    reader: &mut RawReader<R>,
    class: ElfClass,
    elf_hdr: &ElfHdr,
) -> Result<Vec<ElfShdr>, ElfError> {
    if elf_hdr.e_shoff == 0 {
        return Ok(Vec::new());
    }
    if usize::from(elf_hdr.e_shentsize) != ElfShdr::entry_size(class) {
        return Err(ElfError::InvalidShdrSize);
    }

    let shnum = if elf_hdr.e_shnum == 0 {
        // If ->e_shnum is zero, the actual number of sections is stored in
        // the first section header table entry's ->sh_size member.
        let shdr0: ElfShdr = reader.read_record(class, elf_hdr.e_shoff)?;
        usize::try_from(shdr0.sh_size).map_err(|_| ElfError::InvalidSectionIndex)?
    } else {
        usize::try_from(elf_hdr.e_shnum).map_err(|_| ElfError::InvalidSectionIndex)?
    };
    reader.read_table(class, elf_hdr.e_shoff, shnum)
}

fn read_sh_strtab<R: Read + Seek>(
    reader: &mut RawReader<R>,
    elf_hdr: &ElfHdr,
    shdrs: &[ElfShdr],
) -> Result<Option<ElfStrtab>, ElfError> {
    // If ->e_shstrndx == SHN_XINDEX, the actual strndx is stored in first
    // section header table's ->sh_link member.
    let strndx = match elf_hdr.e_shstrndx {
        ElfShdr::SHN_UNDEF => return Ok(None),
        ElfShdr::SHN_XINDEX => {
            shdrs
                .first()
                .ok_or(ElfError::InvalidSectionIndex)?
                .sh_link
        }
        strndx => strndx,
    };
    let shdr = usize::try_from(strndx)
        .ok()
        .and_then(|strndx| shdrs.get(strndx))
        .ok_or(ElfError::InvalidSectionIndex)?;
    if shdr.sh_type != ElfShdr::SHT_STRTAB {
        return Err(ElfError::IncompatibleSectionType);
    }

    let range = shdr.file_range()?;
    let sh_strtab = ElfStrtab::new(reader.read_bytes(range.offset_begin, range.len()?)?);
    for shdr in shdrs {
        sh_strtab.get_str(shdr.sh_name)?;
    }
    Ok(Some(sh_strtab))
}
