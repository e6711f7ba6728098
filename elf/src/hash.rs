// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// Copyright (c) 2023-2024 SUSE LLC
//
// vim: ts=4 sw=4 et

//! Symbol hash tables.
//!
//! Two kinds of tables map a symbol name to its index in the dynamic
//! symbol table:
//!
//! - the SysV table (`SHT_HASH`): `nbucket` bucket heads, each starting a
//!   chain through the `chains` array, terminated by [`ElfSym::STN_UNDEF`].
//! - the GNU table (`SHT_GNU_HASH`): a bloom filter rejects most absent
//!   names up front. Symbols sharing a bucket are stored consecutively in
//!   the symbol table, with one hash value per symbol whose lowest bit
//!   marks the end of the bucket's run. The first `symoffset` symbols are
//!   not covered by the table at all.

use super::reader::RawReader;
use super::types::*;
use super::ElfClass;
use super::ElfError;
use super::ElfShdr;
use super::ElfStrtab;
use super::ElfSym;
use super::Widen;

use std::io::{Read, Seek};

/// The SysV ELF hash function.
///
/// # Examples
///
/// ```rust
/// use elf_reader::elf_hash;
///
/// assert_eq!(elf_hash(b""), 0);
/// assert_eq!(elf_hash(b"printf"), 0x077905a6);
/// ```
pub fn elf_hash(name: &[u8]) -> Elf64Word {
    let mut h: Elf64Word = 0;
    for &c in name {
        h = (h << 4).wrapping_add(Elf64Word::from(c));
        let g = h & 0xf000_0000;
        if g != 0 {
            h ^= g >> 24;
        }
        h &= !g;
    }
    h
}

/// The GNU hash function, DJB's `h * 33 + c` truncated to 32 bits.
///
/// # Examples
///
/// ```rust
/// use elf_reader::gnu_hash;
///
/// assert_eq!(gnu_hash(b""), 5381);
/// assert_eq!(gnu_hash(b"printf"), 0x156b2bb8);
/// ```
pub fn gnu_hash(name: &[u8]) -> Elf64Word {
    name.iter().fold(5381, |h: Elf64Word, &c| {
        h.wrapping_mul(33).wrapping_add(Elf64Word::from(c))
    })
}

fn name_matches(syms: &[ElfSym], strtab: &ElfStrtab, index: usize, name: &[u8]) -> bool {
    syms.get(index)
        .and_then(|sym| strtab.get_str(sym.st_name).ok())
        .is_some_and(|sym_name| sym_name.to_bytes() == name)
}

fn to_count(word: Elf64Word) -> Result<usize, ElfError> {
    usize::try_from(word).map_err(|_| ElfError::InvalidHashTable)
}

/// Returns the file offset following `count` entries of `entsize` bytes
/// each, starting at `offset`.
fn offset_after(offset: Elf64Off, count: usize, entsize: usize) -> Result<Elf64Off, ElfError> {
    count
        .checked_mul(entsize)
        .and_then(|len| Elf64Off::try_from(len).ok())
        .and_then(|len| offset.checked_add(len))
        .ok_or(ElfError::InvalidFileRange)
}

/// The SysV symbol hash table (`SHT_HASH`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysvHashTable {
    buckets: Vec<Elf64Word>,
    chains: Vec<Elf64Word>,
}

impl SysvHashTable {
    /// Creates a table from its bucket and chain arrays.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidHashTable`] if either array is empty.
    pub fn new(buckets: Vec<Elf64Word>, chains: Vec<Elf64Word>) -> Result<Self, ElfError> {
        if buckets.is_empty() || chains.is_empty() {
            return Err(ElfError::InvalidHashTable);
        }
        Ok(Self { buckets, chains })
    }

    /// Reads the table stored in section `shdr`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidHashTable`] if the bucket or chain count is
    /// zero or the arrays don't fit the section, otherwise any error from
    /// reading the file.
    pub fn read<R: Read + Seek>(
        reader: &mut RawReader<R>,
        class: ElfClass,
        shdr: &ElfShdr,
    ) -> Result<Self, ElfError> {
        let range = shdr.file_range()?;
        let header: Vec<Elf64Word> = reader.read_table(class, range.offset_begin, 2)?;
        let &[nbucket, nchain] = header.as_slice() else {
            return Err(ElfError::InvalidHashTable);
        };
        if nbucket == 0 || nchain == 0 {
            return Err(ElfError::InvalidHashTable);
        }
        let nbucket = to_count(nbucket)?;
        let nchain = to_count(nchain)?;

        let entsize = Elf64Word::entry_size(class);
        let buckets_offset = offset_after(range.offset_begin, 2, entsize)?;
        let chains_offset = offset_after(buckets_offset, nbucket, entsize)?;
        if offset_after(chains_offset, nchain, entsize)? > range.offset_end {
            return Err(ElfError::InvalidHashTable);
        }

        let buckets = reader.read_table(class, buckets_offset, nbucket)?;
        let chains = reader.read_table(class, chains_offset, nchain)?;
        Self::new(buckets, chains)
    }

    pub fn buckets(&self) -> &[Elf64Word] {
        &self.buckets
    }

    pub fn chains(&self) -> &[Elf64Word] {
        &self.chains
    }

    /// Looks up `name`, returning the index of the matching symbol in `syms`.
    ///
    /// Reaching the end of a chain means the name isn't there. A corrupt
    /// chain ends the walk after at most `nchain` steps.
    pub fn lookup(&self, name: &[u8], syms: &[ElfSym], strtab: &ElfStrtab) -> Option<usize> {
        let h = usize::try_from(elf_hash(name)).ok()?;
        let mut index = *self.buckets.get(h.checked_rem(self.buckets.len())?)?;

        for _ in 0..self.chains.len() {
            if index == ElfSym::STN_UNDEF {
                return None;
            }
            let i = usize::try_from(index).ok()?;
            if name_matches(syms, strtab, i, name) {
                return Some(i);
            }
            index = *self.chains.get(i)?;
        }
        None
    }
}

/// The GNU symbol hash table (`SHT_GNU_HASH`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuHashTable {
    symoffset: Elf64Word,
    bloom_shift: Elf64Word,
    /// Bloom filter words, widened from 32 bits for ELFCLASS32
    bloom: Vec<Elf64Xword>,
    /// Number of significant bits per bloom word
    bloom_word_bits: Elf64Word,
    buckets: Vec<Elf64Word>,
    /// Hash values of the symbols from `symoffset` on
    values: Vec<Elf64Word>,
}

impl GnuHashTable {
    /// Creates a table from its parts; `class` determines the bloom word
    /// width.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidHashTable`] if there are no buckets, the
    /// bloom word count is not a power of two or the bloom shift exceeds
    /// the hash width.
    pub fn new(
        class: ElfClass,
        symoffset: Elf64Word,
        bloom_shift: Elf64Word,
        bloom: Vec<Elf64Xword>,
        buckets: Vec<Elf64Word>,
        values: Vec<Elf64Word>,
    ) -> Result<Self, ElfError> {
        if buckets.is_empty() || !bloom.len().is_power_of_two() || bloom_shift >= Elf64Word::BITS {
            return Err(ElfError::InvalidHashTable);
        }
        let bloom_word_bits = match class {
            ElfClass::Elf32 => u32::BITS,
            ElfClass::Elf64 => u64::BITS,
        };
        Ok(Self {
            symoffset,
            bloom_shift,
            bloom,
            bloom_word_bits,
            buckets,
            values,
        })
    }

    /// Reads the table stored in section `shdr`. `nsyms` is the number of
    /// entries in the dynamic symbol table the table indexes.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidHashTable`] for inconsistent header
    /// values or arrays that don't fit the section, otherwise any error
    /// from reading the file.
    pub fn read<R: Read + Seek>(
        reader: &mut RawReader<R>,
        class: ElfClass,
        shdr: &ElfShdr,
        nsyms: usize,
    ) -> Result<Self, ElfError> {
        let range = shdr.file_range()?;
        let header: Vec<Elf64Word> = reader.read_table(class, range.offset_begin, 4)?;
        let &[nbuckets, symoffset, bloom_size, bloom_shift] = header.as_slice() else {
            return Err(ElfError::InvalidHashTable);
        };
        if nbuckets == 0 || !bloom_size.is_power_of_two() {
            return Err(ElfError::InvalidHashTable);
        }
        let nvalues = nsyms
            .checked_sub(to_count(symoffset)?)
            .ok_or(ElfError::InvalidHashTable)?;
        let nbuckets = to_count(nbuckets)?;
        let bloom_size = to_count(bloom_size)?;

        let word_size = Elf64Word::entry_size(class);
        let bloom_offset = offset_after(range.offset_begin, 4, word_size)?;
        let buckets_offset = offset_after(bloom_offset, bloom_size, Elf64Xword::entry_size(class))?;
        let values_offset = offset_after(buckets_offset, nbuckets, word_size)?;
        if offset_after(values_offset, nvalues, word_size)? > range.offset_end {
            return Err(ElfError::InvalidHashTable);
        }

        let bloom = reader.read_table(class, bloom_offset, bloom_size)?;
        let buckets = reader.read_table(class, buckets_offset, nbuckets)?;
        let values = reader.read_table(class, values_offset, nvalues)?;
        Self::new(class, symoffset, bloom_shift, bloom, buckets, values)
    }

    /// Index of the first symbol covered by the table
    pub fn symoffset(&self) -> Elf64Word {
        self.symoffset
    }

    pub fn bloom_shift(&self) -> Elf64Word {
        self.bloom_shift
    }

    pub fn bloom(&self) -> &[Elf64Xword] {
        &self.bloom
    }

    pub fn buckets(&self) -> &[Elf64Word] {
        &self.buckets
    }

    pub fn values(&self) -> &[Elf64Word] {
        &self.values
    }

    /// Tests the two bloom filter bits for hash `h1`. A clear bit means the
    /// name is definitely not in the table.
    fn bloom_may_contain(&self, h1: Elf64Word) -> bool {
        let bits = self.bloom_word_bits;
        let Some(word_index) = h1.checked_div(bits).and_then(|i| usize::try_from(i).ok()) else {
            return false;
        };
        // The word count is a power of two, an empty filter matches nothing.
        let Some(&word) = self
            .bloom
            .get(word_index & self.bloom.len().wrapping_sub(1))
        else {
            return false;
        };
        let h2 = h1 >> self.bloom_shift;
        let mask = (1u64 << (h1 % bits)) | (1u64 << (h2 % bits));
        word & mask == mask
    }

    /// Looks up `name`, returning the index of the matching symbol in `syms`.
    ///
    /// Names rejected by the bloom filter are reported missing without
    /// touching the bucket or the symbols.
    pub fn lookup(&self, name: &[u8], syms: &[ElfSym], strtab: &ElfStrtab) -> Option<usize> {
        let h1 = gnu_hash(name);
        if !self.bloom_may_contain(h1) {
            return None;
        }

        let nbuckets = Elf64Word::try_from(self.buckets.len()).ok()?;
        let bucket = usize::try_from(h1.checked_rem(nbuckets)?).ok()?;
        let mut index = usize::try_from(*self.buckets.get(bucket)?).ok()?;
        let symoffset = usize::try_from(self.symoffset).ok()?;
        if index == 0 || index < symoffset {
            return None;
        }

        // The walk is bounded by the end of the hash value array.
        loop {
            let value = *self.values.get(index - symoffset)?;
            if (h1 | 1) == (value | 1) && name_matches(syms, strtab, index, name) {
                return Some(index);
            }
            if value & 1 != 0 {
                return None;
            }
            index += 1;
        }
    }
}

/// The hash tables present in an ELF file, none, one or both kinds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HashIndex {
    sysv: Option<SysvHashTable>,
    gnu: Option<GnuHashTable>,
}

impl HashIndex {
    /// Combines the given tables.
    pub fn new(sysv: Option<SysvHashTable>, gnu: Option<GnuHashTable>) -> Self {
        Self { sysv, gnu }
    }

    /// Reads every hash table section found in `shdrs`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::DuplicateHashTable`] if there's more than one
    /// table of a kind, otherwise any error from reading the tables.
    pub fn read<R: Read + Seek>(
        reader: &mut RawReader<R>,
        class: ElfClass,
        shdrs: &[ElfShdr],
        nsyms: usize,
    ) -> Result<Self, ElfError> {
        let mut sysv = None;
        let mut gnu = None;

        for shdr in shdrs {
            match shdr.sh_type {
                ElfShdr::SHT_HASH => {
                    if sysv.is_some() {
                        return Err(ElfError::DuplicateHashTable);
                    }
                    sysv = Some(SysvHashTable::read(reader, class, shdr)?);
                }
                ElfShdr::SHT_GNU_HASH => {
                    if gnu.is_some() {
                        return Err(ElfError::DuplicateHashTable);
                    }
                    gnu = Some(GnuHashTable::read(reader, class, shdr, nsyms)?);
                }
                _ => {}
            }
        }

        log::debug!(
            "symbol hash tables: sysv {}, gnu {}",
            sysv.is_some(),
            gnu.is_some()
        );
        Ok(Self { sysv, gnu })
    }

    pub fn sysv(&self) -> Option<&SysvHashTable> {
        self.sysv.as_ref()
    }

    pub fn gnu(&self) -> Option<&GnuHashTable> {
        self.gnu.as_ref()
    }

    /// Looks up `name` in the GNU table first, then in the SysV table.
    pub fn lookup(&self, name: &[u8], syms: &[ElfSym], strtab: &ElfStrtab) -> Option<usize> {
        self.gnu
            .as_ref()
            .and_then(|gnu| gnu.lookup(name, syms, strtab))
            .or_else(|| {
                self.sysv
                    .as_ref()
                    .and_then(|sysv| sysv.lookup(name, syms, strtab))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRTAB: &[u8] = b"\0printf\0exit\0demo_fn\0other_sym\0";

    /// Symbols 0 (undefined), printf, exit, demo_fn, other_sym.
    fn symbols() -> (Vec<ElfSym>, ElfStrtab) {
        let syms = [0, 1, 8, 13, 21]
            .into_iter()
            .map(|st_name| ElfSym {
                st_name,
                ..Default::default()
            })
            .collect();
        (syms, ElfStrtab::new(STRTAB.to_vec()))
    }

    #[test]
    fn test_hash_functions() {
        assert_eq!(elf_hash(b"exit"), 0x0006cf04);
        assert_eq!(elf_hash(b"demo_fn"), 0x0ac455ae);
        assert_eq!(elf_hash(b"other_sym"), 0x0ec81c5d);
        assert_eq!(gnu_hash(b"exit"), 0x7c967e3f);
        assert_eq!(gnu_hash(b"demo_fn"), 0x090b4efd);
        assert_eq!(gnu_hash(b"other_sym"), 0xbb6cb09f);
    }

    #[test]
    fn test_sysv_lookup() {
        let (syms, strtab) = symbols();
        // A single bucket chaining all symbols: 4 -> 3 -> 2 -> 1 -> end.
        let table = SysvHashTable::new(vec![4], vec![0, 0, 1, 2, 3]).unwrap();

        assert_eq!(table.lookup(b"printf", &syms, &strtab), Some(1));
        assert_eq!(table.lookup(b"demo_fn", &syms, &strtab), Some(3));
        assert_eq!(table.lookup(b"other_sym", &syms, &strtab), Some(4));
        // Lands in the non-empty bucket, walks the whole chain, no match.
        assert_eq!(table.lookup(b"missing_sym", &syms, &strtab), None);
    }

    #[test]
    fn test_sysv_corrupt_chain() {
        let (syms, strtab) = symbols();
        // 1 -> 2 -> 1 -> ...
        let table = SysvHashTable::new(vec![1], vec![0, 2, 1]).unwrap();
        assert_eq!(table.lookup(b"missing_sym", &syms, &strtab), None);

        assert_eq!(
            SysvHashTable::new(vec![], vec![0]),
            Err(ElfError::InvalidHashTable)
        );
    }

    fn gnu_table(bloom: Elf64Xword) -> GnuHashTable {
        // One bucket starting at symbol 1, the run ends at symbol 4.
        let names: [&[u8]; 4] = [b"printf", b"exit", b"demo_fn", b"other_sym"];
        let values = names
            .iter()
            .map(|name| gnu_hash(name) & !1)
            .enumerate()
            .map(|(i, h)| if i == 3 { h | 1 } else { h })
            .collect();
        GnuHashTable::new(ElfClass::Elf64, 1, 6, vec![bloom], vec![1], values).unwrap()
    }

    #[test]
    fn test_gnu_lookup() {
        let (syms, strtab) = symbols();
        let table = gnu_table(!0);

        assert_eq!(table.lookup(b"printf", &syms, &strtab), Some(1));
        assert_eq!(table.lookup(b"exit", &syms, &strtab), Some(2));
        assert_eq!(table.lookup(b"other_sym", &syms, &strtab), Some(4));
        // Passes the bloom filter, not found once the end marker is seen.
        assert_eq!(table.lookup(b"missing_sym", &syms, &strtab), None);
    }

    #[test]
    fn test_gnu_bloom_rejects() {
        let (syms, strtab) = symbols();
        // The chain would match, but an empty filter must reject first.
        let table = gnu_table(0);
        assert_eq!(table.lookup(b"printf", &syms, &strtab), None);

        // Exactly the two filter bits of "exit" set.
        let h1 = gnu_hash(b"exit");
        let bloom = (1u64 << (h1 % 64)) | (1u64 << ((h1 >> 6) % 64));
        let table = gnu_table(bloom);
        assert_eq!(table.lookup(b"exit", &syms, &strtab), Some(2));
    }

    #[test]
    fn test_gnu_invalid() {
        assert_eq!(
            GnuHashTable::new(ElfClass::Elf64, 1, 6, vec![0; 3], vec![1], vec![]),
            Err(ElfError::InvalidHashTable)
        );
        assert_eq!(
            GnuHashTable::new(ElfClass::Elf64, 1, 6, vec![], vec![1], vec![]),
            Err(ElfError::InvalidHashTable)
        );
        assert_eq!(
            GnuHashTable::new(ElfClass::Elf64, 1, 6, vec![0], vec![], vec![]),
            Err(ElfError::InvalidHashTable)
        );
    }

    #[test]
    fn test_read_rejects_empty_tables() {
        use std::io::Cursor;
        use zerocopy::IntoBytes;

        let section = |words: &[Elf64Word]| {
            let reader = RawReader::new(Cursor::new(words.as_bytes().to_vec()));
            let shdr = ElfShdr {
                sh_size: (words.len() * 4) as Elf64Xword,
                ..Default::default()
            };
            (reader, shdr)
        };

        // nbucket == 0
        let (mut reader, shdr) = section(&[0, 1, 0]);
        assert_eq!(
            SysvHashTable::read(&mut reader, ElfClass::Elf64, &shdr),
            Err(ElfError::InvalidHashTable)
        );
        // nbuckets == 0, then bloom_size == 0
        let (mut reader, shdr) = section(&[0, 1, 1, 6, 0, 0, 0]);
        assert_eq!(
            GnuHashTable::read(&mut reader, ElfClass::Elf32, &shdr, 1),
            Err(ElfError::InvalidHashTable)
        );
        let (mut reader, shdr) = section(&[1, 1, 0, 6, 1, 0]);
        assert_eq!(
            GnuHashTable::read(&mut reader, ElfClass::Elf32, &shdr, 2),
            Err(ElfError::InvalidHashTable)
        );
    }

    #[test]
    fn test_lookup_out_of_range_bucket() {
        let (syms, strtab) = symbols();
        // Bucket heads pointing past the chains and values end the walk.
        let sysv = SysvHashTable::new(vec![9], vec![0]).unwrap();
        assert_eq!(sysv.lookup(b"printf", &syms, &strtab), None);

        let gnu = GnuHashTable::new(ElfClass::Elf64, 1, 6, vec![!0], vec![9], vec![1]).unwrap();
        assert_eq!(gnu.lookup(b"printf", &syms, &strtab), None);
    }

    #[test]
    fn test_index_prefers_gnu() {
        let (syms, strtab) = symbols();
        // A SysV table that disagrees with the GNU one.
        let sysv = SysvHashTable::new(vec![3], vec![0, 0, 0, 0, 0]).unwrap();

        let index = HashIndex::new(Some(sysv.clone()), Some(gnu_table(!0)));
        assert_eq!(index.lookup(b"printf", &syms, &strtab), Some(1));

        // Falls back to SysV when GNU finds nothing.
        let index = HashIndex::new(Some(sysv), Some(gnu_table(0)));
        assert_eq!(index.lookup(b"demo_fn", &syms, &strtab), Some(3));
        assert_eq!(index.lookup(b"printf", &syms, &strtab), None);

        assert_eq!(
            HashIndex::default().lookup(b"printf", &syms, &strtab),
            None
        );
    }
}
