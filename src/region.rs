//! The Region (`.mca`) container: a 32×32 grid of independently compressed NBT chunks packed
//! into a single random-access file behind an 8 KiB header. See §3.3 and §4.4.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as Flate2Level;

use crate::error::{NbtError, RegionError};
use crate::raw;
use crate::tag::NbtCompound;

const SECTOR_SIZE: u64 = 4096;
const HEADER_SECTORS: u64 = 2;
const HEADER_BYTES: u64 = SECTOR_SIZE * HEADER_SECTORS;
const GRID: usize = 32;
const SLOT_COUNT: usize = GRID * GRID;

/// Which compression scheme a chunk blob uses on disk. The numeric IDs are the wire values
/// written into the blob header (§3.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    None,
}

impl Compression {
    fn id(self) -> u8 {
        match self {
            Compression::Gzip => 1,
            Compression::Zlib => 2,
            Compression::None => 3,
        }
    }

    fn from_id(id: u8) -> Result<Compression, RegionError> {
        match id {
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Zlib),
            3 => Ok(Compression::None),
            other => Err(RegionError::MalformedData(format!(
                "unknown chunk compression id {}",
                other
            ))),
        }
    }
}

fn slot_index(x: u8, z: u8) -> usize {
    (x as usize % GRID) + (z as usize % GRID) * GRID
}

/// A Region file: the on-disk locations/timestamp tables plus an in-memory cache of decoded
/// chunk compounds, one per slot.
pub struct RegionFile {
    path: PathBuf,
    file: File,
    /// `(offset_in_sectors << 8) | size_in_sectors`, 0 meaning absent. Indexed by `slot_index`.
    locations: [u32; SLOT_COUNT],
    /// Unix seconds of last write, indexed by `slot_index`.
    timestamps: [u32; SLOT_COUNT],
    /// The decoded chunk body cached per slot, or `None` if not loaded/present.
    chunks: Vec<Option<NbtCompound>>,
}

impl RegionFile {
    /// Opens (or creates) the region file at `path`. A nonexistent path gets a fresh 8 KiB
    /// zeroed header; an existing path has its header read into memory (§4.4.1).
    pub fn open(path: impl AsRef<Path>) -> Result<RegionFile, RegionError> {
        let path = path.as_ref().to_path_buf();
        let is_new = !path.exists();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let mut locations = [0u32; SLOT_COUNT];
        let mut timestamps = [0u32; SLOT_COUNT];

        if is_new {
            file.write_all(&[0u8; HEADER_BYTES as usize])?;
        } else {
            file.seek(SeekFrom::Start(0))?;
            for loc in locations.iter_mut() {
                *loc = file.read_u32::<BigEndian>()?;
            }
            for ts in timestamps.iter_mut() {
                *ts = file.read_u32::<BigEndian>()?;
            }
        }

        log::debug!("opened region file {:?} ({} slots present)", path, locations.iter().filter(|&&l| l != 0).count());

        Ok(RegionFile {
            path,
            file,
            locations,
            timestamps,
            chunks: vec![None; SLOT_COUNT],
        })
    }

    /// The path this region file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn offset_size(&self, idx: usize) -> (u64, u64) {
        let loc = self.locations[idx];
        ((loc >> 8) as u64, (loc & 0xff) as u64)
    }

    /// Gets the chunk cached in memory at `(x, z)`, without touching disk.
    pub fn get_chunk(&self, x: u8, z: u8) -> Option<&NbtCompound> {
        self.chunks[slot_index(x, z)].as_ref()
    }

    /// Sets the in-memory chunk at `(x, z)`. Does not write to disk; call `save_chunk` for that.
    pub fn set_chunk(&mut self, x: u8, z: u8, chunk: Option<NbtCompound>) {
        self.chunks[slot_index(x, z)] = chunk;
    }

    /// Unloads the in-memory chunk at `(x, z)`, without touching disk.
    pub fn unload_chunk(&mut self, x: u8, z: u8) {
        self.chunks[slot_index(x, z)] = None;
    }

    /// Reads the chunk at `(x, z)` from disk into memory and returns a clone of it, or `None`
    /// if the slot is absent (§4.4.2).
    pub fn load_chunk(&mut self, x: u8, z: u8) -> Result<Option<NbtCompound>, RegionError> {
        let idx = slot_index(x, z);
        let (offset, _size) = self.offset_size(idx);
        if offset == 0 {
            self.chunks[idx] = None;
            return Ok(None);
        }

        self.file.seek(SeekFrom::Start(offset * SECTOR_SIZE))?;
        let length = self.file.read_u32::<BigEndian>()?;
        if length == 0 {
            return Err(RegionError::MalformedData(format!(
                "chunk ({}, {}) has a zero-length blob",
                x, z
            )));
        }
        let compression_id = self.file.read_u8()?;
        let compression = Compression::from_id(compression_id)?;
        let mut payload = vec![0u8; length as usize - 1];
        self.file.read_exact(&mut payload)?;

        let decompressed = decompress(compression, &payload)?;
        let (_name, mut wrapper) = raw::read_compound(&mut io::Cursor::new(decompressed)).map_err(NbtError_into_region)?;
        let chunk = wrapper.take("").ok_or_else(|| {
            RegionError::MalformedData(format!("chunk ({}, {}) blob has no unnamed root child", x, z))
        })?;
        let chunk = match chunk {
            crate::tag::NbtTag::Compound(c) => c,
            other => {
                return Err(RegionError::MalformedData(format!(
                    "chunk ({}, {}) root child is a {}, not a Compound",
                    x, z, other.tag_name()
                )))
            }
        };

        log::debug!("loaded chunk ({}, {}) from {:?}", x, z, self.path);
        self.chunks[idx] = Some(chunk.clone());
        Ok(Some(chunk))
    }

    /// Writes the in-memory chunk at `(x, z)` to disk, compressed with `compression`. A no-op
    /// if no in-memory chunk is present at that slot (§4.4.3).
    pub fn save_chunk(&mut self, x: u8, z: u8, compression: Compression) -> Result<(), RegionError> {
        let idx = slot_index(x, z);
        let chunk = match &self.chunks[idx] {
            Some(c) => c.clone(),
            None => return Ok(()),
        };

        let mut wrapper = NbtCompound::new();
        wrapper.add("", chunk, true).expect("fresh compound cannot contain a duplicate");
        let payload = raw::to_bytes("", &wrapper).map_err(NbtError_into_region)?;
        let compressed = compress(compression, &payload)?;

        let mut blob = Vec::with_capacity(compressed.len() + 5);
        blob.write_u32::<BigEndian>(compressed.len() as u32 + 1)?;
        blob.write_u8(compression.id())?;
        blob.extend_from_slice(&compressed);
        let padded_len = ((blob.len() as u64 + SECTOR_SIZE - 1) / SECTOR_SIZE) * SECTOR_SIZE;
        blob.resize(padded_len as usize, 0);
        let new_size_sectors = (padded_len / SECTOR_SIZE) as u32;

        if self.locations[idx] == 0 {
            self.init_chunk(idx)?;
        }

        let (offset, old_size) = self.offset_size(idx);
        self.resize_chunk(idx, new_size_sectors)?;

        // Splice the new blob in at `offset`, preserving whatever followed the old blob.
        self.file.seek(SeekFrom::Start(offset * SECTOR_SIZE + old_size * SECTOR_SIZE))?;
        let mut tail = Vec::new();
        self.file.read_to_end(&mut tail)?;

        self.file.seek(SeekFrom::Start(offset * SECTOR_SIZE))?;
        self.file.write_all(&blob)?;
        self.file.write_all(&tail)?;
        let new_len = offset * SECTOR_SIZE + padded_len + tail.len() as u64;
        self.file.set_len(new_len)?;

        log::debug!(
            "saved chunk ({}, {}) to {:?}: {} sector(s), compression {:?}",
            x, z, self.path, new_size_sectors, compression
        );
        Ok(())
    }

    /// Deletes the chunk at `(x, z)` from disk (and clears it from memory). A no-op if the
    /// slot is already absent (§4.4.5).
    pub fn delete_chunk(&mut self, x: u8, z: u8) -> Result<(), RegionError> {
        let idx = slot_index(x, z);
        if self.locations[idx] == 0 {
            return Ok(());
        }
        let (offset, old_size) = self.offset_size(idx);
        self.resize_chunk(idx, 0)?;

        self.file.seek(SeekFrom::Start(offset * SECTOR_SIZE + old_size * SECTOR_SIZE))?;
        let mut tail = Vec::new();
        self.file.read_to_end(&mut tail)?;
        self.file.seek(SeekFrom::Start(offset * SECTOR_SIZE))?;
        self.file.write_all(&tail)?;
        let new_len = offset * SECTOR_SIZE + tail.len() as u64;
        self.file.set_len(new_len)?;

        self.chunks[idx] = None;
        log::debug!("deleted chunk ({}, {}) from {:?}", x, z, self.path);
        Ok(())
    }

    /// Pads the file to a 4 KiB boundary (if it isn't already on one) and assigns slot `idx`
    /// an offset at the new end of file, with size 0 (so `resize_chunk` treats it as an
    /// insert-at-end). Resolves the Open Question in §9/§4.4.3 about padding before allocating.
    fn init_chunk(&mut self, idx: usize) -> Result<(), RegionError> {
        let end = self.file.seek(SeekFrom::End(0))?;
        let padded_end = ((end + SECTOR_SIZE - 1) / SECTOR_SIZE) * SECTOR_SIZE;
        if padded_end != end {
            self.file.set_len(padded_end)?;
        }
        let offset_sectors = padded_end / SECTOR_SIZE;
        self.locations[idx] = (offset_sectors as u32) << 8;
        Ok(())
    }

    /// Updates slot `idx`'s size (and timestamp), writes both back to the header at the slot's
    /// own computed offset, then fixes up every other present slot whose offset lies after this
    /// one by `new_size - old_size` sectors (§4.4.4).
    fn resize_chunk(&mut self, idx: usize, new_size: u32) -> Result<(), RegionError> {
        let (offset, old_size) = self.offset_size(idx);
        self.locations[idx] = if new_size > 0 { ((offset as u32) << 8) | new_size } else { 0 };
        self.timestamps[idx] = unix_now();
        self.write_header_entry(idx)?;

        let size_change = new_size as i64 - old_size as i64;
        for other in 0..SLOT_COUNT {
            if other == idx {
                continue;
            }
            let (other_offset, other_size) = self.offset_size(other);
            if other_offset > offset {
                let shifted = (other_offset as i64 + size_change) as u32;
                self.locations[other] = (shifted << 8) | other_size as u32;
                self.write_header_entry(other)?;
            }
        }
        Ok(())
    }

    fn write_header_entry(&mut self, idx: usize) -> Result<(), RegionError> {
        self.file.seek(SeekFrom::Start(idx as u64 * 4))?;
        self.file.write_u32::<BigEndian>(self.locations[idx])?;
        self.file.seek(SeekFrom::Start(SECTOR_SIZE + idx as u64 * 4))?;
        self.file.write_u32::<BigEndian>(self.timestamps[idx])?;
        Ok(())
    }

    /// Loads every slot into memory, in row-major `(x, z)` order. Slot-level failures are
    /// collected rather than aborting the sweep; successfully loaded slots are unaffected by a
    /// sibling's failure.
    pub fn load_all(&mut self) -> Vec<((u8, u8), RegionError)> {
        let mut failures = Vec::new();
        for z in 0..GRID as u8 {
            for x in 0..GRID as u8 {
                if let Err(e) = self.load_chunk(x, z) {
                    log::warn!("skipping malformed chunk ({}, {}): {}", x, z, e);
                    failures.push(((x, z), e));
                }
            }
        }
        failures
    }

    /// Saves every slot with an in-memory chunk, in row-major `(x, z)` order.
    pub fn save_all(&mut self, compression: Compression) -> Vec<((u8, u8), RegionError)> {
        let mut failures = Vec::new();
        for z in 0..GRID as u8 {
            for x in 0..GRID as u8 {
                if let Err(e) = self.save_chunk(x, z, compression) {
                    failures.push(((x, z), e));
                }
            }
        }
        failures
    }

    /// Unloads every in-memory chunk, without touching disk.
    pub fn unload_all(&mut self) {
        for chunk in self.chunks.iter_mut() {
            *chunk = None;
        }
    }

    /// Yields `(x, z, chunk)` for every slot with a non-null in-memory chunk, in row-major
    /// order.
    pub fn iter_chunks(&self) -> impl Iterator<Item = (u8, u8, &NbtCompound)> {
        (0..GRID as u8).flat_map(move |z| {
            (0..GRID as u8).filter_map(move |x| {
                self.chunks[slot_index(x, z)].as_ref().map(|c| (x, z, c))
            })
        })
    }
}

#[allow(non_snake_case)]
fn NbtError_into_region(e: NbtError) -> RegionError {
    RegionError::from(e)
}

fn unix_now() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn compress(compression: Compression, data: &[u8]) -> Result<Vec<u8>, RegionError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Flate2Level::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Flate2Level::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
    }
}

fn decompress(compression: Compression, data: &[u8]) -> Result<Vec<u8>, RegionError> {
    let mut out = Vec::new();
    match compression {
        Compression::None => out.extend_from_slice(data),
        Compression::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        Compression::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut out)?;
        }
    }
    Ok(out)
}

impl std::fmt::Debug for RegionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFile")
            .field("path", &self.path)
            .field("present_slots", &self.locations.iter().filter(|&&l| l != 0).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn temp_path(tag: &str) -> PathBuf {
        let suffix: u32 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("nbt-region-test-{}-{:08x}.mca", tag, suffix))
    }

    fn sample_chunk(n: i32) -> NbtCompound {
        let mut chunk = NbtCompound::new();
        chunk.add("n", n, false).unwrap();
        chunk
    }

    #[test]
    fn fresh_file_has_zeroed_header() {
        let path = temp_path("fresh");
        let region = RegionFile::open(&path).unwrap();
        assert_eq!(region.locations, [0u32; SLOT_COUNT]);
        assert_eq!(region.timestamps, [0u32; SLOT_COUNT]);
        std::fs::remove_file(&path).unwrap();
    }

    // Scenario S2: saving a single chunk at (0, 0) places it at sector 2 (right after the
    // 8 KiB header) and the file grows to exactly one data sector.
    #[test]
    fn save_single_chunk_scenario() {
        let path = temp_path("s2");
        let mut region = RegionFile::open(&path).unwrap();
        region.set_chunk(0, 0, Some(sample_chunk(1)));
        region.save_chunk(0, 0, Compression::Zlib).unwrap();

        assert_eq!(region.locations[0] >> 8, 2);
        assert_eq!(region.locations[0] & 0xff, 1);

        let file_len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(file_len, HEADER_BYTES + SECTOR_SIZE);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn save_then_load_round_trips_chunk() {
        let path = temp_path("roundtrip");
        let mut region = RegionFile::open(&path).unwrap();
        region.set_chunk(3, 5, Some(sample_chunk(42)));
        region.save_chunk(3, 5, Compression::Gzip).unwrap();
        region.unload_all();
        assert_eq!(region.get_chunk(3, 5), None);

        let loaded = region.load_chunk(3, 5).unwrap().unwrap();
        assert_eq!(loaded.get("n"), Some(&crate::tag::NbtTag::Int(42)));
        assert_eq!(region.get_chunk(3, 5), Some(&loaded));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_chunk_loads_as_none() {
        let path = temp_path("missing");
        let mut region = RegionFile::open(&path).unwrap();
        assert_eq!(region.load_chunk(10, 10).unwrap(), None);
        std::fs::remove_file(&path).unwrap();
    }

    // Scenario S3: growing a chunk in place shifts every later slot by the same sector delta.
    #[test]
    fn resize_growth_shifts_later_slots() {
        let path = temp_path("s3");
        let mut region = RegionFile::open(&path).unwrap();

        region.set_chunk(0, 0, Some(sample_chunk(1)));
        region.save_chunk(0, 0, Compression::None).unwrap();
        region.set_chunk(1, 0, Some(sample_chunk(2)));
        region.save_chunk(1, 0, Compression::None).unwrap();

        let (first_offset, _) = region.offset_size(slot_index(0, 0));
        let (second_offset_before, _) = region.offset_size(slot_index(1, 0));
        assert!(second_offset_before > first_offset);

        // Grow the first chunk's payload well past one sector.
        let mut big = NbtCompound::new();
        big.add("blob", vec![0i8; 6000], false).unwrap();
        region.set_chunk(0, 0, Some(big));
        region.save_chunk(0, 0, Compression::None).unwrap();

        let (first_offset_after, first_size_after) = region.offset_size(slot_index(0, 0));
        let (second_offset_after, _) = region.offset_size(slot_index(1, 0));
        assert_eq!(first_offset_after, first_offset);
        assert!(first_size_after > 1);
        assert_eq!(second_offset_after, first_offset_after + first_size_after);

        std::fs::remove_file(&path).unwrap();
    }

    // Scenario S4: deleting a chunk shifts every later slot back by the freed size.
    #[test]
    fn delete_shifts_later_slots_back() {
        let path = temp_path("s4");
        let mut region = RegionFile::open(&path).unwrap();

        region.set_chunk(0, 0, Some(sample_chunk(1)));
        region.save_chunk(0, 0, Compression::None).unwrap();
        region.set_chunk(1, 0, Some(sample_chunk(2)));
        region.save_chunk(1, 0, Compression::None).unwrap();

        let (_, first_size) = region.offset_size(slot_index(0, 0));
        let (second_offset_before, _) = region.offset_size(slot_index(1, 0));

        region.delete_chunk(0, 0).unwrap();

        assert_eq!(region.locations[slot_index(0, 0)], 0);
        assert_eq!(region.get_chunk(0, 0), None);
        let (second_offset_after, _) = region.offset_size(slot_index(1, 0));
        assert_eq!(second_offset_after, second_offset_before - first_size);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn delete_clears_cached_chunk_so_save_is_a_noop() {
        let path = temp_path("delete-cache");
        let mut region = RegionFile::open(&path).unwrap();
        region.set_chunk(0, 0, Some(sample_chunk(1)));
        region.save_chunk(0, 0, Compression::None).unwrap();
        region.delete_chunk(0, 0).unwrap();

        // A stray save_chunk after delete must not resurrect the chunk: the cache was cleared.
        region.save_chunk(0, 0, Compression::None).unwrap();
        assert_eq!(region.locations[slot_index(0, 0)], 0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn header_round_trips_through_reopen() {
        let path = temp_path("reopen");
        {
            let mut region = RegionFile::open(&path).unwrap();
            region.set_chunk(7, 9, Some(sample_chunk(99)));
            region.save_chunk(7, 9, Compression::Zlib).unwrap();
        }

        let mut reopened = RegionFile::open(&path).unwrap();
        assert_ne!(reopened.locations[slot_index(7, 9)], 0);
        let loaded = reopened.load_chunk(7, 9).unwrap().unwrap();
        assert_eq!(loaded.get("n"), Some(&crate::tag::NbtTag::Int(99)));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_all_collects_failures_without_aborting() {
        let path = temp_path("load-all");
        let mut region = RegionFile::open(&path).unwrap();
        region.set_chunk(0, 0, Some(sample_chunk(1)));
        region.save_chunk(0, 0, Compression::None).unwrap();

        let failures = region.load_all();
        assert!(failures.is_empty());
        assert_eq!(region.get_chunk(0, 0), Some(&sample_chunk(1)));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn compression_round_trip_each_scheme() {
        for compression in [Compression::Gzip, Compression::Zlib, Compression::None] {
            let path = temp_path("compression");
            let mut region = RegionFile::open(&path).unwrap();
            region.set_chunk(2, 2, Some(sample_chunk(7)));
            region.save_chunk(2, 2, compression).unwrap();
            region.unload_chunk(2, 2);
            let loaded = region.load_chunk(2, 2).unwrap().unwrap();
            assert_eq!(loaded.get("n"), Some(&crate::tag::NbtTag::Int(7)));
            std::fs::remove_file(&path).unwrap();
        }
    }
}
