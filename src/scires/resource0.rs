use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use packed_struct::prelude::*;

use crate::error::{Error, Result};
use crate::scires::decode::{self, DecodedResource};
use crate::scires::resource::{
    CompressedBlock, CompressionMethod, ResourceData, ResourceEntry, ResourceID, ResourceType,
};

const RESOURCE_MAP: &str = "resource.map";
const MAP_RECORD_SIZE: usize = 6;
const DATA_HEADER_SIZE: usize = 8;
// The stored compressed size counts the decompressed-size and method words.
const DATA_HEADER_OVERCOUNT: u16 = 4;

#[derive(PackedStruct)]
#[packed_struct(endian = "lsb")]
struct MapRecord {
    type_number: u16,
    position: u32,
}

#[derive(PackedStruct)]
#[packed_struct(endian = "lsb")]
struct DataHeader {
    id: u16,
    comp_size: u16,
    decomp_size: u16,
    comp_method: u16,
}

/// Parses the packed 6-byte records of `resource.map`. The final record is
/// the end marker and is not returned.
pub fn parse_resource_map(input: &[u8]) -> Result<Vec<ResourceEntry>> {
    if input.len() % MAP_RECORD_SIZE != 0 {
        return Err(Error::format(format!(
            "resource map is {} bytes, not a multiple of {}",
            input.len(),
            MAP_RECORD_SIZE
        )));
    }
    if input.is_empty() {
        return Err(Error::format("resource map is empty"));
    }
    let (records, sentinel) = input.split_at(input.len() - MAP_RECORD_SIZE);
    if sentinel.iter().any(|&b| b != 0xff) {
        log::warn!("resource map end marker is {:02x?}, dropping it anyway", sentinel);
    }

    let mut entries = Vec::with_capacity(records.len() / MAP_RECORD_SIZE);
    for record in records.chunks_exact(MAP_RECORD_SIZE) {
        let record = MapRecord::unpack_from_slice(record)
            .map_err(|e| Error::format(format!("bad resource map record: {:?}", e)))?;
        let id = match ResourceID::from_packed(record.type_number) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("skipping resource map record: {}", e);
                continue;
            }
        };
        entries.push(ResourceEntry {
            id,
            volume: (record.position >> 26) as u8,
            offset: record.position & 0x3ff_ffff,
        });
    }
    Ok(entries)
}

/// Cache state of a single resource.
#[derive(Clone, Debug)]
pub enum LoadState {
    Unloaded,
    Loaded(Arc<ResourceData>),
    /// The last attempt failed; loading again retries.
    Failed(String),
}

struct Slot {
    entry: ResourceEntry,
    state: Mutex<LoadState>,
}

/// The resource directory of an SCI0 game. Owns the open `resource.nnn`
/// volumes for its whole lifetime and caches decompressed resources.
pub struct ResourceDirectory {
    path: PathBuf,
    slots: Vec<Slot>,
    index: HashMap<ResourceID, usize>,
    by_type: BTreeMap<ResourceType, Vec<usize>>,
    volumes: HashMap<u8, Mutex<File>>,
}

/// Refers to one directory entry; cannot outlive its directory.
#[derive(Clone, Copy)]
pub struct ResourceHandle<'a> {
    directory: &'a ResourceDirectory,
    index: usize,
}

impl<'a> ResourceHandle<'a> {
    pub fn entry(&self) -> &'a ResourceEntry {
        &self.directory.slots[self.index].entry
    }

    pub fn id(&self) -> ResourceID {
        self.entry().id
    }

    pub fn read_block(&self) -> Result<CompressedBlock> {
        self.directory.read_block(*self)
    }

    pub fn ensure_loaded(&self) -> Result<Arc<ResourceData>> {
        self.directory.ensure_loaded(*self)
    }

    pub fn state(&self) -> LoadState {
        self.directory.state(*self)
    }

    pub fn decode(&self) -> Result<DecodedResource> {
        self.directory.decode(*self)
    }
}

fn volume_name(volume: u8) -> String {
    format!("resource.{:03}", volume)
}

fn with_path(err: io::Error, path: &Path) -> Error {
    Error::Io(io::Error::new(err.kind(), format!("{}: {}", path.display(), err)))
}

impl ResourceDirectory {
    /// Opens a game directory, or a `resource.map` file directly.
    pub fn open(path: &Path) -> Result<Self> {
        let (dir, map_path) = if path.is_dir() {
            (path.to_path_buf(), path.join(RESOURCE_MAP))
        } else {
            (path.parent().map(Path::to_path_buf).unwrap_or_default(), path.to_path_buf())
        };
        let map_data = std::fs::read(&map_path).map_err(|e| with_path(e, &map_path))?;
        let entries = parse_resource_map(&map_data)?;

        let mut slots: Vec<Slot> = Vec::with_capacity(entries.len());
        let mut index: HashMap<ResourceID, usize> = HashMap::new();
        let mut volumes: HashMap<u8, Mutex<File>> = HashMap::new();
        for entry in entries {
            match index.entry(entry.id) {
                Entry::Occupied(o) => {
                    log::warn!(
                        "{} listed again in resource.{:03} at {}, keeping resource.{:03}",
                        entry.id,
                        entry.volume,
                        entry.offset,
                        slots[*o.get()].entry.volume
                    );
                    continue;
                }
                Entry::Vacant(v) => {
                    v.insert(slots.len());
                }
            }
            if let Entry::Vacant(v) = volumes.entry(entry.volume) {
                let volume_path = dir.join(volume_name(entry.volume));
                let file = File::open(&volume_path).map_err(|e| with_path(e, &volume_path))?;
                v.insert(Mutex::new(file));
            }
            slots.push(Slot { entry, state: Mutex::new(LoadState::Unloaded) });
        }

        let mut by_type: BTreeMap<ResourceType, Vec<usize>> = BTreeMap::new();
        for (n, slot) in slots.iter().enumerate() {
            by_type.entry(slot.entry.id.rtype).or_default().push(n);
        }
        for list in by_type.values_mut() {
            list.sort_by_key(|&n| slots[n].entry.id.num);
        }

        log::debug!("{}: {} resources in {} volumes", map_path.display(), slots.len(), volumes.len());
        Ok(Self { path: dir, slots, index, by_type, volumes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn lookup(&self, rtype: ResourceType, num: u16) -> Result<ResourceHandle<'_>> {
        let id = ResourceID::new(rtype, num);
        self.index
            .get(&id)
            .map(|&index| ResourceHandle { directory: self, index })
            .ok_or(Error::NotFound(id))
    }

    /// All entries in map order.
    pub fn entries(&self) -> impl Iterator<Item = ResourceHandle<'_>> + '_ {
        (0..self.slots.len()).map(move |index| ResourceHandle { directory: self, index })
    }

    /// Entries of one type, sorted by resource number.
    pub fn entries_of_type(&self, rtype: ResourceType) -> impl Iterator<Item = ResourceHandle<'_>> + '_ {
        self.by_type
            .get(&rtype)
            .into_iter()
            .flatten()
            .map(move |&index| ResourceHandle { directory: self, index })
    }

    /// Reads the data record of an entry without decompressing it.
    pub fn read_block(&self, handle: ResourceHandle<'_>) -> Result<CompressedBlock> {
        let entry = handle.entry();
        let volume = self
            .volumes
            .get(&entry.volume)
            .ok_or_else(|| Error::format(format!("{} refers to unopened {}", entry.id, volume_name(entry.volume))))?;
        let mut res_file = volume.lock().unwrap_or_else(PoisonError::into_inner);

        res_file.seek(SeekFrom::Start(entry.offset.into()))?;
        let mut raw_header = [0u8; DATA_HEADER_SIZE];
        res_file.read_exact(&mut raw_header)?;
        let header = DataHeader::unpack_from_slice(&raw_header)
            .map_err(|e| Error::format(format!("bad data record header: {:?}", e)))?;
        if header.id != entry.id.packed() {
            log::warn!(
                "{}: record header id 0x{:04x} does not match map id 0x{:04x}",
                entry.id,
                header.id,
                entry.id.packed()
            );
        }
        if header.comp_size < DATA_HEADER_OVERCOUNT {
            return Err(Error::format(format!("{}: compressed size {} is too small", entry.id, header.comp_size)));
        }
        let compressed_size = header.comp_size - DATA_HEADER_OVERCOUNT;
        let method = CompressionMethod::new(header.comp_method)?;

        let mut data = vec![0u8; compressed_size as usize];
        res_file.read_exact(&mut data)?;
        Ok(CompressedBlock { method, compressed_size, decompressed_size: header.decomp_size, data })
    }

    /// Returns the decompressed resource, decoding it on first use. A failed
    /// decode leaves nothing cached, so a later call tries again.
    pub fn ensure_loaded(&self, handle: ResourceHandle<'_>) -> Result<Arc<ResourceData>> {
        let slot = &self.slots[handle.index];
        if let LoadState::Loaded(data) = &*slot.state.lock().unwrap_or_else(PoisonError::into_inner) {
            return Ok(Arc::clone(data));
        }

        let result = self.read_block(handle).and_then(|block| {
            let data = block.decompress()?;
            Ok(ResourceData { id: slot.entry.id, method: block.method, compressed_size: block.compressed_size, data })
        });

        let mut state = slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let LoadState::Loaded(data) = &*state {
            // Another thread finished first; its result is identical.
            return Ok(Arc::clone(data));
        }
        match result {
            Ok(data) => {
                log::debug!("{}: loaded {} bytes ({})", data.id, data.data.len(), data.method);
                let data = Arc::new(data);
                *state = LoadState::Loaded(Arc::clone(&data));
                Ok(data)
            }
            Err(e) => {
                log::debug!("{}: load failed: {}", slot.entry.id, e);
                *state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn state(&self, handle: ResourceHandle<'_>) -> LoadState {
        self.slots[handle.index].state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Looks up and loads a resource in one go.
    pub fn get(&self, rtype: ResourceType, num: u16) -> Result<Arc<ResourceData>> {
        self.lookup(rtype, num)?.ensure_loaded()
    }

    pub fn decode(&self, handle: ResourceHandle<'_>) -> Result<DecodedResource> {
        let resource = self.ensure_loaded(handle)?;
        decode::decode(handle.id().rtype, &resource.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rtype: u8, num: u16, volume: u8, offset: u32) -> [u8; 6] {
        let id = ((rtype as u16) << 11) | num;
        let position = ((volume as u32) << 26) | offset;
        let mut out = [0u8; 6];
        out[..2].copy_from_slice(&id.to_le_bytes());
        out[2..].copy_from_slice(&position.to_le_bytes());
        out
    }

    #[test]
    fn map_drops_sentinel() {
        let mut map = Vec::new();
        map.extend_from_slice(&record(0, 5, 0, 0));
        map.extend_from_slice(&record(7, 2047, 63, 0x3ff_ffff));
        map.extend_from_slice(&[0xff; 6]);
        let entries = parse_resource_map(&map).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, ResourceID::new(ResourceType::View, 5));
        assert_eq!(entries[1].id, ResourceID::new(ResourceType::Font, 2047));
        assert_eq!(entries[1].volume, 63);
        assert_eq!(entries[1].offset, 0x3ff_ffff);
    }

    #[test]
    fn unknown_type_records_are_skipped() {
        let mut map = Vec::new();
        map.extend_from_slice(&record(12, 1, 0, 0));
        map.extend_from_slice(&record(3, 7, 0, 16));
        map.extend_from_slice(&[0xff; 6]);
        let entries = parse_resource_map(&map).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, ResourceID::new(ResourceType::Text, 7));
    }

    #[test]
    fn map_length_must_divide_stride() {
        assert!(matches!(parse_resource_map(&[0u8; 7]), Err(Error::Format(_))));
        assert!(matches!(parse_resource_map(&[]), Err(Error::Format(_))));
    }

    #[test]
    fn sentinel_only_map_is_empty() {
        assert!(parse_resource_map(&[0xff; 6]).unwrap().is_empty());
    }
}
