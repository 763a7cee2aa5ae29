use std::fs;
use std::path::Path;
use std::sync::Arc;

use sci0_decode::scires::decode::DecodedResource;
use sci0_decode::scires::resource::{CompressionMethod, ResourceType};
use sci0_decode::scires::resource0::{LoadState, ResourceDirectory};
use sci0_decode::Error;

struct Record {
    rtype: ResourceType,
    num: u16,
    method: u16,
    decomp_size: u16,
    payload: Vec<u8>,
}

fn record(rtype: ResourceType, num: u16, method: u16, decomp_size: u16, payload: &[u8]) -> Record {
    Record { rtype, num, method, decomp_size, payload: payload.to_vec() }
}

fn stored(rtype: ResourceType, num: u16, payload: &[u8]) -> Record {
    record(rtype, num, 0, payload.len() as u16, payload)
}

fn packed_id(rtype: ResourceType, num: u16) -> u16 {
    ((u8::from(rtype) as u16) << 11) | num
}

/// Writes `resource.map` and `resource.000` holding the given records.
fn write_game(dir: &Path, records: &[Record]) {
    let mut map = Vec::new();
    let mut volume = Vec::new();
    for r in records {
        let id = packed_id(r.rtype, r.num);
        map.extend_from_slice(&id.to_le_bytes());
        map.extend_from_slice(&(volume.len() as u32).to_le_bytes());

        volume.extend_from_slice(&id.to_le_bytes());
        volume.extend_from_slice(&(r.payload.len() as u16 + 4).to_le_bytes());
        volume.extend_from_slice(&r.decomp_size.to_le_bytes());
        volume.extend_from_slice(&r.method.to_le_bytes());
        volume.extend_from_slice(&r.payload);
    }
    map.extend_from_slice(&[0xff; 6]);
    fs::write(dir.join("resource.map"), map).unwrap();
    fs::write(dir.join("resource.000"), volume).unwrap();
}

// "xyzx" with a three-leaf tree, terminator 0
const HUFFMAN_XYZX: [u8; 13] = [4, 0x00, 0x00, 0x12, b'x', 0, 0x00, 0x10, b'y', 0, 0x5b, 0xd3, 0x00];

fn sample_game() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_game(
        dir.path(),
        &[
            stored(ResourceType::Text, 2, b"Hello\0World\0"),
            stored(ResourceType::Text, 1, b"first\0"),
            record(ResourceType::Vocab, 0, 2, 4, &HUFFMAN_XYZX),
            stored(ResourceType::Script, 0, &[1, 2, 3]),
            record(ResourceType::Font, 0, 7, 3, &[1, 2, 3]),
            record(ResourceType::Cursor, 1, 0, 10, &[1, 2, 3]),
        ],
    );
    dir
}

#[test]
fn sentinel_is_dropped() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    assert_eq!(directory.len(), 6);
    assert_eq!(directory.path(), game.path());
    assert!(directory.lookup(ResourceType::Text, 1).is_ok());
}

#[test]
fn map_file_can_be_opened_directly() {
    let game = sample_game();
    let directory = ResourceDirectory::open(&game.path().join("resource.map")).unwrap();
    assert_eq!(directory.len(), 6);
}

#[test]
fn unknown_resource_is_not_found() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    match directory.lookup(ResourceType::Picture, 1) {
        Err(Error::NotFound(id)) => assert_eq!(id.to_string(), "pic.001"),
        _ => panic!("expected NotFound"),
    }
}

#[test]
fn loads_are_cached() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    let handle = directory.lookup(ResourceType::Text, 2).unwrap();
    assert!(matches!(handle.state(), LoadState::Unloaded));

    let first = handle.ensure_loaded().unwrap();
    assert_eq!(first.data, b"Hello\0World\0");
    assert_eq!(first.method, CompressionMethod::None);
    assert!(matches!(handle.state(), LoadState::Loaded(_)));

    let second = directory.get(ResourceType::Text, 2).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn huffman_resource_decompresses() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    let vocab = directory.get(ResourceType::Vocab, 0).unwrap();
    assert_eq!(vocab.method, CompressionMethod::Huffman);
    assert_eq!(vocab.compressed_size as usize, HUFFMAN_XYZX.len());
    assert_eq!(vocab.data, b"xyzx");
}

/// Packs 9-bit LZW codes LSB first.
fn pack_lzw_codes(codes: &[u16]) -> Vec<u8> {
    let mut out = vec![0u8; (codes.len() * 9).div_ceil(8)];
    for (n, &code) in codes.iter().enumerate() {
        for bit in 0..9 {
            if (code >> bit) & 1 != 0 {
                let pos = n * 9 + bit;
                out[pos / 8] |= 1 << (pos % 8);
            }
        }
    }
    out
}

#[test]
fn lzw_resource_decompresses() {
    let dir = tempfile::tempdir().unwrap();
    let payload = pack_lzw_codes(&[0x61, 0x62, 0x102, 0x104, 0x101]);
    write_game(
        dir.path(),
        &[record(ResourceType::Script, 3, 1, 7, &payload), record(ResourceType::Script, 4, 1, 9, &payload)],
    );
    let directory = ResourceDirectory::open(dir.path()).unwrap();
    let script = directory.get(ResourceType::Script, 3).unwrap();
    assert_eq!(script.method, CompressionMethod::LZW);
    assert_eq!(script.data, b"abababa");
    assert!(matches!(directory.get(ResourceType::Script, 4), Err(Error::CorruptStream(_))));
}

#[test]
fn long_stored_payload_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path(), &[record(ResourceType::Text, 0, 0, 2, b"abc")]);
    let directory = ResourceDirectory::open(dir.path()).unwrap();
    assert!(matches!(directory.get(ResourceType::Text, 0), Err(Error::CorruptStream(_))));
}

#[test]
fn failed_load_is_retryable() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    let handle = directory.lookup(ResourceType::Font, 0).unwrap();
    assert!(matches!(handle.ensure_loaded(), Err(Error::UnsupportedCodec(7))));
    assert!(matches!(handle.state(), LoadState::Failed(_)));
    assert!(matches!(handle.ensure_loaded(), Err(Error::UnsupportedCodec(7))));

    // other resources are unaffected
    assert!(directory.get(ResourceType::Text, 1).is_ok());
}

#[test]
fn short_stored_payload_is_corrupt() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    assert!(matches!(directory.get(ResourceType::Cursor, 1), Err(Error::CorruptStream(_))));
}

#[test]
fn entries_of_type_are_sorted() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    let texts: Vec<u16> = directory.entries_of_type(ResourceType::Text).map(|h| h.id().num).collect();
    assert_eq!(texts, vec![1, 2]);
    assert_eq!(directory.entries_of_type(ResourceType::Sound).count(), 0);
    assert_eq!(directory.entries().count(), 6);
}

#[test]
fn decode_dispatches_on_type() {
    let game = sample_game();
    let directory = ResourceDirectory::open(game.path()).unwrap();
    match directory.lookup(ResourceType::Text, 2).unwrap().decode().unwrap() {
        DecodedResource::Text(text) => assert_eq!(text.get_string(1).as_deref(), Some("World")),
        other => panic!("unexpected {:?}", other),
    }
    let script = directory.lookup(ResourceType::Script, 0).unwrap();
    assert!(matches!(script.decode(), Err(Error::NotImplemented(ResourceType::Script))));
}

#[test]
fn duplicate_entries_keep_the_first() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path(), &[stored(ResourceType::Text, 5, b"one\0"), stored(ResourceType::Text, 5, b"two\0")]);
    let directory = ResourceDirectory::open(dir.path()).unwrap();
    assert_eq!(directory.len(), 1);
    assert_eq!(directory.get(ResourceType::Text, 5).unwrap().data, b"one\0");
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(ResourceDirectory::open(dir.path()), Err(Error::Io(_))));

    write_game(dir.path(), &[stored(ResourceType::Text, 0, b"x\0")]);
    fs::remove_file(dir.path().join("resource.000")).unwrap();
    assert!(matches!(ResourceDirectory::open(dir.path()), Err(Error::Io(_))));
}

#[test]
fn misaligned_map_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("resource.map"), [0u8; 8]).unwrap();
    assert!(matches!(ResourceDirectory::open(dir.path()), Err(Error::Format(_))));
}
