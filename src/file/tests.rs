//! Integration tests for page files over both backing stores

use std::path::Path;

use super::*;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

fn open(path: &Path, page_size: usize, cache_pages: usize) -> PersistentPageFile<RawPage> {
    PersistentPageFile::open(path, &PageFileConfig::with_cache_pages(page_size, cache_pages))
        .unwrap()
}

fn slot_tag(path: &Path, page_size: usize, id: PageId) -> u32 {
    let bytes = std::fs::read(path).unwrap();
    let offset = 8 + id as usize * page_size;
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn test_eviction_scenario() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("scenario.db");
    let mut file = open(&path, 64, 2);

    let a = file.write_page(RawPage::new(b"page A".to_vec())).unwrap();
    let b = file.write_page(RawPage::new(b"page B".to_vec())).unwrap();
    let c = file.write_page(RawPage::new(b"page C".to_vec())).unwrap();
    assert_eq!((a, b, c), (0, 1, 2));

    // A was evicted to disk when C came in
    assert!(!file.is_page_cached(a));
    assert!(file.is_page_cached(b));
    assert!(file.is_page_cached(c));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8 + 64);
    assert_eq!(slot_tag(&path, 64, a), FILLED_PAGE);

    // Reading A brings it back and pushes out B
    let page = file.read_page(a).unwrap().unwrap();
    assert_eq!(page.data(), b"page A");
    assert!(file.is_page_cached(a));
    assert!(!file.is_page_cached(b));
    assert!(file.is_page_cached(c));
    assert_eq!(slot_tag(&path, 64, b), FILLED_PAGE);
    assert_eq!(file.physical_read_access(), 1);
    assert_eq!(file.physical_write_access(), 2);

    file.close().unwrap();
}

#[test]
fn test_write_back_completeness() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    let mut file = open(&path, 64, 3);
    let ids: Vec<PageId> = (0..20u8)
        .map(|i| file.write_page(RawPage::new(vec![i; i as usize])).unwrap())
        .collect();
    for id in [3, 7, 19] {
        file.delete_page(id).unwrap();
    }

    for (i, &id) in ids.iter().enumerate() {
        let page = file.read_page(id).unwrap();
        if [3, 7, 19].contains(&id) {
            assert!(page.is_none());
        } else {
            assert_eq!(page.unwrap().data(), vec![i as u8; i].as_slice());
        }
    }
    file.close().unwrap();

    // Everything survives a reopen
    let mut file = open(&path, 64, 3);
    assert_eq!(file.next_page_id(), 20);
    assert_eq!(file.free_page_ids(), &[3, 7, 19]);
    for (i, &id) in ids.iter().enumerate() {
        let page = file.read_page(id).unwrap();
        if [3, 7, 19].contains(&id) {
            assert!(page.is_none());
        } else {
            assert_eq!(page.unwrap().data(), vec![i as u8; i].as_slice());
        }
    }
}

#[test]
fn test_id_reuse_lifo_persistent() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");
    let mut file = open(&path, 64, 2);

    for i in 0..5u8 {
        file.write_page(RawPage::new(vec![i])).unwrap();
    }
    file.delete_page(1).unwrap();
    file.delete_page(3).unwrap();

    assert_eq!(file.write_page(RawPage::new(b"x".to_vec())).unwrap(), 3);
    assert_eq!(file.write_page(RawPage::new(b"y".to_vec())).unwrap(), 1);
    assert_eq!(file.write_page(RawPage::new(b"z".to_vec())).unwrap(), 5);
}

#[test]
fn test_empty_slot_round_trip() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    {
        let mut file = open(&path, 32, 1);
        for i in 0..3u8 {
            file.write_page(RawPage::new(vec![i])).unwrap();
        }
        file.delete_page(1).unwrap();
        assert!(file.read_page(1).unwrap().is_none());
        assert_eq!(slot_tag(&path, 32, 1), EMPTY_PAGE);
        file.close().unwrap();
    }

    let mut file = open(&path, 32, 1);
    assert_eq!(file.free_page_ids(), &[1]);
    assert!(file.read_page(1).unwrap().is_none());
    assert_eq!(file.write_page(RawPage::new(b"again".to_vec())).unwrap(), 1);
}

#[test]
fn test_reopen_with_trailing_empty_slot() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    {
        let mut file = open(&path, 32, 4);
        file.write_page(RawPage::new(b"a".to_vec())).unwrap();
        let last = file.write_page(RawPage::new(b"b".to_vec())).unwrap();
        file.delete_page(last).unwrap();
        file.close().unwrap();
    }

    let mut file = open(&path, 32, 4);
    assert_eq!(file.free_page_ids(), &[1]);
    assert_eq!(file.next_page_id(), 2);
    assert_eq!(file.write_page(RawPage::new(b"c".to_vec())).unwrap(), 1);
    assert_eq!(file.write_page(RawPage::new(b"d".to_vec())).unwrap(), 2);
}

#[test]
fn test_header_rejection() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    {
        let mut file = open(&path, 32, 1);
        file.write_page(RawPage::new(b"data".to_vec())).unwrap();
        file.close().unwrap();
    }

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[3] = bytes[3].wrapping_add(1);
    std::fs::write(&path, &bytes).unwrap();

    let result = PersistentPageFile::<RawPage>::open(&path, &PageFileConfig::default());
    assert!(matches!(result, Err(FileError::InvalidFormat { .. })));
    // Nothing was written back over the corrupted store
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_capacity_overflow() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");
    let mut file = open(&path, 16, 1);

    file.write_page(RawPage::new(vec![1u8; 8])).unwrap();
    // Fits the cache, too big for a slot
    let big = file.write_page(RawPage::new(vec![2u8; 9])).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8 + 16);

    // Evicting the big page fails and leaves its slot alone
    let result = file.write_page(RawPage::new(vec![3u8; 2]));
    assert!(matches!(
        result,
        Err(FileError::PageTooLarge { page_id, size: 17, max: 16 }) if page_id == big
    ));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8 + 16);
    assert!(file.is_page_cached(big));

    // The rejected page's id was never handed out
    assert_eq!(file.next_page_id(), 2);
    assert!(file.free_page_ids().is_empty());
    assert!(matches!(
        file.read_page(2),
        Err(FileError::PageNotAllocated(2))
    ));

    assert!(matches!(file.flush(), Err(FileError::PageTooLarge { .. })));
}

#[test]
fn test_failed_write_keeps_free_id() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");
    let mut file = open(&path, 16, 1);

    let a = file.write_page(RawPage::new(vec![1u8; 2])).unwrap();
    file.write_page(RawPage::new(vec![2u8; 2])).unwrap();
    file.write_page(RawPage::new(vec![3u8; 9])).unwrap();
    file.delete_page(a).unwrap();
    assert_eq!(file.free_page_ids(), &[a]);

    // Reuses a, then fails evicting the oversized page
    assert!(file.write_page(RawPage::new(vec![4u8; 2])).is_err());
    assert_eq!(file.free_page_ids(), &[a]);
    assert_eq!(file.next_page_id(), 3);
    assert!(file.read_page(a).unwrap().is_none());
    assert!(matches!(
        file.delete_page(a),
        Err(FileError::PageNotAllocated(_))
    ));
}

#[test]
fn test_clear_truncates_to_header() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");
    let mut file = open(&path, 32, 2);

    for i in 0..5u8 {
        file.write_page(RawPage::new(vec![i])).unwrap();
    }
    file.clear().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
    assert_eq!(file.cached_page_count(), 0);
    assert_eq!(file.next_page_id(), 0);

    // Cleared pages are not written back on close
    file.close().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
}

#[test]
fn test_drop_flushes_cached_pages() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    {
        let mut file = open(&path, 32, 10);
        file.write_page(RawPage::new(b"kept".to_vec())).unwrap();
        // file is dropped here, should flush
    }

    let mut file = open(&path, 32, 10);
    assert_eq!(file.read_page(0).unwrap().unwrap().data(), b"kept");
}

#[test]
fn test_existing_store_keeps_page_size() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");

    open(&path, 128, 4).close().unwrap();

    let file = PersistentPageFile::<RawPage>::open(&path, &PageFileConfig::new(64, 512)).unwrap();
    assert_eq!(file.page_size(), 128);
    assert_eq!(file.header().page_size(), 128);
    assert_eq!(file.cache_capacity(), 4);
}

#[test]
fn test_dirty_page_written_like_clean_page() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("test.db");
    let mut file = open(&path, 32, 1);

    let mut dirty = RawPage::new(b"dirty".to_vec());
    dirty.set_dirty(true);
    file.write_page(dirty).unwrap();
    file.write_page(RawPage::new(b"clean".to_vec())).unwrap();
    file.write_page(RawPage::new(b"other".to_vec())).unwrap();

    assert_eq!(file.physical_write_access(), 2);
    assert_eq!(file.read_page(0).unwrap().unwrap().data(), b"dirty");
    assert_eq!(file.read_page(1).unwrap().unwrap().data(), b"clean");
}

#[test]
fn test_memory_and_persistent_count_alike() {
    let temp_dir = setup_test_dir();
    let config = PageFileConfig::with_cache_pages(64, 3);
    let mut persistent =
        PersistentPageFile::<RawPage>::open(temp_dir.path().join("test.db"), &config).unwrap();
    let mut memory = MemoryPageFile::<RawPage>::new(&config).unwrap();

    for round in 0..4u64 {
        for i in 0..6u8 {
            persistent.write_page(RawPage::new(vec![i])).unwrap();
            memory.write_page(RawPage::new(vec![i])).unwrap();
        }
        let next = persistent.next_page_id();
        for id in (0..6).map(|i| i * (round + 1) % next) {
            persistent.read_page(id).unwrap();
            memory.read_page(id).unwrap();
        }
    }

    assert_eq!(persistent.statistics(), memory.statistics());
    assert!(memory.io_access() > 0);
}
