use anyhow::Result;
use pagestore::storage::buffer::clock::ClockReplacer;
use pagestore::storage::{
    BufferPoolManager, FileDiskManager, MemoryDiskManager, PageId, Record, RecordId, StorageConfig,
    StorageError,
};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn memory_pool(pool_size: usize) -> BufferPoolManager {
    BufferPoolManager::new(
        Arc::new(MemoryDiskManager::new()),
        Box::new(ClockReplacer::new(pool_size)),
        pool_size,
    )
}

#[test]
fn test_page_fill_and_evict() -> Result<()> {
    init_logger();
    let dir = tempdir()?;
    let config = StorageConfig::new(dir.path().join("fill.db"))
        .with_pool_size(10)
        .with_truncate(true);
    let buffer_pool = BufferPoolManager::open(&config)?;

    for expected in 0..10 {
        let page = buffer_pool.new_page()?;
        assert_eq!(page.page_id(), PageId(expected));
    }
    assert!(matches!(
        buffer_pool.new_page(),
        Err(StorageError::UsableFrameNotFound)
    ));

    for pid in 0..5 {
        buffer_pool.unpin_page(PageId(pid), true)?;
        buffer_pool.flush_page(PageId(pid))?;
    }
    assert_eq!(buffer_pool.evictable_frames(), 5);

    for _ in 0..4 {
        buffer_pool.new_page()?;
    }
    assert_eq!(buffer_pool.evictable_frames(), 1);

    // Take the last evictable frame, then page 0 has nowhere to go
    buffer_pool.new_page()?;
    assert!(!buffer_pool.is_resident(PageId(0)));
    assert!(matches!(
        buffer_pool.fetch_page(PageId(0)),
        Err(StorageError::UsableFrameNotFound)
    ));

    Ok(())
}

#[test]
fn test_capacity_recovers_after_unpin() -> Result<()> {
    let buffer_pool = memory_pool(6);
    let mut page_ids = Vec::new();
    for _ in 0..6 {
        page_ids.push(buffer_pool.new_page()?.page_id());
    }
    assert!(buffer_pool.new_page().is_err());

    for page_id in &page_ids[..3] {
        buffer_pool.unpin_page(*page_id, false)?;
    }

    for _ in 0..3 {
        buffer_pool.new_page()?;
    }
    assert!(buffer_pool.new_page().is_err());

    Ok(())
}

#[test]
fn test_disk_persistence() -> Result<()> {
    init_logger();
    let dir = tempdir()?;
    let file_path = dir.path().join("persist.db");

    let (page_id, rid, record) = {
        let disk = Arc::new(FileDiskManager::create(&file_path)?);
        let buffer_pool = BufferPoolManager::new(disk, Box::new(ClockReplacer::new(4)), 4);

        let page = buffer_pool.new_page()?;
        let record = Record::new(b"greeting", b"hello, disk")?;
        let rid = page.add_record(&record)?;
        buffer_pool.unpin_page(page.page_id(), true)?;
        buffer_pool.flush_page(page.page_id())?;
        buffer_pool.close()?;

        (page.page_id(), rid, record)
    };

    let disk = Arc::new(FileDiskManager::open(&file_path)?);
    let buffer_pool = BufferPoolManager::new(disk, Box::new(ClockReplacer::new(4)), 4);

    let page = buffer_pool.fetch_page(page_id)?;
    assert_eq!(page.get_record(rid)?, record);
    assert!(page.read().has_key(b"greeting"));

    // New allocations continue after the persisted page
    assert_eq!(buffer_pool.new_page()?.page_id(), PageId(page_id.0 + 1));

    Ok(())
}

#[test]
fn test_persistence_through_eviction() -> Result<()> {
    let dir = tempdir()?;
    let config = StorageConfig::new(dir.path().join("evict.db"))
        .with_pool_size(2)
        .with_truncate(true);

    let mut expected: Vec<(RecordId, Record)> = Vec::new();
    {
        let buffer_pool = BufferPoolManager::open(&config)?;
        for i in 0..8u64 {
            let page = buffer_pool.new_page()?;
            for j in 0..5u64 {
                let record = Record::with_numeric_value(i * 100 + j, i * j)?;
                expected.push((page.add_record(&record)?, record));
            }
            buffer_pool.unpin_page(page.page_id(), true)?;
        }
        assert!(buffer_pool.stats().evictions >= 6);
        buffer_pool.close()?;
    }

    let buffer_pool = BufferPoolManager::open(&config.clone().with_truncate(false))?;
    for (rid, record) in &expected {
        let page = buffer_pool.fetch_page(rid.page_id)?;
        assert_eq!(&page.get_record(*rid)?, record);
        buffer_pool.unpin_page(rid.page_id, false)?;
    }

    Ok(())
}

#[test]
fn test_vacuum_through_handle() -> Result<()> {
    let buffer_pool = memory_pool(2);
    let page = buffer_pool.new_page()?;

    let mut rids = Vec::new();
    for i in 0..20u64 {
        rids.push(page.add_record(&Record::with_numeric_key(i, &[0x5A; 100])?)?);
    }
    for rid in rids.iter().filter(|rid| rid.cell_id % 2 == 0) {
        page.del_record(*rid)?;
    }

    let before = page.read().free_space();
    page.write().vacuum();
    assert!(page.read().free_space() > before);

    for rid in &rids {
        let result = page.get_record(*rid);
        if rid.cell_id % 2 == 0 {
            assert!(matches!(result, Err(StorageError::RecordNotFound(_))));
        } else {
            assert_eq!(result?.numeric_key(), Some(rid.cell_id as u64));
        }
    }
    buffer_pool.unpin_page(page.page_id(), true)?;

    Ok(())
}

#[test]
fn test_concurrent_page_allocation() -> Result<()> {
    init_logger();
    let buffer_pool = memory_pool(16);

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let buffer_pool = buffer_pool.clone();
            thread::spawn(move || -> Result<Vec<(RecordId, u64)>> {
                let mut written = Vec::new();
                for i in 0..20u64 {
                    let key = t * 1000 + i;
                    let page = buffer_pool.new_page()?;
                    let rid = page.add_record(&Record::with_numeric_value(key, key * 2)?)?;
                    buffer_pool.unpin_page(page.page_id(), true)?;
                    written.push((rid, key));
                }
                Ok(written)
            })
        })
        .collect();

    let mut written = Vec::new();
    for handle in handles {
        written.extend(handle.join().expect("worker panicked")?);
    }
    assert_eq!(written.len(), 160);

    for (rid, key) in written {
        let page = buffer_pool.fetch_page(rid.page_id)?;
        let record = page.get_record(rid)?;
        assert_eq!(record.numeric_key(), Some(key));
        assert_eq!(record.numeric_value(), Some(key * 2));
        buffer_pool.unpin_page(rid.page_id, false)?;
    }

    Ok(())
}

#[test]
fn test_concurrent_writers_share_page() -> Result<()> {
    let buffer_pool = memory_pool(4);
    let page_id = buffer_pool.new_page()?.page_id();

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let buffer_pool = buffer_pool.clone();
            thread::spawn(move || -> Result<()> {
                let page = buffer_pool.fetch_page(page_id)?;
                for i in 0..50u64 {
                    page.add_record(&Record::with_numeric_key(t * 100 + i, b"shared")?)?;
                }
                buffer_pool.unpin_page(page_id, true)?;
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    assert_eq!(buffer_pool.pin_count(page_id), Some(1));
    let page = buffer_pool.fetch_page(page_id)?;
    let guard = page.read();
    assert_eq!(guard.live_records(), 200);
    assert!(guard.validate().is_ok());

    let mut previous = None;
    guard.range_records(|_, record| {
        let key = record.numeric_key();
        assert!(previous <= key);
        previous = key;
        Ok(())
    })?;

    Ok(())
}
