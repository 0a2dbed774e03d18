mod common;

use alloy::primitives::U256;
use anyhow::Result;
use erc20_transfers::{Error, EventMapper, TransferFilter};

use common::{Entry, ScriptedSource, TOKEN, block_100_logs, raw, tx};

#[tokio::test]
async fn maps_every_log_of_the_block() -> Result<()> {
    let mapper = EventMapper::new(ScriptedSource::new(block_100_logs()));

    let records = mapper.transfers(TOKEN, 100).await?;

    assert_eq!(records.len(), 2, "one record per log");
    assert_eq!(records[0].id, format!("{:#x}:0", tx(0x10)), "first id");
    assert_eq!(records[1].id, format!("{:#x}:1", tx(0x11)), "second id");
    assert_eq!(records[0].value, "1000000", "small value verbatim");
    assert_eq!(
        records[1].value, "999999999999999999999",
        "large value verbatim"
    );
    assert!(records.iter().all(|r| r.block == 100), "both in block 100");
    assert_eq!(
        records[0].from, "0x0000000000000000000000000000000000000001",
        "from as fixed-width hex"
    );
    Ok(())
}

#[tokio::test]
async fn queries_a_single_block_range() -> Result<()> {
    let source = ScriptedSource::new(Vec::new());
    let queries = std::sync::Arc::clone(&source.queries);
    let mapper = EventMapper::new(source);

    let records = mapper.transfers(TOKEN, 42).await?;

    assert!(records.is_empty(), "empty block yields no records");
    let queries = queries.lock().unwrap();
    assert_eq!(
        queries.as_slice(),
        &[TransferFilter::single_block(TOKEN, 42)],
        "one query for [42, 42]"
    );
    Ok(())
}

#[tokio::test]
async fn block_comes_from_the_log() -> Result<()> {
    let source = ScriptedSource::new(vec![Entry::Log(raw(0x01, 3, 101, 1, 2, U256::from(5)))]);
    let mapper = EventMapper::new(source);

    let records = mapper.transfers(TOKEN, 100).await?;

    assert_eq!(records[0].block, 101, "log's own block wins over the request");
    Ok(())
}

#[tokio::test]
async fn first_error_aborts_mapping_and_releases_iterator() -> Result<()> {
    let mut entries = block_100_logs();
    entries.insert(1, Entry::Fail("malformed log"));
    let source = ScriptedSource::new(entries);
    let open = std::sync::Arc::clone(&source.open);
    let mapper = EventMapper::new(source);

    let err = mapper.transfers(TOKEN, 100).await.unwrap_err();

    assert!(
        matches!(&err, Error::Source(reason) if reason == "malformed log"),
        "unexpected error: {err}"
    );
    assert_eq!(
        open.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "iterator released on error"
    );
    Ok(())
}

#[tokio::test]
async fn open_failure_is_surfaced() {
    let source = ScriptedSource {
        fail_open: true,
        ..ScriptedSource::default()
    };
    let mapper = EventMapper::new(source);

    assert!(
        matches!(mapper.transfers(TOKEN, 1).await, Err(Error::Source(_))),
        "opening error must surface"
    );
}

#[tokio::test]
async fn each_call_requeries_and_releases() -> Result<()> {
    let mapper = EventMapper::new(ScriptedSource::new(block_100_logs()));

    let first = mapper.transfers(TOKEN, 100).await?;
    let second = mapper.transfers(TOKEN, 100).await?;

    assert_eq!(first, second, "same source, same records");
    assert_eq!(mapper.source().queries.lock().unwrap().len(), 2, "two queries");
    assert_eq!(mapper.source().open_iterators(), 0, "iterators released");
    Ok(())
}
