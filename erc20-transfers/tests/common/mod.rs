//! Fakes shared by the integration tests.

#![allow(
    dead_code,
    unreachable_pub,
    reason = "each test binary uses a different subset of the fakes"
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256, U256, address};
use async_trait::async_trait;
use erc20_transfers::{Error, LogSource, RawTransfer, Record, TransferFilter};

/// Token used throughout the tests.
pub const TOKEN: Address = address!("00000000000000000000000000000000000aaaaa");

/// One scripted item of a log stream.
#[derive(Debug, Clone)]
pub enum Entry {
    Log(RawTransfer),
    Fail(&'static str),
}

/// Log source replaying a fixed script on every query.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub entries: Vec<Entry>,
    pub fail_open: bool,
    /// Iterators currently alive.
    pub open: Arc<AtomicUsize>,
    /// Every filter the source was queried with.
    pub queries: Arc<Mutex<Vec<TransferFilter>>>,
}

impl ScriptedSource {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn open_iterators(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Iterator handed out by [`ScriptedSource`]; tracks its own lifetime.
#[derive(Debug)]
pub struct ScriptedLogs {
    entries: std::vec::IntoIter<Entry>,
    open: Arc<AtomicUsize>,
}

impl Iterator for ScriptedLogs {
    type Item = erc20_transfers::Result<RawTransfer>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| match entry {
            Entry::Log(raw) => Ok(raw),
            Entry::Fail(reason) => Err(Error::Source(reason.to_owned())),
        })
    }
}

impl Drop for ScriptedLogs {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    type Logs = ScriptedLogs;

    async fn transfer_logs(
        &self,
        filter: &TransferFilter,
    ) -> erc20_transfers::Result<ScriptedLogs> {
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(*filter);
        if self.fail_open {
            return Err(Error::Source("node unreachable".to_owned()));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedLogs {
            entries: self.entries.clone().into_iter(),
            open: Arc::clone(&self.open),
        })
    }
}

pub fn tx(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn raw(tx_byte: u8, log_index: u64, block: u64, from: u8, to: u8, value: U256) -> RawTransfer {
    RawTransfer {
        tx_hash: tx(tx_byte),
        log_index,
        block_number: block,
        from: Address::with_last_byte(from),
        to: Address::with_last_byte(to),
        value,
    }
}

/// The two logs block 100 emits in the reference scenario.
pub fn block_100_logs() -> Vec<Entry> {
    vec![
        Entry::Log(raw(0x10, 0, 100, 1, 2, U256::from(1_000_000u64))),
        Entry::Log(raw(
            0x11,
            1,
            100,
            2,
            3,
            U256::from(999_999_999_999_999_999_999u128),
        )),
    ]
}

pub fn record(id: &str, block: u64, value: &str) -> Record {
    Record {
        id: id.to_owned(),
        from: "0x0000000000000000000000000000000000000001".to_owned(),
        to: "0x0000000000000000000000000000000000000002".to_owned(),
        value: value.to_owned(),
        block,
    }
}
