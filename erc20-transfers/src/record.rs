//! The canonical, backend-agnostic transfer record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One observed ERC-20 `Transfer` event.
///
/// Every field is a string except `block`, so a record can move through any
/// storage engine without the token amount being narrowed or reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// `<transactionHash>:<logIndex>`, unique per emitted log entry.
    pub id: String,

    /// Sender address, 0x-prefixed fixed-width hex.
    pub from: String,

    /// Receiver address, 0x-prefixed fixed-width hex.
    pub to: String,

    /// Transferred amount as an opaque decimal string (up to 2^256 - 1).
    pub value: String,

    /// Height of the block the event was included in.
    pub block: u64,
}

impl Record {
    /// Build the record id for a log entry.
    ///
    /// ```
    /// assert_eq!(erc20_transfers::Record::id_for("0xabc", 7), "0xabc:7");
    /// ```
    #[must_use]
    pub fn id_for(tx_hash: &str, log_index: u64) -> String {
        format!("{tx_hash}:{log_index}")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block={} id={} from={} to={} value={}",
            self.block, self.id, self.from, self.to, self.value
        )
    }
}
