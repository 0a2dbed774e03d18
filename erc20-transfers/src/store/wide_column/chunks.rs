//! Reassembly of Bigtable `ReadRows` cell chunks into rows.
//!
//! A `ReadRows` response is a stream of chunks. The row key, family and
//! qualifier are only sent when they change, a cell value may be split
//! across several chunks (`valueSize` is non-zero on all but the last piece),
//! `resetRow` discards the row in progress and `commitRow` completes it.

use base64ct::{Base64, Encoding};
use serde::Deserialize;

use super::{Cell, Row};
use crate::error::{Error, Result};

/// One message of a `ReadRows` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadRowsResponse {
    #[serde(default)]
    pub(crate) chunks: Vec<CellChunk>,
}

/// A piece of a cell as sent on the wire; bytes fields are base64.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellChunk {
    #[serde(default)]
    pub(crate) row_key: Option<String>,
    #[serde(default)]
    pub(crate) family_name: Option<String>,
    #[serde(default)]
    pub(crate) qualifier: Option<String>,
    #[serde(default)]
    pub(crate) value: String,
    #[serde(default)]
    pub(crate) value_size: i32,
    #[serde(default)]
    pub(crate) reset_row: bool,
    #[serde(default)]
    pub(crate) commit_row: bool,
}

/// Folds chunks into completed rows.
#[derive(Debug, Default)]
pub(crate) struct RowMerger {
    rows: Vec<Row>,
    row: Option<Row>,
    family: Option<String>,
    qualifier: Option<Vec<u8>>,
    value: Vec<u8>,
}

impl RowMerger {
    pub(crate) fn push(&mut self, chunk: CellChunk) -> Result<()> {
        if chunk.reset_row {
            self.reset();
            return Ok(());
        }

        if let Some(key) = chunk.row_key.as_deref() {
            let key = decode(key)?;
            match &self.row {
                Some(row) if row.key != key => {
                    return Err(Error::corrupt_row(
                        String::from_utf8_lossy(&row.key),
                        "next row started before commit",
                    ));
                }
                Some(_) => {}
                None => {
                    self.row = Some(Row {
                        key,
                        cells: Vec::new(),
                    });
                }
            }
        }

        let Some(row) = self.row.as_mut() else {
            return Err(Error::corrupt_row("<stream>", "chunk without a row key"));
        };

        if let Some(family) = chunk.family_name {
            if chunk.qualifier.is_none() {
                return Err(Error::corrupt_row(
                    String::from_utf8_lossy(&row.key),
                    "family without qualifier",
                ));
            }
            self.family = Some(family);
        }
        if let Some(qualifier) = chunk.qualifier.as_deref() {
            self.qualifier = Some(decode(qualifier)?);
        }

        self.value.extend(decode(&chunk.value)?);
        if chunk.value_size == 0 {
            let (Some(family), Some(qualifier)) = (self.family.clone(), self.qualifier.clone())
            else {
                return Err(Error::corrupt_row(
                    String::from_utf8_lossy(&row.key),
                    "cell without family or qualifier",
                ));
            };
            row.cells.push(Cell {
                family,
                qualifier,
                value: std::mem::take(&mut self.value),
            });
        }

        if chunk.commit_row {
            if chunk.value_size != 0 {
                return Err(Error::corrupt_row(
                    String::from_utf8_lossy(&row.key),
                    "commit inside a split cell",
                ));
            }
            if let Some(row) = self.row.take() {
                self.rows.push(row);
            }
            self.reset();
        }

        Ok(())
    }

    /// Completed rows; fails if the stream stopped mid-row.
    pub(crate) fn finish(self) -> Result<Vec<Row>> {
        if let Some(row) = self.row {
            return Err(Error::corrupt_row(
                String::from_utf8_lossy(&row.key),
                "stream ended before commit",
            ));
        }
        Ok(self.rows)
    }

    fn reset(&mut self) {
        self.row = None;
        self.family = None;
        self.qualifier = None;
        self.value.clear();
    }
}

fn decode(encoded: &str) -> Result<Vec<u8>> {
    Base64::decode_vec(encoded)
        .map_err(|e| Error::corrupt_row("<stream>", format!("invalid base64: {e}")))
}

/// Merge every chunk of a complete `ReadRows` response stream.
pub(crate) fn merge(responses: Vec<ReadRowsResponse>) -> Result<Vec<Row>> {
    let mut merger = RowMerger::default();
    for chunk in responses.into_iter().flat_map(|r| r.chunks) {
        merger.push(chunk)?;
    }
    merger.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        Base64::encode_string(s.as_bytes())
    }

    fn chunks(json: &str) -> Vec<ReadRowsResponse> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn merges_split_values_and_elided_keys() {
        let json = format!(
            r#"[
              {{"chunks": [
                {{"rowKey": "{k}", "familyName": "value", "qualifier": "{q}", "value": "{v1}", "valueSize": 6}},
                {{"value": "{v2}"}},
                {{"familyName": "block", "qualifier": "{qb}", "value": "{b}", "commitRow": true}}
              ]}},
              {{"chunks": [
                {{"rowKey": "{k2}", "familyName": "block", "qualifier": "{qb}", "value": "{b2}", "commitRow": true}}
              ]}}
            ]"#,
            k = b64("tx:0"),
            q = b64("value"),
            v1 = b64("123"),
            v2 = b64("456"),
            qb = b64("block"),
            b = b64("100"),
            k2 = b64("tx:1"),
            b2 = b64("101"),
        );

        let rows = merge(chunks(&json)).unwrap();
        assert_eq!(rows.len(), 2, "two committed rows");
        assert_eq!(rows[0].key, b"tx:0", "first row key");
        assert_eq!(rows[0].cell("value", b"value"), Some(&b"123456"[..]), "split value joined");
        assert_eq!(rows[0].cell("block", b"block"), Some(&b"100"[..]), "second cell");
        assert_eq!(rows[1].cell("block", b"block"), Some(&b"101"[..]), "second row");
    }

    #[test]
    fn reset_discards_partial_row() {
        let json = format!(
            r#"[{{"chunks": [
                {{"rowKey": "{k}", "familyName": "id", "qualifier": "{q}", "value": "{stale}"}},
                {{"resetRow": true}},
                {{"rowKey": "{k}", "familyName": "id", "qualifier": "{q}", "value": "{fresh}", "commitRow": true}}
            ]}}]"#,
            k = b64("tx:0"),
            q = b64("id"),
            stale = b64("stale"),
            fresh = b64("fresh"),
        );

        let rows = merge(chunks(&json)).unwrap();
        assert_eq!(rows.len(), 1, "one row after reset");
        assert_eq!(rows[0].cells.len(), 1, "stale cell dropped");
        assert_eq!(rows[0].cell("id", b"id"), Some(&b"fresh"[..]), "fresh value kept");
    }

    #[test]
    fn uncommitted_tail_is_an_error() {
        let json = format!(
            r#"[{{"chunks": [{{"rowKey": "{k}", "familyName": "id", "qualifier": "{q}", "value": "{v}"}}]}}]"#,
            k = b64("tx:0"),
            q = b64("id"),
            v = b64("x"),
        );

        assert!(
            matches!(merge(chunks(&json)), Err(Error::CorruptRow { .. })),
            "stream ending mid-row must fail"
        );
    }

    #[test]
    fn empty_stream_has_no_rows() {
        assert!(merge(chunks("[]")).unwrap().is_empty(), "no rows");
        assert!(merge(chunks(r#"[{}]"#)).unwrap().is_empty(), "no chunks");
    }
}
