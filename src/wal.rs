//! Write-ahead log record codec.
//!
//! This is a standalone encode/decode for the on-disk record shape; nothing
//! in the pager or commit driver writes or replays a log yet (see the open
//! question recorded alongside the rest of the commit protocol). Record
//! layout: `op:u8, key_len:u32, value_len:u32, txn_id:u64, timestamp:f64,
//! key, value`.

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 1 + 4 + 4 + 8 + 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum WalOp {
    Put = 1,
    Delete = 2,
    Commit = 3,
    Rollback = 4,
}

impl WalOp {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            3 => Some(Self::Commit),
            4 => Some(Self::Rollback),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WalRecord {
    pub op: WalOp,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub txn_id: u64,
    pub timestamp: f64,
}

impl WalRecord {
    pub fn new(op: WalOp, key: Vec<u8>, value: Vec<u8>, txn_id: u64, timestamp: f64) -> Self {
        Self {
            op,
            key,
            value,
            txn_id,
            timestamp,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.key.len() + self.value.len());
        buf.push(self.op as u8);
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.txn_id.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::ShortField {
                field: "wal record header",
                needed: HEADER_LEN - data.len(),
            });
        }
        let op = WalOp::from_byte(data[0])
            .ok_or_else(|| Error::Corruption(format!("unknown wal op byte {}", data[0])))?;
        let key_len = u32::from_le_bytes(data[1..5].try_into().unwrap()) as usize;
        let value_len = u32::from_le_bytes(data[5..9].try_into().unwrap()) as usize;
        let txn_id = u64::from_le_bytes(data[9..17].try_into().unwrap());
        let timestamp = f64::from_le_bytes(data[17..25].try_into().unwrap());

        let expected = HEADER_LEN + key_len + value_len;
        if data.len() < expected {
            return Err(Error::ShortField {
                field: "wal record body",
                needed: expected - data.len(),
            });
        }
        let key = data[HEADER_LEN..HEADER_LEN + key_len].to_vec();
        let value = data[HEADER_LEN + key_len..expected].to_vec();

        Ok(Self {
            op,
            key,
            value,
            txn_id,
            timestamp,
        })
    }
}
