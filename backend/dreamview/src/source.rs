//! Boundary to the remote data source that owns the dream records.
//!
//! Everything the card knows about a dream arrives through [`DreamSource::read`],
//! one field at a time, and every action leaves through [`DreamSource::write`].
//! Wire encoding and retry policy are the implementor's business; see
//! [`crate::rpc::RpcDreamSource`] for the JSON-RPC one.

use std::fmt;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::snapshot::Field;

/// A decoded value for one [`Field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    Flag(bool),
    Text(String),
    Amount(U256),
    Days(u64),
}

/// Writes a viewer can request against a dream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Fund,
    Withdraw,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fund => "fund",
            Self::Withdraw => "withdraw",
        })
    }
}

/// A write ready to be sent, produced by the action controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub dream_id: u64,
    pub action: Action,
    pub caller: Address,
    /// Amount in minor units.
    pub amount: U256,
}

#[async_trait]
pub trait DreamSource: Send + Sync + 'static {
    /// Read a single field of a dream.
    async fn read(&self, dream_id: u64, field: Field) -> Result<FieldValue>;

    /// Submit a write. Resolves to the transaction hash once the remote side
    /// has accepted it.
    async fn write(&self, request: &WriteRequest) -> Result<String>;
}
