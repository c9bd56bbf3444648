//! Typed chain model delivered by the block-sync layer.
//!
//! The indexer never decodes wire-level CBOR itself; the sync layer hands
//! over blocks in this shape, and the chain-data providers return the same
//! structures for historical outputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unit string of the native coin
pub const LOVELACE: &str = "lovelace";

/// A point on the chain: slot plus block hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPoint {
    pub slot: u64,
    pub hash: String,
}

impl ChainPoint {
    pub fn new(slot: u64, hash: impl Into<String>) -> Self {
        Self {
            slot,
            hash: hash.into(),
        }
    }

    /// The origin of the chain
    pub fn origin() -> Self {
        Self {
            slot: 0,
            hash: String::new(),
        }
    }
}

/// Reference to a transaction output: `(tx hash, output index)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_hash: String,
    pub output_index: u32,
}

impl OutputRef {
    pub fn new(tx_hash: impl Into<String>, output_index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
        }
    }

    /// Cache key in `txHash#index` form
    pub fn key(&self) -> String {
        format!("{}#{}", self.tx_hash, self.output_index)
    }
}

/// A quantity of one asset; `unit` is `lovelace` or policy id + hex name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAmount {
    pub unit: String,
    pub quantity: u64,
}

impl TxAmount {
    pub fn new(unit: impl Into<String>, quantity: u64) -> Self {
        Self {
            unit: unit.into(),
            quantity,
        }
    }

    pub fn lovelace(quantity: u64) -> Self {
        Self::new(LOVELACE, quantity)
    }
}

/// Structured script datum attached to an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Int(i128),
    Bytes(Vec<u8>),
    List(Vec<PlutusData>),
    Map(Vec<(PlutusData, PlutusData)>),
}

impl PlutusData {
    /// Constructor with the given tag and fields
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr { tag, fields }
    }

    pub fn bytes_hex(hex_str: &str) -> Self {
        PlutusData::Bytes(hex::decode(hex_str).unwrap_or_default())
    }

    /// Field `index` of a constructor, if this is a constructor
    pub fn field(&self, index: usize) -> Option<&PlutusData> {
        match self {
            PlutusData::Constr { fields, .. } => fields.get(index),
            _ => None,
        }
    }

    pub fn constr_tag(&self) -> Option<u64> {
        match self {
            PlutusData::Constr { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            PlutusData::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlutusData::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_bytes_hex(&self) -> Option<String> {
        self.as_bytes().map(hex::encode)
    }

    /// Decode a `(policy, name)` constructor pair into an asset unit.
    /// An empty policy and name is the native coin.
    pub fn as_asset_unit(&self) -> Option<String> {
        let policy = self.field(0)?.as_bytes()?;
        let name = self.field(1)?.as_bytes()?;
        if policy.is_empty() && name.is_empty() {
            Some(LOVELACE.to_string())
        } else {
            Some(format!("{}{}", hex::encode(policy), hex::encode(name)))
        }
    }
}

/// Datum carried by an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datum {
    None,
    /// Datum hash only; the payload lives in the witness set
    Hash(String),
    /// Inline datum
    Inline(PlutusData),
}

impl Datum {
    pub fn inline(&self) -> Option<&PlutusData> {
        match self {
            Datum::Inline(data) => Some(data),
            _ => None,
        }
    }
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Bech32 address
    pub address: String,
    /// Hex payment credential (key or script hash) of the address
    pub payment_credential: Option<String>,
    pub amounts: Vec<TxAmount>,
    pub datum: Datum,
}

impl TransactionOutput {
    pub fn new(
        address: impl Into<String>,
        payment_credential: Option<String>,
        amounts: Vec<TxAmount>,
        datum: Datum,
    ) -> Self {
        Self {
            address: address.into(),
            payment_credential,
            amounts,
            datum,
        }
    }

    /// Quantity of `unit` held by this output, zero when absent
    pub fn quantity_of(&self, unit: &str) -> u64 {
        self.amounts
            .iter()
            .find(|amount| amount.unit == unit)
            .map(|amount| amount.quantity)
            .unwrap_or(0)
    }

    pub fn lovelace(&self) -> u64 {
        self.quantity_of(LOVELACE)
    }

    /// True when the payment credential matches `credential`
    pub fn pays_to_credential(&self, credential: &str) -> bool {
        self.payment_credential
            .as_deref()
            .map(|c| c == credential)
            .unwrap_or(false)
    }
}

/// An input reference together with the output it spends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub reference: OutputRef,
    pub output: TransactionOutput,
}

impl ResolvedInput {
    pub fn new(reference: OutputRef, output: TransactionOutput) -> Self {
        Self { reference, output }
    }
}

/// A transaction body as delivered inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub hash: String,
    pub inputs: Vec<OutputRef>,
    pub outputs: Vec<TransactionOutput>,
    /// Witness-set datums keyed by datum hash
    #[serde(default)]
    pub datums: HashMap<String, PlutusData>,
}

impl TransactionBody {
    pub fn new(
        hash: impl Into<String>,
        inputs: Vec<OutputRef>,
        outputs: Vec<TransactionOutput>,
    ) -> Self {
        Self {
            hash: hash.into(),
            inputs,
            outputs,
            datums: HashMap::new(),
        }
    }

    pub fn with_datums(mut self, datums: HashMap<String, PlutusData>) -> Self {
        self.datums = datums;
        self
    }
}

/// A block as delivered by the sync session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub parent_hash: String,
    pub slot: u64,
    pub number: u64,
    pub transactions: Vec<TransactionBody>,
}

impl Block {
    pub fn point(&self) -> ChainPoint {
        ChainPoint::new(self.slot, self.hash.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_ref_key_format() {
        let reference = OutputRef::new("ab12", 3);
        assert_eq!(reference.key(), "ab12#3");
    }

    #[test]
    fn quantity_of_missing_unit_is_zero() {
        let output = TransactionOutput::new(
            "addr1xyz",
            None,
            vec![TxAmount::lovelace(5)],
            Datum::None,
        );
        assert_eq!(output.lovelace(), 5);
        assert_eq!(output.quantity_of("deadbeef"), 0);
    }

    #[test]
    fn asset_unit_from_constr_pair() {
        let pair = PlutusData::constr(
            0,
            vec![
                PlutusData::bytes_hex("aabb"),
                PlutusData::Bytes(b"MIN".to_vec()),
            ],
        );
        assert_eq!(pair.as_asset_unit(), Some(format!("aabb{}", hex::encode("MIN"))));

        let native = PlutusData::constr(
            0,
            vec![PlutusData::Bytes(vec![]), PlutusData::Bytes(vec![])],
        );
        assert_eq!(native.as_asset_unit(), Some(LOVELACE.to_string()));
    }
}
