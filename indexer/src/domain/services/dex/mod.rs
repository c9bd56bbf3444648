//! DEX classifiers
//!
//! One classifier per supported protocol. A classifier knows the pool
//! validator hashes of its protocol, decodes the pool datum, and derives
//! swaps and reserve snapshots from qualified transactions.

pub mod minswap;
pub mod minswap_v2;
pub mod sundaeswap;
pub mod types;
pub mod wingriders;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

pub use types::{PoolSnapshot, QualifiedTx};

use crate::domain::models::{PoolReserve, Swap};
use minswap::MinswapClassifier;
use minswap_v2::MinswapV2Classifier;
use sundaeswap::SundaeswapClassifier;
use wingriders::WingridersClassifier;

/// Supported DEX protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexCode {
    Minswap,
    MinswapV2,
    Sundaeswap,
    Wingriders,
}

impl DexCode {
    /// Stable code used in persisted rows and pool ids
    pub fn code(&self) -> &'static str {
        match self {
            DexCode::Minswap => "minswap",
            DexCode::MinswapV2 => "minswapv2",
            DexCode::Sundaeswap => "sundaeswap",
            DexCode::Wingriders => "wingriders",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DexCode::Minswap => "Minswap",
            DexCode::MinswapV2 => "Minswap V2",
            DexCode::Sundaeswap => "SundaeSwap",
            DexCode::Wingriders => "WingRiders",
        }
    }
}

impl FromStr for DexCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minswap" => Ok(DexCode::Minswap),
            "minswapv2" => Ok(DexCode::MinswapV2),
            "sundaeswap" => Ok(DexCode::Sundaeswap),
            "wingriders" => Ok(DexCode::Wingriders),
            other => Err(format!("Unknown DEX '{}'", other)),
        }
    }
}

/// Capability set of a per-protocol extractor
pub trait DexClassifier: Send + Sync {
    /// Stable protocol code
    fn dex_code(&self) -> DexCode;

    /// Human-readable protocol name
    fn dex_name(&self) -> &'static str {
        self.dex_code().display_name()
    }

    /// Payment credentials (script hashes) of the protocol's pool validators
    fn pool_script_hashes(&self) -> &'static [&'static str];

    /// Derive the swaps contained in a qualified transaction
    fn compute_swaps(&self, tx: &QualifiedTx) -> Vec<Swap>;

    /// Derive the reserve snapshots of every pool touched by the transaction
    fn compute_pool_reserves(&self, tx: &QualifiedTx) -> Vec<PoolReserve>;
}

/// Build the classifier for one protocol
pub fn create_classifier(code: DexCode) -> Arc<dyn DexClassifier> {
    match code {
        DexCode::Minswap => Arc::new(MinswapClassifier),
        DexCode::MinswapV2 => Arc::new(MinswapV2Classifier),
        DexCode::Sundaeswap => Arc::new(SundaeswapClassifier),
        DexCode::Wingriders => Arc::new(WingridersClassifier),
    }
}

/// Classifiers enabled for this run, indexed by pool credential
pub struct ClassifierRegistry {
    classifiers: Vec<Arc<dyn DexClassifier>>,
    by_credential: HashMap<&'static str, Arc<dyn DexClassifier>>,
}

impl ClassifierRegistry {
    pub fn new(codes: &[DexCode]) -> Self {
        let classifiers: Vec<Arc<dyn DexClassifier>> =
            codes.iter().map(|code| create_classifier(*code)).collect();

        let mut by_credential = HashMap::new();
        for classifier in &classifiers {
            for credential in classifier.pool_script_hashes() {
                by_credential.insert(*credential, classifier.clone());
            }
        }

        Self {
            classifiers,
            by_credential,
        }
    }

    /// The classifier owning the given pool credential
    pub fn for_credential(&self, credential: &str) -> Option<&Arc<dyn DexClassifier>> {
        self.by_credential.get(credential)
    }

    /// Every pool credential known to the enabled classifiers
    pub fn known_credentials(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_credential.keys().copied()
    }

    pub fn classifiers(&self) -> &[Arc<dyn DexClassifier>] {
        &self.classifiers
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_maps_credentials_to_owning_classifier() {
        let registry = ClassifierRegistry::new(&[DexCode::Minswap, DexCode::Wingriders]);

        let minswap_credential = minswap::POOL_SCRIPT_HASHES[0];
        let classifier = registry.for_credential(minswap_credential).unwrap();
        assert_eq!(classifier.dex_code(), DexCode::Minswap);

        assert!(registry
            .for_credential(sundaeswap::POOL_SCRIPT_HASHES[0])
            .is_none());
    }

    #[test]
    fn dex_codes_are_stable() {
        assert_eq!(DexCode::MinswapV2.code(), "minswapv2");
        assert_eq!("sundaeswap".parse::<DexCode>(), Ok(DexCode::Sundaeswap));
        assert!("uniswap".parse::<DexCode>().is_err());
    }
}
