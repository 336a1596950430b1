//! Annotation lookup interface
//!
//! The engine resolves each atomic alteration name against a remote
//! annotation service. That service is a black box here: transport, retry
//! policy, and matching logic live behind the [`Annotator`] trait. The
//! service is treated as stateless and reentrant, so the engine calls it
//! concurrently without a client-side cap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

/// Reference genome build a lookup is annotated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceGenome {
    #[default]
    #[serde(rename = "GRCh37")]
    Grch37,
    #[serde(rename = "GRCh38")]
    Grch38,
}

impl fmt::Display for ReferenceGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceGenome::Grch37 => write!(f, "GRCh37"),
            ReferenceGenome::Grch38 => write!(f, "GRCh38"),
        }
    }
}

/// The gene the curated alterations belong to, supplied by the
/// surrounding entity-editing screen. Required input to every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneContext {
    pub id: i64,
    pub hugo_symbol: String,
}

impl GeneContext {
    pub fn new(id: i64, hugo_symbol: impl Into<String>) -> Self {
        Self {
            id,
            hugo_symbol: hugo_symbol.into(),
        }
    }
}

/// Result of resolving one atomic alteration name: the name it was
/// resolved for plus the service's payload, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedAlterationRecord {
    pub alteration: String,
    pub payload: serde_json::Value,
}

impl AnnotatedAlterationRecord {
    pub fn new(alteration: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            alteration: alteration.into(),
            payload,
        }
    }
}

/// Asynchronous annotation lookup, called once per atomic alteration name
/// per resolution pass.
///
/// `Ok(None)` means the service declined to resolve the name; `Err` means
/// the call failed. The engine treats both as "no record" at batch level,
/// notifying only for the latter.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn resolve(
        &self,
        genome: ReferenceGenome,
        alteration: &str,
        gene: &GeneContext,
    ) -> Result<Option<AnnotatedAlterationRecord>>;
}
