//! Resolution pipeline
//!
//! ```text
//! alternatives ──► build ──► resolve ──► cast ──► aggregate ──► latent gate ──► filter
//!   (records)      (per record)                   (across alternatives)
//! ```
//!
//! Structural failures reject one record and are reported alongside the
//! result. Context failures reject the whole call before any record is
//! touched.

use serde_json::Value;

use entity_types::Entity;

use crate::annotation::{AnnotationClient, AnnotationRequest};
use crate::context::{ResolveContext, Stages};
use crate::error::{EngineError, InputShapeError, Result, StructuralError};

/// Raw records extracted from one transcription alternative
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alternative {
    /// Source text, used to bound record spans when known
    pub text: Option<String>,
    pub records: Vec<Value>,
}

impl Alternative {
    pub fn new(text: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            text: Some(text.into()),
            records,
        }
    }
}

impl From<Vec<Value>> for Alternative {
    fn from(records: Vec<Value>) -> Self {
        Self { text: None, records }
    }
}

/// A record that could not become an entity
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub alternative_index: usize,
    pub record_index: usize,
    pub error: StructuralError,
}

/// Entities of one call plus the records rejected on the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub entities: Vec<Entity>,
    pub rejected: Vec<RejectedRecord>,
    /// Alternatives whose annotation timed out; they still count towards
    /// consensus scores
    pub timed_out: Vec<usize>,
}

/// Stateless entry point; every call receives its own records and context
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityEngine;

impl EntityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Resolve records of every alternative into one final entity list
    pub fn resolve(&self, alternatives: Vec<Alternative>, ctx: &ResolveContext) -> Result<Vec<Entity>> {
        self.resolve_detailed(alternatives, ctx)
            .map(|resolution| resolution.entities)
    }

    /// Like [`EntityEngine::resolve`], also reporting rejected records.
    ///
    /// Fails when every record in scope was rejected.
    pub fn resolve_detailed(
        &self,
        alternatives: Vec<Alternative>,
        ctx: &ResolveContext,
    ) -> Result<Resolution> {
        let stages = ctx.stages()?;
        let total_alternatives = alternatives.len();

        let mut per_alternative = Vec::with_capacity(total_alternatives);
        let mut rejected = Vec::new();
        let mut total_records = 0;

        for (alternative_index, alternative) in alternatives.into_iter().enumerate() {
            total_records += alternative.records.len();
            let entities = self.resolve_alternative(&stages, alternative_index, &alternative, &mut rejected)?;
            tracing::debug!(
                alternative = alternative_index,
                records = alternative.records.len(),
                entities = entities.len(),
                "Resolved alternative"
            );
            per_alternative.push(entities);
        }

        if total_records > 0 && rejected.len() == total_records {
            let first = rejected.swap_remove(0);
            return Err(first.error.into());
        }

        let mut entities = stages.aggregator.aggregate_alternatives(per_alternative);
        if !ctx.activate_latent_entities {
            entities.retain(|entity| !entity.latent);
        }
        if let Some(filter) = &stages.filter {
            entities = filter.apply(entities);
        }

        tracing::info!(
            alternatives = total_alternatives,
            records = total_records,
            rejected = rejected.len(),
            entities = entities.len(),
            "Entity resolution complete"
        );
        Ok(Resolution {
            entities,
            rejected,
            timed_out: Vec::new(),
        })
    }

    fn resolve_alternative(
        &self,
        stages: &Stages,
        alternative_index: usize,
        alternative: &Alternative,
        rejected: &mut Vec<RejectedRecord>,
    ) -> Result<Vec<Entity>> {
        let mut entities = Vec::with_capacity(alternative.records.len());

        for (record_index, record) in alternative.records.iter().enumerate() {
            let outcome = stages
                .builder
                .build(record, alternative.text.as_deref())
                .map_err(EngineError::from)
                .and_then(|built| match built {
                    Some(entity) => stages.caster.cast(stages.resolver.resolve(entity)),
                    None => Ok(None),
                });

            match outcome {
                Ok(Some(entity)) => entities.push(entity),
                Ok(None) => {
                    tracing::debug!(
                        alternative = alternative_index,
                        record = record_index,
                        "Record excluded, no representable candidate"
                    );
                }
                Err(EngineError::Structural(error)) => {
                    tracing::warn!(
                        alternative = alternative_index,
                        record = record_index,
                        error = %error,
                        "Rejected annotation record"
                    );
                    rejected.push(RejectedRecord {
                        alternative_index,
                        record_index,
                        error,
                    });
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(entities)
    }

    /// Fetch records for every text of `request` and resolve them
    pub async fn extract<C>(
        &self,
        client: &C,
        request: &AnnotationRequest,
        ctx: &ResolveContext,
    ) -> Result<Resolution>
    where
        C: AnnotationClient + ?Sized,
    {
        ctx.stages()?;

        let responses = client.annotate(request).await?;
        if responses.len() != request.texts.len() {
            return Err(InputShapeError::AlternativeCountMismatch {
                expected: request.texts.len(),
                found: responses.len(),
            }
            .into());
        }

        let timed_out: Vec<usize> = responses
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.is_timed_out())
            .map(|(index, _)| index)
            .collect();
        if !timed_out.is_empty() {
            tracing::warn!(
                timed_out = timed_out.len(),
                alternatives = request.texts.len(),
                "Resolving with timed out alternatives"
            );
        }

        let alternatives = request
            .texts
            .iter()
            .zip(responses)
            .map(|(text, answer)| Alternative::new(text.clone(), answer.into_records()))
            .collect();
        let mut resolution = self.resolve_detailed(alternatives, ctx)?;
        resolution.timed_out = timed_out;
        Ok(resolution)
    }
}
