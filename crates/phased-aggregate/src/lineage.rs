//! First-occurrence statistics over a run's lineage trace.

use serde::Serialize;

use crate::dat::DataRecord;
use crate::error::Result;
use crate::phenotype::{solves_equals, PhenotypeEncoder};
use crate::reconcile::{lineage_length, EnvTriple};
use crate::summary::RunInfo;

const LINEAGE_STEP: &str = "lineage step missing from trace";

/// Facts about one ancestor in the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageStep {
    pub update_born: String,
    pub phenotype_even: String,
    pub phenotype_odd: String,
    pub plastic_odd_even: bool,
    pub equals_odd_even: bool,
    pub equals_all: bool,
    pub equals_any: bool,
    pub match_score_even: usize,
    pub match_score_odd: usize,
    pub match_score_odd_even: usize,
}

impl LineageStep {
    pub fn derive(step: EnvTriple<&DataRecord>, encoder: &PhenotypeEncoder) -> Result<Self> {
        let phenotype_even = encoder.encode(step.even)?;
        let phenotype_odd = encoder.encode(step.odd)?;
        let even_equals = solves_equals(step.even)?;
        let odd_equals = solves_equals(step.odd)?;
        let all_equals = solves_equals(step.all)?;
        let match_score_even = encoder.score_even(&phenotype_even)?;
        let match_score_odd = encoder.score_odd(&phenotype_odd)?;
        Ok(LineageStep {
            update_born: step.all.get("update_born")?.to_string(),
            plastic_odd_even: phenotype_even != phenotype_odd,
            equals_odd_even: even_equals && odd_equals,
            equals_all: all_equals,
            equals_any: even_equals || odd_equals || all_equals,
            phenotype_even,
            phenotype_odd,
            match_score_even,
            match_score_odd,
            match_score_odd_even: match_score_even + match_score_odd,
        })
    }
}

/// Update at which each condition first held, if ever.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirstOccurrences {
    pub equals_odd_even_update: Option<String>,
    pub equals_all_update: Option<String>,
    pub equals_any_update: Option<String>,
    pub plastic_odd_even_update: Option<String>,
}

impl FirstOccurrences {
    /// Fold one step in. Fields already set are left alone.
    pub fn observe(&mut self, step: &LineageStep) {
        let marks = [
            (&mut self.equals_odd_even_update, step.equals_odd_even),
            (&mut self.equals_all_update, step.equals_all),
            (&mut self.equals_any_update, step.equals_any),
            (&mut self.plastic_odd_even_update, step.plastic_odd_even),
        ];
        for (slot, holds) in marks {
            if holds && slot.is_none() {
                *slot = Some(step.update_born.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineageSummary {
    pub length: usize,
    pub first: FirstOccurrences,
    pub steps: Vec<LineageStep>,
}

impl LineageSummary {
    pub fn write_into(&self, info: &mut RunInfo) {
        info.insert("lineage_length".to_string(), self.length.into());
        let first = self.first.clone();
        info.insert("equals_odd_even_update".to_string(), first.equals_odd_even_update.into());
        info.insert("equals_all_update".to_string(), first.equals_all_update.into());
        info.insert("equals_any_update".to_string(), first.equals_any_update.into());
        info.insert("plastic_odd_even_update".to_string(), first.plastic_odd_even_update.into());
    }
}

/// Walk the trace in recorded order, oldest ancestor first.
pub fn reduce_lineage(
    lineage: &EnvTriple<Vec<DataRecord>>,
    encoder: &PhenotypeEncoder,
) -> Result<LineageSummary> {
    let length = lineage_length(lineage)?;
    let mut summary = LineageSummary {
        length,
        first: FirstOccurrences::default(),
        steps: Vec::with_capacity(length),
    };
    for index in 0..length {
        let step = LineageStep::derive(lineage.at(index, LINEAGE_STEP)?, encoder)?;
        summary.first.observe(&step);
        summary.steps.push(step);
    }
    tracing::debug!(
        steps = summary.length,
        equals_any = ?summary.first.equals_any_update,
        "reduced lineage"
    );
    Ok(summary)
}
