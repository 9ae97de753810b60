//! Aligns the `all`/`odd`/`even` analysis datasets of a run and derives the
//! per-phase genotype facts.

use serde::Serialize;

use crate::dat::DataRecord;
use crate::error::{AggregateError, Result};
use crate::phenotype::{solves_equals, PhenotypeEncoder};
use crate::summary::{FieldValue, RunInfo};

/// Environment a genotype was re-evaluated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    All,
    Odd,
    Even,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::All => "all",
            Environment::Odd => "odd",
            Environment::Even => "even",
        }
    }

    /// Analysis sub-directory holding this environment's files.
    pub fn dir_name(self) -> String {
        format!("env_{}", self.as_str())
    }
}

/// One value per environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvTriple<T> {
    pub all: T,
    pub odd: T,
    pub even: T,
}

impl<T> EnvTriple<T> {
    pub fn try_from_fn<E, F>(mut f: F) -> std::result::Result<Self, E>
    where
        F: FnMut(Environment) -> std::result::Result<T, E>,
    {
        Ok(EnvTriple {
            all: f(Environment::All)?,
            odd: f(Environment::Odd)?,
            even: f(Environment::Even)?,
        })
    }
}

impl EnvTriple<Vec<DataRecord>> {
    fn counts(&self) -> (usize, usize, usize) {
        (self.all.len(), self.odd.len(), self.even.len())
    }

    fn count_mismatch(&self, what: &'static str) -> AggregateError {
        let (all, odd, even) = self.counts();
        AggregateError::RecordCountMismatch {
            what,
            all,
            odd,
            even,
        }
    }

    /// Records at `index` in each environment.
    pub fn at(&self, index: usize, what: &'static str) -> Result<EnvTriple<&DataRecord>> {
        match (self.all.get(index), self.odd.get(index), self.even.get(index)) {
            (Some(all), Some(odd), Some(even)) => Ok(EnvTriple { all, odd, even }),
            _ => Err(self.count_mismatch(what)),
        }
    }
}

const SNAPSHOT_COUNTS: &str = "unexpected number of genotypes in final_dominant data files";
const LINEAGE_COUNTS: &str = "lineage length mismatch";

/// Stable ascending sort by integer `update_born`.
pub fn sort_by_update_born(records: &mut Vec<DataRecord>) -> Result<()> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        keyed.push((record.get_int("update_born")?, record));
    }
    keyed.sort_by_key(|(update, _)| *update);
    records.extend(keyed.into_iter().map(|(_, record)| record));
    Ok(())
}

/// Accept two `all` snapshots (one per phase) or equal counts everywhere.
pub fn check_snapshot_counts(all: usize, odd: usize, even: usize) -> Result<()> {
    if all != 2 && !(all == odd && odd == even) {
        return Err(AggregateError::RecordCountMismatch {
            what: SNAPSHOT_COUNTS,
            all,
            odd,
            even,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseFacts {
    pub phase: usize,
    pub genome_length: String,
    pub phenotype_even: String,
    pub phenotype_odd: String,
    pub phenotype_all: String,
    pub phenotype_task_order: String,
    pub plastic_odd_even: bool,
    pub equals_odd_even: bool,
    pub equals_any: bool,
    pub match_score_even: usize,
    pub match_score_odd: usize,
    pub match_score_all: usize,
    pub match_score_odd_even: usize,
}

impl PhaseFacts {
    pub fn derive(
        phase: usize,
        snapshot: EnvTriple<&DataRecord>,
        encoder: &PhenotypeEncoder,
    ) -> Result<Self> {
        let phenotype_even = encoder.encode(snapshot.even)?;
        let phenotype_odd = encoder.encode(snapshot.odd)?;
        let phenotype_all = encoder.encode(snapshot.all)?;

        let even_equals = solves_equals(snapshot.even)?;
        let odd_equals = solves_equals(snapshot.odd)?;
        let all_equals = solves_equals(snapshot.all)?;

        let match_score_even = encoder.score_even(&phenotype_even)?;
        let match_score_odd = encoder.score_odd(&phenotype_odd)?;
        let match_score_all = encoder.score_all(&phenotype_all)?;

        Ok(PhaseFacts {
            phase,
            genome_length: snapshot.all.get("genome_length")?.to_string(),
            plastic_odd_even: phenotype_even != phenotype_odd,
            equals_odd_even: even_equals && odd_equals,
            equals_any: even_equals || odd_equals || all_equals,
            phenotype_task_order: encoder.task_order(),
            phenotype_even,
            phenotype_odd,
            phenotype_all,
            match_score_even,
            match_score_odd,
            match_score_all,
            match_score_odd_even: match_score_even + match_score_odd,
        })
    }

    pub fn write_into(&self, info: &mut RunInfo) {
        let prefix = format!("phase_{}_", self.phase);
        let fields: [(&str, FieldValue); 12] = [
            ("genome_length", self.genome_length.clone().into()),
            ("phenotype_even", self.phenotype_even.clone().into()),
            ("phenotype_odd", self.phenotype_odd.clone().into()),
            ("phenotype_all", self.phenotype_all.clone().into()),
            ("phenotype_task_order", self.phenotype_task_order.clone().into()),
            ("plastic_odd_even", self.plastic_odd_even.into()),
            ("equals_odd_even", self.equals_odd_even.into()),
            ("equals_any", self.equals_any.into()),
            ("match_score_even", self.match_score_even.into()),
            ("match_score_odd", self.match_score_odd.into()),
            ("match_score_all", self.match_score_all.into()),
            ("match_score_odd_even", self.match_score_odd_even.into()),
        ];
        for (name, value) in fields {
            info.insert(format!("{}{}", prefix, name), value);
        }
    }
}

/// Derive facts for every phase of the sorted dominant-genotype snapshots.
pub fn reconcile_phases(
    snapshots: &EnvTriple<Vec<DataRecord>>,
    encoder: &PhenotypeEncoder,
) -> Result<Vec<PhaseFacts>> {
    let (all, odd, even) = snapshots.counts();
    check_snapshot_counts(all, odd, even)?;
    (0..all)
        .map(|phase| PhaseFacts::derive(phase, snapshots.at(phase, SNAPSHOT_COUNTS)?, encoder))
        .collect()
}

/// Shared record count of the three lineage traces.
pub fn lineage_length(lineage: &EnvTriple<Vec<DataRecord>>) -> Result<usize> {
    let (all, odd, even) = lineage.counts();
    if all != odd || odd != even {
        return Err(lineage.count_mismatch(LINEAGE_COUNTS));
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phenotype::task_record;

    fn triple(all: Vec<DataRecord>, odd: Vec<DataRecord>, even: Vec<DataRecord>) -> EnvTriple<Vec<DataRecord>> {
        EnvTriple { all, odd, even }
    }

    fn repeat(bits: &str, n: usize) -> Vec<DataRecord> {
        (0..n).map(|i| task_record(bits, i as i64)).collect()
    }

    #[test]
    fn snapshot_count_rule() {
        assert!(check_snapshot_counts(2, 2, 2).is_ok());
        assert!(check_snapshot_counts(5, 5, 5).is_ok());
        assert!(check_snapshot_counts(1, 1, 1).is_ok());
        assert!(check_snapshot_counts(2, 2, 3).is_ok());
        assert!(matches!(
            check_snapshot_counts(3, 2, 2),
            Err(AggregateError::RecordCountMismatch { all: 3, odd: 2, even: 2, .. })
        ));
        assert!(check_snapshot_counts(3, 3, 2).is_err());
    }

    #[test]
    fn short_environment_is_fatal_even_with_two_all_records() {
        let snaps = triple(repeat("000000000", 2), repeat("000000000", 1), repeat("000000000", 2));
        assert!(matches!(
            reconcile_phases(&snaps, &PhenotypeEncoder::default()),
            Err(AggregateError::RecordCountMismatch { all: 2, odd: 1, even: 2, .. })
        ));
    }

    #[test]
    fn sort_orders_by_integer_update_born() {
        let mut records = vec![
            task_record("000000000", 400000),
            task_record("111111111", 99999),
            task_record("000000001", 200000),
        ];
        sort_by_update_born(&mut records).unwrap();
        let updates: Vec<i64> = records.iter().map(|r| r.get_int("update_born").unwrap()).collect();
        assert_eq!(updates, vec![99999, 200000, 400000]);
    }

    #[test]
    fn phase_facts_for_plastic_genotype() {
        // Even env: solves even tasks + equals; odd env: solves odd tasks + equals.
        let snaps = triple(
            vec![task_record("000000000", 1), task_record("111111111", 2)],
            vec![task_record("000000000", 1), task_record("010101011", 2)],
            vec![task_record("000000000", 1), task_record("101010101", 2)],
        );
        let facts = reconcile_phases(&snaps, &PhenotypeEncoder::default()).unwrap();
        assert_eq!(facts.len(), 2);

        let early = &facts[0];
        assert!(!early.plastic_odd_even);
        assert!(!early.equals_any);
        assert_eq!(early.match_score_even, 4);
        assert_eq!(early.match_score_odd, 4);
        assert_eq!(early.match_score_all, 0);

        let late = &facts[1];
        assert_eq!(late.phase, 1);
        assert!(late.plastic_odd_even);
        assert!(late.equals_odd_even);
        assert!(late.equals_any);
        assert_eq!(late.match_score_even, 9);
        assert_eq!(late.match_score_odd, 9);
        assert_eq!(late.match_score_all, 9);
        assert_eq!(late.match_score_odd_even, 18);
        assert_eq!(late.genome_length, "100");
    }

    #[test]
    fn equals_any_counts_all_environment() {
        let snaps = triple(repeat("000000001", 2), repeat("000000000", 2), repeat("000000000", 2));
        let facts = reconcile_phases(&snaps, &PhenotypeEncoder::default()).unwrap();
        assert!(facts[0].equals_any);
        assert!(!facts[0].equals_odd_even);
    }

    #[test]
    fn write_into_namespaces_by_phase() {
        let snaps = triple(repeat("000000000", 2), repeat("000000000", 2), repeat("000000000", 2));
        let facts = reconcile_phases(&snaps, &PhenotypeEncoder::default()).unwrap();
        let mut info = RunInfo::new();
        for phase in &facts {
            phase.write_into(&mut info);
        }
        assert_eq!(info.len(), 24);
        assert_eq!(info["phase_0_plastic_odd_even"].to_string(), "False");
        assert_eq!(info["phase_1_match_score_odd_even"], FieldValue::Int(8));
        assert_eq!(
            info["phase_1_phenotype_task_order"].to_string(),
            "not;nand;and;ornot;or;andnot;nor;xor;equals"
        );
    }

    #[test]
    fn lineage_counts_must_agree() {
        let ok = triple(repeat("0", 3), repeat("0", 3), repeat("0", 3));
        assert_eq!(lineage_length(&ok).unwrap(), 3);
        let bad = triple(repeat("0", 3), repeat("0", 3), repeat("0", 4));
        assert!(matches!(
            lineage_length(&bad),
            Err(AggregateError::RecordCountMismatch { even: 4, .. })
        ));
    }
}
