//! Phenotype strings and their comparison against reference profiles.

use serde::{Deserialize, Serialize};

use crate::dat::DataRecord;
use crate::error::{AggregateError, Result};

/// Logic-function tasks in phenotype bit order.
pub const CANONICAL_TASKS: [&str; 9] = [
    "not", "nand", "and", "ornot", "or", "andnot", "nor", "xor", "equals",
];

pub const EVEN_PROFILE: &str = "101010101";
pub const ODD_PROFILE: &str = "010101011";
pub const ALL_PROFILE: &str = "111111111";

/// Task field checked by the `equals_*` facts.
pub const EQUALS_TASK: &str = "equals";

/// Expected phenotype in each environment, aligned to the task order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceProfiles {
    pub even: String,
    pub odd: String,
    pub all: String,
}

impl Default for ReferenceProfiles {
    fn default() -> Self {
        Self {
            even: EVEN_PROFILE.to_string(),
            odd: ODD_PROFILE.to_string(),
            all: ALL_PROFILE.to_string(),
        }
    }
}

/// Count positions where `a` and `b` agree.
pub fn match_score(a: &str, b: &str) -> Result<usize> {
    if a.chars().count() != b.chars().count() {
        return Err(AggregateError::LengthMismatch {
            left: a.to_string(),
            right: b.to_string(),
        });
    }
    Ok(a.chars().zip(b.chars()).filter(|(x, y)| x == y).count())
}

#[derive(Debug, Clone)]
pub struct PhenotypeEncoder {
    tasks: Vec<String>,
    profiles: ReferenceProfiles,
}

impl Default for PhenotypeEncoder {
    fn default() -> Self {
        Self::new(
            CANONICAL_TASKS.iter().map(|t| t.to_string()).collect(),
            ReferenceProfiles::default(),
        )
    }
}

impl PhenotypeEncoder {
    pub fn new(tasks: Vec<String>, profiles: ReferenceProfiles) -> Self {
        Self { tasks, profiles }
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn profiles(&self) -> &ReferenceProfiles {
        &self.profiles
    }

    /// Concatenate the record's task indicators in task order.
    pub fn encode(&self, record: &DataRecord) -> Result<String> {
        let mut phenotype = String::with_capacity(self.tasks.len());
        for task in &self.tasks {
            phenotype.push_str(record.get(task)?);
        }
        Ok(phenotype)
    }

    pub fn task_order(&self) -> String {
        self.tasks.join(";")
    }

    pub fn score_even(&self, phenotype: &str) -> Result<usize> {
        match_score(phenotype, &self.profiles.even)
    }

    pub fn score_odd(&self, phenotype: &str) -> Result<usize> {
        match_score(phenotype, &self.profiles.odd)
    }

    pub fn score_all(&self, phenotype: &str) -> Result<usize> {
        match_score(phenotype, &self.profiles.all)
    }
}

pub fn solves(record: &DataRecord, task: &str) -> Result<bool> {
    Ok(record.get(task)? == "1")
}

pub fn solves_equals(record: &DataRecord) -> Result<bool> {
    solves(record, EQUALS_TASK)
}

#[cfg(test)]
pub(crate) fn task_record(bits: &str, update_born: i64) -> DataRecord {
    CANONICAL_TASKS
        .iter()
        .map(|t| t.to_string())
        .zip(bits.chars().map(|c| c.to_string()))
        .chain([
            ("update_born".to_string(), update_born.to_string()),
            ("genome_length".to_string(), "100".to_string()),
        ])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_follows_task_order() {
        let encoder = PhenotypeEncoder::default();
        let record = task_record("110000001", 0);
        assert_eq!(encoder.encode(&record).unwrap(), "110000001");
        assert_eq!(encoder.encode(&record).unwrap(), encoder.encode(&record).unwrap());
        assert_eq!(
            encoder.task_order(),
            "not;nand;and;ornot;or;andnot;nor;xor;equals"
        );
    }

    #[test]
    fn encode_uses_injected_task_set() {
        let encoder = PhenotypeEncoder::new(
            vec!["equals".to_string(), "not".to_string()],
            ReferenceProfiles {
                even: "11".to_string(),
                odd: "10".to_string(),
                all: "11".to_string(),
            },
        );
        let record = task_record("100000000", 0);
        let phenotype = encoder.encode(&record).unwrap();
        assert_eq!(phenotype, "01");
        assert_eq!(encoder.score_even(&phenotype).unwrap(), 1);
        assert_eq!(encoder.score_odd(&phenotype).unwrap(), 0);
    }

    #[test]
    fn encode_requires_every_task_field() {
        let record: DataRecord = [("not", "1")].into_iter().collect();
        assert!(matches!(
            PhenotypeEncoder::default().encode(&record),
            Err(AggregateError::MissingField { .. })
        ));
    }

    #[test]
    fn match_score_properties() {
        let samples = ["000000000", "101010101", "010101011", "111111111", "110011001"];
        for a in samples {
            assert_eq!(match_score(a, a).unwrap(), a.len());
            for b in samples {
                let ab = match_score(a, b).unwrap();
                assert_eq!(ab, match_score(b, a).unwrap());
                assert!(ab <= 9);
            }
        }
        assert_eq!(match_score(EVEN_PROFILE, ODD_PROFILE).unwrap(), 1);
        assert_eq!(match_score("000000000", ALL_PROFILE).unwrap(), 0);
    }

    #[test]
    fn match_score_rejects_length_mismatch() {
        let err = match_score("1010", "101").unwrap_err();
        assert!(matches!(err, AggregateError::LengthMismatch { .. }));
    }

    #[test]
    fn equals_requires_literal_one() {
        assert!(solves_equals(&task_record("000000001", 0)).unwrap());
        assert!(!solves_equals(&task_record("111111110", 0)).unwrap());
    }
}
