//! Population-level facts from the time-series files at the end of each
//! experiment phase. Phase 0 ends at a fixed boundary update; phase 1 ends
//! with the last recorded row.

use crate::dat::DataRecord;
use crate::error::{AggregateError, Result};
use crate::summary::RunInfo;

fn final_record<'a>(records: &'a [DataRecord], what: &'static str) -> Result<&'a DataRecord> {
    records
        .last()
        .ok_or_else(|| AggregateError::MissingPhaseBoundary {
            what,
            update: "final".to_string(),
        })
}

fn boundary_record<'a>(
    records: &'a [DataRecord],
    boundary_update: &str,
    what: &'static str,
) -> Result<&'a DataRecord> {
    for record in records {
        if record.get("update")? == boundary_update {
            return Ok(record);
        }
    }
    Err(AggregateError::MissingPhaseBoundary {
        what,
        update: boundary_update.to_string(),
    })
}

/// `phase_{0,1}_average_generation` from `time.dat`.
pub fn average_generation(time: &[DataRecord], boundary_update: &str, info: &mut RunInfo) -> Result<()> {
    let last = final_record(time, "time.dat")?;
    let boundary = boundary_record(time, boundary_update, "time.dat")?;
    info.insert(
        "phase_1_average_generation".to_string(),
        last.get("average_generation")?.into(),
    );
    info.insert(
        "phase_0_average_generation".to_string(),
        boundary.get("average_generation")?.into(),
    );
    Ok(())
}

/// `phase_{0,1}_pop_equals` from `tasks.dat`: whether any organism performed
/// `equals` in the sampled update.
pub fn pop_equals(tasks: &[DataRecord], boundary_update: &str, info: &mut RunInfo) -> Result<()> {
    let last = final_record(tasks, "tasks.dat")?;
    let boundary = boundary_record(tasks, boundary_update, "tasks.dat")?;
    info.insert(
        "phase_1_pop_equals".to_string(),
        (last.get_int("equals")? > 0).into(),
    );
    info.insert(
        "phase_0_pop_equals".to_string(),
        (boundary.get_int("equals")? > 0).into(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::FieldValue;

    fn row(pairs: &[(&str, &str)]) -> DataRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn average_generation_reads_boundary_and_final_rows() {
        let time = vec![
            row(&[("update", "0"), ("average_generation", "0")]),
            row(&[("update", "200000"), ("average_generation", "812.5")]),
            row(&[("update", "200000"), ("average_generation", "999")]),
            row(&[("update", "400000"), ("average_generation", "1620.25")]),
        ];
        let mut info = RunInfo::new();
        average_generation(&time, "200000", &mut info).unwrap();
        assert_eq!(info["phase_0_average_generation"].to_string(), "812.5");
        assert_eq!(info["phase_1_average_generation"].to_string(), "1620.25");
    }

    #[test]
    fn pop_equals_compares_count_against_zero() {
        let tasks = vec![
            row(&[("update", "200000"), ("equals", "0")]),
            row(&[("update", "400000"), ("equals", "17")]),
        ];
        let mut info = RunInfo::new();
        pop_equals(&tasks, "200000", &mut info).unwrap();
        assert_eq!(info["phase_0_pop_equals"], FieldValue::Bool(false));
        assert_eq!(info["phase_1_pop_equals"], FieldValue::Bool(true));
    }

    #[test]
    fn missing_boundary_is_fatal() {
        let time = vec![row(&[("update", "100"), ("average_generation", "1")])];
        let err = average_generation(&time, "200000", &mut RunInfo::new()).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::MissingPhaseBoundary { what: "time.dat", .. }
        ));
        assert!(pop_equals(&[], "200000", &mut RunInfo::new()).is_err());
    }
}
