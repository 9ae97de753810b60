use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "phased_{}_{}_{}",
        label,
        std::process::id(),
        Utc::now().timestamp_micros()
    ));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

const TASK_LEGEND: [&str; 9] = [
    "Not", "Nand", "And", "OrNot", "Or", "AndNot", "Nor", "Xor", "Equals",
];

/// Analysis detail file: id, update born, genome length, nine task columns.
pub fn detail_dat(rows: &[(i64, &str)]) -> String {
    let mut out = String::from("#filetype genotype_data\n# Mode 1 Test CPU Analysis\n# Legend:\n");
    out.push_str("#  1: ID\n#  2: Update Born\n#  3: Genome Length\n");
    for (i, task) in TASK_LEGEND.iter().enumerate() {
        out.push_str(&format!("# {:>2}: {}\n", i + 4, task));
    }
    out.push('\n');
    for (id, (update, bits)) in rows.iter().enumerate() {
        let cols: Vec<String> = bits.chars().map(|c| c.to_string()).collect();
        out.push_str(&format!("{} {} 100 {}\n", id, update, cols.join(" ")));
    }
    out
}

/// Time-series file with the given column names and rows.
pub fn series_dat(columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::from("# Avida data\n# Mon Aug 24 10:12:01 2020\n");
    for (i, col) in columns.iter().enumerate() {
        out.push_str(&format!("# {:>2}: {}\n", i + 1, col));
    }
    out.push('\n');
    for row in rows {
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

/// A complete run directory with a plastic, equals-capable final dominant.
#[derive(Debug, Clone)]
pub struct RunFixture {
    pub cmd_log: String,
    pub time: Vec<(i64, &'static str)>,
    pub tasks_equals: Vec<(i64, i64)>,
    pub dominant_all: Vec<(i64, &'static str)>,
    pub dominant_odd: Vec<(i64, &'static str)>,
    pub dominant_even: Vec<(i64, &'static str)>,
    pub lineage_all: Vec<(i64, &'static str)>,
    pub lineage_odd: Vec<(i64, &'static str)>,
    pub lineage_even: Vec<(i64, &'static str)>,
}

impl Default for RunFixture {
    fn default() -> Self {
        Self {
            cmd_log: "./avida -set EVENT_FILE events-u100.cfg -set SEED 1 -set WORLD_X 60\n"
                .to_string(),
            time: vec![(0, "0"), (200000, "812.5"), (400000, "1620.25")],
            tasks_equals: vec![(0, 0), (200000, 0), (400000, 17)],
            dominant_all: vec![(399000, "111111111"), (199000, "000000000")],
            dominant_odd: vec![(399000, "010101011"), (199000, "000000000")],
            dominant_even: vec![(399000, "101010101"), (199000, "000000000")],
            lineage_all: vec![(0, "000000000"), (150, "000000000"), (300, "000000001")],
            lineage_odd: vec![(0, "000000000"), (150, "010000000"), (300, "010000000")],
            lineage_even: vec![(0, "000000000"), (150, "000000000"), (300, "000000000")],
        }
    }
}

impl RunFixture {
    pub fn write(&self, run_dir: &Path) {
        let data = run_dir.join("data");
        fs::create_dir_all(&data).expect("data dir");
        fs::write(run_dir.join("cmd.log"), &self.cmd_log).expect("cmd.log");

        let time_rows: Vec<Vec<String>> = self
            .time
            .iter()
            .map(|(u, g)| vec![u.to_string(), g.to_string()])
            .collect();
        fs::write(
            data.join("time.dat"),
            series_dat(&["Update", "Average generation"], &time_rows),
        )
        .expect("time.dat");

        let task_rows: Vec<Vec<String>> = self
            .tasks_equals
            .iter()
            .map(|(u, e)| vec![u.to_string(), e.to_string()])
            .collect();
        fs::write(data.join("tasks.dat"), series_dat(&["Update", "Equals"], &task_rows))
            .expect("tasks.dat");

        for (env, dominant, lineage) in [
            ("env_all", &self.dominant_all, &self.lineage_all),
            ("env_odd", &self.dominant_odd, &self.lineage_odd),
            ("env_even", &self.dominant_even, &self.lineage_even),
        ] {
            let dir = data.join("analysis").join(env);
            fs::create_dir_all(&dir).expect("analysis dir");
            fs::write(dir.join("final_dominant.dat"), detail_dat(dominant)).expect("dominant");
            fs::write(dir.join("lineage_tasks.dat"), detail_dat(lineage)).expect("lineage");
        }
    }
}
