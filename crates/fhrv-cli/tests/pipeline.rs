use assert_cmd::cargo::cargo_bin_cmd;
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};
use tempfile::{tempdir, TempDir};

/// Raw recording tree plus a config pointing its interim files into the same temp dir.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
        }
    }

    fn raw(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("processed")
    }

    fn interim(&self) -> PathBuf {
        self.dir.path().join("interim")
    }

    fn add_user(&self, user: &str, condition: &str, rows: usize) {
        let lines: Vec<String> = (0..rows).map(ecg_line).collect();
        self.write_ecg(user, condition, &lines);
        let eda = self.raw().join(user).join("EDA-EMG");
        fs::create_dir_all(&eda).unwrap();
        fs::write(
            eda.join(format!("{user}_{condition}.txt")),
            "10:00:00\t0.5\t0.1\t0.2\n",
        )
        .unwrap();
    }

    fn write_ecg(&self, user: &str, condition: &str, lines: &[String]) {
        let ecg = self.raw().join(user).join("ECG_Analysis");
        fs::create_dir_all(&ecg).unwrap();
        fs::write(
            ecg.join(format!("{user}_{condition}.txt")),
            lines.join("\n") + "\n",
        )
        .unwrap();
    }

    fn config(&self, users: &[&str], extra: &str) -> PathBuf {
        let users: Vec<String> = users.iter().map(|u| format!("\"{u}\"")).collect();
        let text = format!(
            "window_size = 150\nconditions = [\"user_rest\"]\nusers = [{}]\ninterim_dir = '{}'\n{extra}",
            users.join(", "),
            self.interim().display()
        );
        let path = self.dir.path().join("fhrv.toml");
        fs::write(&path, text).unwrap();
        path
    }
}

/// `Timestamp,HR,RR/1024,hex,hex,RR_ms` with a slowly varying rhythm.
fn ecg_line(i: usize) -> String {
    let rr = 780 + (i * 37) % 90;
    format!(
        "10:{:02}:{:02},75,{},0A,0B,{}",
        (i / 60) % 60,
        i % 60,
        rr * 1024 / 1000,
        rr
    )
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn run(ws: &Workspace, config: &Path) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("fhrv");
    cmd.env("FHRV_CONFIG", config).env("RUST_LOG", "info").args([
        "-i",
        ws.raw().to_str().expect("utf8 path"),
        "-o",
        ws.out().to_str().expect("utf8 path"),
    ]);
    cmd.assert()
}

#[test]
fn three_users_yield_six_feature_rows() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new();
    for user in ["user0", "user1", "user2"] {
        ws.add_user(user, "user_rest", 300);
    }
    let config = ws.config(&["user0", "user1", "user2"], "");
    run(&ws, &config).success();

    let interim = read_rows(&ws.interim().join("dataset_ecg_first_30_users.csv"))?;
    assert_eq!(interim.len(), 900);
    assert!(read_rows(&ws.interim().join("dataset_ecg_last_30_users.csv"))?.is_empty());
    assert_eq!(
        read_rows(&ws.interim().join("dataset_eda_emg.csv"))?.len(),
        3
    );

    let features = read_rows(&ws.out().join("user_rest.csv"))?;
    assert_eq!(features.len(), 6);
    let users: Vec<&str> = features.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(
        users,
        vec!["user0", "user0", "user1", "user1", "user2", "user2"]
    );
    assert!(features.iter().all(|r| r[1] == "user_rest" && r[2] == "75"));

    let mut reader = csv::Reader::from_path(ws.out().join("user_rest.csv"))?;
    let header = reader.headers()?.clone();
    assert_eq!(&header[0], "User");
    assert!(header.iter().any(|h| h == "HRV_RMSSD"));
    Ok(())
}

#[test]
fn short_user_contributes_no_rows() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new();
    ws.add_user("user0", "user_rest", 300);
    ws.add_user("user1", "user_rest", 100);
    let config = ws.config(&["user0", "user1"], "");
    run(&ws, &config).success();

    let features = read_rows(&ws.out().join("user_rest.csv"))?;
    assert_eq!(features.len(), 2);
    assert!(features.iter().all(|r| r[0] == "user0"));
    Ok(())
}

#[test]
fn malformed_timestamp_does_not_abort() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new();
    let mut lines: Vec<String> = (0..300).map(ecg_line).collect();
    lines.insert(10, "garbage,75,820,0A,0B,800".to_string());
    ws.add_user("user0", "user_rest", 0);
    ws.write_ecg("user0", "user_rest", &lines);
    let config = ws.config(&["user0"], "");
    run(&ws, &config).success();

    let interim = read_rows(&ws.interim().join("dataset_ecg_first_30_users.csv"))?;
    assert_eq!(interim.len(), 301);
    assert!(interim.iter().any(|r| r[2] == "garbage"));
    assert_eq!(read_rows(&ws.out().join("user_rest.csv"))?.len(), 2);

    let report = fs::read_to_string(ws.interim().join("extraction_report.json"))?;
    assert!(report.contains("\"invalid_timestamps\": 1"));
    Ok(())
}

#[test]
fn spreadsheet_output_is_written() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new();
    ws.add_user("user0", "user_rest", 150);
    let config = ws.config(&["user0"], "output_format = \"xlsx\"\n");
    run(&ws, &config).success();
    assert!(ws.out().join("user_rest.xlsx").is_file());
    Ok(())
}

#[test]
fn corrupt_interval_skips_one_window_and_is_summarised() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new();
    let mut lines: Vec<String> = (0..300).map(ecg_line).collect();
    lines[200] = "10:03:20,75,820,0A,0B,1000000000000".to_string();
    ws.add_user("user0", "user_rest", 0);
    ws.write_ecg("user0", "user_rest", &lines);
    let config = ws.config(&["user0"], "");
    let assert = run(&ws, &config).success();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("user_rest: wrote 1 feature row(s), skipped 1 window(s)"));
    assert_eq!(read_rows(&ws.out().join("user_rest.csv"))?.len(), 1);

    let report = fs::read_to_string(ws.interim().join("extraction_report.json"))?;
    assert!(report.contains("\"skipped\": 1"));
    Ok(())
}
