//! Синтетический CSV для интеграционных тестов

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Детерминированный набор: высокий риск при курении, высоком ИМТ и сахаре.
/// Плюс несколько битых строк, которые должны быть отброшены.
pub fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let mut csv = String::from("age,bmi,smoking,alcohol,sleep,sugar_intake,health_risk\n");
    for i in 0..rows {
        let high = i % 2 == 0;
        let age = 20 + (i * 7) % 55;
        let bmi = if high { 31.0 + (i % 9) as f64 * 0.8 } else { 20.0 + (i % 7) as f64 * 0.6 };
        let smoking = if high { (i % 5 != 0) as u8 } else { (i % 11 == 0) as u8 };
        let alcohol = (i % 3 == 0) as u8;
        let sleep = if high { 4.5 + (i % 4) as f64 * 0.4 } else { 7.0 + (i % 5) as f64 * 0.3 };
        let sugar = if high { 110.0 + (i % 13) as f64 * 4.0 } else { 25.0 + (i % 10) as f64 * 3.0 };
        let label = if high { "high" } else { "low" };
        writeln!(csv, "{age},{bmi},{smoking},{alcohol},{sleep},{sugar},{label}").unwrap();
    }
    csv.push_str("abc,22.0,0,0,7.0,30.0,low\n");
    csv.push_str("40,,1,0,6.0,90.0,high\n");
    csv.push_str("35,24.0,0,0,7.0,40.0,unknown\n");

    let path = dir.join("health.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

/// Один информативный признак, метка меняется каждые две строки: деревья получаются очень глубокими
pub fn write_alternating_dataset(dir: &Path, rows: usize) -> PathBuf {
    let mut csv = String::from("age,bmi,smoking,alcohol,sleep,sugar_intake,health_risk\n");
    for i in 0..rows {
        let sugar = i as f64 * 0.067;
        let label = if (i / 2) % 2 == 0 { "high" } else { "low" };
        writeln!(csv, "40,25.0,0,0,7.0,{sugar},{label}").unwrap();
    }

    let path = dir.join("alternating.csv");
    std::fs::write(&path, csv).unwrap();
    path
}
