//! Загрузка обучающего CSV, очистка строк и стратифицированное разбиение

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::TrainingError;
use crate::types::{RiskLabel, FEATURE_NAMES, N_CLASSES, N_FEATURES, TARGET_COLUMN};

/// Признаки в порядке `FEATURE_NAMES` и метки классов (0 = HighRisk, 1 = LowRisk)
#[derive(Debug, Clone, PartialEq)]
pub struct HealthDataset {
    pub records: Array2<f64>,
    pub targets: Array1<usize>,
}

/// Статистика очистки строк
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Хотя бы один признак не разобран как число
    pub dropped_features: usize,
    /// Не удалось определить метку `health_risk`
    pub dropped_target: usize,
}

impl CleaningStats {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_features + self.dropped_target
    }
}

impl HealthDataset {
    pub fn new(records: Array2<f64>, targets: Array1<usize>) -> Result<Self, TrainingError> {
        if records.ncols() != N_FEATURES {
            return Err(TrainingError::InvalidConfig(format!(
                "expected {} feature columns, got {}",
                N_FEATURES,
                records.ncols()
            )));
        }
        if records.nrows() != targets.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "{} rows but {} targets",
                records.nrows(),
                targets.len()
            )));
        }
        if let Some(bad) = targets.iter().find(|&&t| t >= N_CLASSES) {
            return Err(TrainingError::InvalidConfig(format!("unknown class index {bad}")));
        }
        Ok(Self { records, targets })
    }

    pub fn from_csv_path(path: &Path) -> Result<(Self, CleaningStats), TrainingError> {
        let file = File::open(path).map_err(|source| TrainingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_reader(BufReader::new(file)).map_err(|err| match err {
            TrainingError::Io { source, .. } => TrainingError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Колонки ищутся по имени заголовка, лишние колонки игнорируются.
    /// Строки с неразобранными признаками отбрасываются (без импутации).
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<(Self, CleaningStats), TrainingError> {
        let mut lines = Records {
            lines: reader.lines(),
        };

        let header = match lines.next() {
            Some(line) => line.map_err(|source| TrainingError::Io {
                path: Default::default(),
                source,
            })?,
            None => return Err(TrainingError::EmptyDataset),
        };
        let positions: HashMap<String, usize> = split_csv_line(&header)
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_string(), i))
            .collect();

        let column = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| TrainingError::MissingColumn(name.to_string()))
        };
        let feature_columns = FEATURE_NAMES
            .iter()
            .map(|name| column(*name))
            .collect::<Result<Vec<usize>, _>>()?;
        let target_column = column(TARGET_COLUMN)?;

        let mut stats = CleaningStats::default();
        let mut values: Vec<f64> = Vec::new();
        let mut targets: Vec<usize> = Vec::new();

        for line in lines {
            let line = line.map_err(|source| TrainingError::Io {
                path: Default::default(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            stats.rows_read += 1;

            let fields = split_csv_line(&line);
            let row: Option<Vec<f64>> = feature_columns
                .iter()
                .map(|&idx| fields.get(idx).and_then(|raw| parse_number(raw)))
                .collect();
            let Some(row) = row else {
                stats.dropped_features += 1;
                continue;
            };
            let Some(label) = fields.get(target_column).and_then(|raw| RiskLabel::parse(raw)) else {
                stats.dropped_target += 1;
                continue;
            };

            values.extend(row);
            targets.push(label.class_index());
            stats.rows_kept += 1;
        }

        if stats.rows_kept == 0 {
            return Err(TrainingError::EmptyDataset);
        }

        let records = Array2::from_shape_vec((stats.rows_kept, N_FEATURES), values)
            .map_err(|err| TrainingError::InvalidConfig(err.to_string()))?;
        let dataset = Self::new(records, Array1::from_vec(targets))?;
        Ok((dataset, stats))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn class_counts(&self) -> [usize; N_CLASSES] {
        let mut counts = [0; N_CLASSES];
        for &label in self.targets.iter() {
            counts[label] += 1;
        }
        counts
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }

    /// Перемешивание строк с фиксированным seed
    pub fn shuffled(&self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut rng);
        self.select(&indices)
    }

    /// Стратифицированное разбиение на (train, test).
    /// Доля каждого класса в тесте округляется, но в каждой части остается хотя бы одна строка класса,
    /// если в классе больше одной строки.
    pub fn stratified_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<(Self, Self), TrainingError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); N_CLASSES];
        for (idx, &label) in self.targets.iter().enumerate() {
            by_class[label].push(idx);
        }

        let mut train_idx = Vec::with_capacity(self.len());
        let mut test_idx = Vec::new();
        for mut members in by_class {
            if members.is_empty() {
                continue;
            }
            members.shuffle(&mut rng);
            let n = members.len();
            let n_test = if n > 1 {
                ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
            } else {
                0
            };
            test_idx.extend_from_slice(&members[..n_test]);
            train_idx.extend_from_slice(&members[n_test..]);
        }

        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(TrainingError::InsufficientData(format!(
                "{} rows cannot be split into train and test",
                self.len()
            )));
        }

        // Сохраняем порядок исходного (уже перемешанного) набора
        train_idx.sort_unstable();
        test_idx.sort_unstable();
        Ok((self.select(&train_idx), self.select(&test_idx)))
    }
}

/// Склеивает физические строки в записи CSV: перевод строки внутри кавычек запись не завершает
struct Records<I> {
    lines: I,
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for Records<I> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        // Экранированная кавычка ("") не меняет четность
        while record.matches('"').count() % 2 == 1 {
            match self.lines.next() {
                Some(Ok(line)) => {
                    record.push('\n');
                    record.push_str(&line);
                }
                Some(Err(err)) => return Some(Err(err)),
                None => break,
            }
        }
        Some(Ok(record))
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
