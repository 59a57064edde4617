//! Случайный лес решающих деревьев (классификация, критерий Джини)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, TrainingError};
use crate::models::{argmax, check_dimensions, RiskClassifier};
use crate::types::{ClassProbabilities, RiskLabel, N_CLASSES};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Число признаков-кандидатов на разбиение; `None` = floor(sqrt(n_features))
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: [f64; N_CLASSES],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

const EMPTY_LEAF: Node = Node::Leaf {
    distribution: [0.0; N_CLASSES],
};

/// Дерево хранится плоским списком узлов: корень первый, потомки всегда после родителя.
/// Глубина дерева не влияет на вложенность JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_distribution(&self, sample: &ArrayView1<f64>) -> Option<&[f64; N_CLASSES]> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                Node::Leaf { distribution } => return Some(distribution),
                Node::Split { feature, threshold, left, right } => {
                    let next = if *sample.get(*feature)? <= *threshold { *left } else { *right };
                    if next <= idx {
                        return None;
                    }
                    idx = next;
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    let total: f64 = distribution.iter().sum();
                    let malformed = distribution.iter().any(|p| !p.is_finite() || *p < 0.0);
                    if malformed || (total - 1.0).abs() > 1e-6 {
                        return Err(format!("leaf {idx} does not hold a class distribution"));
                    }
                }
                Node::Split { feature, threshold, left, right } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    if *left <= idx || *right <= idx || *left >= len || *right >= len {
                        return Err(format!("node {idx} points to invalid children"));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn fit(X: &Array2<f64>, y: &Array1<usize>, params: &ForestParams) -> Result<Self, TrainingError> {
        let n_samples = X.nrows();
        let n_features = X.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if y.len() != n_samples {
            return Err(TrainingError::InvalidConfig(format!(
                "{} rows but {} targets",
                n_samples,
                y.len()
            )));
        }
        if params.n_trees == 0 || params.min_samples_split < 2 {
            return Err(TrainingError::InvalidConfig(
                "forest needs at least one tree and min_samples_split >= 2".to_string(),
            ));
        }
        if y.iter().any(|&label| label >= N_CLASSES) {
            return Err(TrainingError::InvalidConfig("unknown class index in targets".to_string()));
        }

        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features);
        let builder = TreeBuilder {
            X,
            y,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features,
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            // У каждого дерева свой seed, выведенный из общего
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());

            // Bootstrap-выборка
            let indices: Vec<usize> = (0..n_samples)
                .map(|_| tree_rng.gen_range(0..n_samples))
                .collect();

            trees.push(builder.build(&mut tree_rng, indices));
        }

        Ok(Self { n_features, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Структурная проверка после десериализации
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("forest has no features".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| format!("tree {i}: {reason}"))?;
        }
        Ok(())
    }

    /// Среднее распределение листьев по всем деревьям
    fn distribution(&self, features: &ArrayView1<f64>) -> Result<[f64; N_CLASSES], PredictionError> {
        check_dimensions(self.n_features, features)?;

        if self.trees.is_empty() {
            return Err(PredictionError::MalformedModel { model: self.name() });
        }

        let mut total = [0.0; N_CLASSES];
        for tree in &self.trees {
            let leaf = tree
                .leaf_distribution(features)
                .ok_or(PredictionError::MalformedModel { model: self.name() })?;
            for (acc, p) in total.iter_mut().zip(leaf.iter()) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for value in &mut total {
            *value /= n_trees;
        }
        Ok(total)
    }
}

impl RiskClassifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_label(&self, features: ArrayView1<f64>) -> Result<RiskLabel, PredictionError> {
        let distribution = self.distribution(&features)?;
        let index = argmax(&distribution);
        RiskLabel::from_class_index(index).ok_or(PredictionError::UnknownClass {
            model: self.name(),
            index,
        })
    }

    fn supports_probabilities(&self) -> bool {
        true
    }

    fn predict_proba(&self, features: ArrayView1<f64>) -> Result<ClassProbabilities, PredictionError> {
        Ok(ClassProbabilities::from_distribution(self.distribution(&features)?))
    }
}

struct TreeBuilder<'a> {
    X: &'a Array2<f64>,
    y: &'a Array1<usize>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
}

impl TreeBuilder<'_> {
    /// Узлы строятся в прямом порядке (левое поддерево раньше правого) без рекурсии
    fn build(&self, rng: &mut StdRng, indices: Vec<usize>) -> Tree {
        let mut nodes = vec![EMPTY_LEAF];
        let mut pending = vec![(0usize, indices, 0usize)];

        while let Some((slot, indices, depth)) = pending.pop() {
            let counts = self.class_counts(&indices);

            let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
            if is_pure || depth_reached || indices.len() < self.min_samples_split {
                nodes[slot] = leaf(&counts);
                continue;
            }

            let Some((feature, threshold)) = self.best_split(rng, &indices, &counts) else {
                nodes[slot] = leaf(&counts);
                continue;
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| self.X[[i, feature]] <= threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(EMPTY_LEAF);
            nodes.push(EMPTY_LEAF);
            nodes[slot] = Node::Split { feature, threshold, left, right };

            pending.push((right, right_indices, depth + 1));
            pending.push((left, left_indices, depth + 1));
        }

        Tree { nodes }
    }

    /// Просматриваем признаки в случайном порядке. Первые `max_features` обязательны;
    /// если среди них нет допустимого разбиения (константные признаки), продолжаем дальше.
    fn best_split(
        &self,
        rng: &mut StdRng,
        indices: &[usize],
        counts: &[usize; N_CLASSES],
    ) -> Option<(usize, f64)> {
        let mut features: Vec<usize> = (0..self.X.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<(usize, f64, f64)> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some((threshold, impurity)) = self.best_threshold(feature, indices, counts) {
                if best.map_or(true, |(_, _, best_impurity)| impurity < best_impurity) {
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    /// Лучший порог по одному признаку: взвешенная примесь Джини потомков
    fn best_threshold(
        &self,
        feature: usize,
        indices: &[usize],
        counts: &[usize; N_CLASSES],
    ) -> Option<(f64, f64)> {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.X[[i, feature]], self.y[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = sorted.len();
        let mut left = [0usize; N_CLASSES];
        let mut best: Option<(f64, f64)> = None;

        for pos in 1..n {
            left[sorted[pos - 1].1] += 1;

            let (prev, curr) = (sorted[pos - 1].0, sorted[pos].0);
            if curr <= prev {
                continue;
            }

            let mut right = [0usize; N_CLASSES];
            for c in 0..N_CLASSES {
                right[c] = counts[c] - left[c];
            }
            let impurity = (pos as f64 * gini(&left, pos)
                + (n - pos) as f64 * gini(&right, n - pos))
                / n as f64;

            if best.map_or(true, |(_, best_impurity)| impurity < best_impurity) {
                let mut threshold = prev + (curr - prev) / 2.0;
                if threshold >= curr {
                    threshold = prev;
                }
                best = Some((threshold, impurity));
            }
        }

        best
    }

    fn class_counts(&self, indices: &[usize]) -> [usize; N_CLASSES] {
        let mut counts = [0usize; N_CLASSES];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize; N_CLASSES], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize; N_CLASSES]) -> Node {
    let total: usize = counts.iter().sum();
    let mut distribution = [0.0; N_CLASSES];
    if total > 0 {
        for (p, &c) in distribution.iter_mut().zip(counts.iter()) {
            *p = c as f64 / total as f64;
        }
    }
    Node::Leaf { distribution }
}
