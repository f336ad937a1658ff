//! # 学習戦略
//!
//! 残差を評価するコロケーション点の選び方を定義します。
//! 固定格子・一様乱数・準乱数（Halton列）・Gauss–Legendre求積の4種類があります。

use crate::error::{PinnError, Result};
use crate::system::{Extent, Region};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Halton列の基数に使う素数。独立変数はこの数まで扱えます。
const HALTON_BASES: [u64; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

/// 固定格子が1つの損失項に生成できる点数の上限。
const MAX_GRID_POINTS: usize = 1 << 22;

/// コロケーション点の選び方。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainingStrategy {
    /// 間隔 `dx` の固定格子（端点を含む）。
    Grid { dx: f64 },
    /// 反復ごとに引き直す一様乱数点。
    Stochastic { points: usize, bc_points: usize },
    /// 反復ごとに開始位置を変える Halton 列。
    QuasiRandom { points: usize, bc_points: usize },
    /// 自由次元あたり `nodes` 点のテンソル積 Gauss–Legendre 求積。
    Quadrature { nodes: usize },
}

impl Default for TrainingStrategy {
    fn default() -> Self {
        TrainingStrategy::Quadrature { nodes: 20 }
    }
}

/// 1つの損失項に対するサンプル点の集合。
///
/// `points` は `[len, dim]` を行優先で平坦化したものです。
/// `weights` がある場合、損失は重み付き平均（和は1）になります。
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub dim: usize,
    pub points: Vec<f32>,
    pub weights: Option<Vec<f32>>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.points.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TrainingStrategy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            TrainingStrategy::Grid { dx } if !(dx > 0.0 && dx.is_finite()) => Err(
                PinnError::InvalidStrategy(format!("dx は正の有限値である必要があります: {}", dx)),
            ),
            TrainingStrategy::Stochastic { points, bc_points }
            | TrainingStrategy::QuasiRandom { points, bc_points }
                if points == 0 || bc_points == 0 =>
            {
                Err(PinnError::InvalidStrategy(
                    "points と bc_points は1以上である必要があります".into(),
                ))
            }
            TrainingStrategy::Quadrature { nodes } if nodes == 0 => Err(
                PinnError::InvalidStrategy("nodes は1以上である必要があります".into()),
            ),
            _ => Ok(()),
        }
    }

    /// 反復ごとにサンプル点を引き直す必要があるかどうか。
    pub fn resamples(&self) -> bool {
        matches!(
            self,
            TrainingStrategy::Stochastic { .. } | TrainingStrategy::QuasiRandom { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrainingStrategy::Grid { .. } => "grid",
            TrainingStrategy::Stochastic { .. } => "stochastic",
            TrainingStrategy::QuasiRandom { .. } => "quasi_random",
            TrainingStrategy::Quadrature { .. } => "quadrature",
        }
    }

    /// 方程式（内部領域）用のサンプル点を生成します。
    pub fn sample<R: Rng>(&self, region: &Region, rng: &mut R) -> Result<SampleSet> {
        self.sample_with(region, rng, false)
    }

    /// 初期・境界条件用のサンプル点を生成します。
    pub fn sample_boundary<R: Rng>(&self, region: &Region, rng: &mut R) -> Result<SampleSet> {
        self.sample_with(region, rng, true)
    }

    fn sample_with<R: Rng>(&self, region: &Region, rng: &mut R, boundary: bool) -> Result<SampleSet> {
        self.validate()?;
        if region.free_dims() == 0 {
            return Ok(single_point(region));
        }
        let set = match *self {
            TrainingStrategy::Grid { dx } => {
                let axes = region
                    .dims
                    .iter()
                    .map(|e| match *e {
                        Extent::Fixed(v) => Ok(vec![v]),
                        Extent::Free(iv) => grid_nodes(iv.width(), dx).map(|n| {
                            (0..n)
                                .map(|i| iv.lo + iv.width() * i as f64 / (n - 1) as f64)
                                .collect()
                        }),
                    })
                    .collect::<Result<Vec<Vec<f64>>>>()?;
                let total = axes
                    .iter()
                    .try_fold(1usize, |acc, axis| acc.checked_mul(axis.len()))
                    .filter(|&n| n <= MAX_GRID_POINTS);
                if total.is_none() {
                    return Err(PinnError::InvalidStrategy(format!(
                        "dx = {} の格子点数が上限 {} を超えます",
                        dx, MAX_GRID_POINTS
                    )));
                }
                SampleSet {
                    dim: region.dim(),
                    points: tensor_product(&axes),
                    weights: None,
                }
            }
            TrainingStrategy::Stochastic { points, bc_points } => {
                let n = if boundary { bc_points } else { points };
                let mut out = Vec::with_capacity(n * region.dim());
                for _ in 0..n {
                    for e in &region.dims {
                        out.push(match *e {
                            Extent::Fixed(v) => v as f32,
                            Extent::Free(iv) => rng.random_range(iv.lo..iv.hi) as f32,
                        });
                    }
                }
                SampleSet {
                    dim: region.dim(),
                    points: out,
                    weights: None,
                }
            }
            TrainingStrategy::QuasiRandom { points, bc_points } => {
                if region.dim() > HALTON_BASES.len() {
                    return Err(PinnError::InvalidStrategy(format!(
                        "quasi_random は独立変数 {} 個までです",
                        HALTON_BASES.len()
                    )));
                }
                let n = if boundary { bc_points } else { points };
                let offset = rng.random_range(1..1_000_000u64);
                let mut out = Vec::with_capacity(n * region.dim());
                for k in 0..n as u64 {
                    for (j, e) in region.dims.iter().enumerate() {
                        out.push(match *e {
                            Extent::Fixed(v) => v as f32,
                            Extent::Free(iv) => {
                                let u = radical_inverse(offset + k, HALTON_BASES[j]);
                                (iv.lo + iv.width() * u) as f32
                            }
                        });
                    }
                }
                SampleSet {
                    dim: region.dim(),
                    points: out,
                    weights: None,
                }
            }
            TrainingStrategy::Quadrature { nodes } => {
                let (ref_nodes, ref_weights) = gauss_legendre(nodes);
                let mut axes = Vec::with_capacity(region.dim());
                let mut axis_weights = Vec::with_capacity(region.dim());
                for e in &region.dims {
                    match *e {
                        Extent::Fixed(v) => {
                            axes.push(vec![v]);
                            axis_weights.push(vec![1.0]);
                        }
                        Extent::Free(iv) => {
                            let center = 0.5 * (iv.lo + iv.hi);
                            let half = 0.5 * iv.width();
                            axes.push(ref_nodes.iter().map(|z| center + half * z).collect());
                            // [-1, 1] 上の重みの和は2なので、半分にして和を1に正規化する
                            axis_weights.push(ref_weights.iter().map(|w| 0.5 * w).collect());
                        }
                    }
                }
                SampleSet {
                    dim: region.dim(),
                    points: tensor_product(&axes),
                    weights: Some(tensor_product_weights(&axis_weights)),
                }
            }
        };
        Ok(set)
    }
}

/// 幅 `width` の区間を間隔 `dx` で刻んだときの格子点数（端点を含む）。
fn grid_nodes(width: f64, dx: f64) -> Result<usize> {
    let steps = (width / dx).round();
    if !(steps.is_finite() && steps < MAX_GRID_POINTS as f64) {
        return Err(PinnError::InvalidStrategy(format!(
            "dx = {} では1軸あたりの格子点数が上限 {} を超えます",
            dx, MAX_GRID_POINTS
        )));
    }
    Ok((steps as usize).max(1) + 1)
}

fn single_point(region: &Region) -> SampleSet {
    let points = region
        .dims
        .iter()
        .map(|e| match *e {
            Extent::Fixed(v) => v as f32,
            Extent::Free(iv) => (0.5 * (iv.lo + iv.hi)) as f32,
        })
        .collect();
    SampleSet {
        dim: region.dim(),
        points,
        weights: None,
    }
}

/// 各軸の座標のテンソル積を行優先（先頭の軸が最も遅く変化）で平坦化します。
fn tensor_product(axes: &[Vec<f64>]) -> Vec<f32> {
    let total: usize = axes.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(total * axes.len());
    let mut idx = vec![0usize; axes.len()];
    for _ in 0..total {
        for (axis, &i) in axes.iter().zip(&idx) {
            out.push(axis[i] as f32);
        }
        for d in (0..axes.len()).rev() {
            idx[d] += 1;
            if idx[d] < axes[d].len() {
                break;
            }
            idx[d] = 0;
        }
    }
    out
}

fn tensor_product_weights(axes: &[Vec<f64>]) -> Vec<f32> {
    let mut weights = vec![1.0f64];
    for axis in axes {
        weights = weights
            .iter()
            .flat_map(|w| axis.iter().map(move |a| w * a))
            .collect();
    }
    weights.into_iter().map(|w| w as f32).collect()
}

/// 基数 `base` での radical inverse（Halton列の1成分）。
fn radical_inverse(mut index: u64, base: u64) -> f64 {
    let inv = 1.0 / base as f64;
    let mut scale = inv;
    let mut value = 0.0;
    while index > 0 {
        value += (index % base) as f64 * scale;
        index /= base;
        scale *= inv;
    }
    value
}

/// `[-1, 1]` 上の `n` 点 Gauss–Legendre 則の節点と重み。
///
/// Legendre多項式の根をChebyshev近似を初期値としたNewton法で求めます。
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n.div_ceil(2) {
        let mut z = ((i as f64 + 0.75) / (n as f64 + 0.5) * PI).cos();
        for _ in 0..100 {
            let (p, dp) = legendre(n, z);
            let dz = p / dp;
            z -= dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre(n, z);
        let w = 2.0 / ((1.0 - z * z) * dp * dp);
        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

/// `P_n(z)` とその導関数を三項漸化式で評価します。
fn legendre(n: usize, z: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = z;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * z * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (z * p1 - p0) / (z * z - 1.0);
    (p1, dp)
}
