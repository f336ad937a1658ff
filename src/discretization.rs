//! # PDEシステムの離散化
//!
//! 記号的なPDEシステムと近似器から、最小化すべき損失関数を組み立てます。
//!
//! 方程式ごと・条件ごとに残差の二乗平均（求積戦略では重み付き平均）を1つの損失項とし、
//! その重み付き和を全体の損失とします。入力に関する導関数はネットワークの中心差分で評価するので、
//! 残差はパラメータについて自動微分可能なまま保たれます。

use crate::error::{PinnError, Result};
use crate::model::SystemModel;
use crate::strategy::{SampleSet, TrainingStrategy};
use crate::symbolic::{Expr, Func};
use crate::system::{Extent, PdeSystem, Region};
use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 残差を評価できる近似器。従属変数ごとに `[n, dim]` の点から `[n, 1]` の値を返します。
pub trait FieldApproximator<B: Backend> {
    fn forward_var(&self, k: usize, points: Tensor<B, 2>) -> Tensor<B, 2>;
}

impl<B: Backend> FieldApproximator<B> for SystemModel<B> {
    fn forward_var(&self, k: usize, points: Tensor<B, 2>) -> Tensor<B, 2> {
        SystemModel::forward_var(self, k, points)
    }
}

/// 離散化の設定（学習戦略・差分幅・損失の重み）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discretization {
    pub strategy: TrainingStrategy,
    /// 入力に関する導関数を中心差分で求めるときの刻み幅。
    pub fd_step: f64,
    pub pde_weight: f64,
    pub bc_weight: f64,
}

impl Default for Discretization {
    fn default() -> Self {
        Self {
            strategy: TrainingStrategy::default(),
            fd_step: 1e-2,
            pde_weight: 1.0,
            bc_weight: 1.0,
        }
    }
}

impl Discretization {
    pub fn new(strategy: TrainingStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        if !(self.fd_step > 0.0 && self.fd_step.is_finite()) {
            return Err(PinnError::InvalidConfig(format!(
                "fd_step は正の有限値である必要があります: {}",
                self.fd_step
            )));
        }
        if self.pde_weight < 0.0 || self.bc_weight < 0.0 {
            return Err(PinnError::InvalidConfig(
                "損失の重みは0以上である必要があります".into(),
            ));
        }
        Ok(())
    }
}

/// 1つの損失項のサンプル点（テンソル化済み）。
#[derive(Debug, Clone)]
pub struct Samples<B: Backend> {
    pub points: Tensor<B, 2>,
    pub weights: Option<Tensor<B, 2>>,
}

impl<B: Backend> Samples<B> {
    pub fn from_set(set: &SampleSet, device: &B::Device) -> Self {
        let n = set.len();
        let points =
            Tensor::<B, 1>::from_floats(set.points.as_slice(), device).reshape([n, set.dim]);
        let weights = set
            .weights
            .as_ref()
            .map(|w| Tensor::<B, 1>::from_floats(w.as_slice(), device).reshape([n, 1]));
        Self { points, weights }
    }

    pub fn len(&self) -> usize {
        self.points.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 1反復ぶんのサンプル点。内部領域と、条件ごとの切り口。
#[derive(Debug, Clone)]
pub struct TrainingBatch<B: Backend> {
    pub interior: Samples<B>,
    pub conditions: Vec<Samples<B>>,
}

#[derive(Debug, Clone)]
struct SampleBatch {
    interior: SampleSet,
    conditions: Vec<SampleSet>,
}

impl SampleBatch {
    fn to_tensors<B: Backend>(&self, device: &B::Device) -> TrainingBatch<B> {
        TrainingBatch {
            interior: Samples::from_set(&self.interior, device),
            conditions: self
                .conditions
                .iter()
                .map(|set| Samples::from_set(set, device))
                .collect(),
        }
    }
}

/// 方程式ごと・条件ごとの損失項。
#[derive(Debug, Clone)]
pub struct LossTerms<B: Backend> {
    pub pde: Vec<Tensor<B, 1>>,
    pub bc: Vec<Tensor<B, 1>>,
}

impl<B: Backend> LossTerms<B> {
    /// 重み付き和 `pde_weight * Σ pde + bc_weight * Σ bc`。
    pub fn total(&self, pde_weight: f64, bc_weight: f64) -> Tensor<B, 1> {
        let pde = Tensor::cat(self.pde.clone(), 0).sum().mul_scalar(pde_weight);
        if self.bc.is_empty() {
            return pde;
        }
        pde + Tensor::cat(self.bc.clone(), 0).sum().mul_scalar(bc_weight)
    }
}

/// 最小化可能な形に離散化されたPDE問題。
#[derive(Debug, Clone)]
pub struct PinnProblem {
    discretization: Discretization,
    pde_residuals: Vec<Expr>,
    bc_residuals: Vec<Expr>,
    interior: Region,
    regions: Vec<Region>,
    cached: Option<SampleBatch>,
}

/// PDEシステムを損失関数へ離散化します。
///
/// 固定格子・求積戦略ではサンプル点をここで一度だけ生成します。
pub fn discretize(system: &PdeSystem, discretization: Discretization) -> Result<PinnProblem> {
    system.validate()?;
    discretization.validate()?;
    let interior = system.interior();
    let regions = system
        .conditions
        .iter()
        .map(|c| system.region_for(c))
        .collect();
    let mut problem = PinnProblem {
        pde_residuals: system.equations.iter().map(|e| e.residual()).collect(),
        bc_residuals: system
            .conditions
            .iter()
            .map(|c| c.equation.residual())
            .collect(),
        discretization,
        interior,
        regions,
        cached: None,
    };
    if !problem.discretization.strategy.resamples() {
        let mut rng = StdRng::seed_from_u64(0);
        problem.cached = Some(problem.sample(&mut rng)?);
    }
    Ok(problem)
}

impl PinnProblem {
    pub fn discretization(&self) -> &Discretization {
        &self.discretization
    }

    pub fn pde_count(&self) -> usize {
        self.pde_residuals.len()
    }

    pub fn bc_count(&self) -> usize {
        self.bc_residuals.len()
    }

    /// 再サンプリングしない戦略で、生成済みのサンプル点をテンソルにして返します。
    ///
    /// 学習ループはこれを一度だけ作り、全反復で使い回します。
    pub fn fixed_batch<B: Backend>(&self, device: &B::Device) -> Option<TrainingBatch<B>> {
        self.cached.as_ref().map(|batch| batch.to_tensors(device))
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Result<SampleBatch> {
        let strategy = &self.discretization.strategy;
        let interior = strategy.sample(&self.interior, rng)?;
        let conditions = self
            .regions
            .iter()
            .map(|region| strategy.sample_boundary(region, rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(SampleBatch {
            interior,
            conditions,
        })
    }

    /// 1反復ぶんのサンプル点を用意します。再サンプリングしない戦略では毎回同じ点を返します。
    pub fn batch<B: Backend, R: Rng>(
        &self,
        rng: &mut R,
        device: &B::Device,
    ) -> Result<TrainingBatch<B>> {
        match self.fixed_batch(device) {
            Some(batch) => Ok(batch),
            None => Ok(self.sample(rng)?.to_tensors(device)),
        }
    }

    /// 方程式ごと・条件ごとの損失項を計算します。
    pub fn losses<B: Backend, M: FieldApproximator<B>>(
        &self,
        model: &M,
        batch: &TrainingBatch<B>,
    ) -> LossTerms<B> {
        let h = self.discretization.fd_step;
        let pde = self
            .pde_residuals
            .iter()
            .map(|r| term_loss(r, model, &batch.interior, h))
            .collect();
        let bc = self
            .bc_residuals
            .iter()
            .zip(&batch.conditions)
            .map(|(r, samples)| term_loss(r, model, samples, h))
            .collect();
        LossTerms { pde, bc }
    }

    /// 全体の損失（スカラー）。
    pub fn loss<B: Backend, M: FieldApproximator<B>>(
        &self,
        model: &M,
        batch: &TrainingBatch<B>,
    ) -> Tensor<B, 1> {
        self.losses(model, batch)
            .total(self.discretization.pde_weight, self.discretization.bc_weight)
    }
}

fn term_loss<B: Backend, M: FieldApproximator<B>>(
    residual: &Expr,
    model: &M,
    samples: &Samples<B>,
    h: f64,
) -> Tensor<B, 1> {
    let r = evaluate(residual, model, &samples.points, h);
    match &samples.weights {
        Some(w) => (r.clone() * r * w.clone()).sum(),
        None => {
            let zeros = Tensor::zeros_like(&r);
            MseLoss::new().forward(r, zeros, Reduction::Mean)
        }
    }
}

fn column<B: Backend>(points: &Tensor<B, 2>, dim: usize) -> Tensor<B, 2> {
    let n = points.dims()[0];
    points.clone().slice([0..n, dim..dim + 1])
}

fn shift<B: Backend>(points: &Tensor<B, 2>, dim: usize, delta: f64) -> Tensor<B, 2> {
    let n = points.dims()[0];
    let moved = column(points, dim).add_scalar(delta);
    points.clone().slice_assign([0..n, dim..dim + 1], moved)
}

/// `var` 番目の従属変数の偏導関数を中心差分で評価します。
///
/// 1階は2点、2階は3点の公式を使い、3階以上は2階差分を再帰的に重ねます。
fn derivative<B: Backend, M: FieldApproximator<B>>(
    model: &M,
    var: usize,
    points: &Tensor<B, 2>,
    orders: &[(usize, u32)],
    h: f64,
) -> Tensor<B, 2> {
    let Some((&(dim, order), rest)) = orders.split_first() else {
        return model.forward_var(var, points.clone());
    };
    match order {
        0 => derivative(model, var, points, rest, h),
        1 => {
            let plus = derivative(model, var, &shift(points, dim, h), rest, h);
            let minus = derivative(model, var, &shift(points, dim, -h), rest, h);
            (plus - minus).div_scalar(2.0 * h)
        }
        _ => {
            let mut lower = Vec::with_capacity(orders.len());
            lower.push((dim, order - 2));
            lower.extend_from_slice(rest);
            let plus = derivative(model, var, &shift(points, dim, h), &lower, h);
            let center = derivative(model, var, points, &lower, h);
            let minus = derivative(model, var, &shift(points, dim, -h), &lower, h);
            (plus - center.mul_scalar(2.0) + minus).div_scalar(h * h)
        }
    }
}

/// 記号式をサンプル点 `[n, dim]` 上で評価し、`[n, 1]` のテンソルを返します。
pub fn evaluate<B: Backend, M: FieldApproximator<B>>(
    expr: &Expr,
    model: &M,
    points: &Tensor<B, 2>,
    h: f64,
) -> Tensor<B, 2> {
    let eval = |e: &Expr| evaluate(e, model, points, h);
    match expr {
        Expr::Const(c) => Tensor::full([points.dims()[0], 1], *c as f32, &points.device()),
        Expr::Indep { index, .. } => column(points, *index),
        Expr::Dep { index, .. } => model.forward_var(*index, points.clone()),
        Expr::Derivative { var, wrt, .. } => {
            let orders: Vec<(usize, u32)> = wrt.iter().map(|p| (p.dim, p.order)).collect();
            derivative(model, *var, points, &orders, h)
        }
        Expr::Add(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Const(c), other) | (other, Expr::Const(c)) => eval(other).add_scalar(*c),
            _ => eval(a) + eval(b),
        },
        Expr::Sub(a, b) => match (a.as_ref(), b.as_ref()) {
            (other, Expr::Const(c)) => eval(other).sub_scalar(*c),
            (Expr::Const(c), other) => eval(other).neg().add_scalar(*c),
            _ => eval(a) - eval(b),
        },
        Expr::Mul(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Const(c), other) | (other, Expr::Const(c)) => eval(other).mul_scalar(*c),
            _ => eval(a) * eval(b),
        },
        Expr::Div(a, b) => match b.as_ref() {
            Expr::Const(c) => eval(a).div_scalar(*c),
            _ => eval(a) / eval(b),
        },
        Expr::Neg(a) => eval(a).neg(),
        Expr::Pow(a, k) => eval(a).powi_scalar(*k),
        Expr::Func(func, a) => {
            let v = eval(a);
            match func {
                Func::Sin => v.sin(),
                Func::Cos => v.cos(),
                Func::Exp => v.exp(),
                Func::Ln => v.log(),
                Func::Tanh => v.tanh(),
                Func::Sqrt => v.sqrt(),
            }
        }
    }
}

/// 損失項1つぶんの記号的な説明。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossDescription {
    pub equation: String,
    pub residual: String,
    pub region: String,
    pub samples: usize,
}

/// [`symbolic_discretize`] の結果。各損失項を記号形式で確認するためのものです。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolicProblem {
    pub name: String,
    pub strategy: String,
    pub pde_losses: Vec<LossDescription>,
    pub bc_losses: Vec<LossDescription>,
}

impl fmt::Display for SymbolicProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "問題: {} (戦略: {})", self.name, self.strategy)?;
        writeln!(f, "PDE損失 ({}項):", self.pde_losses.len())?;
        for (i, d) in self.pde_losses.iter().enumerate() {
            writeln!(
                f,
                "  [{}] {}\n      残差: {}\n      領域: {} / 点数: {}",
                i, d.equation, d.residual, d.region, d.samples
            )?;
        }
        writeln!(f, "条件損失 ({}項):", self.bc_losses.len())?;
        for (i, d) in self.bc_losses.iter().enumerate() {
            writeln!(
                f,
                "  [{}] {}\n      残差: {}\n      領域: {} / 点数: {}",
                i, d.equation, d.residual, d.region, d.samples
            )?;
        }
        Ok(())
    }
}

fn describe_region(system: &PdeSystem, region: &Region) -> String {
    region
        .dims
        .iter()
        .zip(&system.indvars)
        .map(|(extent, var)| match extent {
            Extent::Free(iv) => format!("{} ∈ [{}, {}]", var.name(), iv.lo, iv.hi),
            Extent::Fixed(v) => format!("{} = {}", var.name(), v),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// 離散化の結果を記号形式で返します（学習は行いません）。
pub fn symbolic_discretize(
    system: &PdeSystem,
    discretization: Discretization,
) -> Result<SymbolicProblem> {
    let problem = discretize(system, discretization)?;
    let batch = match &problem.cached {
        Some(cached) => cached.clone(),
        None => problem.sample(&mut StdRng::seed_from_u64(0))?,
    };
    let pde_losses = system
        .equations
        .iter()
        .zip(&problem.pde_residuals)
        .map(|(eq, r)| LossDescription {
            equation: eq.to_string(),
            residual: r.to_string(),
            region: describe_region(system, &problem.interior),
            samples: batch.interior.len(),
        })
        .collect();
    let bc_losses = system
        .conditions
        .iter()
        .zip(&problem.bc_residuals)
        .zip(problem.regions.iter().zip(&batch.conditions))
        .map(|((cond, r), (region, set))| LossDescription {
            equation: cond.equation.to_string(),
            residual: r.to_string(),
            region: describe_region(system, region),
            samples: set.len(),
        })
        .collect();
    Ok(SymbolicProblem {
        name: system.name.clone(),
        strategy: problem.discretization.strategy.label().to_string(),
        pde_losses,
        bc_losses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use crate::symbolic::{Differential, Variables};
    use crate::system::{Condition, Domain};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<TestBackend>;

    /// `u(t, x) = sin(t) * x^2` を返すテスト用の近似器。
    struct Manufactured;

    impl<B: Backend> FieldApproximator<B> for Manufactured {
        fn forward_var(&self, _k: usize, points: Tensor<B, 2>) -> Tensor<B, 2> {
            let n = points.dims()[0];
            let t = points.clone().slice([0..n, 0..1]);
            let x = points.slice([0..n, 1..2]);
            t.sin() * x.powi_scalar(2)
        }
    }

    fn to_vec<B: Backend>(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn points<B: Backend>(device: &B::Device) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats([0.1, 0.2, 0.5, -0.3, 0.9, 0.7], device).reshape([3, 2])
    }

    #[test]
    fn evaluates_arithmetic_and_functions() {
        let device = Default::default();
        let mut vars = Variables::new();
        let t = vars.parameter("t");
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let expr = (u.expr() + 1.0) * t.expr().exp() - x.expr() / 2.0;

        let got = to_vec(evaluate(&expr, &Manufactured, &points::<TestBackend>(&device), 1e-2));
        for (i, (tv, xv)) in [(0.1f32, 0.2f32), (0.5, -0.3), (0.9, 0.7)].iter().enumerate() {
            let uv = tv.sin() * xv * xv;
            let want = (uv + 1.0) * tv.exp() - xv / 2.0;
            assert!((got[i] - want).abs() < 1e-5, "{} vs {}", got[i], want);
        }
    }

    #[test]
    fn finite_differences_match_analytic_derivatives() {
        let device = Default::default();
        let mut vars = Variables::new();
        let t = vars.parameter("t");
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let p = points::<TestBackend>(&device);

        let dt = to_vec(evaluate(&Differential::new(&t).apply(&u), &Manufactured, &p, 1e-2));
        let dxx = to_vec(evaluate(
            &Differential::new(&x).pow(2).apply(&u),
            &Manufactured,
            &p,
            1e-2,
        ));
        let dtx = to_vec(evaluate(
            &Differential::new(&t).then(&x).apply(&u),
            &Manufactured,
            &p,
            1e-2,
        ));
        for (i, (tv, xv)) in [(0.1f32, 0.2f32), (0.5, -0.3), (0.9, 0.7)].iter().enumerate() {
            assert!((dt[i] - tv.cos() * xv * xv).abs() < 1e-3);
            assert!((dxx[i] - 2.0 * tv.sin()).abs() < 1e-2);
            assert!((dtx[i] - 2.0 * tv.cos() * xv).abs() < 1e-3);
        }
    }

    #[test]
    fn finite_differences_agree_with_autodiff_gradient() {
        let device = Default::default();
        let config = ModelConfig::default();
        let model = SystemModel::<TestAutodiffBackend>::new(&config, 1, &device);
        let mut vars = Variables::new();
        let _t = vars.parameter("t");
        let x = vars.parameter("x");
        let u = vars.variable("u");

        let coords = points::<TestAutodiffBackend>(&device);
        let coords_grad = coords.clone().require_grad();
        let grads = model.forward_var(0, coords_grad.clone()).sum().backward();
        let u_grads = coords_grad.grad(&grads).unwrap();
        let u_x: Vec<f32> = u_grads.slice([0..3, 1..2]).into_data().to_vec().unwrap();

        let fd = to_vec(evaluate(&Differential::new(&x).apply(&u), &model, &coords, 1e-2));
        for (a, b) in fd.iter().zip(&u_x) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn exact_field_has_vanishing_loss_and_gradients_flow() {
        let mut vars = Variables::new();
        let t = vars.parameter("t");
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let eq = Differential::new(&t)
            .apply(&u)
            .equals(x.expr().powi(2) * t.expr().cos());
        let bc = Condition::at(&[(&t, 0.0)], u.expr().equals(0.0));
        let system = PdeSystem::new(
            "manufactured",
            vec![eq],
            vec![bc],
            vec![
                Domain::new(&t, 0.0, 1.0).unwrap(),
                Domain::new(&x, -1.0, 1.0).unwrap(),
            ],
            &vars,
        )
        .unwrap();

        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(7);
        for strategy in [
            TrainingStrategy::Grid { dx: 0.1 },
            TrainingStrategy::Stochastic {
                points: 200,
                bc_points: 50,
            },
            TrainingStrategy::Quadrature { nodes: 10 },
        ] {
            let problem = discretize(&system, Discretization::new(strategy)).unwrap();
            let batch = problem.batch::<TestBackend, _>(&mut rng, &device).unwrap();
            let terms = problem.losses(&Manufactured, &batch);
            assert_eq!((terms.pde.len(), terms.bc.len()), (1, 1));
            let total: f32 = problem.loss(&Manufactured, &batch).into_scalar();
            assert!(total < 1e-6, "total = {}", total);
        }

        let problem = discretize(&system, Discretization::default()).unwrap();
        let model = SystemModel::<TestAutodiffBackend>::new(&ModelConfig::default(), 1, &device);
        let batch = problem
            .batch::<TestAutodiffBackend, _>(&mut rng, &device)
            .unwrap();
        let loss = problem.loss(&model, &batch);
        let grads = burn::optim::GradientsParams::from_grads(loss.backward(), &model);
        assert!(!grads.is_empty());
    }

    #[test]
    fn symbolic_discretize_describes_each_term() {
        let mut vars = Variables::new();
        let t = vars.parameter("t");
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let eq = Differential::new(&t)
            .apply(&u)
            .equals(Differential::new(&x).pow(2).apply(&u));
        let ic = Condition::at(&[(&t, 0.0)], u.expr().equals(x.expr().sin()));
        let system = PdeSystem::new(
            "heat",
            vec![eq],
            vec![ic],
            vec![
                Domain::new(&t, 0.0, 1.0).unwrap(),
                Domain::new(&x, 0.0, 1.0).unwrap(),
            ],
            &vars,
        )
        .unwrap();

        let sym = symbolic_discretize(
            &system,
            Discretization::new(TrainingStrategy::Grid { dx: 0.5 }),
        )
        .unwrap();
        assert_eq!(sym.strategy, "grid");
        assert_eq!(sym.pde_losses[0].residual, "Dt(u) - Dxx(u)");
        assert_eq!(sym.pde_losses[0].samples, 9);
        assert_eq!(sym.bc_losses[0].region, "t = 0, x ∈ [0, 1]");
        assert_eq!(sym.bc_losses[0].samples, 3);
        assert!(sym.to_string().contains("u ~ sin(x)"));
    }

    #[test]
    fn fixed_strategies_reuse_one_batch() {
        let mut vars = Variables::new();
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let system = PdeSystem::new(
            "ode",
            vec![Differential::new(&x).apply(&u).equals(u.expr())],
            vec![Condition::at(&[(&x, 0.0)], u.expr().equals(1.0))],
            vec![Domain::new(&x, 0.0, 1.0).unwrap()],
            &vars,
        )
        .unwrap();
        let device = Default::default();

        let fixed = discretize(
            &system,
            Discretization::new(TrainingStrategy::Quadrature { nodes: 8 }),
        )
        .unwrap();
        assert_eq!((fixed.pde_count(), fixed.bc_count()), (1, 1));
        let cached = fixed.fixed_batch::<TestBackend>(&device).unwrap();
        assert_eq!(cached.interior.len(), 8);
        assert_eq!(cached.conditions[0].len(), 1);
        let drawn = fixed
            .batch::<TestBackend, _>(&mut StdRng::seed_from_u64(9), &device)
            .unwrap();
        assert_eq!(to_vec(drawn.interior.points), to_vec(cached.interior.points));

        let resampled = discretize(
            &system,
            Discretization::new(TrainingStrategy::Stochastic {
                points: 32,
                bc_points: 4,
            }),
        )
        .unwrap();
        assert!(resampled.fixed_batch::<TestBackend>(&device).is_none());
    }

    #[test]
    fn rejects_non_positive_step() {
        let mut vars = Variables::new();
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let system = PdeSystem::new(
            "ode",
            vec![Differential::new(&x).apply(&u).equals(u.expr())],
            vec![],
            vec![Domain::new(&x, 0.0, 1.0).unwrap()],
            &vars,
        )
        .unwrap();
        let discretization = Discretization {
            fd_step: 0.0,
            ..Discretization::default()
        };
        assert!(matches!(
            discretize(&system, discretization),
            Err(PinnError::InvalidConfig(_))
        ));
    }
}
