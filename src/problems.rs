//! # 問題カタログ
//!
//! 連立PDEと行列形式のPDEの例題を、厳密解とあわせて提供します。

use crate::error::{PinnError, Result};
use crate::model::{Activation, ModelConfig};
use crate::strategy::TrainingStrategy;
use crate::symbolic::{Differential, Variables};
use crate::system::{Condition, Domain, PdeSystem};
use crate::training::{OptimizerKind, OptimizerStage};
use std::f64::consts::PI;

/// 点 `(t, x, ...)` における全従属変数の厳密解。
pub type AnalyticFn = fn(&[f64]) -> Vec<f64>;

/// 例題1つ。PDEシステム・厳密解・推奨される学習設定からなります。
#[derive(Debug, Clone)]
pub struct Problem {
    pub system: PdeSystem,
    pub description: &'static str,
    pub analytic: AnalyticFn,
    pub model: ModelConfig,
    pub strategy: TrainingStrategy,
    pub stages: Vec<OptimizerStage>,
}

impl Problem {
    pub fn name(&self) -> &str {
        &self.system.name
    }
}

const CATALOG: [(&str, &str); 4] = [
    ("linear", "3変数の連立線形PDE (u1, u2, u3)"),
    ("parabolic", "連成した線形放物型PDE (u, w)"),
    ("elliptic", "非線形楕円型の連立PDE (u, w)"),
    ("matrix", "行列形式の常微分方程式 dU/dx = A U"),
];

/// 登録されている問題名と説明の一覧。
pub fn catalog() -> &'static [(&'static str, &'static str)] {
    &CATALOG
}

/// 名前から問題を構築します。
pub fn lookup(name: &str) -> Result<Problem> {
    match name {
        "linear" => linear(),
        "parabolic" => parabolic(),
        "elliptic" => elliptic(),
        "matrix" => matrix(),
        other => Err(PinnError::UnknownProblem(other.to_string())),
    }
}

fn adam(learning_rate: f64, max_iters: usize) -> OptimizerStage {
    OptimizerStage {
        optimizer: OptimizerKind::Adam,
        learning_rate,
        max_iters,
    }
}

fn description(name: &str) -> &'static str {
    CATALOG
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
        .unwrap_or("")
}

/// ```text
/// Dtt(u1) ~ Dxx(u1) + u3 sin(πx)
/// Dtt(u2) ~ Dxx(u2) + u3 cos(πx)
/// 0       ~ u1 sin(πx) + u2 cos(πx) - e^{-t}
/// ```
fn linear() -> Result<Problem> {
    let mut vars = Variables::new();
    let t = vars.parameter("t");
    let x = vars.parameter("x");
    let u1 = vars.variable("u1");
    let u2 = vars.variable("u2");
    let u3 = vars.variable("u3");

    let dt = Differential::new(&t);
    let dtt = Differential::new(&t).pow(2);
    let dxx = Differential::new(&x).pow(2);
    let pix = || PI * x.expr();
    let decay = || (-t.expr()).exp();

    let equations = vec![
        dtt.apply(&u1)
            .equals(dxx.apply(&u1) + u3.expr() * pix().sin()),
        dtt.apply(&u2)
            .equals(dxx.apply(&u2) + u3.expr() * pix().cos()),
        (u1.expr() * pix().sin() + u2.expr() * pix().cos() - decay()).equals(0.0),
    ];
    let conditions = vec![
        Condition::at(&[(&t, 0.0)], u1.expr().equals(pix().sin())),
        Condition::at(&[(&t, 0.0)], u2.expr().equals(pix().cos())),
        Condition::at(&[(&t, 0.0)], dt.apply(&u1).equals(-pix().sin())),
        Condition::at(&[(&t, 0.0)], dt.apply(&u2).equals(-pix().cos())),
        Condition::at(&[(&x, 0.0)], u1.expr().equals(0.0)),
        Condition::at(&[(&x, 0.0)], u2.expr().equals(decay())),
        Condition::at(&[(&x, 1.0)], u1.expr().equals(0.0)),
        Condition::at(&[(&x, 1.0)], u2.expr().equals(-decay())),
    ];
    let domains = vec![Domain::new(&t, 0.0, 1.0)?, Domain::new(&x, 0.0, 1.0)?];
    let system = PdeSystem::new("linear", equations, conditions, domains, &vars)?;

    Ok(Problem {
        system,
        description: description("linear"),
        analytic: |p| {
            let (t, x) = (p[0], p[1]);
            let decay = (-t).exp();
            vec![
                decay * (PI * x).sin(),
                decay * (PI * x).cos(),
                (1.0 + PI * PI) * decay,
            ]
        },
        model: ModelConfig {
            inputs: 2,
            hidden: 15,
            layers: 3,
            activation: Activation::Sigmoid,
        },
        strategy: TrainingStrategy::Quadrature { nodes: 16 },
        stages: vec![adam(1e-2, 1500), adam(1e-3, 1500)],
    })
}

/// ```text
/// Dt(u) ~ Dxx(u) - π Dx(w) - u
/// Dt(w) ~ Dxx(w) + π Dx(u) - w
/// ```
fn parabolic() -> Result<Problem> {
    let mut vars = Variables::new();
    let t = vars.parameter("t");
    let x = vars.parameter("x");
    let u = vars.variable("u");
    let w = vars.variable("w");

    let dt = Differential::new(&t);
    let dx = Differential::new(&x);
    let dxx = Differential::new(&x).pow(2);
    let pix = || PI * x.expr();
    let decay = || (-t.expr()).exp();

    let equations = vec![
        dt.apply(&u)
            .equals(dxx.apply(&u) - PI * dx.apply(&w) - u.expr()),
        dt.apply(&w)
            .equals(dxx.apply(&w) + PI * dx.apply(&u) - w.expr()),
    ];
    let conditions = vec![
        Condition::at(&[(&t, 0.0)], u.expr().equals(pix().sin())),
        Condition::at(&[(&t, 0.0)], w.expr().equals(pix().cos())),
        Condition::at(&[(&x, 0.0)], u.expr().equals(0.0)),
        Condition::at(&[(&x, 1.0)], u.expr().equals(0.0)),
        Condition::at(&[(&x, 0.0)], w.expr().equals(decay())),
        Condition::at(&[(&x, 1.0)], w.expr().equals(-decay())),
    ];
    let domains = vec![Domain::new(&t, 0.0, 1.0)?, Domain::new(&x, 0.0, 1.0)?];
    let system = PdeSystem::new("parabolic", equations, conditions, domains, &vars)?;

    Ok(Problem {
        system,
        description: description("parabolic"),
        analytic: |p| {
            let (t, x) = (p[0], p[1]);
            let decay = (-t).exp();
            vec![decay * (PI * x).sin(), decay * (PI * x).cos()]
        },
        model: ModelConfig {
            inputs: 2,
            hidden: 16,
            layers: 3,
            activation: Activation::Tanh,
        },
        strategy: TrainingStrategy::QuasiRandom {
            points: 400,
            bc_points: 64,
        },
        stages: vec![adam(1e-2, 2000), adam(1e-3, 1000)],
    })
}

/// ```text
/// Dxx(u) + Dyy(u) + u Dx(w) ~ x y
/// Dxx(w) + Dyy(w) + w Dy(u) ~ x (x + y)
/// ```
fn elliptic() -> Result<Problem> {
    let mut vars = Variables::new();
    let x = vars.parameter("x");
    let y = vars.parameter("y");
    let u = vars.variable("u");
    let w = vars.variable("w");

    let dx = Differential::new(&x);
    let dy = Differential::new(&y);
    let dxx = Differential::new(&x).pow(2);
    let dyy = Differential::new(&y).pow(2);

    let equations = vec![
        (dxx.apply(&u) + dyy.apply(&u) + u.expr() * dx.apply(&w)).equals(x.expr() * y.expr()),
        (dxx.apply(&w) + dyy.apply(&w) + w.expr() * dy.apply(&u))
            .equals(x.expr() * (x.expr() + y.expr())),
    ];
    let conditions = vec![
        Condition::at(&[(&x, 0.0)], u.expr().equals(0.0)),
        Condition::at(&[(&x, 1.0)], u.expr().equals(y.expr())),
        Condition::at(&[(&y, 0.0)], u.expr().equals(0.0)),
        Condition::at(&[(&y, 1.0)], u.expr().equals(x.expr())),
        Condition::at(&[(&x, 0.0)], w.expr().equals(y.expr())),
        Condition::at(&[(&x, 1.0)], w.expr().equals(y.expr() + 1.0)),
        Condition::at(&[(&y, 0.0)], w.expr().equals(x.expr())),
        Condition::at(&[(&y, 1.0)], w.expr().equals(x.expr() + 1.0)),
    ];
    let domains = vec![Domain::new(&x, 0.0, 1.0)?, Domain::new(&y, 0.0, 1.0)?];
    let system = PdeSystem::new("elliptic", equations, conditions, domains, &vars)?;

    Ok(Problem {
        system,
        description: description("elliptic"),
        analytic: |p| {
            let (x, y) = (p[0], p[1]);
            vec![x * y, x + y]
        },
        model: ModelConfig {
            inputs: 2,
            hidden: 16,
            layers: 3,
            activation: Activation::Tanh,
        },
        strategy: TrainingStrategy::Grid { dx: 0.05 },
        stages: vec![
            adam(1e-2, 1500),
            OptimizerStage {
                optimizer: OptimizerKind::RmsProp,
                learning_rate: 1e-3,
                max_iters: 1000,
            },
        ],
    })
}

/// 2×2 の従属変数行列 `U` について `Dx(U) ~ A U`, `U(0) ~ I`。
fn matrix() -> Result<Problem> {
    let mut vars = Variables::new();
    let x = vars.parameter("x");
    let u = vars.array("u", 2, 2);

    let a = vec![vec![0.0, 1.0], vec![-1.0, 0.0]];
    let lhs = u.derivative(&Differential::new(&x));
    let rhs = u.matmul_const(&a)?;
    let equations = lhs
        .into_iter()
        .zip(rhs)
        .map(|(l, r)| l.equals(r))
        .collect();

    let (rows, cols) = u.shape();
    let mut conditions = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            let identity = if i == j { 1.0 } else { 0.0 };
            conditions.push(Condition::at(
                &[(&x, 0.0)],
                u.get(i, j).expr().equals(identity),
            ));
        }
    }
    let domains = vec![Domain::new(&x, 0.0, 1.0)?];
    let system = PdeSystem::new("matrix", equations, conditions, domains, &vars)?;

    Ok(Problem {
        system,
        description: description("matrix"),
        // 回転行列 [[cos x, sin x], [-sin x, cos x]] を列優先で並べたもの
        analytic: |p| {
            let x = p[0];
            vec![x.cos(), -x.sin(), x.sin(), x.cos()]
        },
        model: ModelConfig {
            inputs: 1,
            hidden: 12,
            layers: 3,
            activation: Activation::Tanh,
        },
        strategy: TrainingStrategy::Quadrature { nodes: 32 },
        stages: vec![adam(1e-2, 1000), adam(1e-3, 1000)],
    })
}
