//! # PDEシステム
//!
//! 方程式・初期/境界条件・定義域・独立変数・従属変数をひとまとめにした [`PdeSystem`] を定義します。

use crate::error::{PinnError, Result};
use crate::symbolic::{DependentVar, Equation, Expr, IndependentVar, Variables};
use std::fmt;

/// 閉区間 `[lo, hi]`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(PinnError::InvalidInterval { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

/// 独立変数とその定義区間の組。
#[derive(Debug, Clone)]
pub struct Domain {
    pub var: IndependentVar,
    pub interval: Interval,
}

impl Domain {
    pub fn new(var: &IndependentVar, lo: f64, hi: f64) -> Result<Self> {
        Ok(Self {
            var: var.clone(),
            interval: Interval::new(lo, hi)?,
        })
    }
}

/// 初期条件・境界条件。
///
/// `fixed` に列挙した独立変数を固定値に置いた定義域の切り口上で `equation` が成り立つことを要求します。
/// 例えば `u1(0, x) ~ sin(πx)` は `fixed = [(t, 0.0)]` です。
#[derive(Debug, Clone)]
pub struct Condition {
    pub fixed: Vec<(IndependentVar, f64)>,
    pub equation: Equation,
}

impl Condition {
    pub fn at(fixed: &[(&IndependentVar, f64)], equation: Equation) -> Self {
        Self {
            fixed: fixed
                .iter()
                .map(|&(var, value)| (var.clone(), value))
                .collect(),
            equation,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.equation)?;
        if !self.fixed.is_empty() {
            let at: Vec<String> = self
                .fixed
                .iter()
                .map(|(var, value)| format!("{}={}", var.name(), value))
                .collect();
            write!(f, "  [{}]", at.join(", "))?;
        }
        Ok(())
    }
}

/// サンプリング対象の領域。次元ごとに区間か固定値のどちらかを持ちます。
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub dims: Vec<Extent>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    Free(Interval),
    Fixed(f64),
}

impl Region {
    /// 固定されていない次元の数。
    pub fn free_dims(&self) -> usize {
        self.dims
            .iter()
            .filter(|e| matches!(e, Extent::Free(_)))
            .count()
    }

    pub fn dim(&self) -> usize {
        self.dims.len()
    }
}

/// 方程式・条件・定義域・変数をまとめたPDEシステム。
#[derive(Debug, Clone)]
pub struct PdeSystem {
    pub name: String,
    pub equations: Vec<Equation>,
    pub conditions: Vec<Condition>,
    pub domains: Vec<Domain>,
    pub indvars: Vec<IndependentVar>,
    pub depvars: Vec<DependentVar>,
}

impl PdeSystem {
    /// システムを組み立て、整合性を検証します。
    pub fn new(
        name: &str,
        equations: Vec<Equation>,
        conditions: Vec<Condition>,
        domains: Vec<Domain>,
        vars: &Variables,
    ) -> Result<Self> {
        let system = Self {
            name: name.to_string(),
            equations,
            conditions,
            domains,
            indvars: vars.indvars().to_vec(),
            depvars: vars.depvars().to_vec(),
        };
        system.validate()?;
        Ok(system)
    }

    pub fn input_dim(&self) -> usize {
        self.indvars.len()
    }

    pub fn output_count(&self) -> usize {
        self.depvars.len()
    }

    /// 参照される変数・定義域・条件の固定値の整合性を検証します。
    pub fn validate(&self) -> Result<()> {
        if self.equations.is_empty() {
            return Err(PinnError::InvalidSystem("方程式がありません".into()));
        }
        if self.indvars.is_empty() || self.depvars.is_empty() {
            return Err(PinnError::InvalidSystem(
                "独立変数と従属変数をそれぞれ1つ以上宣言してください".into(),
            ));
        }
        if self.domains.len() != self.indvars.len() {
            return Err(PinnError::InvalidSystem(format!(
                "定義域の数 ({}) が独立変数の数 ({}) と一致しません",
                self.domains.len(),
                self.indvars.len()
            )));
        }
        for (i, (domain, var)) in self.domains.iter().zip(&self.indvars).enumerate() {
            if domain.var != *var {
                return Err(PinnError::InvalidSystem(format!(
                    "{}番目の定義域は '{}' ではなく '{}' についてのものです",
                    i,
                    var.name(),
                    domain.var.name()
                )));
            }
        }

        let equations = self
            .equations
            .iter()
            .chain(self.conditions.iter().map(|c| &c.equation));
        for eq in equations {
            for side in [&eq.lhs, &eq.rhs] {
                self.check_refs(side, eq)?;
            }
        }

        for cond in &self.conditions {
            for (var, value) in &cond.fixed {
                let value = *value;
                let domain = self
                    .domains
                    .get(var.index())
                    .filter(|d| d.var == *var)
                    .ok_or_else(|| {
                        PinnError::UnknownVariable(format!("独立変数 '{}' ({})", var.name(), cond))
                    })?;
                if !domain.interval.contains(value) {
                    return Err(PinnError::InvalidSystem(format!(
                        "条件 '{}' の固定値 {}={} が定義域 [{}, {}] の外にあります",
                        cond.equation,
                        domain.var.name(),
                        value,
                        domain.interval.lo,
                        domain.interval.hi
                    )));
                }
            }
        }
        Ok(())
    }

    /// 式中の変数が添字と名前の両方でこのシステムの宣言と一致することを確かめます。
    fn check_refs(&self, expr: &Expr, eq: &Equation) -> Result<()> {
        for (index, name) in expr.dependent_refs() {
            if self.depvars.get(index).map(DependentVar::name) != Some(name) {
                return Err(PinnError::UnknownVariable(format!(
                    "従属変数 '{}' ({})",
                    name, eq
                )));
            }
        }
        for (index, name) in expr.independent_refs() {
            if self.indvars.get(index).map(IndependentVar::name) != Some(name) {
                return Err(PinnError::UnknownVariable(format!(
                    "独立変数 '{}' ({})",
                    name, eq
                )));
            }
        }
        Ok(())
    }

    /// 方程式を評価する内部領域。
    pub fn interior(&self) -> Region {
        Region {
            dims: self
                .domains
                .iter()
                .map(|d| Extent::Free(d.interval))
                .collect(),
        }
    }

    /// 条件を評価する切り口の領域。
    pub fn region_for(&self, condition: &Condition) -> Region {
        let mut region = self.interior();
        for (var, value) in &condition.fixed {
            if let Some(extent) = region.dims.get_mut(var.index()) {
                *extent = Extent::Fixed(*value);
            }
        }
        region
    }
}
