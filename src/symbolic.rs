//! # 記号モデリング層
//!
//! 独立変数・従属変数・微分演算子・方程式を記号的に宣言するための型を提供します。
//! ここで組み立てた式 [`Expr`] は [`crate::discretization`] でテンソル上の残差として評価されます。

use crate::error::{PinnError, Result};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 独立変数（座標）。`t`, `x`, `y` など。
#[derive(Debug, Clone, PartialEq)]
pub struct IndependentVar {
    index: usize,
    name: String,
}

impl IndependentVar {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// この座標の値を表す式を返します。
    pub fn expr(&self) -> Expr {
        Expr::Indep {
            index: self.index,
            name: self.name.clone(),
        }
    }
}

/// 従属変数（未知関数）。変数ごとに1つのニューラルネットワークで近似されます。
#[derive(Debug, Clone, PartialEq)]
pub struct DependentVar {
    index: usize,
    name: String,
}

impl DependentVar {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 現在の点における `u(t, x)` を表す式を返します。
    pub fn expr(&self) -> Expr {
        Expr::Dep {
            index: self.index,
            name: self.name.clone(),
        }
    }
}

impl From<&IndependentVar> for Expr {
    fn from(var: &IndependentVar) -> Self {
        var.expr()
    }
}

impl From<&DependentVar> for Expr {
    fn from(var: &DependentVar) -> Self {
        var.expr()
    }
}

/// 変数の宣言をまとめて管理します。
///
/// 宣言順に添字が振られ、独立変数の添字がそのままネットワーク入力の列番号になります。
#[derive(Debug, Clone, Default)]
pub struct Variables {
    indvars: Vec<IndependentVar>,
    depvars: Vec<DependentVar>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 独立変数を宣言します。
    pub fn parameter(&mut self, name: &str) -> IndependentVar {
        let var = IndependentVar {
            index: self.indvars.len(),
            name: name.to_string(),
        };
        self.indvars.push(var.clone());
        var
    }

    /// 従属変数を宣言します。
    pub fn variable(&mut self, name: &str) -> DependentVar {
        let var = DependentVar {
            index: self.depvars.len(),
            name: name.to_string(),
        };
        self.depvars.push(var.clone());
        var
    }

    /// `rows × cols` の従属変数の行列を宣言します。要素は列優先で並びます。
    pub fn array(&mut self, name: &str, rows: usize, cols: usize) -> VariableArray {
        let mut vars = Vec::with_capacity(rows * cols);
        for j in 0..cols {
            for i in 0..rows {
                vars.push(self.variable(&format!("{}{}{}", name, i + 1, j + 1)));
            }
        }
        VariableArray {
            name: name.to_string(),
            rows,
            cols,
            vars,
        }
    }

    pub fn indvars(&self) -> &[IndependentVar] {
        &self.indvars
    }

    pub fn depvars(&self) -> &[DependentVar] {
        &self.depvars
    }
}

/// 行列形式の従属変数。
#[derive(Debug, Clone)]
pub struct VariableArray {
    name: String,
    rows: usize,
    cols: usize,
    vars: Vec<DependentVar>,
}

impl VariableArray {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 行列要素 `U[i, j]`（0始まり）。
    pub fn get(&self, i: usize, j: usize) -> &DependentVar {
        &self.vars[j * self.rows + i]
    }

    /// 列優先の線形添字でアクセスします。
    pub fn at(&self, k: usize) -> &DependentVar {
        &self.vars[k]
    }

    /// 要素ごとに微分演算子を適用します。
    pub fn derivative(&self, d: &Differential) -> Vec<Expr> {
        self.vars.iter().map(|v| d.apply(v)).collect()
    }

    /// 定数行列 `A` との積 `A · U` を列優先の要素式として返します。
    pub fn matmul_const(&self, a: &[Vec<f64>]) -> Result<Vec<Expr>> {
        if a.iter().any(|row| row.len() != self.rows) {
            return Err(PinnError::InvalidSystem(format!(
                "行列の形状が一致しません: A の列数は {} である必要があります",
                self.rows
            )));
        }
        let mut out = Vec::with_capacity(a.len() * self.cols);
        for j in 0..self.cols {
            for row in a {
                let mut acc: Option<Expr> = None;
                for (k, &coef) in row.iter().enumerate() {
                    if coef == 0.0 {
                        continue;
                    }
                    let term = if coef == 1.0 {
                        self.get(k, j).expr()
                    } else if coef == -1.0 {
                        -self.get(k, j).expr()
                    } else {
                        coef * self.get(k, j).expr()
                    };
                    acc = Some(match acc {
                        None => term,
                        Some(sum) => sum + term,
                    });
                }
                out.push(acc.unwrap_or(Expr::Const(0.0)));
            }
        }
        Ok(out)
    }
}

/// 偏微分の1成分（どの座標について何階か）。
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub dim: usize,
    pub name: String,
    pub order: u32,
}

/// 単項関数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Exp,
    Ln,
    Tanh,
    Sqrt,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Exp => "exp",
            Func::Ln => "log",
            Func::Tanh => "tanh",
            Func::Sqrt => "sqrt",
        }
    }
}

/// 記号式の木。
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Indep { index: usize, name: String },
    Dep { index: usize, name: String },
    Derivative {
        var: usize,
        name: String,
        wrt: Vec<Partial>,
    },
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Pow(Box<Expr>, i32),
    Func(Func, Box<Expr>),
}

impl Expr {
    pub fn sin(self) -> Self {
        Expr::Func(Func::Sin, Box::new(self))
    }

    pub fn cos(self) -> Self {
        Expr::Func(Func::Cos, Box::new(self))
    }

    pub fn exp(self) -> Self {
        Expr::Func(Func::Exp, Box::new(self))
    }

    pub fn ln(self) -> Self {
        Expr::Func(Func::Ln, Box::new(self))
    }

    pub fn tanh(self) -> Self {
        Expr::Func(Func::Tanh, Box::new(self))
    }

    pub fn sqrt(self) -> Self {
        Expr::Func(Func::Sqrt, Box::new(self))
    }

    pub fn powi(self, exponent: i32) -> Self {
        Expr::Pow(Box::new(self), exponent)
    }

    /// `lhs ~ rhs` の方程式を作ります。
    pub fn equals(self, rhs: impl Into<Expr>) -> Equation {
        Equation {
            lhs: self,
            rhs: rhs.into(),
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Indep { .. } | Expr::Dep { .. } | Expr::Derivative { .. } => {
                Vec::new()
            }
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                vec![a.as_ref(), b.as_ref()]
            }
            Expr::Neg(a) | Expr::Pow(a, _) | Expr::Func(_, a) => vec![a.as_ref()],
        }
    }

    fn fold<T>(&self, init: T, f: &impl Fn(T, &Expr) -> T) -> T {
        let acc = f(init, self);
        self.children()
            .into_iter()
            .fold(acc, |acc, child| child.fold(acc, f))
    }

    fn nodes(&self) -> Vec<&Expr> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.nodes());
        }
        out
    }

    /// 式中で参照される従属変数を `(添字, 名前)` の組で出現順に返します。
    pub fn dependent_refs(&self) -> Vec<(usize, &str)> {
        self.nodes()
            .into_iter()
            .filter_map(|e| match e {
                Expr::Dep { index, name } | Expr::Derivative { var: index, name, .. } => {
                    Some((*index, name.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// 式中で参照される独立変数（微分の対象を含む）を `(添字, 名前)` の組で返します。
    pub fn independent_refs(&self) -> Vec<(usize, &str)> {
        self.nodes()
            .into_iter()
            .flat_map(|e| match e {
                Expr::Indep { index, name } => vec![(*index, name.as_str())],
                Expr::Derivative { wrt, .. } => {
                    wrt.iter().map(|p| (p.dim, p.name.as_str())).collect()
                }
                _ => Vec::new(),
            })
            .collect()
    }

    /// 式中で参照される従属変数の最大添字。
    pub fn max_dependent_index(&self) -> Option<usize> {
        self.dependent_refs().into_iter().map(|(k, _)| k).max()
    }

    /// 式中で参照される独立変数の最大添字。
    pub fn max_independent_index(&self) -> Option<usize> {
        self.independent_refs().into_iter().map(|(k, _)| k).max()
    }

    /// 式に含まれる最高の微分階数（全階数）。
    pub fn derivative_order(&self) -> u32 {
        self.fold(0, &|acc: u32, e: &Expr| match e {
            Expr::Derivative { wrt, .. } => acc.max(wrt.iter().map(|p| p.order).sum()),
            _ => acc,
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Pow(..) => 4,
            Expr::Const(c) if *c < 0.0 => 3,
            _ => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Indep { name, .. } | Expr::Dep { name, .. } => write!(f, "{}", name),
            Expr::Derivative { name, wrt, .. } => {
                write!(f, "D")?;
                for p in wrt {
                    for _ in 0..p.order {
                        write!(f, "{}", p.name)?;
                    }
                }
                write!(f, "({})", name)
            }
            Expr::Add(a, b) => {
                a.fmt_child(f, 1)?;
                write!(f, " + ")?;
                b.fmt_child(f, 1)
            }
            Expr::Sub(a, b) => {
                a.fmt_child(f, 1)?;
                write!(f, " - ")?;
                b.fmt_child(f, 2)
            }
            Expr::Mul(a, b) => {
                a.fmt_child(f, 2)?;
                write!(f, " * ")?;
                b.fmt_child(f, 2)
            }
            Expr::Div(a, b) => {
                a.fmt_child(f, 2)?;
                write!(f, " / ")?;
                b.fmt_child(f, 3)
            }
            Expr::Neg(a) => {
                write!(f, "-")?;
                a.fmt_child(f, 3)
            }
            Expr::Pow(a, k) => {
                a.fmt_child(f, 5)?;
                write!(f, "^{}", k)
            }
            Expr::Func(func, a) => write!(f, "{}({})", func.name(), a),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait<Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(self), Box::new(rhs))
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                Expr::$variant(Box::new(self), Box::new(Expr::Const(rhs)))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(Expr::Const(self)), Box::new(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, Add);
impl_binary_op!(Sub, sub, Sub);
impl_binary_op!(Mul, mul, Mul);
impl_binary_op!(Div, div, Div);

/// 方程式 `lhs ~ rhs`。
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    /// 残差 `lhs - rhs`。厳密解では恒等的に0になります。
    pub fn residual(&self) -> Expr {
        match &self.rhs {
            Expr::Const(c) if *c == 0.0 => self.lhs.clone(),
            _ => self.lhs.clone() - self.rhs.clone(),
        }
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.lhs, self.rhs)
    }
}

/// 微分演算子。`Differential::new(&x).pow(2)` が `Dxx` に相当します。
#[derive(Debug, Clone, PartialEq)]
pub struct Differential {
    wrt: Vec<Partial>,
}

impl Differential {
    pub fn new(var: &IndependentVar) -> Self {
        Self {
            wrt: vec![Partial {
                dim: var.index,
                name: var.name.clone(),
                order: 1,
            }],
        }
    }

    /// 演算子を `n` 回合成します。
    pub fn pow(mut self, n: u32) -> Self {
        for p in &mut self.wrt {
            p.order *= n;
        }
        self.normalized()
    }

    /// 別の座標についての1階微分を合成します（混合微分）。
    pub fn then(mut self, var: &IndependentVar) -> Self {
        self.wrt.push(Partial {
            dim: var.index,
            name: var.name.clone(),
            order: 1,
        });
        self.normalized()
    }

    pub fn partials(&self) -> &[Partial] {
        &self.wrt
    }

    /// 従属変数に適用し、偏微分の式を返します。
    pub fn apply(&self, target: &DependentVar) -> Expr {
        if self.wrt.is_empty() {
            return target.expr();
        }
        Expr::Derivative {
            var: target.index,
            name: target.name.clone(),
            wrt: self.wrt.clone(),
        }
    }

    fn normalized(mut self) -> Self {
        self.wrt.sort_by_key(|p| p.dim);
        let mut merged: Vec<Partial> = Vec::with_capacity(self.wrt.len());
        for p in self.wrt {
            match merged.last_mut() {
                Some(last) if last.dim == p.dim => last.order += p.order,
                _ => merged.push(p),
            }
        }
        merged.retain(|p| p.order > 0);
        self.wrt = merged;
        self
    }
}
