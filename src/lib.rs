//! # 連立PDEのための物理情報ニューラルネットワーク (PINN) ライブラリ
//!
//! `burn` フレームワークを使用して、連立偏微分方程式や行列形式のPDEを
//! 物理情報ニューラルネットワーク（PINN）で解くための主要なコンポーネントを提供します。
//!
//! 1. [`symbolic`] / [`system`] で変数・微分演算子・方程式・条件・定義域を宣言し、
//! 2. [`discretization`] で学習戦略（[`strategy`]）に従って損失関数へ離散化し、
//! 3. [`training`] で最適化の段を順に実行して従属変数ごとのネットワーク（[`model`]）を学習し、
//! 4. [`inference`] / [`plot`] で厳密解と比較して描画します。

pub mod cli;
pub mod config;
pub mod discretization;
pub mod error;
pub mod inference;
pub mod model;
pub mod plot;
pub mod problems;
pub mod strategy;
pub mod symbolic;
pub mod system;
pub mod training;

pub use error::{PinnError, Result};
