//! # 連立PDEを解く物理情報ニューラルネットワーク (PINN) プログラム
//!
//! `clap` クレートを利用して、コマンドラインから`train`（学習）と`infer`（推論）、
//! 離散化結果の確認（`show`）、問題一覧（`list`）を個別に実行できます。
//!
//! ## 使い方
//!
//! ### 学習
//! ```bash
//! cargo run --release -- train --problem linear
//! ```
//!
//! ### 推論
//! ```bash
//! cargo run --release -- infer --problem linear
//! ```
//!
//! ログの詳細度は環境変数 `RUST_LOG` で変更できます（例: `RUST_LOG=debug`）。

use clap::Parser;
use pinn_systems::cli::{Cli, Commands, StrategyArg};
use pinn_systems::config::TrainConfig;
use pinn_systems::discretization::symbolic_discretize;
use pinn_systems::{Result, inference, problems, training};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// `show`サブコマンドを実行します。
fn show(problem: &str, strategy: Option<StrategyArg>) -> Result<()> {
    let problem = problems::lookup(problem)?;
    let mut discretization = TrainConfig::for_problem(&problem).discretization;
    if let Some(strategy) = strategy {
        discretization.strategy = strategy.to_strategy();
    }
    let symbolic = symbolic_discretize(&problem.system, discretization)?;
    println!("{}", symbolic);
    Ok(())
}

fn list() {
    for (name, description) in problems::catalog() {
        println!("{:<10} {}", name, description);
    }
}

/// プログラムのエントリーポイント。
///
/// コマンドライン引数を解析し、各サブコマンドの処理に振り分けます。
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Train(args) => training::run(args),
        Commands::Infer(args) => inference::run(args),
        Commands::Show { problem, strategy } => show(problem, *strategy),
        Commands::List => {
            list();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
