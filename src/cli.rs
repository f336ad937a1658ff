use crate::strategy::TrainingStrategy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(author, version, about = "Physics-Informed Neural Networks for systems of PDEs with Burn", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// PINNモデルを学習し、結果をファイルに保存します
    Train(TrainArgs),
    /// 保存されたPINNモデルで推論し、厳密解と比較します
    Infer(InferArgs),
    /// 離散化された損失項を記号形式で表示します
    Show {
        #[arg(short, long)]
        problem: String,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// 利用できる問題の一覧を表示します
    List,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// 問題名 (list で一覧を表示)
    #[arg(short, long)]
    pub problem: String,
    /// 既定値を上書きするJSON設定ファイル
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// モデル・設定・グラフの出力先
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    #[arg(short, long)]
    pub problem: String,
    /// 学習時と同じ出力先
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// 評価格子の1軸あたりの点数
    #[arg(long)]
    pub resolution: Option<usize>,
}

/// コマンドラインから選べる学習戦略。
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Grid,
    Stochastic,
    QuasiRandom,
    Quadrature,
}

impl StrategyArg {
    pub fn to_strategy(self) -> TrainingStrategy {
        match self {
            StrategyArg::Grid => TrainingStrategy::Grid { dx: 0.05 },
            StrategyArg::Stochastic => TrainingStrategy::Stochastic {
                points: 512,
                bc_points: 128,
            },
            StrategyArg::QuasiRandom => TrainingStrategy::QuasiRandom {
                points: 512,
                bc_points: 128,
            },
            StrategyArg::Quadrature => TrainingStrategy::Quadrature { nodes: 16 },
        }
    }
}
