//! # 学習設定
//!
//! 問題ごとの既定値に、JSON設定ファイルとコマンドライン引数を順に上書きして最終的な設定を決めます。
//! 学習時に確定した設定はモデルと一緒に保存され、推論時にネットワークの形状を復元するのに使われます。

use crate::discretization::Discretization;
use crate::error::{PinnError, Result};
use crate::model::ModelConfig;
use crate::problems::Problem;
use crate::strategy::TrainingStrategy;
use crate::training::{OptimizerStage, TrainingOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// 学習・推論の設定一式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model: ModelConfig,
    pub discretization: Discretization,
    pub stages: Vec<OptimizerStage>,
    pub abstol: f64,
    pub seed: u64,
    pub log_every: usize,
    /// 推論・描画に使う格子の1軸あたりの点数。
    pub resolution: usize,
    pub output_dir: PathBuf,
}

impl TrainConfig {
    /// 問題に推奨される既定の設定。
    pub fn for_problem(problem: &Problem) -> Self {
        let options = TrainingOptions::default();
        Self {
            model: ModelConfig {
                inputs: problem.system.input_dim(),
                ..problem.model
            },
            discretization: Discretization::new(problem.strategy.clone()),
            stages: problem.stages.clone(),
            abstol: options.abstol,
            seed: options.seed,
            log_every: options.log_every,
            resolution: 50,
            output_dir: PathBuf::from("output"),
        }
    }

    /// 既定値 → 設定ファイル → コマンドライン引数の順に上書きして設定を確定します。
    pub fn resolve(
        problem: &Problem,
        config_file: Option<&Path>,
        strategy: Option<TrainingStrategy>,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::load_over(problem, path)?,
            None => Self::for_problem(problem),
        };
        if let Some(strategy) = strategy {
            config.discretization.strategy = strategy;
        }
        if let Some(dir) = output_dir {
            config.output_dir = dir;
        }
        config.validate(problem)?;
        Ok(config)
    }

    /// 問題の既定値の上に設定ファイルの内容を重ねて読み込みます。
    ///
    /// ファイルに書かれていない項目は既定値のまま残ります。
    pub fn load_over(problem: &Problem, path: &Path) -> Result<Self> {
        let mut base = serde_json::to_value(Self::for_problem(problem))?;
        let overlay: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        merge(&mut base, overlay);
        let config: Self = serde_json::from_value(base)?;
        config.validate(problem)?;
        Ok(config)
    }

    /// 保存済みの設定をそのまま読み込みます。
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self, problem: &Problem) -> Result<()> {
        if self.model.inputs != problem.system.input_dim() {
            return Err(PinnError::InvalidConfig(format!(
                "model.inputs ({}) が独立変数の数 ({}) と一致しません",
                self.model.inputs,
                problem.system.input_dim()
            )));
        }
        if self.model.hidden == 0 {
            return Err(PinnError::InvalidConfig(
                "model.hidden は1以上である必要があります".into(),
            ));
        }
        if self.stages.is_empty() {
            return Err(PinnError::InvalidConfig(
                "最適化の段 (stages) が1つもありません".into(),
            ));
        }
        if let Some(stage) = self
            .stages
            .iter()
            .find(|s| !(s.learning_rate > 0.0 && s.learning_rate.is_finite()))
        {
            return Err(PinnError::InvalidConfig(format!(
                "学習率は正の有限値である必要があります: {}",
                stage.learning_rate
            )));
        }
        if self.resolution < 2 {
            return Err(PinnError::InvalidConfig(
                "resolution は2以上である必要があります".into(),
            ));
        }
        self.discretization.strategy.validate()
    }

    pub fn options(&self) -> TrainingOptions {
        TrainingOptions {
            abstol: self.abstol,
            log_every: self.log_every,
            seed: self.seed,
        }
    }

    pub fn model_path(&self, problem: &str) -> PathBuf {
        self.output_dir.join(format!("{}_model.mpk", problem))
    }

    pub fn config_path(&self, problem: &str) -> PathBuf {
        self.output_dir.join(format!("{}_config.json", problem))
    }
}

/// `overlay` のオブジェクトを `base` に再帰的に重ねます。配列やスカラーは丸ごと置き換えます。
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
