use crate::cli::InferArgs;
use crate::config::TrainConfig;
use crate::error::{PinnError, Result};
use crate::model::SystemModel;
use crate::plot::plot_comparison;
use crate::problems::{self, Problem};
use crate::system::Domain;
use burn::backend::NdArray;
use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::Tensor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

type MyBackend = NdArray<f32>;

/// 定義域全体を覆う一様格子。
///
/// 点は先頭の独立変数が最も遅く変化する順に並びます。
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationGrid {
    pub names: Vec<String>,
    pub axes: Vec<Vec<f64>>,
}

impl EvaluationGrid {
    pub fn new(domains: &[Domain], resolution: usize) -> Self {
        let n = resolution.max(2);
        let axes = domains
            .iter()
            .map(|d| {
                (0..n)
                    .map(|i| d.interval.lo + d.interval.width() * i as f64 / (n - 1) as f64)
                    .collect()
            })
            .collect();
        Self {
            names: domains.iter().map(|d| d.var.name().to_string()).collect(),
            axes,
        }
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    pub fn len(&self) -> usize {
        self.axes.iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全格子点を列挙します。
    pub fn points(&self) -> Vec<Vec<f64>> {
        let mut out = Vec::with_capacity(self.len());
        let mut idx = vec![0usize; self.dim()];
        for _ in 0..self.len() {
            out.push(idx.iter().zip(&self.axes).map(|(&i, a)| a[i]).collect());
            for d in (0..self.dim()).rev() {
                idx[d] += 1;
                if idx[d] < self.axes[d].len() {
                    break;
                }
                idx[d] = 0;
            }
        }
        out
    }
}

/// 1つの従属変数についての厳密解と予測の比較。
#[derive(Debug, Clone, PartialEq)]
pub struct VariableComparison {
    pub name: String,
    pub analytic: Vec<f64>,
    pub predicted: Vec<f64>,
    pub abs_error: Vec<f64>,
    pub max_error: f64,
    pub mean_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub grid: EvaluationGrid,
    pub vars: Vec<VariableComparison>,
}

/// 学習済みモデルを格子上で評価し、厳密解と比較します。
pub fn compare<B: Backend>(
    model: &SystemModel<B>,
    problem: &Problem,
    grid: EvaluationGrid,
    device: &B::Device,
) -> Result<Comparison> {
    let points = grid.points();
    let n = points.len();
    let dim = grid.dim();
    let flat: Vec<f32> = points.iter().flatten().map(|&v| v as f32).collect();
    let coords = Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([n, dim]);

    let outputs = model.outputs();
    let predictions: Vec<f32> = model
        .forward_all(coords)
        .into_data()
        .to_vec()
        .map_err(|e| PinnError::Tensor(format!("{:?}", e)))?;
    let analytic: Vec<Vec<f64>> = points.iter().map(|p| (problem.analytic)(p)).collect();

    let vars = problem
        .system
        .depvars
        .iter()
        .enumerate()
        .map(|(k, var)| {
            let analytic: Vec<f64> = analytic.iter().map(|row| row[k]).collect();
            let predicted: Vec<f64> = (0..n)
                .map(|i| predictions[i * outputs + k] as f64)
                .collect();
            let abs_error: Vec<f64> = analytic
                .iter()
                .zip(&predicted)
                .map(|(a, p)| (a - p).abs())
                .collect();
            let max_error = abs_error.iter().cloned().fold(0.0, f64::max);
            let mean_error = abs_error.iter().sum::<f64>() / n.max(1) as f64;
            VariableComparison {
                name: var.name().to_string(),
                analytic,
                predicted,
                abs_error,
                max_error,
                mean_error,
            }
        })
        .collect();
    Ok(Comparison { grid, vars })
}

/// `infer`サブコマンドを実行します。
///
/// 保存済みモデルを読み込み、厳密解との誤差を表示してグラフを保存します。
pub fn run(args: &InferArgs) -> Result<()> {
    let device = Default::default();
    let problem = problems::lookup(&args.problem)?;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| TrainConfig::for_problem(&problem).output_dir);
    let defaults = TrainConfig {
        output_dir: output_dir.clone(),
        ..TrainConfig::for_problem(&problem)
    };
    let config_path = defaults.config_path(problem.name());
    let mut config = if config_path.exists() {
        TrainConfig::load(&config_path)?
    } else {
        warn!(
            "設定ファイル '{}' が見つからないため既定の設定を使います。",
            config_path.display()
        );
        defaults
    };
    config.output_dir = output_dir;
    config.validate(&problem)?;

    let model_path: PathBuf = config.model_path(problem.name());
    if !model_path.exists() {
        return Err(PinnError::ModelNotFound(model_path.display().to_string()));
    }

    info!("推論を実行します - バックエンド: NdArray (CPU)");
    let inference_start = Instant::now();

    info!("保存済みモデルを '{}' からロード中...", model_path.display());
    let model = SystemModel::<MyBackend>::new(&config.model, problem.system.output_count(), &device)
        .load_file(
            model_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            &device,
        )?;

    let resolution = args.resolution.unwrap_or(config.resolution);
    let grid = EvaluationGrid::new(&problem.system.domains, resolution);
    let grid_size = grid.len();
    let comparison = compare(&model, &problem, grid, &device)?;
    let inference_duration = inference_start.elapsed();

    info!("推論が完了しました。評価点数: {}", grid_size);
    for var in &comparison.vars {
        info!(
            "  {}: 最大絶対誤差 {:.3e}, 平均絶対誤差 {:.3e}",
            var.name, var.max_error, var.mean_error
        );
    }
    info!("=> 推論時間: {:.2?}", inference_duration);

    let written = plot_comparison(&config.output_dir, problem.name(), &comparison)?;
    for path in written {
        info!("=> グラフを '{}' に保存しました。", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;

    #[test]
    fn grid_spans_each_domain() {
        let problem = problems::lookup("linear").unwrap();
        let grid = EvaluationGrid::new(&problem.system.domains, 5);
        assert_eq!(grid.names, vec!["t", "x"]);
        assert_eq!(grid.len(), 25);
        let points = grid.points();
        assert_eq!(points[0], vec![0.0, 0.0]);
        assert_eq!(points[1], vec![0.0, 0.25]);
        assert_eq!(points[24], vec![1.0, 1.0]);
    }

    #[test]
    fn comparison_reports_errors_per_variable() {
        let device = Default::default();
        let problem = problems::lookup("matrix").unwrap();
        let config = ModelConfig {
            inputs: 1,
            ..problem.model
        };
        let model = SystemModel::<MyBackend>::new(&config, 4, &device);
        let grid = EvaluationGrid::new(&problem.system.domains, 11);
        let comparison = compare(&model, &problem, grid, &device).unwrap();

        assert_eq!(comparison.vars.len(), 4);
        for var in &comparison.vars {
            assert_eq!(var.predicted.len(), 11);
            assert!(var.max_error >= var.mean_error);
            let recomputed = (var.analytic[3] - var.predicted[3]).abs();
            assert!((var.abs_error[3] - recomputed).abs() < 1e-12);
        }
        assert_eq!(comparison.vars[1].name, "u21");
        assert!((comparison.vars[0].analytic[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = InferArgs {
            problem: "elliptic".into(),
            output: Some(dir.path().to_path_buf()),
            resolution: None,
        };
        assert!(matches!(run(&args), Err(PinnError::ModelNotFound(_))));
    }
}
