use crate::cli::TrainArgs;
use crate::config::TrainConfig;
use crate::discretization::{PinnProblem, TrainingBatch, discretize};
use crate::error::Result;
use crate::model::SystemModel;
use crate::plot::plot_loss_history;
use crate::problems;
use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::optim::{
    AdamConfig, AdamWConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig,
};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::ElementConversion;
use burn::tensor::backend::{AutodiffBackend, Backend};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{debug, info};

type MyBackend = Autodiff<NdArray<f32>>;

/// 各段で使うオプティマイザ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    AdamW,
    Sgd,
    RmsProp,
}

/// 最適化の1段。複数の段を順に実行し、同じモデルを続けて学習します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerStage {
    pub optimizer: OptimizerKind,
    pub learning_rate: f64,
    pub max_iters: usize,
}

/// 学習ループの設定。
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    /// 全体の損失がこの値を下回ったら学習を打ち切ります。
    pub abstol: f64,
    pub log_every: usize,
    pub seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            abstol: 1e-7,
            log_every: 100,
            seed: 42,
        }
    }
}

/// コールバックに渡される各反復の状態。
///
/// `model` はこの反復の更新を適用する前のパラメータです。
pub struct TrainingProgress<'a, B: Backend> {
    pub stage: usize,
    pub iteration: usize,
    pub model: &'a SystemModel<B>,
    pub loss: f32,
    pub pde_losses: &'a [f32],
    pub bc_losses: &'a [f32],
}

/// 損失履歴の1点。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossRecord {
    pub iteration: usize,
    pub total: f32,
    pub pde: f32,
    pub bc: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub history: Vec<LossRecord>,
    pub iterations: usize,
    pub final_loss: f32,
    pub elapsed: Duration,
    /// コールバックが学習を中断したかどうか。
    pub halted: bool,
    /// 損失が `abstol` を下回って終了したかどうか。
    pub converged: bool,
}

enum StageEnd {
    Completed,
    Halted,
    Converged,
}

/// 最適化の段を順に実行してモデルを学習します。
///
/// `callback` は毎反復、現在のモデルと損失を受け取って呼ばれ、`ControlFlow::Break(())` を返すと学習を中断します。
/// 固定格子・求積戦略のサンプル点はテンソル化を一度だけ行い、全段で使い回します。
pub fn train<B, F>(
    problem: &PinnProblem,
    mut model: SystemModel<B>,
    stages: &[OptimizerStage],
    options: &TrainingOptions,
    device: &B::Device,
    mut callback: F,
) -> Result<(SystemModel<B>, TrainingReport)>
where
    B: AutodiffBackend,
    F: FnMut(&TrainingProgress<B>) -> ControlFlow<()>,
{
    let mut rng = StdRng::seed_from_u64(options.seed);
    let fixed = problem.fixed_batch::<B>(device);
    let mut report = TrainingReport::default();
    let start = Instant::now();

    for (index, stage) in stages.iter().enumerate() {
        info!(
            "第{}段: {:?} (学習率 {}, 最大 {} 反復)",
            index + 1,
            stage.optimizer,
            stage.learning_rate,
            stage.max_iters
        );
        let mut runner = StageRunner {
            problem,
            stage,
            index,
            options,
            device,
            fixed: fixed.as_ref(),
            rng: &mut rng,
            report: &mut report,
            callback: &mut callback,
        };
        let (trained, end) = match stage.optimizer {
            OptimizerKind::Adam => runner.run(model, AdamConfig::new().init())?,
            OptimizerKind::AdamW => runner.run(model, AdamWConfig::new().init())?,
            OptimizerKind::Sgd => runner.run(model, SgdConfig::new().init())?,
            OptimizerKind::RmsProp => runner.run(model, RmsPropConfig::new().init())?,
        };
        model = trained;
        match end {
            StageEnd::Completed => {}
            StageEnd::Halted => {
                info!("コールバックにより学習を中断しました。");
                report.halted = true;
                break;
            }
            StageEnd::Converged => {
                info!("損失が許容値 {} を下回ったため学習を終了します。", options.abstol);
                report.converged = true;
                break;
            }
        }
    }
    report.elapsed = start.elapsed();
    Ok((model, report))
}

struct StageRunner<'a, B: AutodiffBackend, F> {
    problem: &'a PinnProblem,
    stage: &'a OptimizerStage,
    index: usize,
    options: &'a TrainingOptions,
    device: &'a B::Device,
    fixed: Option<&'a TrainingBatch<B>>,
    rng: &'a mut StdRng,
    report: &'a mut TrainingReport,
    callback: &'a mut F,
}

impl<B, F> StageRunner<'_, B, F>
where
    B: AutodiffBackend,
    F: FnMut(&TrainingProgress<B>) -> ControlFlow<()>,
{
    fn run<O>(&mut self, mut model: SystemModel<B>, mut optim: O) -> Result<(SystemModel<B>, StageEnd)>
    where
        O: Optimizer<SystemModel<B>, B>,
    {
        let discretization = self.problem.discretization();
        let log_every = self.options.log_every.max(1);

        for iteration in 1..=self.stage.max_iters {
            let fresh;
            let batch = match self.fixed {
                Some(batch) => batch,
                None => {
                    fresh = self.problem.batch::<B, _>(&mut *self.rng, self.device)?;
                    &fresh
                }
            };
            let terms = self.problem.losses(&model, batch);
            let total = terms.total(discretization.pde_weight, discretization.bc_weight);

            let loss: f32 = total.clone().into_scalar().elem();
            let pde_losses: Vec<f32> = terms
                .pde
                .iter()
                .map(|t| t.clone().into_scalar().elem())
                .collect();
            let bc_losses: Vec<f32> = terms
                .bc
                .iter()
                .map(|t| t.clone().into_scalar().elem())
                .collect();

            self.report.iterations += 1;
            self.report.final_loss = loss;
            let global = self.report.iterations;
            if global % log_every == 0 || global == 1 {
                let record = LossRecord {
                    iteration: global,
                    total: loss,
                    pde: pde_losses.iter().sum(),
                    bc: bc_losses.iter().sum(),
                };
                info!(
                    "[Iter {}] Total Loss: {:.6}, PDE Loss: {:.6}, Condition Loss: {:.6}",
                    global, record.total, record.pde, record.bc
                );
                debug!(?pde_losses, ?bc_losses, "損失項ごとの値");
                self.report.history.push(record);
            }

            let progress = TrainingProgress {
                stage: self.index,
                iteration,
                model: &model,
                loss,
                pde_losses: &pde_losses,
                bc_losses: &bc_losses,
            };
            if (self.callback)(&progress).is_break() {
                return Ok((model, StageEnd::Halted));
            }
            if (loss as f64) < self.options.abstol {
                return Ok((model, StageEnd::Converged));
            }

            let grads = total.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(self.stage.learning_rate, model, grads);
        }
        Ok((model, StageEnd::Completed))
    }
}

/// `train`サブコマンドを実行します。
///
/// モデルの学習、損失グラフの描画、学習済みモデルと設定のファイル保存を行います。
pub fn run(args: &TrainArgs) -> Result<()> {
    let device = Default::default();
    let problem = problems::lookup(&args.problem)?;
    let config = TrainConfig::resolve(
        &problem,
        args.config.as_deref(),
        args.strategy.map(|s| s.to_strategy()),
        args.output.clone(),
    )?;
    std::fs::create_dir_all(&config.output_dir)?;

    let pinn = discretize(&problem.system, config.discretization.clone())?;
    let model = SystemModel::<MyBackend>::new(&config.model, problem.system.output_count(), &device);

    info!(
        "学習を開始します ({}: {}) - 戦略: {}, 損失項: PDE {} / 条件 {}, バックエンド: NdArray (CPU)",
        problem.name(),
        problem.description,
        config.discretization.strategy.label(),
        pinn.pde_count(),
        pinn.bc_count()
    );
    let (model, report) = train(
        &pinn,
        model,
        &config.stages,
        &config.options(),
        &device,
        |_| ControlFlow::Continue(()),
    )?;
    info!("学習が完了しました。");
    info!("=> 学習時間: {:.2?}, 反復回数: {}, 最終損失: {:.6}", report.elapsed, report.iterations, report.final_loss);

    let loss_path = config.output_dir.join(format!("{}_loss.png", problem.name()));
    plot_loss_history(&loss_path, &report.history)?;
    info!("=> 損失グラフを '{}' に保存しました。", loss_path.display());

    info!("学習済みモデルを保存中...");
    let model_path = config.model_path(problem.name());
    model.save_file(
        model_path.clone(),
        &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
    )?;
    config.save(&config.config_path(problem.name()))?;
    info!("=> モデルを '{}' に保存しました。", model_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::Discretization;
    use crate::model::ModelConfig;
    use crate::strategy::TrainingStrategy;
    use crate::symbolic::{Differential, Variables};
    use crate::system::{Condition, Domain, PdeSystem};

    /// `u' = u`, `u(0) = 1` の小さな問題。
    fn growth() -> PinnProblem {
        let mut vars = Variables::new();
        let x = vars.parameter("x");
        let u = vars.variable("u");
        let system = PdeSystem::new(
            "growth",
            vec![Differential::new(&x).apply(&u).equals(u.expr())],
            vec![Condition::at(&[(&x, 0.0)], u.expr().equals(1.0))],
            vec![Domain::new(&x, 0.0, 1.0).unwrap()],
            &vars,
        )
        .unwrap();
        discretize(
            &system,
            Discretization::new(TrainingStrategy::Quadrature { nodes: 16 }),
        )
        .unwrap()
    }

    fn small_model(device: &<MyBackend as burn::prelude::Backend>::Device) -> SystemModel<MyBackend> {
        let config = ModelConfig {
            inputs: 1,
            hidden: 8,
            layers: 3,
            ..ModelConfig::default()
        };
        SystemModel::new(&config, 1, device)
    }

    #[test]
    fn staged_training_reduces_loss() {
        let device = Default::default();
        let problem = growth();
        let stages = [
            OptimizerStage {
                optimizer: OptimizerKind::Adam,
                learning_rate: 1e-2,
                max_iters: 150,
            },
            OptimizerStage {
                optimizer: OptimizerKind::RmsProp,
                learning_rate: 1e-3,
                max_iters: 50,
            },
        ];
        let options = TrainingOptions {
            abstol: 0.0,
            log_every: 10,
            seed: 1,
        };
        let mut first = None;
        let mut last = 0.0;
        let mut stages_seen = Vec::new();
        let (_, report) = train(
            &problem,
            small_model(&device),
            &stages,
            &options,
            &device,
            |p| {
                first.get_or_insert(p.loss);
                last = p.loss;
                if stages_seen.last() != Some(&p.stage) {
                    stages_seen.push(p.stage);
                }
                assert_eq!(p.pde_losses.len(), 1);
                assert_eq!(p.bc_losses.len(), 1);
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(report.iterations, 200);
        assert_eq!(stages_seen, vec![0, 1]);
        assert!(!report.halted && !report.converged);
        assert!(last < first.unwrap(), "{} -> {}", first.unwrap(), last);
        assert_eq!(report.history.first().map(|r| r.iteration), Some(1));
        assert_eq!(report.history.len(), 21);
    }

    #[test]
    fn callback_can_halt_training() {
        let device = Default::default();
        let problem = growth();
        let stages = [OptimizerStage {
            optimizer: OptimizerKind::Sgd,
            learning_rate: 1e-3,
            max_iters: 100,
        }];
        let (_, report) = train(
            &problem,
            small_model(&device),
            &stages,
            &TrainingOptions::default(),
            &device,
            |p| {
                if p.iteration == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .unwrap();
        assert!(report.halted);
        assert_eq!(report.iterations, 5);
    }

    #[test]
    fn callback_sees_the_current_parameters() {
        let device = Default::default();
        let problem = growth();
        let initial = small_model(&device);
        let xs =
            burn::tensor::Tensor::<MyBackend, 1>::from_floats([0.0, 0.5, 1.0], &device)
                .reshape([3, 1]);
        let outputs = |m: &SystemModel<MyBackend>| -> Vec<f32> {
            m.forward_all(xs.clone())
                .into_data()
                .to_vec()
                .unwrap()
        };
        let expected_first = outputs(&initial);
        let stages = [OptimizerStage {
            optimizer: OptimizerKind::Adam,
            learning_rate: 1e-2,
            max_iters: 20,
        }];
        let mut snapshots: Vec<SystemModel<MyBackend>> = Vec::new();
        let (trained, _) = train(
            &problem,
            initial,
            &stages,
            &TrainingOptions::default(),
            &device,
            |p| {
                assert_eq!(p.model.outputs(), 1);
                if p.iteration == 1 || p.iteration == 20 {
                    snapshots.push(p.model.clone());
                }
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(outputs(&snapshots[0]), expected_first);
        assert_ne!(outputs(&snapshots[1]), expected_first);
        // 最後のコールバックの後にもう1回更新が入る
        assert_ne!(outputs(&snapshots[1]), outputs(&trained));
    }

    #[test]
    fn abstol_stops_training_early() {
        let device = Default::default();
        let problem = growth();
        let stages = [OptimizerStage {
            optimizer: OptimizerKind::AdamW,
            learning_rate: 1e-3,
            max_iters: 100,
        }];
        let options = TrainingOptions {
            abstol: f64::MAX,
            ..TrainingOptions::default()
        };
        let (_, report) = train(
            &problem,
            small_model(&device),
            &stages,
            &options,
            &device,
            |_| ControlFlow::Continue(()),
        )
        .unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
    }
}
