use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use pinn_systems::discretization::{Discretization, discretize, symbolic_discretize};
use pinn_systems::inference::{EvaluationGrid, compare};
use pinn_systems::model::{Activation, ModelConfig, SystemModel};
use pinn_systems::problems::{self, Problem};
use pinn_systems::strategy::TrainingStrategy;
use pinn_systems::symbolic::{Differential, Variables};
use pinn_systems::system::{Condition, Domain, PdeSystem};
use pinn_systems::training::{OptimizerKind, OptimizerStage, TrainingOptions, train};
use std::ops::ControlFlow;

type MyBackend = Autodiff<NdArray<f32>>;

/// 調和振動子 `u' = v`, `v' = -u`, `u(0) = 0`, `v(0) = 1` を連立系として宣言します。
fn oscillator() -> Problem {
    let mut vars = Variables::new();
    let x = vars.parameter("x");
    let u = vars.variable("u");
    let v = vars.variable("v");
    let dx = Differential::new(&x);
    let system = PdeSystem::new(
        "oscillator",
        vec![
            dx.apply(&u).equals(v.expr()),
            dx.apply(&v).equals(-u.expr()),
        ],
        vec![
            Condition::at(&[(&x, 0.0)], u.expr().equals(0.0)),
            Condition::at(&[(&x, 0.0)], v.expr().equals(1.0)),
        ],
        vec![Domain::new(&x, 0.0, 1.0).unwrap()],
        &vars,
    )
    .unwrap();
    Problem {
        system,
        description: "harmonic oscillator",
        analytic: |p| vec![p[0].sin(), p[0].cos()],
        model: ModelConfig {
            inputs: 1,
            hidden: 10,
            layers: 3,
            activation: Activation::Tanh,
        },
        strategy: TrainingStrategy::Quadrature { nodes: 20 },
        stages: vec![],
    }
}

#[test]
fn staged_training_approaches_the_analytic_solution() {
    let device = Default::default();
    let problem = oscillator();
    let pinn = discretize(&problem.system, Discretization::new(problem.strategy.clone())).unwrap();
    let model = SystemModel::<MyBackend>::new(&problem.model, 2, &device);

    let before = compare(
        &model.valid(),
        &problem,
        EvaluationGrid::new(&problem.system.domains, 21),
        &device,
    )
    .unwrap();

    let stages = [
        OptimizerStage {
            optimizer: OptimizerKind::Adam,
            learning_rate: 1e-2,
            max_iters: 400,
        },
        OptimizerStage {
            optimizer: OptimizerKind::Adam,
            learning_rate: 1e-3,
            max_iters: 200,
        },
    ];
    let mut losses = Vec::new();
    let (model, report) = train(
        &pinn,
        model,
        &stages,
        &TrainingOptions {
            abstol: 1e-6,
            log_every: 50,
            seed: 3,
        },
        &device,
        |p| {
            losses.push(p.loss);
            ControlFlow::Continue(())
        },
    )
    .unwrap();

    assert!(report.iterations > 0);
    assert!(losses.last().unwrap() < losses.first().unwrap());

    let after = compare(
        &model.valid(),
        &problem,
        EvaluationGrid::new(&problem.system.domains, 21),
        &device,
    )
    .unwrap();
    for (b, a) in before.vars.iter().zip(&after.vars) {
        assert!(
            a.mean_error < b.mean_error,
            "{}: {} -> {}",
            a.name,
            b.mean_error,
            a.mean_error
        );
    }
}

#[test]
fn resampling_strategies_train_without_errors() {
    let device = Default::default();
    let problem = problems::lookup("parabolic").unwrap();
    for strategy in [
        TrainingStrategy::Stochastic {
            points: 64,
            bc_points: 16,
        },
        TrainingStrategy::QuasiRandom {
            points: 64,
            bc_points: 16,
        },
    ] {
        let pinn = discretize(&problem.system, Discretization::new(strategy)).unwrap();
        let model = SystemModel::<MyBackend>::new(&problem.model, 2, &device);
        let stages = [OptimizerStage {
            optimizer: OptimizerKind::Adam,
            learning_rate: 1e-2,
            max_iters: 5,
        }];
        let (_, report) = train(
            &pinn,
            model,
            &stages,
            &TrainingOptions::default(),
            &device,
            |p| {
                assert_eq!(p.pde_losses.len(), 2);
                assert_eq!(p.bc_losses.len(), 6);
                assert!(p.loss.is_finite());
                ControlFlow::Continue(())
            },
        )
        .unwrap();
        assert_eq!(report.iterations, 5);
    }
}

#[test]
fn symbolic_form_lists_every_loss_term() {
    let problem = problems::lookup("linear").unwrap();
    let sym = symbolic_discretize(
        &problem.system,
        Discretization::new(TrainingStrategy::Quadrature { nodes: 4 }),
    )
    .unwrap();
    assert_eq!(sym.pde_losses.len(), 3);
    assert_eq!(sym.bc_losses.len(), 8);
    assert!(sym.pde_losses.iter().all(|d| d.samples == 16));
    assert!(sym.bc_losses.iter().all(|d| d.samples == 4));
    assert!(sym.bc_losses[2].equation.starts_with("Dt(u1) ~ "));
}
