use pinn_systems::cli::{InferArgs, TrainArgs};
use pinn_systems::config::TrainConfig;
use pinn_systems::{inference, training};

/// 数反復だけ学習する設定ファイルを書き出します。
fn write_quick_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("quick.json");
    std::fs::write(
        &path,
        r#"{
            "stages": [{ "optimizer": "adam", "learning_rate": 0.01, "max_iters": 3 }],
            "log_every": 1,
            "resolution": 6
        }"#,
    )
    .unwrap();
    path
}

#[test]
fn train_then_infer_writes_model_config_and_plots() {
    for (problem, vars) in [
        ("matrix", vec!["u11", "u21", "u12", "u22"]),
        ("elliptic", vec!["u", "w"]),
    ] {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = write_quick_config(dir.path());

        training::run(&TrainArgs {
            problem: problem.into(),
            config: Some(config),
            strategy: None,
            output: Some(out.clone()),
        })
        .unwrap();

        let model = out.join(format!("{}_model.mpk", problem));
        let saved = out.join(format!("{}_config.json", problem));
        assert!(model.exists(), "{}", model.display());
        assert!(saved.exists(), "{}", saved.display());
        assert!(out.join(format!("{}_loss.png", problem)).exists());

        let reloaded = TrainConfig::load(&saved).unwrap();
        assert_eq!(reloaded.stages.len(), 1);
        assert_eq!(reloaded.stages[0].max_iters, 3);
        assert_eq!(reloaded.resolution, 6);

        inference::run(&InferArgs {
            problem: problem.into(),
            output: Some(out.clone()),
            resolution: None,
        })
        .unwrap();
        for var in vars {
            let plot = out.join(format!("{}_sol_{}.png", problem, var));
            assert!(plot.exists(), "{}", plot.display());
        }
    }
}
