use thiserror::Error;

/// クレート全体で使用するエラー型。
#[derive(Debug, Error)]
pub enum PinnError {
    #[error("不正な区間です: [{lo}, {hi}]")]
    InvalidInterval { lo: f64, hi: f64 },

    #[error("未定義の変数が参照されています: {0}")]
    UnknownVariable(String),

    #[error("PDEシステムが不正です: {0}")]
    InvalidSystem(String),

    #[error("学習戦略の設定が不正です: {0}")]
    InvalidStrategy(String),

    #[error("設定が不正です: {0}")]
    InvalidConfig(String),

    #[error("未知の問題名です: '{0}' (list コマンドで一覧を確認してください)")]
    UnknownProblem(String),

    #[error(
        "モデルファイル '{0}' が見つかりません。最初に 'train' コマンドでモデルを学習・保存してください。"
    )]
    ModelNotFound(String),

    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("モデルの保存・読み込みに失敗しました: {0}")]
    Recorder(#[from] burn::record::RecorderError),

    #[error("テンソルの変換に失敗しました: {0}")]
    Tensor(String),

    #[error("グラフの描画に失敗しました: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, PinnError>;
