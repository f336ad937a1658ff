use burn::module::{Ignored, Module};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::sigmoid;
use serde::{Deserialize, Serialize};

/// 隠れ層の活性化関数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply<B: Backend>(self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

/// ネットワークの形状。`layers` は全結合層の総数（入力層・出力層を含む）です。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub inputs: usize,
    pub hidden: usize,
    pub layers: usize,
    pub activation: Activation,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            inputs: 2,
            hidden: 20,
            layers: 4,
            activation: Activation::Tanh,
        }
    }
}

/// 1つの従属変数を近似する多層パーセプトロン（MLP）。
///
/// 座標 `(t, x, ...)` を入力とし、その点における値を1つ出力します。
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    linears: Vec<Linear<B>>,
    activation: Ignored<Activation>,
}

impl<B: Backend> Model<B> {
    /// 新しいモデルを初期化します。
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let n_layers = config.layers.max(2);
        let mut linears = Vec::with_capacity(n_layers);
        linears.push(LinearConfig::new(config.inputs, config.hidden).init(device));
        for _ in 1..(n_layers - 1) {
            linears.push(LinearConfig::new(config.hidden, config.hidden).init(device));
        }
        linears.push(LinearConfig::new(config.hidden, 1).init(device));
        Self {
            linears,
            activation: Ignored(config.activation),
        }
    }

    /// モデルの順伝播を実行します。入力 `[n, inputs]`、出力 `[n, 1]`。
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let Some((output, hidden)) = self.linears.split_last() else {
            return input;
        };
        let mut x = input;
        for linear in hidden {
            x = linear.forward(x);
            x = self.activation.0.apply(x);
        }
        output.forward(x)
    }
}

/// 従属変数ごとに1つずつネットワークを持つ近似器の組。
#[derive(Module, Debug)]
pub struct SystemModel<B: Backend> {
    nets: Vec<Model<B>>,
}

impl<B: Backend> SystemModel<B> {
    pub fn new(config: &ModelConfig, outputs: usize, device: &B::Device) -> Self {
        Self {
            nets: (0..outputs).map(|_| Model::new(config, device)).collect(),
        }
    }

    pub fn outputs(&self) -> usize {
        self.nets.len()
    }

    /// `k` 番目の従属変数の予測値 `[n, 1]`。
    pub fn forward_var(&self, k: usize, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.nets[k].forward(input)
    }

    /// 全従属変数の予測値を列方向に並べた `[n, outputs]`。
    pub fn forward_all(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let columns = self
            .nets
            .iter()
            .map(|net| net.forward(input.clone()))
            .collect();
        Tensor::cat(columns, 1)
    }
}
