//! Rectifier (activation function) types.

use serde::{Deserialize, Serialize};

/// The scalar nonlinearity applied to a neuron's pre-activation sum.
///
/// Serialized by lowercase name, e.g. `"relu"` or `"tanh"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rectifier {
    /// Logistic function
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
    /// Passes the sum through unchanged
    Identity,
    /// Heaviside step function, with a derivative of `1` everywhere
    Step,
    /// Rectified Linear Unit
    ReLU,
}

impl Rectifier {
    /// Evaluates `f(x)` for the selected rectifier.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Rectifier::Sigmoid => sigmoid(x),
            Rectifier::TanH => x.tanh(),
            Rectifier::Identity => x,
            Rectifier::Step => if x > 0.0 { 1.0 } else { 0.0 },
            Rectifier::ReLU => if x > 0.0 { x } else { 0.0 },
        }
    }

    /// Evaluates the derivative `f'(x)` at the *pre-activation* sum `x`.
    pub fn fprime(&self, x: f64) -> f64 {
        match *self {
            Rectifier::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            Rectifier::TanH => 1.0 - x.tanh().powi(2),
            Rectifier::Identity => 1.0,
            Rectifier::Step => 1.0,
            Rectifier::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
        }
    }

    /// Evaluates either `f(x)` or, when `derive` is set, `f'(x)`.
    pub fn apply(&self, x: f64, derive: bool) -> f64 {
        if derive {
            self.fprime(x)
        } else {
            self.f(x)
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
