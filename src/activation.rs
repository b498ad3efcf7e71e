/// An activation function whose derivative can be recovered from its output.
///
/// Backpropagation only has the cached forward activation `a = φ(z)` at hand, not `z`, so the
/// derivative is expressed as a function of `a`.
pub trait ActivationFunction: Send + Sync + 'static {
    const NAME: &'static str;

    fn apply(x: f32) -> f32;

    /// `φ'(z)` where `a = φ(z)`.
    fn deriv_from_output(a: f32) -> f32;
}

pub mod activation_functions {
    use super::ActivationFunction;

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Identity;
    impl ActivationFunction for Identity {
        const NAME: &'static str = "identity";

        fn apply(x: f32) -> f32 {
            x
        }

        fn deriv_from_output(_: f32) -> f32 {
            1.0
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Sigmoid;
    impl ActivationFunction for Sigmoid {
        const NAME: &'static str = "sigmoid";

        fn apply(x: f32) -> f32 {
            1.0 / (1.0 + f32::exp(-x))
        }

        fn deriv_from_output(a: f32) -> f32 {
            a * (1.0 - a)
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Tanh;
    impl ActivationFunction for Tanh {
        const NAME: &'static str = "tanh";

        fn apply(x: f32) -> f32 {
            f32::tanh(x)
        }

        fn deriv_from_output(a: f32) -> f32 {
            1.0 - a * a
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Relu;
    impl ActivationFunction for Relu {
        const NAME: &'static str = "relu";

        fn apply(x: f32) -> f32 {
            x.max(0.0)
        }

        fn deriv_from_output(a: f32) -> f32 {
            if a > 0.0 { 1.0 } else { 0.0 }
        }
    }

    /// Softplus, `ln(1 + e^x)`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SoftRelu;
    impl ActivationFunction for SoftRelu {
        const NAME: &'static str = "softrelu";

        fn apply(x: f32) -> f32 {
            f32::ln_1p(f32::exp(x))
        }

        // d/dx ln(1 + e^x) = sigmoid(x) = 1 - e^(-a)
        fn deriv_from_output(a: f32) -> f32 {
            1.0 - f32::exp(-a)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{ActivationFunction, activation_functions::*};

    fn check_against_finite_difference<Phi: ActivationFunction>(xs: &[f32]) {
        let h = 1e-3f32;
        for &x in xs {
            let numeric = (Phi::apply(x + h) - Phi::apply(x - h)) / (2.0 * h);
            let analytic = Phi::deriv_from_output(Phi::apply(x));
            assert_abs_diff_eq!(numeric, analytic, epsilon = 1e-2);
        }
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let xs = [-2.0, -0.5, 0.3, 1.0, 2.5];
        check_against_finite_difference::<Identity>(&xs);
        check_against_finite_difference::<Sigmoid>(&xs);
        check_against_finite_difference::<Tanh>(&xs);
        check_against_finite_difference::<SoftRelu>(&xs);
        // Away from the kink.
        check_against_finite_difference::<Relu>(&[-2.0, -0.5, 0.3, 1.0]);
    }
}
