pub mod mixed;
pub mod ndarray_bernoulli_gaussian;
pub mod ndarray_beta;
pub mod ndarray_constant;
pub mod ndarray_gamma;
pub mod ndarray_gaussian;
pub mod stat;
pub mod traits;

pub use mixed::Mixed;
pub use ndarray_bernoulli_gaussian::{
    BernoulliGaussianDist, BernoulliGaussianExpectations, BernoulliGaussianParams,
};
pub use ndarray_beta::{BetaDist, BetaExpectations, BetaParams};
pub use ndarray_constant::{ConstantDist, ConstantExpectations};
pub use ndarray_gamma::{GammaDist, GammaExpectations, GammaParams};
pub use ndarray_gaussian::{GaussianDist, GaussianExpectations, GaussianParams};
pub use traits::{Dim, ExpFamily};
