pub type Mat = ndarray::Array2<f64>;
pub type Mask = ndarray::Array2<bool>;

pub use matrix_param::stat::{nan_to_zero, sigmoid};
pub use matrix_param::{Dim, ExpFamily, Mixed};
pub use matrix_util::traits::{AxisOps, BroadcastOps, MaskOps, SampleOps};
pub use ndarray::prelude::*;
pub use ndarray::Zip;

pub use log::{debug, info, warn};
