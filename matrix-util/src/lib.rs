pub mod ndarray_util;
pub mod traits;
