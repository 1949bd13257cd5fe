//! Deterministic fixed point math shared by all pool types.

pub mod checked;
pub mod error;
pub mod fixed_point;
pub mod linear_math;
pub mod log_exp_math;
pub mod stable_math;
pub mod weighted_math;

pub use {
    error::{Error, ErrorKind},
    fixed_point::{Bfp, PowVersion},
};
