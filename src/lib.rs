// Block-quantized q4_0 x q8_0 dot product: kernels plus the glue that drives them
pub mod block;
pub mod config;
pub mod harness;
pub mod kernel;
pub mod synth;
pub mod verify;

pub use block::{BlockQ4_0, BlockQ8_0, QK4_0, QK8_0};
pub use kernel::{dot, Kernel};
