mod check;
mod generate;
mod shared;

pub use check::{CheckArgs, CheckTarget};
pub use generate::{GenerateArgs, GenerateTarget};
pub use shared::{NessieArgs, S3Args};
