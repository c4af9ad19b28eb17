pub mod app_error;
pub mod relay_error;

pub use app_error::{AppError, AppResult};
pub use relay_error::{RelayError, RelayResult};
