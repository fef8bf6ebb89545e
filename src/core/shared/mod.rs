pub mod enums;
pub mod error;
pub mod pagination;
pub mod schema;
pub mod state;
pub mod test_utils;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use utils::DbPool;
