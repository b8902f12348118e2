//! HTTP handlers for the chat API surface.

mod block_status;
mod clear_history;
mod get_history;
mod message_count;
mod online_users;

pub use block_status::block_status;
pub use clear_history::clear_history;
pub use get_history::get_history;
pub use message_count::message_count;
pub use online_users::online_users;

use serde::Deserialize;

/// Query parameters shared by the pair-addressed endpoints.
#[derive(Debug, Deserialize)]
pub struct PairParams {
    pub user_id: i64,
    pub other_user: i64,
}
