//! 駆動側ポート（入力インターフェース）。
//!
//! フロントエンドが呼び出すユースケース。

mod command_channel;
mod helper_lifecycle;

pub use command_channel::*;
pub use helper_lifecycle::*;
