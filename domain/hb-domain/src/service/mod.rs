//! ドメインサービス（純粋関数）

pub mod client_trust;

pub use client_trust::{ClientRejection, evaluate_client};
