pub mod cloudflare;

mod types;
pub use types::Provider;
