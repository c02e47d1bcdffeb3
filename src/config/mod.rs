pub mod settings;
pub mod upstream;

pub use settings::{RelayConfig, ServerConfig, Settings};
pub use upstream::UpstreamConfig;
