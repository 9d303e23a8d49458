mod restful_cli;
mod serializer;

pub use restful_cli::CfClient;
pub use restful_cli::CLOUDFLARE_API_BASE;
