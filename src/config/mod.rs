mod server;

pub use server::{CONFIG_FILE_NAME, MIN_SECRET_LEN, ServerConfig};
