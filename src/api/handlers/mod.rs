mod download;
mod files;
mod health;

pub use download::download_file;
pub use files::{delete_file, upload_file};
pub use health::health;
