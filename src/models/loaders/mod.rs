pub mod toml_loader;

pub use toml_loader::{load_all_work_files, load_work_file, WorkFile};
