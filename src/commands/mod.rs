pub mod config;
mod library;
mod repos;
mod resolve;

pub use config::Options;
pub use library::{add as library_add, list as library_list, remove as library_remove, resolve as library_resolve};
pub use repos::{add as repo_add, repos, validate};
pub use resolve::{classpath, fetch, latest, versions};
