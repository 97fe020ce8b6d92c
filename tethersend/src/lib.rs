pub mod archive;
pub mod context;
pub mod error;
pub mod logging;
pub mod retry;
pub mod run;
pub mod upload;
pub mod util;
pub mod watcher;

#[cfg(test)]
mod tests;
