mod analysis;
mod config;
mod convert;
mod entry;
mod handlers;
mod state;
mod text;

#[cfg(test)]
mod text_test;

pub use entry::run;
