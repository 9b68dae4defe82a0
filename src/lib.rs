pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod isolates;
pub mod manifest;
pub mod output;
pub mod repository;
pub mod sync;
