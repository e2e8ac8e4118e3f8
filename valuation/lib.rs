#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod assemble;
pub mod cache;
pub mod data;
pub mod defaults;
pub mod pipeline;
pub mod stats;
pub mod types;

#[path = "../shared/config.rs"]
pub mod config;

#[path = "../pages/mod.rs"]
pub mod pages;

#[path = "../render/mod.rs"]
pub mod render;
