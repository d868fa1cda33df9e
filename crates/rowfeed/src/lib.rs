#![doc = include_str!("../README.md")]

mod controller;
mod debounce;
mod error;
mod generator;
mod rand;
mod record;
mod settings;
mod synth;
mod window;

pub use crate::controller::*;
pub use crate::debounce::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::rand::*;
pub use crate::record::*;
pub use crate::settings::*;
pub use crate::synth::*;
pub use crate::window::*;
