#[allow(non_snake_case)]
pub mod Chemistry;
#[allow(non_snake_case)]
pub mod Convection;
#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Integrators;
#[allow(non_snake_case)]
pub mod SourceTerms;
#[allow(non_snake_case)]
pub mod Utils;
pub mod errors;
pub mod grid;
pub mod settings;
pub mod strain_function;
