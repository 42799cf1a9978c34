//! Compiler adapters.

pub mod solc;

pub use solc::SolcCompiler;
