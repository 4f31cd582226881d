//! Architectural CPU state model primitives.

/// Register file, register handles and condition flags.
pub mod registers;

pub use registers::{
    Nzcv, RegisterFile, RegisterId, GENERAL_REGISTER_COUNT, REG_31, VECTOR_REGISTER_COUNT,
};
