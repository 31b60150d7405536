pub mod codegen;
pub mod file_ops;
pub mod shell;
