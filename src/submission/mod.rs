pub mod parser;
pub mod pipeline;
