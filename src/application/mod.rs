//! Application services: dispatch, assembly and the batch workflow around them.

pub mod assemble;
pub mod backend;
pub mod batch;
pub mod dispatch;
pub mod error;
