pub mod fetch;
pub mod list;
pub mod pipe;
pub mod render;
pub mod update;
pub mod variables;
