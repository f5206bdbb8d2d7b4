pub mod fling;
pub mod project;
pub mod server;
pub mod system;
