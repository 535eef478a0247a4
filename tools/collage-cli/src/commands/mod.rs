pub mod check;
pub mod init;
pub mod layout;
pub mod plan;
pub mod render;
pub mod validate;
