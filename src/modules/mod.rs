pub mod assign;
pub mod dispatch;
pub mod error;
pub mod idle;
pub mod layout;
pub mod manifest;
pub mod request;
pub mod resource;
pub mod scenario;
pub mod state;
pub mod stats;
pub mod structure;
pub mod vm;
pub mod world;
pub mod zone;
