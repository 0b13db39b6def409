pub mod config;
pub mod exception;
pub mod listing;
pub mod menu;
pub mod param;
pub mod request;
pub mod response;
pub mod server;
pub mod transpile;
pub mod util;

pub use config::{Config, ServerContext};
pub use exception::Exception;
pub use menu::MenuLine;
pub use param::{FileKind, ItemType};
pub use request::Request;
pub use response::Responder;
