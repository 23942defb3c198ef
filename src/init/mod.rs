mod db;
pub use db::*;

mod session;
pub use session::*;
