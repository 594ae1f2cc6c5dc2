pub mod db;
pub mod mail;
pub mod storage;

pub use db::DbAdapter;
pub use mail::{LogNotifier, SmtpNotifier};
pub use storage::LocalFileStorage;
