pub mod sqlx;

pub use self::sqlx::{db_connection, load_registry};
