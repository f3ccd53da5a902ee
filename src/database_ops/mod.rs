pub mod db;
pub mod records;
pub mod store;

pub use db::Db;
pub use store::{Column, PositionGroup, Record, SqlValue, Store, Table, TeamRef};
