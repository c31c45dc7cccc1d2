pub mod gateway;
pub mod kv;
pub mod schema;
pub mod structured;
