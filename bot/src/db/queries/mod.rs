pub mod avatar_records;
pub mod server_assignments;
