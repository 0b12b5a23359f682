pub mod caller;
pub mod request_id;
