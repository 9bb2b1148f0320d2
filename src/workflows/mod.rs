pub mod notify;
pub mod poll;
pub mod transport;
pub mod vacancy;
