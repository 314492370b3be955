pub mod base;
pub mod configs;
pub mod extract;
pub mod factory;
pub mod openai;
pub mod request;
pub mod retry;
pub mod streaming;
pub mod transport;
pub mod you;
