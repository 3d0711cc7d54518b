pub mod auth;
pub mod formatter;
pub mod invoker;
pub mod overrides;
pub mod request;
