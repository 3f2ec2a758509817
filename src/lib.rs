pub mod config;
pub mod credentials;
pub mod document;
pub mod engine;
pub mod error;
pub mod job;
pub mod model;
pub mod poller;
pub mod results;
pub mod service;
pub mod shutdown;
pub mod stream;
pub mod submit;
pub mod transport;
pub mod xmlrpc;
