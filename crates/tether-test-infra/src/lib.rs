//! Disposable backing services for integration tests.

pub mod error;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};

/// Docker may report `localhost`, which some clients resolve to `::1`
/// while published ports only listen on IPv4.
pub(crate) fn ipv4_host(host: impl ToString) -> String {
    let host = host.to_string();
    if host == "localhost" {
        String::from("127.0.0.1")
    } else {
        host
    }
}
