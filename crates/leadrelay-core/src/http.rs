//! Outbound HTTP client shared by every tier.

use std::time::Duration;

use reqwest::Client;

/// Client with the configured request timeout. `None` leaves requests unbounded.
pub fn client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
