//! HTTP client factory.

/// Build the `reqwest::Client` shared by the backend client, token providers
/// and warehouses.
///
/// No request timeout is set; calls wait for the transport default.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("cora/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }
}
