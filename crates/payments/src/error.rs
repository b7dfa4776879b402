/// Errors from the payment gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Payment gateway error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The gateway answered with a payload we could not interpret.
    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),
}
