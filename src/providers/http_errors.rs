use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::TimedOut
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("timed out")
        {
            return true;
        }

        current = source.source();
    }

    false
}

pub(crate) fn transport_error_message(
    err: &reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> String {
    if err.is_timeout() || error_chain_has_timeout(err) {
        return format!(
            "Model request timed out after {}s while calling '{}'. \
             Increase MODEL_TIMEOUT_SECS or retry later.",
            timeout_secs, api_url
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(err) {
            return format!(
                "Connection refused by model API at '{}'. Check MODEL_BASE_URL.",
                api_url
            );
        }

        return format!(
            "Failed to connect to model API at '{}'. \
             Check MODEL_BASE_URL and network connectivity.",
            api_url
        );
    }

    format!("Failed to call model API at '{}': {}", api_url, err)
}
