mod http_errors;
pub mod mistral;
