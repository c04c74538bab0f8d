mod securetoken;

pub use securetoken::{RefreshedTokens, TOKEN_URL, TokenRefreshError, extract_error, refresh_token};
