mod securetoken;

pub use securetoken::SecureTokenCredentialManager;
