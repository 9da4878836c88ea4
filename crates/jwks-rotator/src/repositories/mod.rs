pub mod jwks_secret;
