//! Domain types and models

pub mod account;
pub mod credential;
pub mod provider;

pub use account::LinkedAccount;
pub use credential::ThirdPartyCredential;
pub use provider::Provider;
