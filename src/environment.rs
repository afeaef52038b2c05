//! Deployment environments for the Constata API.
//!
//! Each environment fixes the GraphQL endpoint, the network used to parse
//! and encode the client's signing key, and the server identity callbacks
//! are verified against. The table is read-only; selecting an environment
//! is the only runtime choice.

use std::str::FromStr;

use bitcoin::Network;

use crate::types::ConstataError;

/// A Constata deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Local development server (regtest keys).
    Development,
    /// Staging deployment.
    Staging,
    /// Production deployment.
    #[default]
    Production,
}

impl Environment {
    /// GraphQL endpoint for this environment.
    pub fn api_url(&self) -> &'static str {
        match self {
            Environment::Development => "http://127.0.0.1:8000/graphql",
            Environment::Staging => "https://api-staging.constata.eu/graphql",
            Environment::Production => "https://api.constata.eu/graphql",
        }
    }

    /// Network the client's signing key is parsed and addressed under.
    pub fn signing_network(&self) -> Network {
        match self {
            Environment::Development => Network::Regtest,
            Environment::Staging => Network::Bitcoin,
            Environment::Production => Network::Bitcoin,
        }
    }

    /// Network the server's callback-signing address is encoded under.
    ///
    /// Staging signs requests with mainnet-encoded keys but issues callbacks
    /// from a testnet address, so this is a separate column from
    /// [`signing_network`](Self::signing_network).
    pub fn callback_network(&self) -> Network {
        match self {
            Environment::Development => Network::Regtest,
            Environment::Staging => Network::Testnet,
            Environment::Production => Network::Bitcoin,
        }
    }

    /// Segwit address the server signs web callbacks with.
    pub fn trusted_address(&self) -> &'static str {
        match self {
            Environment::Development => "bcrt1qsj2h8ernt4amc674l60vu925flvn57ff9lyry2",
            Environment::Staging => "tb1qurghvhp8g6he5hsv0en6n59rextfw8kw0wxyun",
            Environment::Production => "bc1qw3ca5pgepg6hqqle2eq8qakejl5wdafs7up0jd",
        }
    }
}

impl FromStr for Environment {
    type Err = ConstataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(ConstataError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}
