//! Client registrations and the registry lookup the engines depend on.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The single response type a client is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Implicit flow, access token in the redirect fragment
    Token,
    /// Authorization code flow, code in the redirect query
    Code,
}

impl ResponseType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "token" => Some(ResponseType::Token),
            "code" => Some(ResponseType::Code),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Token => "token",
            ResponseType::Code => "code",
        }
    }
}

impl Display for ResponseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered OAuth client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    /// Compared byte for byte, query component included
    pub redirect_uri: String,
    pub response_type: ResponseType,
    pub display_name: String,
    /// Present for confidential clients, absent for public ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl ClientRegistration {
    pub fn is_confidential(&self) -> bool {
        self.client_secret.is_some()
    }
}

/// Looks up a client registration by its identifier.
pub trait ClientRegistry: Send + Sync {
    fn lookup(&self, client_id: &str) -> Option<ClientRegistration>;
}

impl<F> ClientRegistry for F
where
    F: Fn(&str) -> Option<ClientRegistration> + Send + Sync,
{
    fn lookup(&self, client_id: &str) -> Option<ClientRegistration> {
        self(client_id)
    }
}

/// Registry backed by a fixed set of registrations, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticClientRegistry {
    clients: HashMap<String, ClientRegistration>,
}

impl StaticClientRegistry {
    pub fn new(clients: impl IntoIterator<Item = ClientRegistration>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl ClientRegistry for StaticClientRegistry {
    fn lookup(&self, client_id: &str) -> Option<ClientRegistration> {
        self.clients.get(client_id).cloned()
    }
}
