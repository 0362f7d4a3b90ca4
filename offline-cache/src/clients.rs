//! Controlled Clients
//!
//! Open pages of the site and which worker version, if any, controls them.

use std::sync::Arc;

use spin::RwLock;

/// Client registry shared between every worker version of one origin.
pub type SharedClients = Arc<RwLock<Clients>>;

/// Client info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client ID
    pub id: String,
    /// Page URL
    pub url: String,
    /// Version of the controlling worker
    pub controller: Option<String>,
    /// Whether focused
    pub focused: bool,
}

impl ClientInfo {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            controller: None,
            focused: false,
        }
    }
}

/// Clients API
#[derive(Debug, Default)]
pub struct Clients {
    clients: Vec<ClientInfo>,
    next_window: u64,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedClients {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Get a client by ID
    pub fn get(&self, id: &str) -> Option<&ClientInfo> {
        self.clients.iter().find(|c| c.id == id)
    }

    /// Add a client. A page opened while a worker is active is controlled
    /// by it from the start.
    pub fn add(&mut self, mut client: ClientInfo, active: Option<&str>) {
        if client.controller.is_none() {
            client.controller = active.map(str::to_string);
        }
        self.clients.retain(|c| c.id != client.id);
        self.clients.push(client);
    }

    /// Remove a client
    pub fn remove(&mut self, id: &str) -> bool {
        let len_before = self.clients.len();
        self.clients.retain(|c| c.id != id);
        self.clients.len() != len_before
    }

    /// Take control of every open page. Returns the number claimed.
    pub fn claim(&mut self, version: &str) -> usize {
        for client in &mut self.clients {
            client.controller = Some(version.to_string());
        }
        self.clients.len()
    }

    /// Pages controlled by `version`
    pub fn controlled_by(&self, version: &str) -> Vec<&ClientInfo> {
        self.clients
            .iter()
            .filter(|c| c.controller.as_deref() == Some(version))
            .collect()
    }

    /// Focus an existing page showing `url`, or open a new one.
    pub fn open_window(&mut self, url: &str, controller: Option<&str>) -> ClientInfo {
        for client in &mut self.clients {
            client.focused = client.url == url;
        }
        if let Some(existing) = self.clients.iter().find(|c| c.url == url) {
            return existing.clone();
        }

        self.next_window += 1;
        let mut client = ClientInfo::new(format!("window-{}", self.next_window), url);
        client.controller = controller.map(str::to_string);
        client.focused = true;
        self.clients.push(client.clone());
        client
    }

    pub fn all(&self) -> &[ClientInfo] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_marks_every_client() {
        let mut clients = Clients::new();
        clients.add(ClientInfo::new("a", "https://site/"), None);
        clients.add(ClientInfo::new("b", "https://site/products"), Some("v1"));
        assert_eq!(clients.controlled_by("v1").len(), 1);
        assert_eq!(clients.claim("v2"), 2);
        assert_eq!(clients.controlled_by("v2").len(), 2);
        assert!(clients.controlled_by("v1").is_empty());
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut clients = Clients::new();
        clients.add(ClientInfo::new("a", "https://site/"), None);
        clients.add(ClientInfo::new("a", "https://site/about"), None);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients.get("a").unwrap().url, "https://site/about");
    }

    #[test]
    fn test_remove() {
        let mut clients = Clients::new();
        clients.add(ClientInfo::new("a", "https://site/"), None);
        assert!(clients.remove("a"));
        assert!(!clients.remove("a"));
        assert!(clients.is_empty());
    }

    #[test]
    fn test_open_window_focuses_existing() {
        let mut clients = Clients::new();
        clients.add(ClientInfo::new("a", "https://site/"), Some("v1"));
        let opened = clients.open_window("https://site/", Some("v1"));
        assert_eq!(opened.id, "a");
        assert!(clients.get("a").unwrap().focused);
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_open_window_creates_new() {
        let mut clients = Clients::new();
        let opened = clients.open_window("https://site/", Some("v1"));
        assert_eq!(opened.controller.as_deref(), Some("v1"));
        assert!(opened.focused);
        assert_eq!(clients.len(), 1);
    }
}
