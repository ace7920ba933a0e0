//! Cache des tables de schéma
//!
//! Les tables `functions` et `types` d'un service sont stockées sous des clés
//! préfixées par l'identifiant du service (`service_<id>:functions`,
//! `service_<id>:types`), ce qui permet à plusieurs services de partager
//! le même [`CacheStore`].
//!
//! Le backend par défaut, [`MemoryCacheStore`], repose sur `moka` avec une
//! politique d'expiration par entrée : les entrées persistantes n'expirent
//! jamais, les autres suivent le TTL du service.

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// TTL par défaut des entrées non persistantes
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Nombre maximal d'entrées par défaut du cache mémoire
pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Clé de la table des opérations
pub const FUNCTIONS_KEY: &str = "functions";

/// Clé de la table des types
pub const TYPES_KEY: &str = "types";

/// Stockage clé/valeur avec TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Récupère une valeur, `None` si absente ou expirée
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stocke une valeur ; `ttl = None` signifie sans expiration
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Supprime une valeur
    async fn remove(&self, key: &str);
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    ttl: Option<Duration>,
}

/// Expiration propre à chaque entrée
struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Cache mémoire partagé entre services
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: MokaCache<String, StoredEntry>,
}

impl MemoryCacheStore {
    /// Crée un nouveau cache avec la capacité par défaut
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Crée un nouveau cache avec une capacité spécifique
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            entries: MokaCache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryExpiry)
                .build(),
        }
    }

    /// Nombre d'entrées vivantes
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), StoredEntry { value, ttl })
            .await;
    }

    async fn remove(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}

/// Vue d'un [`CacheStore`] restreinte à un service
#[derive(Clone)]
pub struct SchemaCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
    enabled: bool,
}

impl SchemaCache {
    /// Crée le cache d'un service
    ///
    /// # Arguments
    ///
    /// * `store` - Backend partagé
    /// * `service_id` - Identifiant du service (préfixe des clés)
    /// * `ttl` - Durée de vie des entrées non persistantes
    pub fn new(store: Arc<dyn CacheStore>, service_id: u32, ttl: Duration) -> Self {
        Self {
            store,
            namespace: format!("service_{}", service_id),
            ttl,
            enabled: true,
        }
    }

    /// Active ou désactive le cache ; désactivé, il ne renvoie jamais rien
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Clé complète (`service_<id>:<key>`)
    pub fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Lit et désérialise une valeur
    ///
    /// Une valeur illisible est considérée comme absente.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let full_key = self.key(key);
        let value = self.store.get(&full_key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => {
                debug!(key = %full_key, "Schema cache hit");
                Some(decoded)
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Ignoring undecodable schema cache entry");
                None
            }
        }
    }

    /// Sérialise et stocke une valeur
    ///
    /// # Arguments
    ///
    /// * `persist` - `true` pour une entrée sans expiration
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, persist: bool) {
        if !self.enabled {
            return;
        }

        let full_key = self.key(key);
        match serde_json::to_value(value) {
            Ok(json) => {
                let ttl = if persist { None } else { Some(self.ttl) };
                self.store.put(&full_key, json, ttl).await;
                debug!(key = %full_key, persist, "Schema cache updated");
            }
            Err(e) => warn!(key = %full_key, error = %e, "Failed to serialize schema cache entry"),
        }
    }

    /// Supprime une valeur
    pub async fn remove(&self, key: &str) {
        let full_key = self.key(key);
        self.store.remove(&full_key).await;
        debug!(key = %full_key, "Schema cache entry removed");
    }
}
