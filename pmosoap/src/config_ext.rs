//! Extension pour intégrer la configuration SOAP dans pmoconfig
//!
//! Ce module fournit le trait `SoapConfigExt` qui ajoute à
//! `pmoconfig::Config` l'accès aux services SOAP déclarés sous
//! `soap.services` et aux réglages du cache de schéma (`soap.cache`).

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::config::ServiceConfig;
use anyhow::{anyhow, Result};
use pmoconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

/// Trait d'extension pour gérer la configuration SOAP dans pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmosoap::SoapConfigExt;
///
/// let config = get_config();
/// for service in config.get_soap_services()? {
///     println!("SOAP service: {}", service.name);
/// }
/// ```
pub trait SoapConfigExt {
    /// Récupère tous les services déclarés
    ///
    /// # Errors
    ///
    /// Retourne une erreur si une déclaration de service est invalide
    fn get_soap_services(&self) -> Result<Vec<ServiceConfig>>;

    /// Récupère un service par son nom (insensible à la casse)
    fn get_soap_service(&self, name: &str) -> Result<ServiceConfig>;

    /// Ajoute ou remplace (même nom) un service
    fn set_soap_service(&self, service: &ServiceConfig) -> Result<()>;

    /// TTL par défaut des entrées du cache de schéma
    fn get_soap_cache_ttl(&self) -> Duration;

    fn set_soap_cache_ttl(&self, ttl: Duration) -> Result<()>;

    /// Capacité du cache mémoire partagé
    fn get_soap_cache_capacity(&self) -> u64;

    fn set_soap_cache_capacity(&self, capacity: u64) -> Result<()>;
}

impl SoapConfigExt for Config {
    fn get_soap_services(&self) -> Result<Vec<ServiceConfig>> {
        match self.get_value(&["soap", "services"]) {
            Ok(Value::Sequence(entries)) => entries
                .into_iter()
                .map(|entry| {
                    serde_yaml::from_value(entry)
                        .map_err(|e| anyhow!("Invalid SOAP service declaration: {}", e))
                })
                .collect(),
            Ok(Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(_) => Err(anyhow!("soap.services must be a list")),
        }
    }

    fn get_soap_service(&self, name: &str) -> Result<ServiceConfig> {
        self.get_soap_services()?
            .into_iter()
            .find(|service| service.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("SOAP service '{}' not configured", name))
    }

    fn set_soap_service(&self, service: &ServiceConfig) -> Result<()> {
        let mut services = self.get_soap_services()?;
        match services
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&service.name))
        {
            Some(existing) => *existing = service.clone(),
            None => services.push(service.clone()),
        }

        self.set_value(&["soap", "services"], serde_yaml::to_value(&services)?)
    }

    fn get_soap_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.get_u64(&["soap", "cache", "ttl"], DEFAULT_CACHE_TTL.as_secs()),
        )
    }

    fn set_soap_cache_ttl(&self, ttl: Duration) -> Result<()> {
        self.set_value(
            &["soap", "cache", "ttl"],
            Value::Number(serde_yaml::Number::from(ttl.as_secs())),
        )
    }

    fn get_soap_cache_capacity(&self) -> u64 {
        self.get_u64(&["soap", "cache", "capacity"], DEFAULT_CACHE_CAPACITY)
    }

    fn set_soap_cache_capacity(&self, capacity: u64) -> Result<()> {
        self.set_value(
            &["soap", "cache", "capacity"],
            Value::Number(serde_yaml::Number::from(capacity)),
        )
    }
}
