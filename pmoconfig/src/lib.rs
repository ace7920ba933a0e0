//! # Configuration pmosoap
//!
//! Gestion de la configuration YAML des services SOAP :
//! - configuration par défaut intégrée au binaire
//! - fusion avec le fichier `config.yaml` du répertoire de configuration
//! - surcharges par variables d'environnement (`PMOSOAP_CONFIG__SOAP__CACHE__TTL=60`)
//! - accès par chemin (`&["soap", "cache", "ttl"]`) et instance globale partagée
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let ttl = config.get_u64(&["soap", "cache", "ttl"], 300);
//! config.set_value(&["soap", "cache", "ttl"], serde_yaml::Value::Number(600.into()))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Value};
use std::{env, fs, path::Path, sync::Arc};
use tracing::{debug, info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmosoap.yaml");

const ENV_CONFIG_DIR: &str = "PMOSOAP_CONFIG";
const ENV_PREFIX: &str = "PMOSOAP_CONFIG__";
const DEFAULT_DIR_NAME: &str = ".pmosoap";
const CONFIG_FILE_NAME: &str = "config.yaml";

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load pmosoap configuration"));
}

/// Configuration chargée depuis un répertoire
///
/// Les clés sont normalisées en minuscules au chargement ; les chemins
/// passés à [`Config::get_value`] et [`Config::set_value`] le sont aussi.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data.lock().clone()),
        }
    }
}

impl Config {
    /// Choisit le répertoire de configuration
    ///
    /// Ordre : argument, variable `PMOSOAP_CONFIG`, `.pmosoap` du répertoire
    /// courant, `.pmosoap` du répertoire personnel.
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Using config directory from environment");
            return env_path;
        }

        if Path::new(DEFAULT_DIR_NAME).exists() {
            return DEFAULT_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let candidate = home.join(DEFAULT_DIR_NAME);
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }

        DEFAULT_DIR_NAME.to_string()
    }

    /// Crée le répertoire si besoin et vérifie qu'il est lisible et inscriptible
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let probe = path.join(".write_test");
        fs::write(&probe, b"probe")?;
        fs::remove_file(&probe)?;
        fs::read_dir(path)?;

        Ok(())
    }

    /// Détermine et valide le répertoire de configuration
    pub fn resolve_config_dir(directory: &str) -> Result<String> {
        let dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir))
            .map_err(|e| anyhow!("Invalid config directory {}: {}", dir, e))?;
        Ok(dir)
    }

    /// Charge la configuration
    ///
    /// La configuration intégrée est fusionnée avec `config.yaml` (s'il
    /// existe), puis les variables d'environnement sont appliquées. Le
    /// résultat est réécrit dans `config.yaml`.
    ///
    /// # Arguments
    ///
    /// * `directory` - Répertoire de configuration, ou chaîne vide pour la recherche par défaut
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::resolve_config_dir(directory)?;
        let path = Path::new(&config_dir)
            .join(CONFIG_FILE_NAME)
            .to_string_lossy()
            .to_string();
        info!(config_file = %path, "Loading pmosoap configuration");

        // Les clés sont normalisées avant la fusion pour que `SOAP:` et
        // `soap:` désignent le même sous-arbre
        let mut data = lower_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read(&path) {
            Ok(raw) => {
                let external = lower_keys(serde_yaml::from_slice(&raw)?);
                merge_yaml(&mut data, &external);
            }
            Err(_) => debug!(config_file = %path, "No config file, using embedded defaults"),
        }

        apply_env_overrides(&mut data);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Répertoire de configuration
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Chemin du fichier `config.yaml`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Écrit la configuration courante dans `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Définit une valeur et sauvegarde la configuration
    ///
    /// Les nœuds intermédiaires manquants sont créés.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock();
            set_in(&mut data, path, value)?;
        }
        self.save()
    }

    /// Récupère la valeur située à `path`
    ///
    /// # Errors
    ///
    /// Si le chemin n'existe pas ou traverse une valeur qui n'est pas un mapping
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock();
        let mut current = &*data;

        for (i, key) in path.iter().enumerate() {
            let Value::Mapping(map) = current else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            };
            current = map
                .get(&Value::String(key.to_lowercase()))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
        }

        Ok(current.clone())
    }

    /// Entier non signé à `path`, ou `default` s'il est absent ou invalide
    pub fn get_u64(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
                warn!(path = %path.join("."), "Expected an unsigned integer, using default {}", default);
                default
            }),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                warn!(path = %path.join("."), value = %s, "Invalid integer, using default {}", default);
                default
            }),
            _ => default,
        }
    }

    /// Booléen à `path`, ou `default` s'il est absent ou invalide
    pub fn get_bool(&self, path: &[&str], default: bool) -> bool {
        match self.get_value(path) {
            Ok(Value::Bool(b)) => b,
            _ => default,
        }
    }
}

/// Instance globale, chargée au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn set_in(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    let Value::Mapping(map) = data else {
        return Err(anyhow!("Cannot set {}: parent is not a mapping", first));
    };

    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let child = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_in(child, rest, value)
    }
}

/// Applique les variables `PMOSOAP_CONFIG__A__B=valeur` sur le chemin `a.b`
fn apply_env_overrides(data: &mut Value) {
    for (name, raw) in env::vars() {
        let Some(suffix) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = suffix.split("__").collect();
        let value = serde_yaml::from_str::<Value>(&raw).unwrap_or(Value::String(raw.clone()));

        if let Err(e) = set_in(data, &path, value) {
            warn!(variable = %name, error = %e, "Ignoring configuration override");
        }
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Fusionne `external` dans `default` : les mappings sont fusionnés
/// récursivement, les scalaires et séquences sont remplacés
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
