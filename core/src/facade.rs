//! Shared client instances.
//!
//! # Design
//! A `Facade` is a client profile: a type whose hooks choose the base URI
//! and adjust the configuration and the finished client. `Registry` caches
//! one `Arc<Client>` per profile type, keyed by `TypeId`, together with the
//! default configuration and logger applied to every client it makes.
//!
//! Get-or-create holds the instances lock for the whole sequence, so
//! concurrent first calls construct exactly one client. Profile hooks run
//! under that lock and must not ask the same registry for an instance.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::client::{Call, Client};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::logging::{LogCrateLogger, RequestLogger};
use crate::request::{Body, Part};
use crate::response::Response;
use crate::transport::Transport;

pub struct Registry {
    instances: Mutex<HashMap<TypeId, Arc<Client>>>,
    default_config: RwLock<Config>,
    default_logger: RwLock<Option<Arc<dyn RequestLogger>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            default_config: RwLock::new(Config::default()),
            default_logger: RwLock::new(Some(default_logger())),
        }
    }

    /// The process-wide registry used by `Facade::instance` and `make`.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    pub fn default_config(&self) -> Config {
        self.default_config.read().clone()
    }

    /// Configuration every new client is layered over.
    pub fn set_default_config(&self, config: Config) {
        *self.default_config.write() = config;
    }

    pub fn default_logger(&self) -> Option<Arc<dyn RequestLogger>> {
        self.default_logger.read().clone()
    }

    /// Logger for clients made without one. `None` turns logging off.
    pub fn set_default_logger(&self, logger: Option<Arc<dyn RequestLogger>>) {
        *self.default_logger.write() = logger;
    }

    /// Drop every cached client. Holders of an `Arc` keep theirs.
    pub fn clear_instances(&self) {
        self.instances.lock().clear();
    }

    /// Drop cached clients and restore the default config and logger.
    pub fn reset(&self) {
        self.clear_instances();
        self.set_default_config(Config::default());
        self.set_default_logger(Some(default_logger()));
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_try_insert(&self, key: TypeId, make: impl FnOnce() -> Result<Client>) -> Result<Arc<Client>> {
        let mut instances = self.instances.lock();
        if let Some(client) = instances.get(&key) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(make()?);
        instances.insert(key, Arc::clone(&client));
        Ok(client)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("instances", &self.len())
            .field("default_config", &*self.default_config.read())
            .field("default_logger", &self.default_logger.read().is_some())
            .finish()
    }
}

fn default_logger() -> Arc<dyn RequestLogger> {
    Arc::new(LogCrateLogger::default())
}

/// A client profile with a shared instance.
///
/// Override the hooks to bake in a base URI, default headers or any other
/// adjustment; the provided functions take care of construction and
/// caching.
///
/// ```no_run
/// use hyperhttp::{Config, Facade};
///
/// struct Library;
///
/// impl Facade for Library {
///     fn base_uri() -> Option<String> {
///         Some("https://library.example.com/api".to_string())
///     }
///
///     fn make_config(config: Config) -> Config {
///         config.with_header("Accept", "application/json")
///     }
/// }
///
/// let book = Library::get("/books/1")?;
/// println!("{}", book.to_json());
/// # Ok::<(), hyperhttp::Error>(())
/// ```
pub trait Facade: 'static {
    /// Base URI for every client of this profile; wins over `base_uri` in
    /// the configuration.
    fn base_uri() -> Option<String> {
        None
    }

    /// Adjust the merged configuration before the client is built.
    fn make_config(config: Config) -> Config {
        config
    }

    /// Adjust the finished client.
    fn make_client(client: Client) -> Client {
        client
    }

    /// A new, uncached client with the default configuration.
    fn make() -> Result<Client> {
        Self::make_with(Config::default(), None, None)
    }

    fn make_with(
        config: Config,
        transport: Option<Arc<dyn Transport>>,
        logger: Option<Arc<dyn RequestLogger>>,
    ) -> Result<Client> {
        Self::make_in(Registry::global(), config, transport, logger)
    }

    /// Build a client from `config` layered over the registry defaults.
    ///
    /// A supplied transport cannot be combined with transport settings,
    /// since those only configure the default transport.
    fn make_in(
        registry: &Registry,
        config: Config,
        transport: Option<Arc<dyn Transport>>,
        logger: Option<Arc<dyn RequestLogger>>,
    ) -> Result<Client> {
        let config = config.merged_over(&registry.default_config())?;
        if transport.is_some() && !config.transport.is_empty() {
            return Err(Error::BadConfiguration(
                "cannot provide both a transport and transport settings".to_string(),
            ));
        }

        let base_uri = Self::base_uri().or_else(|| config.base_uri.clone());
        let config = Self::make_config(config);
        let mut client = match transport {
            Some(transport) => {
                let mut client = Client::new(transport);
                client.set_config(config);
                client
            }
            None => Client::from_config(config),
        };
        client.set_logger(logger.or_else(|| registry.default_logger()));
        if let Some(base_uri) = base_uri {
            client.set_base_uri(base_uri);
        }
        Ok(Self::make_client(client))
    }

    /// The shared client of this profile, created on first use.
    fn instance() -> Result<Arc<Client>> {
        Self::instance_in(Registry::global(), Config::default(), None, None)
    }

    /// Like `instance`; the arguments only apply when the client is created.
    fn instance_with(
        config: Config,
        transport: Option<Arc<dyn Transport>>,
        logger: Option<Arc<dyn RequestLogger>>,
    ) -> Result<Arc<Client>> {
        Self::instance_in(Registry::global(), config, transport, logger)
    }

    fn instance_in(
        registry: &Registry,
        config: Config,
        transport: Option<Arc<dyn Transport>>,
        logger: Option<Arc<dyn RequestLogger>>,
    ) -> Result<Arc<Client>> {
        registry.get_or_try_insert(TypeId::of::<Self>(), || {
            Self::make_in(registry, config, transport, logger)
        })
    }

    fn get(uri: &str) -> Result<Response> {
        let client = Self::instance()?;
        client.get(uri).send()
    }

    fn post(uri: &str, body: impl Into<Body>) -> Result<Response> {
        let client = Self::instance()?;
        client.post(uri, body).send()
    }

    fn post_form<K, V>(uri: &str, fields: impl IntoIterator<Item = (K, V)>) -> Result<Response>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let client = Self::instance()?;
        client.post_form(uri, fields).send()
    }

    fn post_multipart_form(uri: &str, parts: Vec<Part>) -> Result<Response> {
        let client = Self::instance()?;
        client.post_multipart_form(uri, parts).send()
    }

    fn put(uri: &str, body: impl Into<Body>) -> Result<Response> {
        let client = Self::instance()?;
        client.put(uri, body).send()
    }

    fn patch(uri: &str, body: impl Into<Body>) -> Result<Response> {
        let client = Self::instance()?;
        client.patch(uri, body).send()
    }

    fn delete(uri: &str) -> Result<Response> {
        let client = Self::instance()?;
        client.delete(uri).send()
    }

    /// Send with any method. `configure` can add headers, query or options.
    fn call(
        method: impl Into<HttpMethod>,
        uri: &str,
        configure: impl FnOnce(Call<'_>) -> Call<'_>,
    ) -> Result<Response> {
        let client = Self::instance()?;
        configure(client.call(method, uri)).send()
    }
}

/// The default profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hyper;

impl Facade for Hyper {}
