use crate::crs::{Crs, CrsId};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No registry is installed for authority {0}")]
    UnknownAuthority(String),
    #[error("{0} was not found in the registry")]
    NotFound(CrsId),
}

/// A catalog resolving codes of one authority to full CRS definitions.
pub trait CrsRegistry {
    /// Authority name served by this registry, e.g. `EPSG`.
    fn authority(&self) -> &str;

    fn resolve(&self, code: &str) -> Result<Arc<Crs>, RegistryError>;

    /// Every available code with a human readable label, in catalog order.
    fn list_codes(&self) -> IndexMap<String, String>;
}

/// An in-memory registry, populated by the host.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    authority: String,
    entries: IndexMap<String, Arc<Crs>>,
}

impl StaticRegistry {
    pub fn new(authority: impl Into<String>) -> Self {
        StaticRegistry {
            authority: authority.into(),
            entries: IndexMap::new(),
        }
    }

    /// Add a CRS under its own code. The CRS authority must match the registry's.
    pub fn with(mut self, crs: Crs) -> Self {
        self.insert(crs);
        self
    }

    pub fn insert(&mut self, crs: Crs) -> Option<Arc<Crs>> {
        debug_assert!(crs.id().authority().eq_ignore_ascii_case(&self.authority));
        self.entries
            .insert(crs.id().code().to_string(), Arc::new(crs))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CrsRegistry for StaticRegistry {
    fn authority(&self) -> &str {
        &self.authority
    }

    fn resolve(&self, code: &str) -> Result<Arc<Crs>, RegistryError> {
        self.entries
            .get(code)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(CrsId::new(self.authority.clone(), code)))
    }

    fn list_codes(&self) -> IndexMap<String, String> {
        self.entries
            .iter()
            .map(|(code, crs)| (code.clone(), format!("{code} - {}", crs.name())))
            .collect()
    }
}

/// The set of registries a batch may draw its CRS from, keyed by authority.
#[derive(Default)]
pub struct RegistryManager {
    registries: IndexMap<String, Box<dyn CrsRegistry>>,
}

impl RegistryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a registry, replacing any previous one for the same authority.
    pub fn add_registry(&mut self, registry: impl CrsRegistry + 'static) {
        let authority = registry.authority().to_ascii_uppercase();
        self.registries.insert(authority, Box::new(registry));
    }

    pub fn with_registry(mut self, registry: impl CrsRegistry + 'static) -> Self {
        self.add_registry(registry);
        self
    }

    pub fn registry(&self, authority: &str) -> Result<&dyn CrsRegistry, RegistryError> {
        self.registries
            .get(&authority.to_ascii_uppercase())
            .map(|registry| registry.as_ref())
            .ok_or_else(|| RegistryError::UnknownAuthority(authority.to_string()))
    }

    pub fn authorities(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn resolve(&self, authority: &str, code: &str) -> Result<Arc<Crs>, RegistryError> {
        self.registry(authority)?.resolve(code)
    }

    pub fn list_codes(&self, authority: &str) -> Result<IndexMap<String, String>, RegistryError> {
        Ok(self.registry(authority)?.list_codes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{Datum, EPSG, Ellipsoid, IGNF};

    fn epsg_registry() -> StaticRegistry {
        StaticRegistry::new(EPSG)
            .with(Crs::new(
                CrsId::epsg(4326),
                "WGS 84",
                Datum::new("WGS_1984", Ellipsoid::wgs84()),
            ))
            .with(
                Crs::new(
                    CrsId::epsg(2154),
                    "RGF93 / Lambert-93",
                    Datum::new("RGF93", Ellipsoid::grs80()),
                )
                .with_projection("Lambert_Conformal_Conic_2SP", "+proj=lcc"),
            )
    }

    #[test]
    fn test_list_codes_keeps_catalog_order() {
        let codes = epsg_registry().list_codes();
        let keys: Vec<_> = codes.keys().cloned().collect();
        assert_eq!(keys, vec!["4326", "2154"]);
        assert_eq!(codes["2154"], "2154 - RGF93 / Lambert-93");
    }

    #[test]
    fn test_manager_resolves_by_authority() {
        let manager = RegistryManager::new()
            .with_registry(epsg_registry())
            .with_registry(StaticRegistry::new(IGNF));
        let crs = manager.resolve("epsg", "2154").unwrap();
        assert_eq!(crs.epsg_code(), Some(2154));
        assert_eq!(manager.authorities().collect::<Vec<_>>(), vec![EPSG, IGNF]);
        assert!(manager.list_codes(IGNF).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_errors() {
        let manager = RegistryManager::new().with_registry(epsg_registry());
        assert_eq!(
            manager.resolve(EPSG, "9999").unwrap_err(),
            RegistryError::NotFound(CrsId::epsg(9999))
        );
        assert_eq!(
            manager.resolve(IGNF, "LAMB93").unwrap_err(),
            RegistryError::UnknownAuthority(IGNF.to_string())
        );
    }
}
