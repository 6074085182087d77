//! Client region lookup for the packages request.

/// Supplies the client's country code (e.g. `JP`).
pub trait RegionSource: Send + Sync {
    /// Two-letter country code, or an empty string if unknown.
    fn region(&self) -> String;
}

/// A region fixed at construction, typically from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRegion(pub String);

impl RegionSource for FixedRegion {
    fn region(&self) -> String {
        self.0.clone()
    }
}

/// Reads the country from the POSIX locale environment.
///
/// `LC_ALL`, `LC_MESSAGES` and `LANG` are consulted in that order; the first
/// one that names a territory wins. Yields an empty string otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvRegion;

impl RegionSource for EnvRegion {
    fn region(&self) -> String {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|locale| country_of(&locale))
            .unwrap_or_default()
    }
}

/// Extract the territory from a locale name like `ja_JP.UTF-8@calendar`.
pub fn country_of(locale: &str) -> Option<String> {
    let name = locale.split(['.', '@']).next()?;
    let (_, territory) = name.split_once(['_', '-'])?;
    if territory.len() == 2 && territory.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(territory.to_ascii_uppercase())
    } else {
        None
    }
}
