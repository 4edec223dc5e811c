//! Scanner registration and per-query resolution.
//!
//! Scanners are registered explicitly, in order. Resolution tries the
//! configured scanner first and otherwise falls through to the first other
//! registered scanner that supports the query. A query nothing supports is
//! an error, never an empty result.
//!
//! # Examples
//!
//! ```
//! use mt_core::{Query, ScannerKind};
//! use mt_scanner::{FileScanner, MavenScanner, ScannerRegistry};
//!
//! let registry = ScannerRegistry::new()
//!     .with_scanner(MavenScanner)
//!     .with_scanner(FileScanner);
//!
//! // The configured scanner cannot run the query, so the next one that can is chosen.
//! let query = Query::new("pom", "dependency");
//! let scanner = registry.resolve(&query, Some(ScannerKind::File)).unwrap();
//! assert_eq!(scanner.kind(), ScannerKind::Maven);
//! ```

use std::sync::Arc;

use mt_core::{CoreError, Query, ScannerKind};
use tracing::debug;

use crate::error::ScanError;
use crate::scanner::Scanner;
use crate::scanners::{FileScanner, JdtlsScanner, MavenScanner, OpenRewriteScanner, SymbolServer};
use crate::toolchain::ToolRunner;

/// Ordered set of available scanners.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    scanners: Vec<Arc<dyn Scanner>>,
}

impl std::fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.scanners.iter().map(|s| s.kind()))
            .finish()
    }
}

impl ScannerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in scanners.
    ///
    /// Local scanners come first so they win capability fallback over the
    /// external tool. The symbol-server scanner is registered only when a
    /// server is supplied.
    #[must_use]
    pub fn standard(runner: Arc<dyn ToolRunner>, server: Option<Arc<dyn SymbolServer>>) -> Self {
        let mut registry = Self::new().with_scanner(MavenScanner).with_scanner(FileScanner);
        if let Some(server) = server {
            registry = registry.with_scanner(JdtlsScanner::new(server));
        }
        registry.with_scanner(OpenRewriteScanner::new(runner))
    }

    /// Appends a scanner. A later scanner of an already registered kind replaces it in place.
    #[must_use]
    pub fn with_scanner(mut self, scanner: impl Scanner + 'static) -> Self {
        let scanner: Arc<dyn Scanner> = Arc::new(scanner);
        match self.scanners.iter_mut().find(|s| s.kind() == scanner.kind()) {
            Some(slot) => *slot = scanner,
            None => self.scanners.push(scanner),
        }
        self
    }

    /// Returns the registered scanner of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedScannerType`] if no such scanner is registered.
    pub fn get(&self, kind: ScannerKind) -> Result<&dyn Scanner, CoreError> {
        self.scanners
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
            .ok_or_else(|| CoreError::UnsupportedScannerType(kind.to_string()))
    }

    /// Registered scanner kinds, in registration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ScannerKind> {
        self.scanners.iter().map(|s| s.kind()).collect()
    }

    /// Returns the number of registered scanners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    /// Returns `true` if no scanner is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Picks the scanner that executes `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NoScannerAvailable`] if no registered scanner
    /// supports the query. The reason names the configured scanner when it was
    /// passed over.
    pub fn resolve(
        &self,
        query: &Query,
        configured: Option<ScannerKind>,
    ) -> Result<&dyn Scanner, ScanError> {
        let mut skipped = None;
        if let Some(kind) = configured {
            match self.get(kind) {
                Ok(scanner) if scanner.supports(query) => return Ok(scanner),
                Ok(_) => skipped = Some(format!("configured scanner {kind} does not support it")),
                Err(_) => skipped = Some(format!("configured scanner {kind} is not registered")),
            }
        }

        if let Some(scanner) = self
            .scanners
            .iter()
            .filter(|s| Some(s.kind()) != configured)
            .find(|s| s.supports(query))
        {
            if let Some(reason) = &skipped {
                debug!(query = %query, scanner = %scanner.kind(), reason = %reason, "falling back to capable scanner");
            }
            return Ok(scanner.as_ref());
        }

        let considered = self
            .kinds()
            .into_iter()
            .map(ScannerKind::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let reason = match skipped {
            Some(skipped) => format!("{skipped}; no other scanner does (registered: [{considered}])"),
            None => format!("no registered scanner supports it (registered: [{considered}])"),
        };
        Err(ScanError::NoScannerAvailable {
            query: query.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_scanner_wins_when_capable() {
        let registry = ScannerRegistry::new()
            .with_scanner(FileScanner)
            .with_scanner(MavenScanner);
        let query = Query::new("pom", "dependency");
        let scanner = registry.resolve(&query, Some(ScannerKind::Maven)).unwrap();
        assert_eq!(scanner.kind(), ScannerKind::Maven);
    }

    #[test]
    fn test_unsupported_configured_scanner_falls_through() {
        let registry = ScannerRegistry::new()
            .with_scanner(FileScanner)
            .with_scanner(MavenScanner);
        let query = Query::new("file", "content");
        let scanner = registry.resolve(&query, Some(ScannerKind::Maven)).unwrap();
        assert_eq!(scanner.kind(), ScannerKind::File);
    }

    #[test]
    fn test_no_capable_scanner_is_an_error() {
        let registry = ScannerRegistry::new().with_scanner(MavenScanner);
        let query = Query::new("java", "annotation").with_param("name", "org.acme.Foo");
        let err = registry.resolve(&query, Some(ScannerKind::Jdtls)).err().unwrap();
        let message = err.to_string();
        assert!(matches!(err, ScanError::NoScannerAvailable { .. }));
        assert!(message.contains("java.annotation"), "{message}");
        assert!(message.contains("jdtls is not registered"), "{message}");
    }

    #[test]
    fn test_get_unknown_kind() {
        let registry = ScannerRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(ScannerKind::Maven),
            Err(CoreError::UnsupportedScannerType(_))
        ));
    }

    #[test]
    fn test_re_registration_replaces_in_place() {
        let registry = ScannerRegistry::new()
            .with_scanner(MavenScanner)
            .with_scanner(FileScanner)
            .with_scanner(MavenScanner);
        assert_eq!(registry.kinds(), vec![ScannerKind::Maven, ScannerKind::File]);
        assert_eq!(registry.len(), 2);
    }
}
