//! Marker discovery.

use crate::class::{ClassRegistry, TypeMarker};
use crate::descriptor::TypePath;

/// Yields the classes of a namespace that carry a marker.
///
/// Discovery runs once before a build; the schema generator never scans on its own.
pub trait MarkerScanner {
    fn scan(&self, namespace: &str, marker: TypeMarker) -> Vec<TypePath>;
}

impl MarkerScanner for ClassRegistry {
    fn scan(&self, namespace: &str, marker: TypeMarker) -> Vec<TypePath> {
        self.iter()
            .filter(|class| class.has_marker(marker) && class.path().is_in(namespace))
            .map(|class| class.path().clone())
            .collect()
    }
}

/// A fixed list of discovered paths, for scanners fed by an external index.
impl MarkerScanner for Vec<(TypePath, TypeMarker)> {
    fn scan(&self, namespace: &str, marker: TypeMarker) -> Vec<TypePath> {
        self.iter()
            .filter(|(path, found)| *found == marker && path.is_in(namespace))
            .map(|(path, _)| path.clone())
            .collect()
    }
}
