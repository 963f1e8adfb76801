//! Registry of converters, keyed by `(input, output)` type pair.

use crate::converter::ConverterDescriptor;
use crate::filetype::FileTypeKind;
use indexmap::IndexMap;
use tracing::debug;

/// Key a converter registers under.
pub type Pair = (FileTypeKind, FileTypeKind);

/// Registry of available converters.
///
/// At most one converter per type pair. Iteration follows registration
/// order, so listings and "supported conversions" reports are stable.
#[derive(Clone, Default)]
pub struct Registry {
    converters: IndexMap<Pair, ConverterDescriptor>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter.
    ///
    /// A second registration for the same pair replaces the first one, which
    /// is returned. The pair keeps its original position.
    pub fn register(&mut self, converter: ConverterDescriptor) -> Option<ConverterDescriptor> {
        let pair = converter.pair();
        let previous = self.converters.insert(pair, converter);
        if let Some(prev) = &previous {
            debug!(
                input = %pair.0,
                output = %pair.1,
                replaced = prev.id(),
                "converter replaced"
            );
        }
        previous
    }

    /// Remove the converter for a pair, keeping the order of the rest.
    pub fn remove(
        &mut self,
        input: FileTypeKind,
        output: FileTypeKind,
    ) -> Option<ConverterDescriptor> {
        self.converters.shift_remove(&(input, output))
    }

    /// The converter for exactly this pair, if any.
    pub fn lookup(
        &self,
        input: FileTypeKind,
        output: FileTypeKind,
    ) -> Option<&ConverterDescriptor> {
        self.converters.get(&(input, output))
    }

    /// Every registered pair, in registration order.
    pub fn supported_pairs(&self) -> Vec<Pair> {
        self.converters.keys().copied().collect()
    }

    /// Iterate over all descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &ConverterDescriptor> {
        self.converters.values()
    }

    /// Output types reachable from `input` in one step.
    pub fn outputs_for(&self, input: FileTypeKind) -> Vec<FileTypeKind> {
        self.converters
            .keys()
            .filter(|(from, _)| *from == input)
            .map(|(_, to)| *to)
            .collect()
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.converters.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Content;
    use crate::test_support::PlainText;
    use FileTypeKind::*;

    fn copy(id: &str, input: FileTypeKind, output: FileTypeKind) -> ConverterDescriptor {
        ConverterDescriptor::buffered(id, input, output, PlainText, PlainText, |inputs| {
            Ok(Content::Text(
                inputs.iter().filter_map(Content::as_text).collect(),
            ))
        })
    }

    fn make_test_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(copy("text-to-md", Text, Markdown));
        registry.register(copy("md-to-text", Markdown, Text));
        registry.register(copy("text-to-json", Text, Json));
        registry
    }

    #[test]
    fn test_lookup() {
        let registry = make_test_registry();

        assert_eq!(registry.lookup(Text, Markdown).unwrap().id(), "text-to-md");
        assert!(registry.lookup(Markdown, Json).is_none());
        assert!(registry.lookup(Json, Text).is_none());
    }

    #[test]
    fn test_supported_pairs_in_registration_order() {
        let registry = make_test_registry();

        assert_eq!(
            registry.supported_pairs(),
            vec![(Text, Markdown), (Markdown, Text), (Text, Json)]
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = make_test_registry();

        let previous = registry.register(copy("text-to-md-v2", Text, Markdown));

        assert_eq!(previous.unwrap().id(), "text-to-md");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup(Text, Markdown).unwrap().id(), "text-to-md-v2");
        assert_eq!(registry.supported_pairs()[0], (Text, Markdown));
    }

    #[test]
    fn test_remove() {
        let mut registry = make_test_registry();

        assert!(registry.remove(Text, Markdown).is_some());
        assert!(registry.remove(Text, Markdown).is_none());
        assert_eq!(registry.supported_pairs(), vec![(Markdown, Text), (Text, Json)]);
    }

    #[test]
    fn test_outputs_for() {
        let registry = make_test_registry();

        assert_eq!(registry.outputs_for(Text), vec![Markdown, Json]);
        assert!(registry.outputs_for(Pdf).is_empty());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();

        let registry = std::sync::Arc::new(make_test_registry());
        let shared = std::sync::Arc::clone(&registry);
        let found = std::thread::spawn(move || {
            shared.lookup(Text, Json).map(|d| d.id().to_string())
        })
        .join()
        .unwrap();
        assert_eq!(found.as_deref(), Some("text-to-json"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.supported_pairs().is_empty());
        assert!(registry.lookup(Text, Text).is_none());
    }
}
