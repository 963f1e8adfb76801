//! Better error messages with actionable suggestions.

use fileconv_core::{ConverterNotFound, Error, FileTypeKind, Registry};
use std::path::Path;

/// Exit code for pipeline failures (read, convert, write).
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for type resolution errors.
pub const EXIT_RESOLUTION: u8 = 2;
/// Exit code when no converter handles the requested pair.
pub const EXIT_UNSUPPORTED: u8 = 3;
/// Exit code when an input path does not exist.
pub const EXIT_NOT_FOUND: u8 = 4;

/// Pick the exit code for an error that aborted a command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::PathNotFound { .. } | Error::FileNotFound { .. }) => EXIT_NOT_FOUND,
        Some(err) if err.is_resolution() => EXIT_RESOLUTION,
        _ => EXIT_FAILURE,
    }
}

/// Build the report for a conversion no converter handles.
pub fn unsupported_conversion(missing: &ConverterNotFound, registry: &Registry) -> String {
    let (from, to) = missing.requested;
    let mut msg = format!("No converter from {from} to {to}");

    let reachable = missing.reachable();
    if reachable.is_empty() {
        msg.push_str(&format!(".\n\n{from} has no registered conversions.\n"));
    } else {
        let names: Vec<String> = reachable.iter().map(ToString::to_string).collect();
        msg.push_str(&format!(".\n\n{from} can convert to: {}\n", names.join(", ")));
    }

    let sources: Vec<String> = registry
        .supported_pairs()
        .into_iter()
        .filter(|(_, out)| *out == to)
        .map(|(input, _)| input.to_string())
        .collect();
    if !sources.is_empty() {
        msg.push_str(&format!("{to} can be created from: {}\n", sources.join(", ")));
    }

    msg.push_str("\nSupported conversions:");
    for (input, output) in &missing.supported {
        msg.push_str(&format!("\n  {input} -> {output}"));
    }
    msg
}

/// Extra guidance for errors about undetectable file types.
pub fn type_detection_hint(err: &Error) -> Option<String> {
    let path = match err {
        Error::EmptySuffix { path } | Error::UnsupportedType { path, .. } => path,
        Error::MissingDirectoryType { .. } => {
            return Some("Declare the directory's file type with --to <type>.".into());
        }
        Error::AmbiguousPathKind { .. } => {
            return Some("Add a suffix to the output path, or declare its type with --to.".into());
        }
        _ => return None,
    };

    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let mut msg = String::new();
    if let Some(suggestion) = ext.as_deref().and_then(find_similar_suffix) {
        msg.push_str(&format!(
            "Did you mean '{suggestion}'? \
             Declare it with --from {suggestion} or --to {suggestion}.\n\n"
        ));
    } else {
        msg.push_str("Declare the type with --from <type> (inputs) or --to <type> (output).\n\n");
    }

    msg.push_str("Supported suffixes:");
    for kind in FileTypeKind::true_types() {
        msg.push_str(&format!("\n  {:<9} {}", kind.name(), kind.suffixes().join(", ")));
    }
    Some(msg)
}

/// Find a similar catalog suffix (for typo suggestions).
fn find_similar_suffix(input: &str) -> Option<&'static str> {
    let input = input.to_lowercase();

    // Common typos and aliases
    let aliases: &[(&str, &str)] = &[
        ("text", "txt"),
        ("mdown", "md"),
        ("mkd", "md"),
        ("jsonl", "json"),
        ("tif", "tiff"),
        ("xlsm", "xlsx"),
        ("m4v", "mp4"),
    ];

    for (alias, canonical) in aliases {
        if input == *alias {
            return Some(canonical);
        }
    }

    // Closest suffix within Levenshtein distance 2
    FileTypeKind::true_types()
        .flat_map(|kind| kind.suffixes().iter().copied())
        .filter(|suffix| input != *suffix)
        .map(|suffix| (levenshtein(&input, suffix), suffix))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, suffix)| suffix)
}

/// Simple Levenshtein distance for short strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileconv_core::Evidence;
    use std::path::PathBuf;

    #[test]
    fn test_find_similar_suffix() {
        assert_eq!(find_similar_suffix("mdown"), Some("md"));
        assert_eq!(find_similar_suffix("jsn"), Some("json"));
        assert_eq!(find_similar_suffix("pngg"), Some("png"));
        assert_eq!(find_similar_suffix("zzzzzzz"), None);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("csv", "csv"), 0);
        assert_eq!(levenshtein("csv", "cvs"), 2);
        assert_eq!(levenshtein("json", "jsn"), 1);
        assert_eq!(levenshtein("abc", "xyz"), 3);
    }

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::new(Error::PathNotFound {
            path: PathBuf::from("a.txt"),
        });
        assert_eq!(exit_code(&not_found), EXIT_NOT_FOUND);

        let mismatch = anyhow::Error::new(Error::MismatchedType {
            path: PathBuf::from("a.txt"),
            expected: FileTypeKind::Json,
            found: FileTypeKind::Text,
            evidence: Evidence::Suffix,
        });
        assert_eq!(exit_code(&mismatch), EXIT_RESOLUTION);

        let missing = anyhow::Error::new(Error::OutputMissing {
            path: PathBuf::from("out.md"),
        });
        assert_eq!(exit_code(&missing), EXIT_FAILURE);

        assert_eq!(exit_code(&anyhow::anyhow!("anything else")), EXIT_FAILURE);
    }

    #[test]
    fn test_type_detection_hint() {
        let err = Error::UnsupportedType {
            path: PathBuf::from("notes.mdown"),
            found: "suffix '.mdown'".into(),
        };
        let hint = type_detection_hint(&err).unwrap();
        assert!(hint.contains("Did you mean 'md'?"));
        assert!(hint.contains("MARKDOWN"));

        let err = Error::EmptySuffix {
            path: PathBuf::from("notes"),
        };
        assert!(type_detection_hint(&err).unwrap().contains("--from <type>"));

        assert!(type_detection_hint(&Error::NoInputs).is_none());
    }

    #[test]
    fn test_unsupported_conversion_report() {
        use fileconv_core::{Content, ConverterDescriptor, ReadError, Reader, WriteError, Writer};

        struct Nothing;
        impl Reader for Nothing {
            fn read(&self, _: &Path) -> Result<Content, ReadError> {
                Ok(Content::Text(String::new()))
            }
            fn check_format(&self, _: &Content) -> bool {
                true
            }
        }
        impl Writer for Nothing {
            fn check_format(&self, _: &Content) -> bool {
                true
            }
            fn write(&self, _: &Path, _: &Content) -> Result<(), WriteError> {
                Ok(())
            }
        }

        let mut registry = Registry::new();
        registry.register(ConverterDescriptor::buffered(
            "csv-to-json",
            FileTypeKind::Csv,
            FileTypeKind::Json,
            Nothing,
            Nothing,
            |_| Ok(Content::Text(String::new())),
        ));
        let missing = ConverterNotFound {
            requested: (FileTypeKind::Json, FileTypeKind::Csv),
            supported: registry.supported_pairs(),
        };

        let msg = unsupported_conversion(&missing, &registry);
        assert!(msg.starts_with("No converter from JSON to CSV"));
        assert!(msg.contains("JSON has no registered conversions"));
        assert!(msg.contains("CSV -> JSON"));
    }
}
