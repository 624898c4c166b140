//! Property tests for the key codec and path model.
//!
//! Run with: cargo test --test proptest_paths

use bucketfs::path::{
    PATH_SEPARATOR, decode_key, encode_key, extension, join, name, normalize_directory,
    parent_directory_of, parent_of_file, validate_directory_path, validate_file_path,
};
use proptest::prelude::*;

// One path segment: no separators of either kind, never empty
fn segment_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z0-9 ._\\-é]{1,12}").unwrap()
}

fn file_path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment_strategy(), 1..6).prop_map(|segments| segments.join("\\"))
}

fn directory_path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment_strategy(), 0..6).prop_map(|segments| {
        segments
            .iter()
            .map(|segment| format!("{segment}\\"))
            .collect::<String>()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Decoding an encoded path gives the path back
    #[test]
    fn decode_inverts_encode(path in "[a-zA-Z0-9\\\\ .]{0,40}") {
        prop_assert_eq!(decode_key(&encode_key(&path)), path);
    }

    /// Encoding a decoded key gives the key back
    #[test]
    fn encode_inverts_decode(key in "[a-zA-Z0-9/ .]{0,40}") {
        prop_assert_eq!(encode_key(&decode_key(&key)), key);
    }

    /// Encoded keys never contain the path separator
    #[test]
    fn encoded_keys_use_store_separator(path in file_path_strategy()) {
        prop_assert!(!encode_key(&path).contains(PATH_SEPARATOR));
    }

    /// Generated file paths are valid and their parent is a valid directory
    #[test]
    fn file_parent_drops_last_segment(path in file_path_strategy()) {
        prop_assert!(validate_file_path(&path).is_ok());

        let parent = parent_of_file(&path);
        prop_assert!(validate_directory_path(&parent).is_ok());
        prop_assert_eq!(join(&parent, name(&path)), path.clone());
    }

    /// Normalizing an already normalized directory path changes nothing
    #[test]
    fn normalize_is_idempotent(path in directory_path_strategy()) {
        let once = normalize_directory(&path);
        prop_assert_eq!(normalize_directory(&once), once.clone());
        prop_assert_eq!(once, path);
    }

    /// A directory's parent plus its name reconstructs it
    #[test]
    fn directory_parent_and_name(path in directory_path_strategy()) {
        prop_assume!(!path.is_empty());
        let parent = parent_directory_of(&path);
        prop_assert_eq!(normalize_directory(&join(&parent, name(&path))), path);
    }

    /// Extensions never contain a dot or a separator
    #[test]
    fn extension_is_a_suffix_of_name(path in file_path_strategy()) {
        let ext = extension(&path);
        prop_assert!(!ext.contains('.'));
        prop_assert!(!ext.contains(PATH_SEPARATOR));
        prop_assert!(name(&path).ends_with(ext));
    }

    /// Paths carrying the store separator are rejected
    #[test]
    fn store_separator_rejected(left in segment_strategy(), right in segment_strategy()) {
        let path = format!("{left}/{right}");
        prop_assert!(validate_file_path(&path).is_err());
        let directory = format!("{path}\\");
        prop_assert!(validate_directory_path(&directory).is_err());
    }
}
