//! Canonical file names.
//!
//! Assistants and clients refer to the same logical contract through many
//! spellings (`contracts/Token.sol`, `Token_v2.sol`, `Token_999.sol`). All of
//! them collapse onto one canonical name so a chat never holds two current
//! versions of one contract.

/// Derive the canonical name of a path.
///
/// Drops the directory part, keeps the stem up to the first `_` and
/// reattaches the extension. A stem that starts with `_` is kept whole.
pub fn canonical_name(path: &str) -> String {
    let file_name = path
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();

    let (stem, extension) = match file_name.rfind('.') {
        Some(0) | None => (file_name, None),
        Some(idx) => (&file_name[..idx], Some(&file_name[idx + 1..])),
    };

    let base = match stem.split_once('_') {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => stem,
    };

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_directory_and_suffix() {
        assert_eq!(canonical_name("contracts/Token_999.sol"), "Token.sol");
        assert_eq!(canonical_name("Token_other.sol"), "Token.sol");
        assert_eq!(canonical_name("Token.sol"), "Token.sol");
        assert_eq!(canonical_name("a/b/c/Vault_v2_final.sol"), "Vault.sol");
    }

    #[test]
    fn test_windows_separators() {
        assert_eq!(canonical_name(r"contracts\Token_1.sol"), "Token.sol");
    }

    #[test]
    fn test_synthesized_paths_share_a_name() {
        assert_eq!(
            canonical_name("contracts/Contract_0.sol"),
            canonical_name("contracts/Contract_3.sol")
        );
    }

    #[test]
    fn test_leading_underscore_keeps_stem() {
        assert_eq!(canonical_name("_helpers.sol"), "_helpers.sol");
    }

    #[test]
    fn test_no_extension_and_dotfiles() {
        assert_eq!(canonical_name("README_old"), "README");
        assert_eq!(canonical_name(".gitignore"), ".gitignore");
        assert_eq!(canonical_name("contracts/"), "contracts");
    }
}
