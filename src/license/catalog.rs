//! Static reporting text for audit findings, keyed by canonical license id.

pub const DANGEROUS_MESSAGES: &[(&str, &str)] = &[
    ("GPL-2.0", "GPL-2.0 is a copyleft license that may require releasing your source code under the same license"),
    ("GPL-3.0", "GPL-3.0 is a copyleft license that may require releasing your source code under the same license"),
    ("AGPL-3.0", "AGPL-3.0 has strong copyleft requirements including network use provisions"),
    ("LGPL-2.1", "LGPL-2.1 may require releasing modifications to the library under the same license"),
    ("LGPL-3.0", "LGPL-3.0 may require releasing modifications to the library under the same license"),
    ("CDDL-1.0", "CDDL-1.0 has copyleft requirements that may conflict with proprietary code"),
    ("CDDL-1.1", "CDDL-1.1 has copyleft requirements that may conflict with proprietary code"),
    ("EPL-1.0", "EPL-1.0 has copyleft requirements for modifications and derivative works"),
    ("EPL-2.0", "EPL-2.0 has copyleft requirements for modifications and derivative works"),
    ("CPL-1.0", "CPL-1.0 has copyleft requirements that may affect your code"),
    ("OSL-3.0", "OSL-3.0 has strong copyleft requirements including network distribution"),
    ("QPL-1.0", "QPL-1.0 has specific requirements for commercial use"),
];

pub const DANGEROUS_SUGGESTIONS: &[(&str, &str)] = &[
    ("GPL-2.0", "Consider using MIT, Apache-2.0, or BSD licensed alternatives"),
    ("GPL-3.0", "Consider using MIT, Apache-2.0, or BSD licensed alternatives"),
    ("AGPL-3.0", "Consider using MIT, Apache-2.0, or BSD licensed alternatives"),
    ("LGPL-2.1", "Ensure you comply with LGPL requirements or find MIT/Apache alternatives"),
    ("LGPL-3.0", "Ensure you comply with LGPL requirements or find MIT/Apache alternatives"),
    ("CDDL-1.0", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("CDDL-1.1", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("EPL-1.0", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("EPL-2.0", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("CPL-1.0", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("OSL-3.0", "Consider using Apache-2.0 or MIT licensed alternatives"),
    ("QPL-1.0", "Review commercial use requirements or find alternatives"),
];

pub const UNCLEAR_MESSAGES: &[(&str, &str)] = &[
    ("UNKNOWN", "No license information could be determined for this dependency"),
    ("UNLICENSED", "This dependency is explicitly marked as unlicensed"),
    ("PROPRIETARY", "This dependency uses a proprietary license"),
    ("COMMERCIAL", "This dependency requires a commercial license"),
    ("", "No license information found"),
];

pub const DANGEROUS_FALLBACK_MESSAGE: &str =
    "This license may have restrictions that could affect your project";
pub const DANGEROUS_FALLBACK_SUGGESTION: &str =
    "Review the license terms carefully and consult with legal counsel if necessary";
pub const UNCLEAR_FALLBACK_MESSAGE: &str = "License information is unclear or ambiguous";
pub const UNCLEAR_SUGGESTION: &str =
    "Review the dependency's repository or documentation to determine the correct license";

pub const TAINTED_MESSAGE: &str = "Dependency may have tainted or conflicting license terms";
pub const TAINTED_SUGGESTION: &str =
    "Carefully review the license terms and consult with legal counsel if necessary";

pub const MISSING_MESSAGE: &str = "No license information found for this dependency";
pub const MISSING_SUGGESTION: &str =
    "Check the dependency's repository, package registry, or documentation for license information";

/// Case-insensitive lookup of `id` in one of the tables above.
pub fn lookup(table: &'static [(&'static str, &'static str)], id: &str) -> Option<&'static str> {
    let id = id.trim();
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(id))
        .map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(
            lookup(DANGEROUS_SUGGESTIONS, "agpl-3.0"),
            Some("Consider using MIT, Apache-2.0, or BSD licensed alternatives")
        );
        assert!(lookup(DANGEROUS_MESSAGES, "MIT").is_none());
    }

    #[test]
    fn test_every_dangerous_message_has_a_suggestion() {
        for (id, _) in DANGEROUS_MESSAGES {
            assert!(lookup(DANGEROUS_SUGGESTIONS, id).is_some(), "{id}");
        }
    }
}
