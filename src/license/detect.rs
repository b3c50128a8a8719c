use std::io::Read;
use std::path::Path;

use crate::models::UNKNOWN;

/// Files checked, in order, when looking for a package's license text.
pub const LICENSE_FILE_CANDIDATES: &[&str] = &[
    "LICENSE",
    "LICENSE.txt",
    "LICENSE.md",
    "LICENSE.rst",
    "license",
    "license.txt",
    "license.md",
    "license.rst",
    "COPYING",
    "COPYING.txt",
    "COPYRIGHT",
    "COPYRIGHT.txt",
];

/// License file names checked inside installed npm packages.
pub const NODE_LICENSE_FILES: &[&str] = &[
    "LICENSE",
    "LICENSE.txt",
    "LICENSE.md",
    "license",
    "license.txt",
    "license.md",
];

/// Lower-cased phrase → identifier. The phrase found earliest in the text
/// wins; at the same offset the entry listed first wins, so versioned titles
/// sit above the generic ones they extend.
const LICENSE_PHRASES: &[(&str, &str)] = &[
    ("gnu affero general public license", "AGPL-3.0"),
    ("gnu lesser general public license version 2.1", "LGPL-2.1"),
    ("gnu lesser general public", "LGPL-3.0"),
    ("gnu general public license version 2", "GPL-2.0"),
    ("gnu general public license", "GPL-3.0"),
    ("mozilla public license", "MPL-2.0"),
    ("apache license, version 2.0", "Apache-2.0"),
    ("apache license version 2.0", "Apache-2.0"),
    ("bsd 3-clause", "BSD-3-Clause"),
    ("bsd 2-clause", "BSD-2-Clause"),
    ("isc license", "ISC"),
    ("mit license", "MIT"),
    ("permission is hereby granted, free of charge", "MIT"),
    ("unlicense", "Unlicense"),
];

/// License files larger than this are truncated before classification.
const MAX_LICENSE_BYTES: u64 = 1024 * 1024;

/// Map raw license text to an identifier, or [`UNKNOWN`].
///
/// This is a position search, not a first-hit table scan: a phrase that
/// appears earlier in the text beats one listed earlier in [`LICENSE_PHRASES`].
/// Table order only breaks ties at the same offset.
pub fn detect_license_type(text: &str) -> &'static str {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    // GPL-3.0 text names the Affero license in its body, so titles must outrank mentions.
    LICENSE_PHRASES
        .iter()
        .enumerate()
        .filter_map(|(rank, (phrase, id))| normalized.find(phrase).map(|pos| (pos, rank, *id)))
        .min()
        .map(|(_, _, id)| id)
        .unwrap_or(UNKNOWN)
}

/// Read the first license candidate present in `dir`.
pub fn read_license_text(dir: &Path) -> Option<String> {
    read_first_of(dir, LICENSE_FILE_CANDIDATES)
}

/// Read the first of `candidates` present in `dir`.
pub fn read_first_of(dir: &Path, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|name| {
        let file = std::fs::File::open(dir.join(name)).ok()?;
        let mut text = String::new();
        file.take(MAX_LICENSE_BYTES).read_to_string(&mut text).ok()?;
        Some(text)
    })
}

/// Read and classify the license file in `dir`: `(text, identifier)`.
pub fn read_license_from_dir(dir: &Path) -> Option<(String, &'static str)> {
    let text = read_license_text(dir)?;
    let license = detect_license_type(&text);
    Some((text, license))
}
