//! Drop duplicate binaries before the archive is assembled.
//!
//! Dependency collection can report one shared library once per search path
//! it was reachable from. Only the first record per identity key survives.

use std::collections::HashSet;
use std::ffi::OsString;

use serde::Deserialize;

use crate::artifact::ArtifactRecord;

/// How two records are judged to be the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Lower-cased file name of the source path.
    #[default]
    #[serde(alias = "basename")]
    NormalizedBasename,
    /// Source path exactly as collected.
    #[serde(alias = "path")]
    RawPath,
}

/// Identity of a record under a [`DedupPolicy`]. Names that are not valid
/// UTF-8 stay as raw OS strings so distinct paths never collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Text(String),
    Raw(OsString),
}

impl DedupPolicy {
    pub fn key(&self, record: &ArtifactRecord) -> DedupKey {
        match self {
            Self::NormalizedBasename => {
                let name = record
                    .source
                    .file_name()
                    .unwrap_or(record.source.as_os_str());
                match name.to_str() {
                    Some(s) => DedupKey::Text(s.to_lowercase()),
                    None => DedupKey::Raw(name.to_os_string()),
                }
            }
            Self::RawPath => DedupKey::Raw(record.source.as_os_str().to_os_string()),
        }
    }
}

/// Kept records plus the ones that were dropped, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    pub kept: Vec<ArtifactRecord>,
    pub dropped: Vec<ArtifactRecord>,
}

pub fn partition_duplicates(
    records: impl IntoIterator<Item = ArtifactRecord>,
    policy: DedupPolicy,
) -> DedupOutcome {
    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();
    for record in records {
        if seen.insert(policy.key(&record)) {
            outcome.kept.push(record);
        } else {
            outcome.dropped.push(record);
        }
    }
    outcome
}

/// First record per identity key, original relative order.
pub fn dedupe(
    records: impl IntoIterator<Item = ArtifactRecord>,
    policy: DedupPolicy,
) -> Vec<ArtifactRecord> {
    partition_duplicates(records, policy).kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;

    fn rec(source: &str, dest: &str) -> ArtifactRecord {
        ArtifactRecord::new(source, dest, ArtifactKind::Binary)
    }

    fn samples() -> Vec<Vec<ArtifactRecord>> {
        vec![
            vec![],
            vec![rec("libfoo.so", "a")],
            vec![rec("libfoo.so", "a"), rec("LIBFOO.SO", "b"), rec("libbar.so", "c")],
            vec![
                rec("/venv/lib/libssl.so.3", "."),
                rec("/usr/lib/libssl.so.3", "lib"),
                rec("/venv/lib/libssl.so.3", "other"),
                rec("/venv/lib/Qt5Core.dll", "."),
                rec("/usr/lib/qt5core.DLL", "."),
            ],
        ]
    }

    #[test]
    fn test_case_insensitive_basename_scenario() {
        let input = vec![rec("libfoo.so", "a"), rec("LIBFOO.SO", "b"), rec("libbar.so", "c")];
        let out = dedupe(input, DedupPolicy::NormalizedBasename);
        assert_eq!(out, vec![rec("libfoo.so", "a"), rec("libbar.so", "c")]);
    }

    #[test]
    fn test_raw_path_policy_keeps_distinct_paths() {
        let input = samples().pop().unwrap();
        let out = dedupe(input, DedupPolicy::RawPath);
        let sources: Vec<String> = out
            .iter()
            .map(|r| r.source.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            sources,
            vec![
                "/venv/lib/libssl.so.3",
                "/usr/lib/libssl.so.3",
                "/venv/lib/Qt5Core.dll",
                "/usr/lib/qt5core.DLL",
            ]
        );
        assert_eq!(out[0].dest, std::path::PathBuf::from("."));
    }

    #[test]
    fn test_idempotent_and_never_longer() {
        for policy in [DedupPolicy::NormalizedBasename, DedupPolicy::RawPath] {
            for input in samples() {
                let once = dedupe(input.clone(), policy);
                let twice = dedupe(once.clone(), policy);
                assert_eq!(once, twice);
                assert!(once.len() <= input.len());
            }
        }
    }

    #[test]
    fn test_output_keys_come_from_first_occurrence() {
        for policy in [DedupPolicy::NormalizedBasename, DedupPolicy::RawPath] {
            for input in samples() {
                let out = dedupe(input.clone(), policy);
                let keys: HashSet<DedupKey> = out.iter().map(|r| policy.key(r)).collect();
                assert_eq!(keys.len(), out.len(), "at most one record per key");
                for kept in &out {
                    let first = input
                        .iter()
                        .find(|r| policy.key(r) == policy.key(kept))
                        .unwrap();
                    assert_eq!(kept, first);
                }
                let input_keys: HashSet<DedupKey> = input.iter().map(|r| policy.key(r)).collect();
                assert_eq!(keys, input_keys);
            }
        }
    }

    #[test]
    fn test_partition_reports_dropped() {
        let input = samples().pop().unwrap();
        let outcome = partition_duplicates(input, DedupPolicy::NormalizedBasename);
        assert_eq!(outcome.kept.len(), 2);
        assert_eq!(outcome.dropped.len(), 3);
        assert_eq!(outcome.dropped[0].dest, std::path::PathBuf::from("lib"));
    }

    #[test]
    fn test_policy_from_yaml_aliases() {
        let p: DedupPolicy = serde_yaml::from_str("basename").unwrap();
        assert_eq!(p, DedupPolicy::NormalizedBasename);
        let p: DedupPolicy = serde_yaml::from_str("raw_path").unwrap();
        assert_eq!(p, DedupPolicy::RawPath);
        let p: DedupPolicy = serde_yaml::from_str("path").unwrap();
        assert_eq!(p, DedupPolicy::RawPath);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_stay_distinct() {
        use std::os::unix::ffi::OsStrExt;
        let path = |b: &[u8]| std::path::PathBuf::from(std::ffi::OsStr::from_bytes(b));
        let mk = |p: std::path::PathBuf| ArtifactRecord::new(p, ".", ArtifactKind::Binary);
        let input = vec![
            mk(path(b"/lib/\xff.so")),
            mk(path(b"/lib/\xfe.so")),
            mk(path(b"/lib/\xff.so")),
        ];

        let raw = dedupe(input.clone(), DedupPolicy::RawPath);
        assert_eq!(raw, input[..2].to_vec());
        let by_name = dedupe(input.clone(), DedupPolicy::NormalizedBasename);
        assert_eq!(by_name, input[..2].to_vec());
    }
}
