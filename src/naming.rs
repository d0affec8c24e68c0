//! # Run-Scoped Resource Naming
//!
//! Every resource a pipeline run provisions carries one shared
//! timestamp-derived suffix, so concurrent runs never collide on names. Job
//! names additionally carry a zero-padded shard index whose width is derived
//! from the requested shard count, so a sorted job listing matches submission
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Second-resolution suffix shared by every name in one run.
pub fn timestamp_suffix(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// The full set of names one orchestrator run derives up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunNames {
    pub repository: String,
    pub role: String,
    pub job_spec: String,
    pub queue: String,
    /// Immutable base; the fan-out appends the padded shard index directly.
    pub job_name_base: String,
}

impl RunNames {
    /// Derive all names from a base string and the run timestamp. Repository
    /// names are lowercased to satisfy registry naming rules.
    pub fn derive(name_base: &str, now: DateTime<Utc>) -> Self {
        let suffix = timestamp_suffix(now);
        Self {
            repository: format!("{name_base}-repo-{suffix}").to_lowercase(),
            role: format!("{name_base}-job-role-{suffix}"),
            job_spec: format!("{name_base}-job-def-{suffix}"),
            queue: format!("{name_base}-job-queue-{suffix}"),
            job_name_base: format!("{name_base}-job-{suffix}-"),
        }
    }
}

/// Width of the zero-padded index suffix for a fan-out of `count` shards:
/// the decimal digit count of `count` itself, so `count = 10` pads to two
/// digits (`00..09`) and `count = 100` to three (`000..099`).
pub fn index_width(count: u32) -> usize {
    let mut width = 1;
    let mut rest = count / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}

/// Job name for one shard, derived fresh from the immutable base.
pub fn shard_job_name(job_name_base: &str, index: u32, width: usize) -> String {
    format!("{job_name_base}{index:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_timestamp_suffix_format() {
        assert_eq!(timestamp_suffix(fixed_now()), "20260314-150926");
    }

    #[test]
    fn test_all_run_names_share_one_suffix() {
        let names = RunNames::derive("ShardRun", fixed_now());
        for name in [&names.role, &names.job_spec, &names.queue, &names.job_name_base] {
            assert!(name.contains("20260314-150926"), "{name}");
        }
        // Repository name is lowercased but keeps the suffix.
        assert_eq!(names.repository, "shardrun-repo-20260314-150926");
    }

    #[test]
    fn test_index_width_matches_digit_count() {
        assert_eq!(index_width(1), 1);
        assert_eq!(index_width(9), 1);
        assert_eq!(index_width(10), 2);
        assert_eq!(index_width(99), 2);
        assert_eq!(index_width(100), 3);
    }

    #[test]
    fn test_shard_job_name_padding() {
        assert_eq!(shard_job_name("run-x", 0, 1), "run-x0");
        assert_eq!(shard_job_name("run-x", 7, 2), "run-x07");
        assert_eq!(shard_job_name("run-x", 7, 3), "run-x007");
    }

    proptest! {
        #[test]
        fn prop_index_width_covers_every_index(count in 1u32..100_000) {
            let width = index_width(count);
            // Every index in [0, count) fits the width without truncation,
            // and the largest index uses the full width.
            let largest = shard_job_name("", count - 1, width);
            prop_assert_eq!(largest.len(), width);
            prop_assert_eq!(shard_job_name("", 0, width).len(), width);
        }
    }
}
