//! Tests for the cluster roster and partitioner together.
//!
//! # Test Strategy
//!
//! 1. **Roster files**: loading from disk, fatal errors on bad files
//! 2. **Partitioning**: every key lands in a valid range for any roster size
//! 3. **Determinism**: repeated computation gives identical ranges

use corelib::node::NodeId;
use corelib::partitioner::{ByteOrderedPartitioner, Partitioner};
use corelib::{Error, Key, Roster};
use proptest::prelude::*;
use std::io::Write;

// ============================================================================
// Roster File Tests
// ============================================================================

#[test]
fn test_load_roster_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "A 127.0.0.1 9001").unwrap();
    writeln!(file, "B 127.0.0.1 9002").unwrap();
    writeln!(file, "C 127.0.0.1 9003").unwrap();
    writeln!(file, "D 127.0.0.1 9004").unwrap();

    let roster = Roster::load(file.path()).unwrap();
    let names: Vec<&str> = roster.ids().map(NodeId::as_str).collect();
    assert_eq!(names, vec!["A", "B", "C", "D"], "file order must be preserved");
    assert!(roster.contains(&NodeId::from("C")));
    assert!(!roster.contains(&NodeId::from("E")));
}

#[test]
fn test_missing_roster_file_is_io_error() {
    let err = Roster::load("/definitely/not/here/roster.txt").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_empty_roster_file_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let err = Roster::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidRoster(_)));
}

// ============================================================================
// Partitioning Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_range_in_bounds(key in any::<u8>(), n in 1usize..=256) {
        let range = ByteOrderedPartitioner.range_of(Key(key), n);
        prop_assert!(range < n);
    }

    #[test]
    fn prop_range_is_monotonic(a in any::<u8>(), b in any::<u8>(), n in 1usize..=16) {
        let p = ByteOrderedPartitioner;
        if a <= b {
            prop_assert!(p.range_of(Key(a), n) <= p.range_of(Key(b), n));
        }
    }

    #[test]
    fn prop_range_is_deterministic(key in any::<u8>(), n in 1usize..=16) {
        let p = ByteOrderedPartitioner;
        prop_assert_eq!(p.range_of(Key(key), n), p.range_of(Key(key), n));
    }
}

#[test]
fn test_partitioner_name() {
    assert_eq!(ByteOrderedPartitioner.name(), "ByteOrderedPartitioner");
}
