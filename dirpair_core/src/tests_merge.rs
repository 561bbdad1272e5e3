#[cfg(test)]
mod tests {
    use crate::compare::tests::FlakyCollator;
    use crate::compare::OrderingMode;
    use crate::comparer::{CompareOptions, DirComparer};
    use crate::diagnostics::{CollectingSink, Diagnostic};
    use crate::identity::{FileIdentity, FileKind, FileStat};
    use crate::listing::DirListing;
    use crate::node::{ComparisonNode, DirHandle, FileSide};
    use dirpair_common::Status;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    type Pair = (Option<String>, Option<String>);

    fn pair(left: Option<&str>, right: Option<&str>) -> Pair {
        (left.map(str::to_string), right.map(str::to_string))
    }

    fn options(ignore_case: bool) -> CompareOptions {
        CompareOptions {
            ignore_file_name_case: ignore_case,
            follow_symlinks: true,
            starting_file: None,
        }
    }

    fn merge_collect(comparer: &mut DirComparer, node: &mut ComparisonNode<'_>) -> (Status, Vec<Pair>) {
        let mut pairs = Vec::new();
        let status = comparer.merge(node, |_, _, pairing| {
            pairs.push((
                pairing.left.map(|n| n.to_string_lossy().into_owned()),
                pairing.right.map(|n| n.to_string_lossy().into_owned()),
            ));
            Status::Same
        });
        (status, pairs)
    }

    fn merge_names(comparer: &mut DirComparer, left: &[&str], right: &[&str]) -> Vec<Pair> {
        let node = ComparisonNode::root(FileSide::new("l"), FileSide::new("r"));
        let mut pairs = Vec::new();
        comparer.merge_listings(
            &node,
            DirListing::from_names(left),
            DirListing::from_names(right),
            |_, _, pairing| {
                pairs.push((
                    pairing.left.map(|n| n.to_string_lossy().into_owned()),
                    pairing.right.map(|n| n.to_string_lossy().into_owned()),
                ));
                Status::Same
            },
        );
        pairs
    }

    fn make_dir(root: &Path, name: &str, files: &[&str]) -> std::path::PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), file.as_bytes()).unwrap();
        }
        dir
    }

    fn fake_dir_stat(ino: u64) -> FileStat {
        FileStat {
            identity: FileIdentity::Inode { dev: 42, ino, special: None },
            kind: FileKind::Directory,
            len: 0,
        }
    }

    // ============================================================================
    // Pairing order and completeness
    // ============================================================================

    #[test]
    fn test_merge_pairs_common_and_one_sided_names() {
        let temp = TempDir::new().unwrap();
        let left = make_dir(temp.path(), "left", &["apple", "banana"]);
        let right = make_dir(temp.path(), "right", &["banana", "cherry"]);

        let mut comparer = DirComparer::new(options(false));
        let mut node = ComparisonNode::root(FileSide::new(left), FileSide::new(right));
        let (status, pairs) = merge_collect(&mut comparer, &mut node);

        assert_eq!(status, Status::Same);
        assert_eq!(
            pairs,
            vec![
                pair(Some("apple"), None),
                pair(Some("banana"), Some("banana")),
                pair(None, Some("cherry")),
            ]
        );
        assert_eq!(node.sides[0].handle, DirHandle::Opened);
        assert_eq!(node.sides[1].handle, DirHandle::Opened);
    }

    #[test]
    fn test_merge_against_nonexistent_side() {
        let temp = TempDir::new().unwrap();
        let right = make_dir(temp.path(), "right", &["x"]);

        let mut comparer = DirComparer::new(options(false));
        let mut node = ComparisonNode::root(
            FileSide::nonexistent(temp.path().join("left")),
            FileSide::new(right),
        );
        let (status, pairs) = merge_collect(&mut comparer, &mut node);

        assert_eq!(status, Status::Same);
        assert_eq!(pairs, vec![pair(None, Some("x"))]);
    }

    #[test]
    fn test_merge_emits_every_name_once_in_order() {
        let mut comparer = DirComparer::new(options(false));
        let left = ["m", "b", "z", "d", "a"];
        let right = ["c", "m", "a", "y", "e", "z"];
        let pairs = merge_names(&mut comparer, &left, &right);

        assert_eq!(
            pairs,
            vec![
                pair(Some("a"), Some("a")),
                pair(Some("b"), None),
                pair(None, Some("c")),
                pair(Some("d"), None),
                pair(None, Some("e")),
                pair(Some("m"), Some("m")),
                pair(None, Some("y")),
                pair(Some("z"), Some("z")),
            ]
        );

        let emitted_left: Vec<&String> = pairs.iter().filter_map(|(l, _)| l.as_ref()).collect();
        let emitted_right: Vec<&String> = pairs.iter().filter_map(|(_, r)| r.as_ref()).collect();
        assert_eq!(emitted_left.len(), left.len());
        assert_eq!(emitted_right.len(), right.len());
    }

    #[test]
    fn test_merge_of_two_empty_listings_calls_nothing() {
        let mut comparer = DirComparer::new(options(false));
        assert!(merge_names(&mut comparer, &[], &[]).is_empty());
    }

    #[test]
    fn test_case_sensitive_merge_keeps_case_variants_apart() {
        let mut comparer = DirComparer::new(options(false));
        let pairs = merge_names(&mut comparer, &["Makefile"], &["makefile"]);
        assert_eq!(pairs, vec![pair(Some("Makefile"), None), pair(None, Some("makefile"))]);
    }

    // ============================================================================
    // Case-insensitive pairing
    // ============================================================================

    #[test]
    fn test_case_insensitive_merge_pairs_case_variants() {
        let mut comparer = DirComparer::new(options(true));
        let pairs = merge_names(&mut comparer, &["Makefile", "src"], &["makefile", "SRC"]);
        assert_eq!(
            pairs,
            vec![pair(Some("Makefile"), Some("makefile")), pair(Some("src"), Some("SRC"))]
        );
    }

    #[test]
    fn test_case_insensitive_merge_prefers_exact_match_on_left() {
        let mut comparer = DirComparer::new(options(true));
        let pairs = merge_names(&mut comparer, &["a", "A"], &["a"]);
        assert_eq!(pairs, vec![pair(Some("a"), Some("a")), pair(Some("A"), None)]);
    }

    #[test]
    fn test_case_insensitive_merge_prefers_exact_match_on_right() {
        let mut comparer = DirComparer::new(options(true));
        let pairs = merge_names(&mut comparer, &["a"], &["a", "A"]);
        assert_eq!(pairs, vec![pair(Some("a"), Some("a")), pair(None, Some("A"))]);
    }

    #[test]
    fn test_case_insensitive_merge_exact_match_already_in_front() {
        let mut comparer = DirComparer::new(options(true));
        let pairs = merge_names(&mut comparer, &["A", "a"], &["A"]);
        assert_eq!(pairs, vec![pair(Some("A"), Some("A")), pair(Some("a"), None)]);
    }

    #[test]
    fn test_case_insensitive_merge_three_variants() {
        let mut comparer = DirComparer::new(options(true));
        let pairs = merge_names(&mut comparer, &["ab", "AB", "Ab"], &["aB", "ab"]);
        // Left sorts as AB, Ab, ab; right as aB, ab. No left name spells
        // "aB", so AB takes it; "ab" is then pulled ahead of "Ab".
        assert_eq!(
            pairs,
            vec![
                pair(Some("AB"), Some("aB")),
                pair(Some("ab"), Some("ab")),
                pair(Some("Ab"), None),
            ]
        );
    }

    // ============================================================================
    // Loop detection and read failures
    // ============================================================================

    #[test]
    fn test_merge_refuses_directory_loop() {
        let sink = CollectingSink::new();
        let mut comparer = DirComparer::new(options(false)).with_diagnostics(sink.clone());

        let root = ComparisonNode::root(
            FileSide::with_stat("left", fake_dir_stat(1)),
            FileSide::with_stat("right", fake_dir_stat(2)),
        );
        let mut child = root.child(
            FileSide::with_stat("left/again", fake_dir_stat(1)),
            FileSide::with_stat("right/again", fake_dir_stat(2)),
        );

        let (status, pairs) = merge_collect(&mut comparer, &mut child);

        assert_eq!(status, Status::Trouble);
        assert!(pairs.is_empty());
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::RecursiveLoop { path: "left/again".into() }]
        );
    }

    #[test]
    fn test_merge_continues_when_only_one_side_loops() {
        let temp = TempDir::new().unwrap();
        let left = make_dir(temp.path(), "left", &["f"]);
        let right = make_dir(temp.path(), "right", &["f"]);

        let mut comparer = DirComparer::new(options(false));
        let root = ComparisonNode::root(
            FileSide::with_stat(temp.path(), fake_dir_stat(1)),
            FileSide::with_stat(temp.path(), fake_dir_stat(2)),
        );
        let mut child = root.child(
            FileSide::with_stat(left, fake_dir_stat(1)),
            FileSide::with_stat(right, fake_dir_stat(3)),
        );

        let (status, pairs) = merge_collect(&mut comparer, &mut child);
        assert_eq!(status, Status::Same);
        assert_eq!(pairs, vec![pair(Some("f"), Some("f"))]);
    }

    #[test]
    fn test_merge_with_both_sides_nonexistent_is_trouble() {
        let sink = CollectingSink::new();
        let mut comparer = DirComparer::new(options(false)).with_diagnostics(sink.clone());
        let mut node = ComparisonNode::root(FileSide::nonexistent("a"), FileSide::nonexistent("b"));

        let (status, pairs) = merge_collect(&mut comparer, &mut node);
        assert_eq!(status, Status::Trouble);
        assert!(pairs.is_empty());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_read_failure_still_reads_other_side() {
        let temp = TempDir::new().unwrap();
        let right = make_dir(temp.path(), "right", &["x"]);

        let sink = CollectingSink::new();
        let mut comparer = DirComparer::new(options(false)).with_diagnostics(sink.clone());
        let mut node = ComparisonNode::root(
            FileSide::new(temp.path().join("missing")),
            FileSide::new(right),
        );

        let (status, pairs) = merge_collect(&mut comparer, &mut node);

        assert_eq!(status, Status::Trouble);
        assert!(pairs.is_empty());
        assert_eq!(node.sides[1].handle, DirHandle::Opened);
        match &sink.diagnostics()[..] {
            [Diagnostic::ReadFailed { path, .. }] => assert_eq!(path, &temp.path().join("missing")),
            other => panic!("unexpected diagnostics: {:?}", other),
        }
    }

    #[test]
    fn test_handler_statuses_fold_to_maximum() {
        let temp = TempDir::new().unwrap();
        let left = make_dir(temp.path(), "left", &["a", "b", "c"]);
        let right = make_dir(temp.path(), "right", &["a", "b", "c"]);

        let mut comparer = DirComparer::new(options(false));
        let mut node = ComparisonNode::root(FileSide::new(&left), FileSide::new(&right));
        let status = comparer.merge(&mut node, |_, _, pairing| {
            if pairing.name() == "b" {
                Status::Different
            } else {
                Status::Same
            }
        });
        assert_eq!(status, Status::Different);

        let mut node = ComparisonNode::root(FileSide::new(&left), FileSide::new(&right));
        let mut calls = 0;
        let status = comparer.merge(&mut node, |_, _, _| {
            calls += 1;
            if calls == 1 {
                Status::Trouble
            } else {
                Status::Different
            }
        });
        assert_eq!(status, Status::Trouble);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_starting_file_applies_at_root_only() {
        let temp = TempDir::new().unwrap();
        let left = make_dir(temp.path(), "left", &["a", "b", "c"]);
        let right = make_dir(temp.path(), "right", &["b", "d"]);

        let mut comparer = DirComparer::new(options(false)).with_starting_file("b");

        let mut root = ComparisonNode::root(FileSide::new(&left), FileSide::new(&right));
        let (_, pairs) = merge_collect(&mut comparer, &mut root);
        assert_eq!(
            pairs,
            vec![pair(Some("b"), Some("b")), pair(Some("c"), None), pair(None, Some("d"))]
        );

        let mut child = root.child(FileSide::new(&left), FileSide::new(&right));
        let (_, pairs) = merge_collect(&mut comparer, &mut child);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], pair(Some("a"), None));
    }

    // ============================================================================
    // Collation fallback
    // ============================================================================

    #[test]
    fn test_collation_failure_on_first_call_orders_run_bytewise() {
        let sink = CollectingSink::new();
        let mut comparer = DirComparer::new(options(true))
            .with_diagnostics(sink.clone())
            .with_collator(FlakyCollator::failing_on(1));

        let pairs = merge_names(&mut comparer, &["b", "A", "c"], &["a", "B"]);

        assert_eq!(
            pairs,
            vec![
                pair(Some("A"), None),
                pair(None, Some("B")),
                pair(None, Some("a")),
                pair(Some("b"), None),
                pair(Some("c"), None),
            ]
        );
        assert_eq!(comparer.ordering_mode(), OrderingMode::Bytewise);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_collation_failure_mid_merge_loses_nothing() {
        let sink = CollectingSink::new();
        // Four keys are computed while sorting; the fifth call is the first
        // comparison of the merge itself.
        let mut comparer = DirComparer::new(options(true))
            .with_diagnostics(sink.clone())
            .with_collator(FlakyCollator::failing_on(5));

        let pairs = merge_names(&mut comparer, &["c", "a"], &["b", "c"]);

        assert_eq!(
            pairs,
            vec![pair(Some("a"), None), pair(None, Some("b")), pair(Some("c"), Some("c"))]
        );
        assert_eq!(comparer.ordering_mode(), OrderingMode::Bytewise);
        assert!(matches!(
            &sink.diagnostics()[..],
            [Diagnostic::CollationFallback { other: Some(_), .. }]
        ));
    }

    #[test]
    fn test_listing_sorted_before_fallback_is_sorted_again() {
        let sink = CollectingSink::new();
        // Left sorts collated with calls 1-3, right fails on its first key.
        let mut comparer = DirComparer::new(options(true))
            .with_diagnostics(sink.clone())
            .with_collator(FlakyCollator::failing_on(4));

        let temp = TempDir::new().unwrap();
        let left = make_dir(temp.path(), "left", &["b", "C", "a"]);
        let right = make_dir(temp.path(), "right", &["c", "B"]);

        let mut node = ComparisonNode::root(FileSide::new(left), FileSide::new(right));
        let (status, pairs) = merge_collect(&mut comparer, &mut node);

        assert_eq!(status, Status::Same);
        assert_eq!(
            pairs,
            vec![
                pair(None, Some("B")),
                pair(Some("C"), None),
                pair(Some("a"), None),
                pair(Some("b"), None),
                pair(None, Some("c")),
            ]
        );
        assert_eq!(sink.len(), 1);
    }
}
