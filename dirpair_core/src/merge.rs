use crate::compare::bytewise;
use crate::comparer::DirComparer;
use crate::diagnostics::Diagnostic;
use crate::listing::DirListing;
use crate::loop_detect::is_ancestor_loop;
use crate::node::ComparisonNode;
use dirpair_common::{Side, Status};
use std::cmp::Ordering;
use std::ffi::OsStr;
use tracing::debug;

/// One unit of merge output: a name on one side matched with a name, or
/// nothing, on the other. Never both absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing<'a> {
    pub left: Option<&'a OsStr>,
    pub right: Option<&'a OsStr>,
}

impl<'a> Pairing<'a> {
    pub fn get(&self, side: Side) -> Option<&'a OsStr> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// The side holding the only name, for one-sided pairings
    pub fn only_side(&self) -> Option<Side> {
        match (self.left, self.right) {
            (Some(_), None) => Some(Side::Left),
            (None, Some(_)) => Some(Side::Right),
            _ => None,
        }
    }

    /// Some name of the pairing, the left one when both are present
    pub fn name(&self) -> &'a OsStr {
        self.left.or(self.right).unwrap_or_default()
    }
}

impl DirComparer {
    /// Compare the two directories of `node`, calling `handler` once per
    /// pairing in merge order.
    ///
    /// Returns the worst status the handler returned, or
    /// [`Status::Trouble`] if a directory loop was found or either side
    /// could not be read; no pairings are produced in those cases. A side
    /// marked nonexistent reads as empty.
    pub fn merge<F>(&mut self, node: &mut ComparisonNode<'_>, handler: F) -> Status
    where
        F: FnMut(&mut DirComparer, &ComparisonNode<'_>, Pairing<'_>) -> Status,
    {
        let loops = |side: Side| node.side(side).is_nonexistent() || is_ancestor_loop(node, side);
        if loops(Side::Left) && loops(Side::Right) {
            let reported = if node.side(Side::Left).is_nonexistent() {
                Side::Right
            } else {
                Side::Left
            };
            self.sink.report(Diagnostic::RecursiveLoop {
                path: node.side(reported).path.clone(),
            });
            return Status::Trouble;
        }

        let start = if node.is_root() {
            self.options.starting_file.clone()
        } else {
            None
        };

        let mut listings: [Option<DirListing>; 2] = [None, None];
        for side in Side::BOTH {
            match self.read_dir(node.side_mut(side), start.as_deref(), false) {
                Ok(listing) => listings[side.index()] = Some(listing),
                Err(err) => {
                    self.sink.report(Diagnostic::ReadFailed {
                        path: err.path().to_path_buf(),
                        reason: err.io_error().to_string(),
                    });
                }
            }
        }

        match listings {
            [Some(left), Some(right)] => self.merge_listings(node, left, right, handler),
            _ => Status::Trouble,
        }
    }

    /// Merge two listings read for `node`.
    pub(crate) fn merge_listings<F>(
        &mut self,
        node: &ComparisonNode<'_>,
        mut left: DirListing,
        mut right: DirListing,
        mut handler: F,
    ) -> Status
    where
        F: FnMut(&mut DirComparer, &ComparisonNode<'_>, Pairing<'_>) -> Status,
    {
        for listing in [&mut left, &mut right] {
            if listing.sorted_under() != Some(self.order.mode()) {
                listing.sort_from(0, &mut self.order);
            }
        }
        // Sorting the second listing may have dropped the run to byte order.
        if left.sorted_under() != Some(self.order.mode()) {
            left.sort_from(0, &mut self.order);
        }

        let mut status = Status::Same;
        let (mut i, mut j) = (0, 0);

        while i < left.len() || j < right.len() {
            let mode = self.order.mode();

            let order = if i == left.len() {
                Ordering::Greater
            } else if j == right.len() {
                Ordering::Less
            } else {
                self.order.compare(left.name(i), right.name(j))
            };

            if order == Ordering::Equal && self.order.ignore_case() {
                self.prefer_exact_match(&mut left, i, &mut right, j);
            }

            if self.order.mode() != mode {
                debug!("Name ordering changed mid-merge; re-sorting remaining entries");
                left.sort_from(i, &mut self.order);
                right.sort_from(j, &mut self.order);
                continue;
            }

            let pairing = Pairing {
                left: (order != Ordering::Greater).then(|| left.name(i)),
                right: (order != Ordering::Less).then(|| right.name(j)),
            };
            status.absorb(handler(self, node, pairing));

            if order != Ordering::Greater {
                i += 1;
            }
            if order != Ordering::Less {
                j += 1;
            }
        }

        status
    }

    /// Names at `left[i]` and `right[j]` match case-insensitively but maybe
    /// not byte for byte. Look through the run of case-insensitive matches
    /// on the side whose name sorts first; if it holds an exact match for
    /// the other side's name, move that match into the current position.
    fn prefer_exact_match(&mut self, left: &mut DirListing, i: usize, right: &mut DirListing, j: usize) {
        match bytewise(left.name(i), right.name(j)) {
            Ordering::Equal => {}
            Ordering::Less => self.pull_exact_match(left, i, right.name(j)),
            Ordering::Greater => self.pull_exact_match(right, j, left.name(i)),
        }
    }

    fn pull_exact_match(&mut self, lesser: &mut DirListing, at: usize, greater: &OsStr) {
        let mut p = at + 1;
        while let Some(candidate) = lesser.get(p) {
            if self.order.compare(candidate, greater) != Ordering::Equal {
                break;
            }
            match bytewise(candidate, greater) {
                Ordering::Less => p += 1,
                Ordering::Equal => {
                    lesser.rotate_to(at, p);
                    break;
                }
                Ordering::Greater => break,
            }
        }
    }
}
