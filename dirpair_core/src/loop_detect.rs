use crate::node::ComparisonNode;
use dirpair_common::Side;

/// Whether `side` of `node` is the same directory as that side of one of
/// its ancestors.
///
/// Sides without a known identity never match.
pub fn is_ancestor_loop(node: &ComparisonNode<'_>, side: Side) -> bool {
    let Some(stat) = node.side(side).stat.as_ref() else {
        return false;
    };

    node.ancestors().any(|ancestor| {
        ancestor
            .side(side)
            .stat
            .as_ref()
            .map_or(false, |other| other.same_file(stat))
    })
}
