/// quorum returns the number of nodes that forms a majority of a cluster of `n` nodes.
pub fn quorum(n: usize) -> usize {
    n / 2 + 1
}
