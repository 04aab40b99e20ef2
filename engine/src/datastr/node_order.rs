use crate::datastr::graph::NodeId;
use crate::io::*;
use crate::{Result, RoutingError};

pub type Rank = NodeId;

/// A node order which allows efficiently retrieving both the rank of a node
/// and the node for a given rank. Mostly useful, because this type makes it always clear
/// in which direction the mapping goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOrder {
    // NodeIds ordered by their ranks - that is ascending in importance
    node_order: Vec<NodeId>,
    // The rank of each node - 0 is the lowest importance, n-1 the highest
    ranks: Vec<Rank>,
}

impl NodeOrder {
    /// Create a `NodeOrder` where the id is equal to the rank
    pub fn identity(n: usize) -> NodeOrder {
        NodeOrder {
            node_order: (0..n as NodeId).collect(),
            ranks: (0..n as NodeId).collect(),
        }
    }

    /// Create a `NodeOrder` from the node ids ordered by their rank.
    /// Fails unless `node_order` is a permutation of `0..node_order.len()`.
    pub fn from_node_order(node_order: Vec<NodeId>) -> Result<NodeOrder> {
        let ranks = invert_permutation(&node_order)?;
        Ok(NodeOrder { node_order, ranks })
    }

    /// Create a `NodeOrder` from a rank vector, that is a vector where `ranks[id]` contains the rank for node `id`
    pub fn from_ranks(ranks: Vec<Rank>) -> Result<NodeOrder> {
        let node_order = invert_permutation(&ranks)?;
        Ok(NodeOrder { node_order, ranks })
    }

    /// Get node order (rank -> node) as a slice
    pub fn order(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Get node ranks (node -> rank) as a slice
    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn rank(&self, node: NodeId) -> Rank {
        self.ranks[node as usize]
    }

    pub fn node(&self, rank: Rank) -> NodeId {
        self.node_order[rank as usize]
    }

    pub fn len(&self) -> usize {
        self.node_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invert_permutation(permutation: &[NodeId]) -> Result<Vec<NodeId>> {
    let n = permutation.len();
    if n >= NodeId::MAX as usize {
        return Err(RoutingError::MalformedGraph(format!("{} nodes do not fit into node ids", n)));
    }
    let mut inverse = vec![n as NodeId; n];
    for (i, &x) in permutation.iter().enumerate() {
        match inverse.get_mut(x as usize) {
            Some(slot) if *slot == n as NodeId => *slot = i as NodeId,
            _ => return Err(RoutingError::MalformedGraph(format!("node order is not a permutation, {} is invalid or repeated", x))),
        }
    }
    Ok(inverse)
}

impl Deconstruct for NodeOrder {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("ranks", &self.ranks)
    }
}

impl Reconstruct for NodeOrder {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let ranks = loader.load("ranks")?;
        Self::from_ranks(ranks).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_ranks_are_inverse() {
        let order = NodeOrder::from_node_order(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(order.ranks(), &[1, 3, 0, 2]);
        for rank in 0..4 {
            assert_eq!(order.rank(order.node(rank)), rank);
        }
        assert_eq!(NodeOrder::from_ranks(order.ranks().to_vec()).unwrap(), order);
    }

    #[test]
    fn non_permutations_are_rejected() {
        assert!(NodeOrder::from_node_order(vec![0, 0, 1]).is_err());
        assert!(NodeOrder::from_ranks(vec![0, 5]).is_err());
    }
}
