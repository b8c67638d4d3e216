use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{PointDistance, RTree};

use crate::{Bounds, Pt2D};

/// A spatial index over the bounding boxes of arbitrary objects. Callers get candidates in
/// increasing order of bounding-box distance and do the exact distance check themselves.
pub struct FindClosest<K> {
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, K>>,
}

impl<K> FindClosest<K>
where
    K: Clone,
{
    pub fn new() -> FindClosest<K> {
        FindClosest { tree: RTree::new() }
    }

    /// Empty bounds are ignored.
    pub fn add(&mut self, key: K, bounds: &Bounds) {
        if bounds.is_empty() {
            return;
        }
        self.tree.insert(GeomWithData::new(
            Rectangle::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]),
            key,
        ));
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Every object, closest bounding box first, paired with the distance to that box. A point
    /// inside a box has distance 0.
    pub fn candidates(&self, query_pt: Pt2D) -> impl Iterator<Item = (K, f64)> + '_ {
        let pt = [query_pt.x(), query_pt.y()];
        self.tree
            .nearest_neighbor_iter(&pt)
            .map(move |obj| (obj.data.clone(), obj.geom().distance_2(&pt).sqrt()))
    }
}

impl<K: Clone> Default for FindClosest<K> {
    fn default() -> FindClosest<K> {
        FindClosest::new()
    }
}
