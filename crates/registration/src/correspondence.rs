use partscan_core::PointCloud;
use partscan_spatial::KdTree;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub source_index: usize,
    pub target_index: usize,
    pub distance: f64,
}

/// Pair every source point with its nearest point in the target cloud
/// (represented by its KdTree).
///
/// Queries run in parallel; the output keeps source order. Source points with
/// a non-finite coordinate get no correspondence.
pub fn find_correspondences(source: &PointCloud, target_tree: &KdTree) -> Vec<Correspondence> {
    (0..source.len())
        .into_par_iter()
        .filter_map(|i| {
            target_tree.nearest(&source.point(i)).map(|nn| Correspondence {
                source_index: i,
                target_index: nn.index,
                distance: nn.distance,
            })
        })
        .collect()
}

/// Mean correspondence distance, or 0.0 when there are none.
pub fn mean_distance(correspondences: &[Correspondence]) -> f64 {
    if correspondences.is_empty() {
        return 0.0;
    }
    correspondences.iter().map(|c| c.distance).sum::<f64>() / correspondences.len() as f64
}
