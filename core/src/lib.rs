pub mod error;
pub mod graph;
pub mod model;
pub mod normalize;
pub mod popularity;
pub mod recommend;
pub mod snapshot;
pub mod tree;

pub use error::RecError;
pub use graph::CooccurrenceGraph;
pub use model::{Catalog, Game, ItemId, Ownership, RatingIndex, UserId};
pub use popularity::{PopularityRow, PopularityTable};
pub use tree::{GenreTree, NodeIdx, TreeNode};
pub use snapshot::Snapshot;
