#![warn(missing_docs)]

//! Geometry and physics engines for game asset pipelines.
//!
//! rigkit turns authored scene data into the derived records a game
//! runtime consumes: collision bounds with mass properties, shrunk
//! collision meshes, fragment physics LODs, and retargeted animation
//! curves. Each engine lives in its own crate; this facade re-exports
//! them under one roof.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rigkit::bounds::{build_bound, BuildContext, Shape, ShapeNode};
//! use rigkit::math::{CollectSink, Vec3};
//!
//! let node = ShapeNode::with_material(
//!     "crate",
//!     Shape::Box {
//!         min: Vec3::new(-1.0, -1.0, -1.0),
//!         max: Vec3::new(1.0, 1.0, 1.0),
//!     },
//!     0,
//! );
//! let ctx = BuildContext::single_collision("concrete");
//! let mut sink = CollectSink::default();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let bound = build_bound(&node, &ctx, &mut sink, &mut rng).unwrap();
//! assert!((bound.volume - 8.0).abs() < 1e-9);
//! ```

pub use rigkit_anim as anim;
pub use rigkit_bounds as bounds;
pub use rigkit_frag as frag;
pub use rigkit_math as math;
pub use rigkit_mesh as mesh;
pub use rigkit_shrink as shrink;
pub use rigkit_skeleton as skeleton;
