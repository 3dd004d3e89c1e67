//! Parameter, input, result and partial-result bundles
//!
//! Bundles are small maps keyed by algorithm-declared ids. Each algorithm
//! crate declares its ids with [`bundle_ids!`](crate::bundle_ids).

mod ids;
mod input;
mod parameter;
mod partial;
mod result;

pub use ids::{AlgorithmId, BundleId, MethodId};
pub use input::InputBundle;
pub use parameter::{ParameterBundle, ParameterBundleBuilder, ParameterValue};
pub use partial::PartialResult;
pub use result::{ResultBundle, ResultLayout, ResultSlot};
