//! Activity node kinds.

use super::{ProvType, ACTIVITY, LONG};

prov_types! {
    /// A running task.
    TASK = ProvType::node_subtype(ACTIVITY, 0) => "task";
    /// Activity disclosed from user space.
    ACTIVITY_DISCLOSED = ProvType::node_subtype(ACTIVITY | LONG, 1) => "activity_disclosed";
}
