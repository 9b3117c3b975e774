//! Agent node kinds.

use super::{ProvType, AGENT, LONG};

prov_types! {
    USER = ProvType::node_subtype(AGENT, 2) => "user";
    GROUP = ProvType::node_subtype(AGENT, 3) => "group";
    /// The machine the capture runs on.
    MACHINE = ProvType::node_subtype(AGENT | LONG, 4) => "machine";
    AGENT_DISCLOSED = ProvType::node_subtype(AGENT | LONG, 5) => "agent_disclosed";
}
