use tracing::{debug, warn};

use crate::mapping::{ForwardTable, ReverseEntry, ReverseTable};

/// Inverts a forward table in one pass, in forward enumeration order.
///
/// When two knowledge-base IDs share an OMIM number the later forward entry
/// owns the reverse slot.
pub fn build_reverse(forward: &ForwardTable) -> ReverseTable {
    let mut reverse = ReverseTable::with_capacity(forward.len());
    let mut collisions = 0usize;

    for (kb_id, entry) in forward.iter() {
        let replaced = reverse.insert(
            entry.external_id.clone(),
            ReverseEntry {
                knowledge_base_id: kb_id.clone(),
                name: entry.name.clone(),
                category: entry.category,
            },
        );
        if let Some(previous) = replaced {
            collisions += 1;
            debug!(
                omim = %entry.external_id,
                kept = %kb_id,
                dropped = %previous.knowledge_base_id,
                "OMIM number shared by several knowledge-base IDs"
            );
        }
    }

    if collisions > 0 {
        warn!(
            collisions,
            "Reverse table kept the last knowledge-base ID for shared OMIM numbers"
        );
    }
    reverse
}
