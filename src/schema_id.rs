//! Stable, collision-checked identifiers for shared schema definitions.

use crate::contract::TypeRef;
use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps a type to the id of its entry in `components.schemas`
pub type SchemaIdSelector = Arc<dyn Fn(&TypeRef) -> String + Send + Sync>;

/// Friendly id derived from the type's own name.
///
/// Generic arguments are flattened into the name: `Page<User>` becomes
/// `PageOfUser`, `Pair<A, B>` becomes `PairOfAAndB`.
pub fn default_schema_id(ty: &TypeRef) -> String {
    if ty.generic_args.is_empty() {
        return ty.name.clone();
    }
    let args: Vec<String> = ty.generic_args.iter().map(default_schema_id).collect();
    format!("{}Of{}", ty.name, args.join("And"))
}

/// Memoizes schema ids for one generation pass and rejects collisions.
pub struct SchemaIdManager {
    selector: SchemaIdSelector,
    ids: HashMap<TypeRef, String>,
    owners: HashMap<String, TypeRef>,
}

impl SchemaIdManager {
    pub fn new(selector: SchemaIdSelector) -> Self {
        Self {
            selector,
            ids: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Id for `ty`; the same type always yields the same id.
    ///
    /// Fails when the selector maps a second, distinct type onto an id that is
    /// already owned.
    pub fn id_for(&mut self, ty: &TypeRef) -> Result<String> {
        if let Some(id) = self.ids.get(ty) {
            return Ok(id.clone());
        }

        let id = (self.selector)(ty);
        if let Some(existing) = self.owners.get(&id) {
            return Err(Error::SchemaIdCollision {
                schema_id: id,
                existing: existing.to_string(),
                conflicting: ty.to_string(),
            });
        }

        debug!("Assigned schema id {} to {}", id, ty);
        self.owners.insert(id.clone(), ty.clone());
        self.ids.insert(ty.clone(), id.clone());
        Ok(id)
    }
}
