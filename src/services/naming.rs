//! Name resolution for upload batches
//!
//! Decides, per uploaded file, the public base name its four renditions are
//! published under. Files are grouped by logical name with the extension
//! stripped; any group with more than one member gets a random disambiguation
//! suffix on every member, and a singleton gets one only when an unsuffixed
//! output identifier already exists in the store from an earlier batch.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::models::RenditionKind;
use crate::storage::OutputStore;

/// Length of the disambiguation token appended to colliding base names
pub const SUFFIX_LEN: usize = 5;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Base name assignment for one uploaded file
#[derive(Debug, Clone)]
pub struct ResolvedName {
    pub original_name: String,
    pub base_name: String,
    pub suffixed: bool,
}

/// Logical name with its trailing extension removed.
///
/// `a.jpg` and `a.png` share the grouping key `a` because they target the
/// same output base name. A name without an extension is its own key.
pub fn grouping_key(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect()
}

/// Returns true when any of the four unsuffixed output identifiers for
/// `base_name` is already present in the store.
async fn any_rendition_exists(store: &dyn OutputStore, base_name: &str) -> bool {
    for kind in RenditionKind::ALL {
        if store.exists(&kind.identifier(base_name)).await {
            return true;
        }
    }
    false
}

/// Resolve base output names for a batch of logical file names.
///
/// Preserves input order. The store is read once per singleton before any
/// rendition is written, so the collision check is consistent at resolution
/// time; a concurrent external writer racing for the same unsuffixed name is
/// an accepted risk. Freshly generated suffixes are kept unique within the
/// batch via a reservation set.
pub async fn resolve(names: &[String], store: &dyn OutputStore) -> Vec<ResolvedName> {
    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *group_sizes.entry(grouping_key(name)).or_insert(0) += 1;
    }

    let mut reserved: HashSet<String> = HashSet::new();
    let mut resolved = Vec::with_capacity(names.len());

    for name in names {
        let key = grouping_key(name);
        let in_batch_collision = group_sizes.get(key).copied().unwrap_or(0) > 1;
        let needs_suffix =
            in_batch_collision || any_rendition_exists(store, key).await;

        let base_name = if needs_suffix {
            // Regenerate on the rare intra-batch token collision
            loop {
                let candidate = format!("{}-{}", key, random_suffix());
                if reserved.insert(candidate.clone()) {
                    break candidate;
                }
            }
        } else {
            reserved.insert(key.to_string());
            key.to_string()
        };

        resolved.push(ResolvedName {
            original_name: name.clone(),
            base_name,
            suffixed: needs_suffix,
        });
    }

    resolved
}
