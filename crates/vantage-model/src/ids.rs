//! Content-addressed ids for derived records (versioned).
//!
//! Derived records (issues, pre-issues, introduction opportunities, action
//! candidates) are recomputed from raw facts on every run and are never
//! persisted, so downstream consumers deduplicate them across runs by id.
//! That only works if the id is a **deterministic function of stable business
//! fields** — never object identity, never an incrementing counter.
//!
//! We use a **simple, deterministic, non-cryptographic** digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: a framed `key=value;` encoding of the record's stable fields
//! - output: `"<prefix><16 lowercase hex digits>"`
//!
//! Notes:
//! - This digest is **not** a security primitive. It is a stability/identity
//!   tool: equal inputs must yield equal ids across runs and across hosts.
//! - Field framing (`key=` / `;` separators) keeps adjacent fields from
//!   colliding (`("ab","c")` vs `("a","bc")`).

/// Prefix used in serialized issue ids.
pub const ISSUE_ID_V1_PREFIX: &str = "issuefnv1a64:";

/// Prefix used in serialized pre-issue ids.
pub const PREISSUE_ID_V1_PREFIX: &str = "prefnv1a64:";

/// Prefix used in serialized introduction-opportunity ids.
pub const INTRO_ID_V1_PREFIX: &str = "introfnv1a64:";

/// Prefix used in serialized action ids.
pub const ACTION_ID_V1_PREFIX: &str = "actfnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn add(hash: &mut u64, s: &str) {
    for b in s.as_bytes() {
        *hash ^= (*b) as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Compute a v1 content id over `(key, value)` fields with the given prefix.
///
/// Properties:
/// - deterministic
/// - sensitive to field order (callers pass fields in declaration order, or
///   pre-sort when the source is an unordered set)
/// - non-cryptographic
pub fn content_id_v1(prefix: &str, fields: &[(&str, &str)]) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for (key, value) in fields {
        add(&mut hash, key);
        add(&mut hash, "=");
        add(&mut hash, value);
        add(&mut hash, ";");
    }
    format!("{prefix}{hash:016x}")
}

/// Stable id for an issue: hash of type + entity ref + per-type stable key.
///
/// The stable key distinguishes multiple issues of the same type on the same
/// entity (e.g. two stale deals on one company hash their deal ids).
pub fn issue_id_v1(
    issue_type: &str,
    entity_type: &str,
    entity_id: &str,
    stable_key: &str,
) -> String {
    content_id_v1(
        ISSUE_ID_V1_PREFIX,
        &[
            ("type", issue_type),
            ("entity_type", entity_type),
            ("entity_id", entity_id),
            ("key", stable_key),
        ],
    )
}

/// Stable id for a pre-issue (same framing as [`issue_id_v1`]).
pub fn preissue_id_v1(
    preissue_type: &str,
    entity_type: &str,
    entity_id: &str,
    stable_key: &str,
) -> String {
    content_id_v1(
        PREISSUE_ID_V1_PREFIX,
        &[
            ("type", preissue_type),
            ("entity_type", entity_type),
            ("entity_id", entity_id),
            ("key", stable_key),
        ],
    )
}

/// Stable id for an introduction opportunity: hash of the goal plus the full
/// person-id path (introducer first, target last).
pub fn intro_id_v1(goal_id: &str, path_person_ids: &[&str]) -> String {
    let path = path_person_ids.join(">");
    content_id_v1(INTRO_ID_V1_PREFIX, &[("goal", goal_id), ("path", &path)])
}

/// Stable id for an action candidate: hash of entity ref + resolution id +
/// **sorted** source keys.
///
/// Source keys are sorted so the id survives any reordering of the upstream
/// detector output.
pub fn action_id_v1(
    entity_type: &str,
    entity_id: &str,
    resolution_id: &str,
    source_keys: &[&str],
) -> String {
    let mut keys: Vec<&str> = source_keys.to_vec();
    keys.sort_unstable();
    let keys = keys.join(",");
    content_id_v1(
        ACTION_ID_V1_PREFIX,
        &[
            ("entity_type", entity_type),
            ("entity_id", entity_id),
            ("resolution", resolution_id),
            ("sources", &keys),
        ],
    )
}
