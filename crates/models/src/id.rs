use uuid::Uuid;

/// Mints a new entity id: a short lowercase prefix naming the entity
/// class, joined to a hex-encoded v4 UUID.
///
/// Prefixes in use: `scn` (scene), `obj` (object), `pro` (project),
/// `acp` (action point), `act` (action), `ori` (orientation),
/// `joi` (joints), `lit` (logic item), `pps` (project parameter).
pub fn uid(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
