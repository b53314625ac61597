//! Pure domain rules: kind routing, section policy, layer ordering,
//! violation detection, index-level detection.

use crate::types::{IndexLevel, KddKind, Layer};
use serde_json::{Map, Value};

/// Wiki-link target prefixes that resolve to a specific kind. Any target
/// without one of these is treated as an entity reference.
pub const RESERVED_PREFIXES: &[(&str, KddKind)] = &[
    ("EVT-", KddKind::Event),
    ("BR-", KddKind::BusinessRule),
    ("BP-", KddKind::BusinessPolicy),
    ("XP-", KddKind::CrossPolicy),
    ("CMD-", KddKind::Command),
    ("QRY-", KddKind::Query),
    ("UC-", KddKind::UseCase),
    ("PROC-", KddKind::Process),
    ("REQ-", KddKind::Requirement),
    ("OBJ-", KddKind::Objective),
    ("ADR-", KddKind::Adr),
    ("PRD-", KddKind::Prd),
    ("UI-", KddKind::UiView),
];

/// Resolve the kind a wiki-link target refers to.
pub fn kind_for_target(target: &str) -> KddKind {
    RESERVED_PREFIXES
        .iter()
        .find(|(prefix, _)| target.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(KddKind::Entity)
}

/// True when the target carries one of the reserved typed prefixes.
pub fn is_typed_reference(target: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|(prefix, _)| target.starts_with(prefix))
}

/// Route a document to its kind from front-matter and source path.
///
/// Returns `(kind, warning)`. Absent front-matter or an unrecognized
/// `kind` field yields `(None, None)`. A recognized kind in an unexpected
/// location yields the kind plus a warning naming both paths.
pub fn route_kind(
    front_matter: Option<&Map<String, Value>>,
    source_path: &str,
) -> (Option<KddKind>, Option<String>) {
    let Some(front_matter) = front_matter else {
        return (None, None);
    };
    let Some(raw) = front_matter.get("kind").and_then(Value::as_str) else {
        return (None, None);
    };
    let Some(kind) = KddKind::parse(raw) else {
        return (None, None);
    };

    let expected = kind.expected_path();
    if source_path.contains(expected) {
        (Some(kind), None)
    } else {
        let warning = format!(
            "{} '{}' found outside expected path '{}'",
            kind.as_str(),
            source_path,
            expected
        );
        (Some(kind), Some(warning))
    }
}

/// Detect the layer of a source path; `None` when no numeric prefix
/// component matches.
pub fn layer_for_path(path: &str) -> Option<Layer> {
    Layer::from_path(path)
}

/// A cross-layer edge violates the architecture iff it originates outside
/// the requirements layer and points at a strictly higher layer. Unknown
/// destination layers never violate.
pub fn is_layer_violation(origin: Layer, destination: Option<Layer>) -> bool {
    match destination {
        Some(dest) => origin != Layer::Requirements && origin.rank() < dest.rank(),
        None => false,
    }
}

/// Capability tier available at indexing time.
///
/// L3 requires an agent API on top of the encoder and is never
/// auto-detected by the container.
pub fn detect_index_level(encoder_available: bool, agent_api_available: bool) -> IndexLevel {
    match (encoder_available, agent_api_available) {
        (true, true) => IndexLevel::L3,
        (true, false) => IndexLevel::L2,
        _ => IndexLevel::L1,
    }
}

/// Recognized section fields per kind: `(canonical field key, heading
/// synonyms)`. Synonyms are lower-case; English and Spanish spellings are
/// accepted equivalently.
pub fn section_fields(kind: KddKind) -> &'static [(&'static str, &'static [&'static str])] {
    match kind {
        KddKind::Entity => &[
            ("description", &["description", "descripción"]),
            ("attributes", &["attributes", "atributos"]),
            ("relations", &["relations", "relationships", "relaciones"]),
            (
                "invariants",
                &["invariants", "constraints", "invariantes", "restricciones"],
            ),
            (
                "lifecycle",
                &["lifecycle", "state machine", "ciclo de vida", "máquina de estados"],
            ),
            (
                "lifecycle_events",
                &["lifecycle events", "eventos del ciclo de vida"],
            ),
        ],
        KddKind::Event => &[
            ("description", &["description", "descripción"]),
            ("payload", &["payload"]),
            ("producer", &["producer", "productor"]),
            ("consumers", &["consumers", "consumidores"]),
        ],
        KddKind::BusinessRule => &[
            ("declaration", &["declaration", "declaración"]),
            ("when_applies", &["when applies", "cuándo aplica", "cuando aplica"]),
            ("why_it_exists", &["why it exists", "por qué existe", "por que existe"]),
            ("violation", &["violation", "violación"]),
            ("examples", &["examples", "ejemplos"]),
        ],
        KddKind::BusinessPolicy => &[
            ("declaration", &["declaration", "declaración"]),
            ("when_applies", &["when applies", "cuándo aplica", "cuando aplica"]),
            ("parameters", &["parameters", "parámetros"]),
            ("violation", &["violation", "violación"]),
        ],
        KddKind::CrossPolicy => &[
            ("purpose", &["purpose", "propósito"]),
            ("declaration", &["declaration", "declaración"]),
            (
                "ears_formalization",
                &["ears formalization", "formalización ears", "formalizacion ears"],
            ),
            (
                "standard_behavior",
                &["standard behavior", "comportamiento estándar", "comportamiento estandar"],
            ),
        ],
        KddKind::Command => &[
            ("purpose", &["purpose", "propósito"]),
            ("input", &["input", "entrada"]),
            ("preconditions", &["preconditions", "precondiciones"]),
            ("postconditions", &["postconditions", "postcondiciones"]),
            ("possible_errors", &["possible errors", "errores posibles"]),
        ],
        KddKind::Query => &[
            ("purpose", &["purpose", "propósito"]),
            ("input", &["input", "entrada"]),
            ("output", &["output", "salida"]),
            ("possible_errors", &["possible errors", "errores posibles"]),
        ],
        KddKind::Process => &[
            ("participants", &["participants", "participantes"]),
            ("steps", &["steps", "pasos"]),
            ("diagram", &["diagram", "diagrama"]),
        ],
        KddKind::UseCase => &[
            ("description", &["description", "descripción"]),
            ("actors", &["actors", "actores"]),
            ("preconditions", &["preconditions", "precondiciones"]),
            ("main_flow", &["main flow", "flujo principal"]),
            ("alternative_flows", &["alternative flows", "flujos alternativos"]),
            ("exceptions", &["exceptions", "excepciones"]),
            ("postconditions", &["postconditions", "postcondiciones"]),
            ("applied_rules", &["applied rules", "reglas aplicadas"]),
            ("commands_executed", &["commands executed", "comandos ejecutados"]),
        ],
        KddKind::UiView => &[
            ("description", &["description", "descripción"]),
            ("layout", &["layout", "diseño"]),
            ("components", &["components", "componentes"]),
            ("states", &["states", "estados"]),
            ("behavior", &["behavior", "comportamiento"]),
        ],
        KddKind::UiComponent => &[
            ("description", &["description", "descripción"]),
            ("entities", &["entities", "entidades"]),
            ("use_cases", &["use cases", "casos de uso"]),
        ],
        KddKind::Requirement => &[
            ("description", &["description", "descripción"]),
            (
                "acceptance_criteria",
                &["acceptance criteria", "criterios de aceptación", "criterios de aceptacion"],
            ),
            ("traceability", &["traceability", "trazabilidad"]),
        ],
        KddKind::Objective => &[
            ("actor", &["actor"]),
            ("objective", &["objective", "objetivo"]),
            (
                "success_criteria",
                &["success criteria", "criterios de éxito", "criterios de exito"],
            ),
        ],
        KddKind::Prd => &[
            (
                "problem",
                &["problem", "opportunity", "problem/opportunity", "problema", "oportunidad"],
            ),
            ("scope", &["scope", "alcance"]),
            ("users", &["users", "usuarios"]),
            (
                "success_metrics",
                &["success metrics", "métricas de éxito", "metricas de exito"],
            ),
            ("dependencies", &["dependencies", "dependencias"]),
        ],
        KddKind::Adr => &[
            ("context", &["context", "contexto"]),
            ("decision", &["decision", "decisión"]),
            ("consequences", &["consequences", "consecuencias"]),
        ],
        KddKind::Glossary => &[
            ("definition", &["definition", "definición"]),
            ("context", &["context", "contexto"]),
            (
                "related_terms",
                &["related terms", "términos relacionados", "terminos relacionados"],
            ),
        ],
    }
}

/// Heading names whose section bodies are eligible for embedding, stored
/// lower-case for case-insensitive comparison. Kinds with an empty set
/// (event) produce no embeddings.
pub fn embeddable_sections(kind: KddKind) -> Vec<&'static str> {
    if kind == KddKind::Event {
        return Vec::new();
    }
    section_fields(kind)
        .iter()
        .flat_map(|(_, synonyms)| synonyms.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fm(kind: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("kind".into(), json!(kind));
        map
    }

    #[test]
    fn routes_well_placed_entity() {
        let front = fm("entity");
        let (kind, warning) =
            route_kind(Some(&front), "specs/01-domain/entities/KDDDocument.md");
        assert_eq!(kind, Some(KddKind::Entity));
        assert!(warning.is_none());
    }

    #[test]
    fn routes_misplaced_entity_with_warning() {
        let front = fm("entity");
        let (kind, warning) = route_kind(Some(&front), "specs/02-behavior/Stray.md");
        assert_eq!(kind, Some(KddKind::Entity));
        assert_eq!(
            warning.as_deref(),
            Some("entity 'specs/02-behavior/Stray.md' found outside expected path '01-domain/entities/'")
        );
    }

    #[test]
    fn routes_nothing_without_front_matter() {
        assert_eq!(route_kind(None, "specs/01-domain/entities/X.md"), (None, None));
    }

    #[test]
    fn routes_nothing_for_unknown_kind() {
        let front = fm("widget");
        assert_eq!(route_kind(Some(&front), "specs/01-domain/X.md"), (None, None));
    }

    #[test]
    fn kind_field_is_case_insensitive() {
        let front = fm("  Use-Case ");
        let (kind, _) = route_kind(Some(&front), "specs/02-behavior/use-cases/UC-001.md");
        assert_eq!(kind, Some(KddKind::UseCase));
    }

    #[test]
    fn violation_requires_upward_cross_layer() {
        // domain → behavior violates
        assert!(is_layer_violation(Layer::Domain, Some(Layer::Behavior)));
        // behavior → domain does not
        assert!(!is_layer_violation(Layer::Behavior, Some(Layer::Domain)));
        // requirements layer is exempt
        assert!(!is_layer_violation(Layer::Requirements, Some(Layer::Experience)));
        // unknown destination never violates
        assert!(!is_layer_violation(Layer::Domain, None));
        // same layer is fine
        assert!(!is_layer_violation(Layer::Domain, Some(Layer::Domain)));
    }

    #[test]
    fn typed_targets_resolve_by_prefix() {
        assert_eq!(kind_for_target("EVT-012"), KddKind::Event);
        assert_eq!(kind_for_target("UC-001"), KddKind::UseCase);
        assert_eq!(kind_for_target("XP-003"), KddKind::CrossPolicy);
        assert_eq!(kind_for_target("Pedido"), KddKind::Entity);
        assert!(is_typed_reference("CMD-007"));
        assert!(!is_typed_reference("Customer"));
    }

    #[test]
    fn index_level_detection() {
        assert_eq!(detect_index_level(false, false), IndexLevel::L1);
        assert_eq!(detect_index_level(true, false), IndexLevel::L2);
        assert_eq!(detect_index_level(true, true), IndexLevel::L3);
        assert_eq!(detect_index_level(false, true), IndexLevel::L1);
    }

    #[test]
    fn event_kind_has_no_embeddable_sections() {
        assert!(embeddable_sections(KddKind::Event).is_empty());
        assert!(embeddable_sections(KddKind::Entity).contains(&"description"));
        assert!(embeddable_sections(KddKind::Entity).contains(&"descripción"));
    }
}
