use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type alias for node identifiers (`<kind>:<documentId>`).
pub type NodeId = String;

/// The 16 document kinds a specification repository can contain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum KddKind {
    Entity,
    Event,
    BusinessRule,
    BusinessPolicy,
    CrossPolicy,
    Command,
    Query,
    Process,
    UseCase,
    UiView,
    UiComponent,
    Requirement,
    Objective,
    Prd,
    Adr,
    Glossary,
}

impl KddKind {
    /// Canonical lower-case name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            KddKind::Entity => "entity",
            KddKind::Event => "event",
            KddKind::BusinessRule => "business-rule",
            KddKind::BusinessPolicy => "business-policy",
            KddKind::CrossPolicy => "cross-policy",
            KddKind::Command => "command",
            KddKind::Query => "query",
            KddKind::Process => "process",
            KddKind::UseCase => "use-case",
            KddKind::UiView => "ui-view",
            KddKind::UiComponent => "ui-component",
            KddKind::Requirement => "requirement",
            KddKind::Objective => "objective",
            KddKind::Prd => "prd",
            KddKind::Adr => "adr",
            KddKind::Glossary => "glossary",
        }
    }

    /// Parse a front-matter `kind` value. Input is lower-cased and trimmed
    /// before matching; anything outside the closed set returns None.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase();
        Self::all().iter().copied().find(|k| k.as_str() == normalized)
    }

    /// Every kind, in declaration order.
    pub fn all() -> &'static [KddKind] {
        &[
            KddKind::Entity,
            KddKind::Event,
            KddKind::BusinessRule,
            KddKind::BusinessPolicy,
            KddKind::CrossPolicy,
            KddKind::Command,
            KddKind::Query,
            KddKind::Process,
            KddKind::UseCase,
            KddKind::UiView,
            KddKind::UiComponent,
            KddKind::Requirement,
            KddKind::Objective,
            KddKind::Prd,
            KddKind::Adr,
            KddKind::Glossary,
        ]
    }

    /// The architectural layer this kind belongs to.
    pub fn layer(self) -> Layer {
        match self {
            KddKind::Requirement | KddKind::Objective | KddKind::Prd | KddKind::Adr => {
                Layer::Requirements
            }
            KddKind::Entity
            | KddKind::Event
            | KddKind::BusinessRule
            | KddKind::BusinessPolicy
            | KddKind::CrossPolicy
            | KddKind::Glossary => Layer::Domain,
            KddKind::Command | KddKind::Query | KddKind::Process | KddKind::UseCase => {
                Layer::Behavior
            }
            KddKind::UiView | KddKind::UiComponent => Layer::Experience,
        }
    }

    /// Source-path prefix where documents of this kind are expected to live.
    pub fn expected_path(self) -> &'static str {
        match self {
            KddKind::Requirement => "00-requirements/",
            KddKind::Objective => "00-requirements/objectives/",
            KddKind::Prd => "00-requirements/prd/",
            KddKind::Adr => "00-requirements/adr/",
            KddKind::Entity => "01-domain/entities/",
            KddKind::Event => "01-domain/events/",
            KddKind::BusinessRule => "01-domain/rules/",
            KddKind::BusinessPolicy => "01-domain/policies/",
            KddKind::CrossPolicy => "01-domain/cross-policies/",
            KddKind::Glossary => "01-domain/glossary/",
            KddKind::Command => "02-behavior/commands/",
            KddKind::Query => "02-behavior/queries/",
            KddKind::Process => "02-behavior/processes/",
            KddKind::UseCase => "02-behavior/use-cases/",
            KddKind::UiView => "03-experience/views/",
            KddKind::UiComponent => "03-experience/components/",
        }
    }

    /// Build the node ID for a document of this kind.
    pub fn node_id(self, document_id: &str) -> NodeId {
        format!("{}:{}", self.as_str(), document_id)
    }
}

impl std::fmt::Display for KddKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five architectural layers, totally ordered by `rank`.
///
/// The `requirements` layer is exempt from layer-violation checking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Requirements,
    Domain,
    Behavior,
    Experience,
    Verification,
}

impl Layer {
    pub fn rank(self) -> u8 {
        match self {
            Layer::Requirements => 0,
            Layer::Domain => 1,
            Layer::Behavior => 2,
            Layer::Experience => 3,
            Layer::Verification => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Requirements => "requirements",
            Layer::Domain => "domain",
            Layer::Behavior => "behavior",
            Layer::Experience => "experience",
            Layer::Verification => "verification",
        }
    }

    /// Directory marker carrying this layer's numeric prefix.
    pub fn path_marker(self) -> &'static str {
        match self {
            Layer::Requirements => "00-requirements",
            Layer::Domain => "01-domain",
            Layer::Behavior => "02-behavior",
            Layer::Experience => "03-experience",
            Layer::Verification => "04-verification",
        }
    }

    /// Resolve a layer from a source path by its first matching numeric
    /// prefix component (`01-domain/...` → Domain).
    pub fn from_path(path: &str) -> Option<Self> {
        for component in path.split(['/', '\\']) {
            for layer in [
                Layer::Requirements,
                Layer::Domain,
                Layer::Behavior,
                Layer::Experience,
                Layer::Verification,
            ] {
                if component.starts_with(layer.path_marker()) {
                    return Some(layer);
                }
            }
        }
        None
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 17 typed relations between nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    WikiLink,
    DomainRelation,
    EntityRule,
    EntityPolicy,
    Emits,
    Consumes,
    UcAppliesRule,
    UcExecutesCmd,
    UcStory,
    ViewTriggersUc,
    ViewUsesComponent,
    ComponentUsesEntity,
    ReqTracesTo,
    Validates,
    DecidesFor,
    CrossDomainRef,
    GlossaryDefines,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::WikiLink => "WIKI_LINK",
            EdgeType::DomainRelation => "DOMAIN_RELATION",
            EdgeType::EntityRule => "ENTITY_RULE",
            EdgeType::EntityPolicy => "ENTITY_POLICY",
            EdgeType::Emits => "EMITS",
            EdgeType::Consumes => "CONSUMES",
            EdgeType::UcAppliesRule => "UC_APPLIES_RULE",
            EdgeType::UcExecutesCmd => "UC_EXECUTES_CMD",
            EdgeType::UcStory => "UC_STORY",
            EdgeType::ViewTriggersUc => "VIEW_TRIGGERS_UC",
            EdgeType::ViewUsesComponent => "VIEW_USES_COMPONENT",
            EdgeType::ComponentUsesEntity => "COMPONENT_USES_ENTITY",
            EdgeType::ReqTracesTo => "REQ_TRACES_TO",
            EdgeType::Validates => "VALIDATES",
            EdgeType::DecidesFor => "DECIDES_FOR",
            EdgeType::CrossDomainRef => "CROSS_DOMAIN_REF",
            EdgeType::GlossaryDefines => "GLOSSARY_DEFINES",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        [
            EdgeType::WikiLink,
            EdgeType::DomainRelation,
            EdgeType::EntityRule,
            EdgeType::EntityPolicy,
            EdgeType::Emits,
            EdgeType::Consumes,
            EdgeType::UcAppliesRule,
            EdgeType::UcExecutesCmd,
            EdgeType::UcStory,
            EdgeType::ViewTriggersUc,
            EdgeType::ViewUsesComponent,
            EdgeType::ComponentUsesEntity,
            EdgeType::ReqTracesTo,
            EdgeType::Validates,
            EdgeType::DecidesFor,
            EdgeType::CrossDomainRef,
            EdgeType::GlossaryDefines,
        ]
        .into_iter()
        .find(|e| e.as_str() == normalized)
        .ok_or_else(|| format!("unknown edge type '{s}'"))
    }
}

/// A typed vertex of the knowledge graph representing one source document.
///
/// Immutable after extraction; replaced wholesale on reindexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Globally unique: `<kind>:<documentId>`. At most one node per ID
    /// across the whole index.
    pub id: NodeId,

    pub kind: KddKind,

    /// Path of the source document, relative to the repository root.
    pub source_path: String,

    /// SHA-256 hex of the full source bytes.
    pub source_hash: String,

    pub layer: Layer,

    /// Lifecycle status from front-matter; defaults to "draft".
    pub status: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Optional domain tag for multi-domain repositories.
    #[serde(default)]
    pub domain: Option<String>,

    /// Kind-specific indexed fields: section bodies keyed by canonical
    /// field name, plus `title` when front-matter carries one. Open
    /// mapping, carried through I/O as free JSON.
    #[serde(default)]
    pub indexed_fields: Map<String, Value>,

    pub indexed_at: DateTime<Utc>,
}

impl GraphNode {
    /// The document ID portion of the node ID.
    pub fn document_id(&self) -> &str {
        self.id.split_once(':').map(|(_, rest)| rest).unwrap_or(&self.id)
    }

    /// Front-matter title, when the extractor captured one.
    pub fn title(&self) -> Option<&str> {
        self.indexed_fields.get("title").and_then(Value::as_str)
    }
}

/// A typed directed relation between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub edge_type: EdgeType,

    /// Path of the document that produced this edge.
    pub source_path: String,

    /// How the edge was extracted ("wikilink", "relations_table", ...).
    pub extraction_method: String,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// True when the edge crosses layers upward from a non-requirements
    /// origin.
    pub layer_violation: bool,

    pub bidirectional: bool,
}

impl GraphEdge {
    /// Composite dedup key. Within one document no two edges share it.
    pub fn key(&self) -> String {
        format!("{}→{}:{}", self.from, self.to, self.edge_type)
    }
}

/// One heading-delimited slice of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,

    /// Heading depth, 1–6.
    pub level: u8,

    /// Verbatim text between this heading and the next, blank lines
    /// trimmed at both ends.
    pub body: String,

    /// Dotted chain of ancestor heading slugs, this heading last.
    pub path: String,
}

/// A parsed source document, ready for extraction and chunking.
#[derive(Debug, Clone)]
pub struct Document {
    pub document_id: String,
    pub source_path: String,
    pub source_hash: String,
    pub layer: Layer,
    pub front_matter: Map<String, Value>,
    pub sections: Vec<Section>,
    pub links: Vec<crate::parser::WikiLink>,
}

impl Document {
    pub fn title(&self) -> Option<&str> {
        self.front_matter.get("title").and_then(Value::as_str)
    }

    /// First section whose lowercased heading matches any of the names.
    pub fn section_by_names(&self, names: &[&str]) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| names.contains(&s.heading.trim().to_lowercase().as_str()))
    }
}

/// A sub-document text window used as encoder input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// `<documentId>:chunk-<index>`, monotonic within a document.
    pub id: String,

    pub document_id: String,

    /// Heading of the originating section.
    pub section: String,

    /// Raw chunk content.
    pub content: String,

    /// Identity preface followed by the raw content; this is what gets
    /// encoded.
    pub context: String,

    /// Character offset of the first paragraph within the section body.
    pub offset: usize,
}

/// A chunk's vector under a named model, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Equal to the chunk ID.
    pub id: String,

    pub document_id: String,
    pub kind: KddKind,
    pub section_path: String,
    pub chunk_index: usize,

    /// Raw chunk text.
    pub text: String,

    /// Context-prefixed text the vector was computed from.
    pub context_text: String,

    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,

    /// SHA-256 hex of the raw chunk text.
    pub text_hash: String,

    pub generated_at: DateTime<Utc>,
}

/// Capability tier of an index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexLevel {
    /// Graph only.
    L1,
    /// Graph + embeddings.
    L2,
    /// Graph + embeddings + enrichments.
    L3,
}

impl std::fmt::Display for IndexLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexLevel::L1 => f.write_str("L1"),
            IndexLevel::L2 => f.write_str("L2"),
            IndexLevel::L3 => f.write_str("L3"),
        }
    }
}

/// Aggregate counts recorded in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub nodes: usize,
    pub edges: usize,
    pub embeddings: usize,
    pub enrichments: usize,
}

/// Top-level descriptor of the index directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Artifact format version.
    pub version: String,

    /// Version of the indexer that produced the tree.
    pub kdd_version: String,

    #[serde(default)]
    pub embedding_model: Option<String>,

    #[serde(default)]
    pub dimensions: Option<usize>,

    pub indexed_at: DateTime<Utc>,
    pub indexed_by: String,

    /// Structure tag of the specs tree.
    pub structure: String,

    pub index_level: IndexLevel,
    pub stats: IndexStats,

    #[serde(default)]
    pub domains: Vec<String>,

    #[serde(default)]
    pub git_commit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serde_uses_kebab_case() {
        let json = serde_json::to_string(&KddKind::BusinessRule).unwrap();
        assert_eq!(json, "\"business-rule\"");
        let back: KddKind = serde_json::from_str("\"use-case\"").unwrap();
        assert_eq!(back, KddKind::UseCase);
    }

    #[test]
    fn kind_parse_normalizes() {
        assert_eq!(KddKind::parse("  Entity "), Some(KddKind::Entity));
        assert_eq!(KddKind::parse("USE-CASE"), Some(KddKind::UseCase));
        assert_eq!(KddKind::parse("widget"), None);
    }

    #[test]
    fn edge_type_serde_is_screaming_snake() {
        let json = serde_json::to_string(&EdgeType::UcAppliesRule).unwrap();
        assert_eq!(json, "\"UC_APPLIES_RULE\"");
        let back: EdgeType = serde_json::from_str("\"WIKI_LINK\"").unwrap();
        assert_eq!(back, EdgeType::WikiLink);
    }

    #[test]
    fn edge_type_from_str_accepts_loose_forms() {
        assert_eq!("wiki_link".parse::<EdgeType>().unwrap(), EdgeType::WikiLink);
        assert_eq!("uc-applies-rule".parse::<EdgeType>().unwrap(), EdgeType::UcAppliesRule);
        assert!("FRIENDS_WITH".parse::<EdgeType>().is_err());
    }

    #[test]
    fn layer_order_is_total() {
        assert!(Layer::Requirements.rank() < Layer::Domain.rank());
        assert!(Layer::Domain.rank() < Layer::Behavior.rank());
        assert!(Layer::Behavior.rank() < Layer::Experience.rank());
        assert!(Layer::Experience.rank() < Layer::Verification.rank());
    }

    #[test]
    fn layer_from_path_matches_first_component() {
        assert_eq!(
            Layer::from_path("specs/01-domain/entities/Order.md"),
            Some(Layer::Domain)
        );
        assert_eq!(
            Layer::from_path("specs/02-behavior/use-cases/UC-001.md"),
            Some(Layer::Behavior)
        );
        assert_eq!(Layer::from_path("specs/notes/scratch.md"), None);
    }

    #[test]
    fn node_id_and_document_id_round_trip() {
        let id = KddKind::Entity.node_id("Pedido");
        assert_eq!(id, "entity:Pedido");
        let node = GraphNode {
            id,
            kind: KddKind::Entity,
            source_path: "specs/01-domain/entities/Pedido.md".into(),
            source_hash: "0".repeat(64),
            layer: Layer::Domain,
            status: "draft".into(),
            aliases: vec![],
            domain: None,
            indexed_fields: Map::new(),
            indexed_at: Utc::now(),
        };
        assert_eq!(node.document_id(), "Pedido");
    }

    #[test]
    fn edge_key_is_composite() {
        let edge = GraphEdge {
            from: "entity:A".into(),
            to: "event:EVT-001".into(),
            edge_type: EdgeType::Emits,
            source_path: "specs/01-domain/entities/A.md".into(),
            extraction_method: "lifecycle_section".into(),
            metadata: Map::new(),
            layer_violation: false,
            bidirectional: false,
        };
        assert_eq!(edge.key(), "entity:A→event:EVT-001:EMITS");
    }
}
