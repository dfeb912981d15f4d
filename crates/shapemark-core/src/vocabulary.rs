//! Vocabulary IRIs used across the workspace

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// SHACL vocabulary
pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";

    pub const NODE_SHAPE: &str = "http://www.w3.org/ns/shacl#NodeShape";
    pub const PROPERTY: &str = "http://www.w3.org/ns/shacl#property";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const INVERSE_PATH: &str = "http://www.w3.org/ns/shacl#inversePath";

    pub const TARGET_CLASS: &str = "http://www.w3.org/ns/shacl#targetClass";
    pub const TARGET_NODE: &str = "http://www.w3.org/ns/shacl#targetNode";
    pub const TARGET_SUBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetSubjectsOf";
    pub const TARGET_OBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetObjectsOf";

    pub const MIN_COUNT: &str = "http://www.w3.org/ns/shacl#minCount";
    pub const MAX_COUNT: &str = "http://www.w3.org/ns/shacl#maxCount";
    pub const DATATYPE: &str = "http://www.w3.org/ns/shacl#datatype";
    pub const NODE_KIND: &str = "http://www.w3.org/ns/shacl#nodeKind";
    pub const CLASS: &str = "http://www.w3.org/ns/shacl#class";
    pub const MIN_LENGTH: &str = "http://www.w3.org/ns/shacl#minLength";
    pub const MAX_LENGTH: &str = "http://www.w3.org/ns/shacl#maxLength";
    pub const PATTERN: &str = "http://www.w3.org/ns/shacl#pattern";
    pub const FLAGS: &str = "http://www.w3.org/ns/shacl#flags";
    pub const HAS_VALUE: &str = "http://www.w3.org/ns/shacl#hasValue";

    pub const SEVERITY: &str = "http://www.w3.org/ns/shacl#severity";
    pub const MESSAGE: &str = "http://www.w3.org/ns/shacl#message";
    pub const DEACTIVATED: &str = "http://www.w3.org/ns/shacl#deactivated";

    pub const VIOLATION: &str = "http://www.w3.org/ns/shacl#Violation";
    pub const WARNING: &str = "http://www.w3.org/ns/shacl#Warning";
    pub const INFO: &str = "http://www.w3.org/ns/shacl#Info";

    pub const IRI: &str = "http://www.w3.org/ns/shacl#IRI";
    pub const BLANK_NODE: &str = "http://www.w3.org/ns/shacl#BlankNode";
    pub const LITERAL: &str = "http://www.w3.org/ns/shacl#Literal";
    pub const BLANK_NODE_OR_IRI: &str = "http://www.w3.org/ns/shacl#BlankNodeOrIRI";
    pub const BLANK_NODE_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#BlankNodeOrLiteral";
    pub const IRI_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#IRIOrLiteral";

    pub const MIN_COUNT_COMPONENT: &str = "http://www.w3.org/ns/shacl#MinCountConstraintComponent";
    pub const MAX_COUNT_COMPONENT: &str = "http://www.w3.org/ns/shacl#MaxCountConstraintComponent";
    pub const DATATYPE_COMPONENT: &str = "http://www.w3.org/ns/shacl#DatatypeConstraintComponent";
    pub const NODE_KIND_COMPONENT: &str = "http://www.w3.org/ns/shacl#NodeKindConstraintComponent";
    pub const CLASS_COMPONENT: &str = "http://www.w3.org/ns/shacl#ClassConstraintComponent";
    pub const MIN_LENGTH_COMPONENT: &str = "http://www.w3.org/ns/shacl#MinLengthConstraintComponent";
    pub const MAX_LENGTH_COMPONENT: &str = "http://www.w3.org/ns/shacl#MaxLengthConstraintComponent";
    pub const PATTERN_COMPONENT: &str = "http://www.w3.org/ns/shacl#PatternConstraintComponent";
    pub const HAS_VALUE_COMPONENT: &str = "http://www.w3.org/ns/shacl#HasValueConstraintComponent";
}
