//! LIM attributes: the fixed set of node properties a formula can read
//!
//! Every attribute has a set of node kinds it applies to, and some carry an
//! enumerated value set (`accessibility`, `classKind`, ...). Structural
//! attributes (`type`, `returnType`, `class`, `parent`) navigate the graph.

use crate::error::EvalError;
use crate::model::{CodeGraph, Direction, EdgeKind, NodeId, NodeKind};
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Depth used by the `~=` type-similarity test
pub const DEPTH_TO_SEARCH_IN: u32 = 3;

/// Value reported for a metric that is not present on a node
pub const MISSING_METRIC: i64 = i16::MIN as i64;

/// Value reported when a structural lookup finds nothing
pub const NO_VALUE: &str = "-1";

/// Attribute of the language-independent model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimAttribute {
    ReturnType,
    IsAbstract,
    IsAnonymous,
    IsStatic,
    IsVirtual,
    ParameterSize,
    Accessibility,
    ClassKind,
    MethodKind,
    Id,
    Kind,
    Name,
    ParamKind,
    Type,
    SimpleTypeKind,
    PointerKind,
    Class,
    Parent,
}

const ACCESSIBILITY: &[&str] = &[
    "ackNone",
    "ackPublic",
    "ackProtected",
    "ackPrivate",
    "ackInternal",
    "ackProtectedInternal",
    "ackPackagePrivate",
    "ackInternalProtected",
];

const CLASS_KIND: &[&str] = &[
    "clkClass",
    "clkStruct",
    "clkUnion",
    "clkInterface",
    "clkEnum",
    "clkAnnotation",
    "clkDelegate",
    "clkProtocol",
    "clkExtension",
    "clkCategory",
];

const METHOD_KIND: &[&str] = &[
    "mekNormal",
    "mekConstructor",
    "mekDestructor",
    "mekOperator",
    "mekGet",
    "mekSet",
    "mekAdd",
    "mekRemove",
    "mekSubroutine",
    "mekMenu",
    "mekGeneratedDefaultConstructor",
    "mekGeneratedAnonymousClassConstructor",
];

const PARAM_KIND: &[&str] = &[
    "pmkIn",
    "pmkOut",
    "pmkInOut",
    "pmkNormal",
    "pmkVararg",
    "pmkKwarg",
    "pmkPosonlyarg",
    "pmkKwonlyarg",
];

const SIMPLE_TYPE_KIND: &[&str] = &[
    "stkUnknown",
    "stkVoid",
    "stkBoolean",
    "stkCharacter",
    "stkUnicode",
    "stkByte",
    "stkShort",
    "stkInteger",
    "stkLong",
    "stkFloat",
    "stkDouble",
    "stkString",
    "stkObject",
    "stkDecimal",
    "stkSingle",
    "stkImaginary",
    "stkUnsignedCharacter",
    "stkUnsignedShort",
    "stkUnsignedInteger",
    "stkUnsignedLong",
    "stkNone",
];

const POINTER_KIND: &[&str] = &[
    "ptkPointer",
    "ptkReference",
    "ptkVoid",
    "ptkShort",
    "ptkLong",
    "ptkInt",
    "ptkFloat",
    "ptkDouble",
    "ptkChar",
    "ptkByte",
    "ptkBoolean",
];

const BOOLEAN: &[&str] = &["true", "false"];

/// Attribute names plus every enumerated value
static LIM_NAMES: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut names = HashSet::new();
    for attribute in LimAttribute::ALL {
        names.insert(attribute.as_str().to_string());
        names.extend(attribute.values());
    }
    names
});

impl LimAttribute {
    pub const ALL: [LimAttribute; 18] = [
        LimAttribute::ReturnType,
        LimAttribute::IsAbstract,
        LimAttribute::IsAnonymous,
        LimAttribute::IsStatic,
        LimAttribute::IsVirtual,
        LimAttribute::ParameterSize,
        LimAttribute::Accessibility,
        LimAttribute::ClassKind,
        LimAttribute::MethodKind,
        LimAttribute::Id,
        LimAttribute::Kind,
        LimAttribute::Name,
        LimAttribute::ParamKind,
        LimAttribute::Type,
        LimAttribute::SimpleTypeKind,
        LimAttribute::PointerKind,
        LimAttribute::Class,
        LimAttribute::Parent,
    ];

    /// Name as written in formulas
    pub fn as_str(&self) -> &'static str {
        match self {
            LimAttribute::ReturnType => "returnType",
            LimAttribute::IsAbstract => "isAbstract",
            LimAttribute::IsAnonymous => "isAnonymous",
            LimAttribute::IsStatic => "isStatic",
            LimAttribute::IsVirtual => "isVirtual",
            LimAttribute::ParameterSize => "parameterSize",
            LimAttribute::Accessibility => "accessibility",
            LimAttribute::ClassKind => "classKind",
            LimAttribute::MethodKind => "methodKind",
            LimAttribute::Id => "id",
            LimAttribute::Kind => "kind",
            LimAttribute::Name => "name",
            LimAttribute::ParamKind => "paramKind",
            LimAttribute::Type => "type",
            LimAttribute::SimpleTypeKind => "simpleTypeKind",
            LimAttribute::PointerKind => "pointerKind",
            LimAttribute::Class => "class",
            LimAttribute::Parent => "parent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        LimAttribute::ALL.iter().copied().find(|a| a.as_str() == name)
    }

    /// Kinds the attribute is defined on; subtypes inherit it
    pub fn kinds(&self) -> &'static [NodeKind] {
        use NodeKind::*;
        match self {
            LimAttribute::ReturnType | LimAttribute::IsVirtual => &[Method],
            LimAttribute::ParameterSize | LimAttribute::MethodKind => &[Method],
            LimAttribute::IsAbstract => &[Method, Class],
            LimAttribute::IsAnonymous => &[Method, Package, Class, Scope],
            LimAttribute::IsStatic => &[Method, Attribute, Class, Package, Scope],
            LimAttribute::Accessibility => &[Method, Class, Attribute, Package, Scope],
            LimAttribute::ClassKind => &[Class, ClassGeneric],
            LimAttribute::Id | LimAttribute::Kind => &[Base],
            LimAttribute::Name => &[
                Method, Class, Attribute, Package, Parameter, File, Folder, FileSystem,
            ],
            LimAttribute::ParamKind => &[Parameter],
            LimAttribute::Type => &[Parameter, Attribute, Class, Method, Type],
            LimAttribute::SimpleTypeKind => &[SimpleType],
            LimAttribute::PointerKind => &[TypeFormerPointer],
            LimAttribute::Class => &[Type],
            LimAttribute::Parent => &[Class, Method, Attribute, Parameter],
        }
    }

    /// True when the attribute is defined for `kind`
    pub fn applies_to(&self, kind: NodeKind) -> bool {
        self.kinds().iter().any(|k| kind.is_subtype_of(*k))
    }

    /// Enumerated values, empty for open-ended attributes
    pub fn values(&self) -> Vec<String> {
        let values: &[&str] = match self {
            LimAttribute::Accessibility => ACCESSIBILITY,
            LimAttribute::ClassKind => CLASS_KIND,
            LimAttribute::MethodKind => METHOD_KIND,
            LimAttribute::ParamKind => PARAM_KIND,
            LimAttribute::SimpleTypeKind => SIMPLE_TYPE_KIND,
            LimAttribute::PointerKind => POINTER_KIND,
            LimAttribute::IsAbstract
            | LimAttribute::IsAnonymous
            | LimAttribute::IsStatic
            | LimAttribute::IsVirtual => BOOLEAN,
            LimAttribute::Kind => {
                return NodeKind::ALL.iter().map(|k| k.as_str()).collect();
            }
            _ => &[],
        };
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Navigates the graph instead of reading a stored attribute
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LimAttribute::Type | LimAttribute::ReturnType | LimAttribute::Class | LimAttribute::Parent
        )
    }
}

impl fmt::Display for LimAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for an attribute name or one of the enumerated values
pub fn is_lim_name(name: &str) -> bool {
    LIM_NAMES.contains(name)
}

/// Value of `name` on `node`: a LIM attribute, an enumerated value, or a derived metric.
///
/// A metric that the graph does not know logs a warning and yields [`MISSING_METRIC`].
pub fn value_of(graph: &dyn CodeGraph, node: NodeId, name: &str) -> Result<String, EvalError> {
    if is_lim_name(name) {
        return lim_value(graph, node, name);
    }

    match graph.derived_metric(node, name) {
        Some(value) => Ok(value),
        None => {
            log::warn!("Metric '{}' is not applicable on node '{}'", name, node);
            Ok(MISSING_METRIC.to_string())
        }
    }
}

/// Value of a LIM attribute. Names that are not attributes, or attributes that
/// do not apply to the node's kind, evaluate to the name itself.
pub fn lim_value(graph: &dyn CodeGraph, node: NodeId, name: &str) -> Result<String, EvalError> {
    let kind = graph.kind(node).ok_or(EvalError::UnknownNode(node))?;
    let attribute = match LimAttribute::from_name(name) {
        Some(attribute) if attribute.applies_to(kind) => attribute,
        _ => return Ok(name.to_string()),
    };

    let value = match attribute {
        LimAttribute::ReturnType | LimAttribute::Type => id_or_none(type_of(graph, node)),
        LimAttribute::IsAbstract
        | LimAttribute::IsAnonymous
        | LimAttribute::IsStatic
        | LimAttribute::IsVirtual => graph
            .attribute(node, name)
            .unwrap_or_else(|| "false".to_string()),
        LimAttribute::ParameterSize => graph.attribute(node, name).unwrap_or_else(|| {
            graph
                .traverse(node, EdgeKind::MethodHasParameter, Direction::Forward)
                .len()
                .to_string()
        }),
        LimAttribute::Accessibility
        | LimAttribute::ClassKind
        | LimAttribute::MethodKind
        | LimAttribute::ParamKind
        | LimAttribute::SimpleTypeKind
        | LimAttribute::PointerKind => graph.attribute(node, name).unwrap_or_default(),
        LimAttribute::Id => node.to_string(),
        LimAttribute::Kind => kind.as_str(),
        LimAttribute::Name => graph
            .attribute(node, "name")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| NO_VALUE.to_string()),
        LimAttribute::Class => class_of(graph, node)?.to_string(),
        LimAttribute::Parent => parent_of(graph, node, kind).to_string(),
    };
    Ok(value)
}

fn id_or_none(node: Option<NodeId>) -> String {
    node.map(|n| n.to_string())
        .unwrap_or_else(|| NO_VALUE.to_string())
}

fn first(graph: &dyn CodeGraph, node: NodeId, edge: EdgeKind, direction: Direction) -> Option<NodeId> {
    graph.traverse(node, edge, direction).first().copied()
}

fn kind_is(graph: &dyn CodeGraph, node: NodeId, of: NodeKind) -> bool {
    graph.kind(node).is_some_and(|k| graph.is_subtype(k, of))
}

/// Type node of a method (return type), parameter, attribute or class; a type is its own type
pub fn type_of(graph: &dyn CodeGraph, node: NodeId) -> Option<NodeId> {
    let kind = graph.kind(node)?;
    if kind.is_subtype_of(NodeKind::Type) {
        Some(node)
    } else if kind.is_subtype_of(NodeKind::Method) {
        first(graph, node, EdgeKind::MethodReturns, Direction::Forward)
    } else if kind.is_subtype_of(NodeKind::Parameter) {
        first(graph, node, EdgeKind::ParameterHasType, Direction::Forward)
    } else if kind.is_subtype_of(NodeKind::Attribute) {
        first(graph, node, EdgeKind::AttributeHasType, Direction::Forward)
    } else if kind.is_subtype_of(NodeKind::Class) {
        class_type(graph, node)
    } else {
        None
    }
}

/// The plain type referring to a class: the first type whose former chain is a single step
fn class_type(graph: &dyn CodeGraph, class: NodeId) -> Option<NodeId> {
    let former = first(graph, class, EdgeKind::TypeFormerTypeRefersTo, Direction::Reverse)?;
    graph
        .traverse(former, EdgeKind::TypeHasTypeFormer, Direction::Reverse)
        .into_iter()
        .find(|t| {
            graph
                .traverse(*t, EdgeKind::TypeHasTypeFormer, Direction::Forward)
                .len()
                < 2
        })
}

/// Class a type refers to; a generic instance resolves to its declaring member
pub fn class_of(graph: &dyn CodeGraph, type_node: NodeId) -> Result<NodeId, EvalError> {
    for former in graph.traverse(type_node, EdgeKind::TypeHasTypeFormer, Direction::Forward) {
        if !kind_is(graph, former, NodeKind::TypeFormerType) {
            continue;
        }
        let Some(target) = first(graph, former, EdgeKind::TypeFormerTypeRefersTo, Direction::Forward)
        else {
            continue;
        };
        if kind_is(graph, target, NodeKind::ClassGenericInstance) {
            return first(graph, target, EdgeKind::MemberInstance, Direction::Reverse)
                .ok_or(EvalError::MissingInstance(target));
        }
        if kind_is(graph, target, NodeKind::Class) {
            return Ok(target);
        }
    }
    Err(EvalError::ClassNotFound(type_node))
}

/// Enclosing scope of a member, or the method owning a parameter; the node itself if none
pub fn parent_of(graph: &dyn CodeGraph, node: NodeId, kind: NodeKind) -> NodeId {
    let edge = if kind.is_subtype_of(NodeKind::Member) {
        EdgeKind::ScopeHasMember
    } else {
        EdgeKind::MethodHasParameter
    };
    first(graph, node, edge, Direction::Reverse).unwrap_or(node)
}

/// Node reached by one `type`, `class` or `parent` navigation step
pub fn navigate(graph: &dyn CodeGraph, node: NodeId, step: &str) -> Result<Option<NodeId>, EvalError> {
    let kind = graph.kind(node).ok_or(EvalError::UnknownNode(node))?;
    match step {
        "type" | "returnType" => Ok(type_of(graph, node)),
        "class" => {
            if !kind.is_subtype_of(NodeKind::Type) {
                return Err(EvalError::NotAType { node, found: kind });
            }
            class_of(graph, node).map(Some)
        }
        "parent" => Ok(Some(parent_of(graph, node, kind))),
        _ => Ok(None),
    }
}

/// Single types making up a (possibly generic) type, up to `depth` levels of
/// type arguments and superclasses
pub fn single_types(graph: &dyn CodeGraph, type_node: NodeId, depth: u32) -> BTreeSet<NodeId> {
    let mut types = BTreeSet::new();
    if depth == 0 {
        return types;
    }
    types.insert(type_node);

    for former in graph.traverse(type_node, EdgeKind::TypeHasTypeFormer, Direction::Forward) {
        if !kind_is(graph, former, NodeKind::TypeFormerType) {
            continue;
        }
        let Some(target) = first(graph, former, EdgeKind::TypeFormerTypeRefersTo, Direction::Forward)
        else {
            continue;
        };
        let Some(kind) = graph.kind(target) else {
            continue;
        };

        if kind.is_subtype_of(NodeKind::SimpleType) {
            types.insert(target);
        } else if kind.is_subtype_of(NodeKind::ClassGenericSpec) {
            types.insert(target);
            for argument in graph.traverse(target, EdgeKind::ClassGenericSpecHasArguments, Direction::Forward) {
                types.extend(single_types(graph, argument, depth - 1));
            }
            if let Some(generic) = first(graph, target, EdgeKind::ClassGenericSpecSpecialize, Direction::Forward) {
                types.extend(superclass_types(graph, generic, depth - 1));
            }
        } else if kind.is_subtype_of(NodeKind::ClassGenericInstance) {
            types.insert(target);
            for argument in graph.traverse(target, EdgeKind::ClassGenericInstanceHasArguments, Direction::Forward) {
                types.extend(single_types(graph, argument, depth - 1));
            }
        } else if kind.is_subtype_of(NodeKind::Class) {
            types.insert(target);
            types.extend(superclass_types(graph, target, depth - 1));
        }
    }
    types
}

fn superclass_types(graph: &dyn CodeGraph, class: NodeId, depth: u32) -> BTreeSet<NodeId> {
    graph
        .traverse(class, EdgeKind::ClassIsSubclass, Direction::Forward)
        .into_iter()
        .flat_map(|t| single_types(graph, t, depth))
        .collect()
}

/// `~=` on types: the single-type sets of both types intersect
pub fn types_similar(graph: &dyn CodeGraph, left: NodeId, right: NodeId) -> Result<bool, EvalError> {
    for node in [left, right] {
        let kind = graph.kind(node).ok_or(EvalError::UnknownNode(node))?;
        if !kind.is_subtype_of(NodeKind::Type) {
            return Err(EvalError::NotAType { node, found: kind });
        }
    }
    let left_types = single_types(graph, left, DEPTH_TO_SEARCH_IN);
    let right_types = single_types(graph, right, DEPTH_TO_SEARCH_IN);
    Ok(!left_types.is_disjoint(&right_types))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryGraph;

    /// class Shape { static int count; int area(Shape a, List<Shape> b) }
    fn graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node(1, NodeKind::Class)
            .attr("name", "Shape")
            .attr("accessibility", "ackPublic");
        g.add_node(2, NodeKind::Attribute)
            .attr("name", "count")
            .attr("isStatic", true);
        g.add_node(3, NodeKind::Method).attr("name", "area").metric("LOC", 7);
        g.add_node(4, NodeKind::Parameter).attr("name", "a");
        g.add_node(5, NodeKind::Parameter).attr("name", "b");
        g.add_node(10, NodeKind::SimpleType).attr("simpleTypeKind", "stkInteger");
        g.add_node(11, NodeKind::TypeFormerType);
        g.add_node(12, NodeKind::Type);
        g.add_node(13, NodeKind::TypeFormerType);
        g.add_node(14, NodeKind::Type);
        g.add_node(20, NodeKind::ClassGenericInstance).attr("name", "List<Shape>");
        g.add_node(21, NodeKind::TypeFormerType);
        g.add_node(22, NodeKind::Type);

        g.add_edge(1, EdgeKind::ScopeHasMember, 2).unwrap();
        g.add_edge(1, EdgeKind::ScopeHasMember, 3).unwrap();
        g.add_edge(3, EdgeKind::MethodHasParameter, 4).unwrap();
        g.add_edge(3, EdgeKind::MethodHasParameter, 5).unwrap();
        // int
        g.add_edge(11, EdgeKind::TypeFormerTypeRefersTo, 10).unwrap();
        g.add_edge(12, EdgeKind::TypeHasTypeFormer, 11).unwrap();
        // Shape
        g.add_edge(13, EdgeKind::TypeFormerTypeRefersTo, 1).unwrap();
        g.add_edge(14, EdgeKind::TypeHasTypeFormer, 13).unwrap();
        // List<Shape>
        g.add_edge(20, EdgeKind::ClassGenericInstanceHasArguments, 14).unwrap();
        g.add_edge(21, EdgeKind::TypeFormerTypeRefersTo, 20).unwrap();
        g.add_edge(22, EdgeKind::TypeHasTypeFormer, 21).unwrap();

        g.add_edge(2, EdgeKind::AttributeHasType, 12).unwrap();
        g.add_edge(3, EdgeKind::MethodReturns, 12).unwrap();
        g.add_edge(4, EdgeKind::ParameterHasType, 14).unwrap();
        g.add_edge(5, EdgeKind::ParameterHasType, 22).unwrap();
        g
    }

    #[test]
    fn test_lim_names() {
        assert!(is_lim_name("isStatic"));
        assert!(is_lim_name("ackPublic"));
        assert!(is_lim_name("ndkClass"));
        assert!(is_lim_name("true"));
        assert!(!is_lim_name("LOC"));
    }

    #[test]
    fn test_applicability_inherits_to_subtypes() {
        assert!(LimAttribute::ClassKind.applies_to(NodeKind::ClassGenericSpec));
        assert!(LimAttribute::ParameterSize.applies_to(NodeKind::MethodGeneric));
        assert!(!LimAttribute::ParameterSize.applies_to(NodeKind::Class));
        assert!(LimAttribute::Kind.applies_to(NodeKind::Comment));
    }

    #[test]
    fn test_plain_attributes() {
        let g = graph();
        assert_eq!(lim_value(&g, 2, "isStatic").unwrap(), "true");
        assert_eq!(lim_value(&g, 1, "isStatic").unwrap(), "false");
        assert_eq!(lim_value(&g, 1, "accessibility").unwrap(), "ackPublic");
        assert_eq!(lim_value(&g, 3, "id").unwrap(), "3");
        assert_eq!(lim_value(&g, 3, "kind").unwrap(), "ndkMethod");
        assert_eq!(lim_value(&g, 3, "name").unwrap(), "area");
        assert_eq!(lim_value(&g, 3, "parameterSize").unwrap(), "2");
    }

    #[test]
    fn test_inapplicable_attribute_is_its_name() {
        let g = graph();
        assert_eq!(lim_value(&g, 4, "isStatic").unwrap(), "isStatic");
        assert_eq!(lim_value(&g, 3, "ackPublic").unwrap(), "ackPublic");
    }

    #[test]
    fn test_missing_name_is_minus_one() {
        let g = graph();
        assert_eq!(lim_value(&g, 20, "name").unwrap(), "List<Shape>");
        let mut g = MemoryGraph::new();
        g.add_node(1, NodeKind::Method);
        assert_eq!(lim_value(&g, 1, "name").unwrap(), NO_VALUE);
    }

    #[test]
    fn test_metric_lookup() {
        let g = graph();
        assert_eq!(value_of(&g, 3, "LOC").unwrap(), "7");
        assert_eq!(value_of(&g, 3, "NOA").unwrap(), MISSING_METRIC.to_string());
    }

    #[test]
    fn test_structural_lookups() {
        let g = graph();
        assert_eq!(lim_value(&g, 3, "returnType").unwrap(), "12");
        assert_eq!(lim_value(&g, 3, "type").unwrap(), "12");
        assert_eq!(lim_value(&g, 2, "type").unwrap(), "12");
        assert_eq!(lim_value(&g, 4, "type").unwrap(), "14");
        assert_eq!(lim_value(&g, 1, "type").unwrap(), "14");
        assert_eq!(lim_value(&g, 14, "type").unwrap(), "14");
        assert_eq!(lim_value(&g, 14, "class").unwrap(), "1");
        assert_eq!(lim_value(&g, 3, "parent").unwrap(), "1");
        assert_eq!(lim_value(&g, 4, "parent").unwrap(), "3");
        assert_eq!(lim_value(&g, 1, "parent").unwrap(), "1");
    }

    #[test]
    fn test_class_of_simple_type_fails() {
        let g = graph();
        assert!(matches!(class_of(&g, 12), Err(EvalError::ClassNotFound(12))));
    }

    #[test]
    fn test_class_of_generic_instance_needs_member_edge() {
        let g = graph();
        assert!(matches!(class_of(&g, 22), Err(EvalError::MissingInstance(20))));
    }

    #[test]
    fn test_navigate_class_on_non_type() {
        let g = graph();
        assert!(matches!(
            navigate(&g, 3, "class"),
            Err(EvalError::NotAType { node: 3, .. })
        ));
        assert_eq!(navigate(&g, 3, "type").unwrap(), Some(12));
    }

    #[test]
    fn test_single_types_of_generic() {
        let g = graph();
        let types = single_types(&g, 22, DEPTH_TO_SEARCH_IN);
        assert!(types.contains(&22));
        assert!(types.contains(&20));
        assert!(types.contains(&14));
        assert!(types.contains(&1));
    }

    #[test]
    fn test_types_similar() {
        let g = graph();
        assert!(types_similar(&g, 14, 22).unwrap());
        assert!(!types_similar(&g, 12, 14).unwrap());
        assert!(matches!(
            types_similar(&g, 3, 14),
            Err(EvalError::NotAType { node: 3, .. })
        ));
    }
}
