//! Edge kinds, their owning node kind, and navigation direction

use super::kinds::NodeKind;
use std::fmt;

/// Kind of an edge in the code graph.
///
/// Every edge kind is owned by exactly one node kind; it is valid on that kind
/// and on all of its subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    ComponentCompilationUnit,
    ComponentContains,
    ComponentHasFiles,
    ControlFlowBlockCalls,
    ControlFlowBlockPred,
    NamedDependsOn,
    AttributeCalls,
    AttributeHasType,
    AttributeAccessAttribute,
    ClassIsSubclass,
    ClassExtends,
    ClassGrantsFriendship,
    ClassGenericHasGenericParameter,
    ClassGenericInstanceHasArguments,
    ClassGenericSpecHasArguments,
    ClassGenericSpecSpecialize,
    FriendshipFriend,
    GenericParameterHasParameterConstraint,
    MemberAggregated,
    MemberBelongsTo,
    MemberCompilationUnit,
    MemberDeclares,
    MemberHasComment,
    MemberInstance,
    MemberIsContainedIn,
    MemberLanguageVariant,
    MemberUses,
    MemberVariant,
    MethodAccessesAttribute,
    MethodCalls,
    MethodCanThrow,
    MethodHasControlFlowBlock,
    MethodHasParameter,
    MethodInstantiates,
    MethodReturns,
    MethodThrows,
    MethodCallMethod,
    MethodGenericHasGenericParameter,
    MethodGenericInstanceHasArguments,
    MethodGenericSpecHasArguments,
    MethodGenericSpecSpecialize,
    ParameterHasType,
    ScopeHasMember,
    FileHasComment,
    FileIncludes,
    FileSystemHasFSEntry,
    FolderContains,
    TypeHasTypeFormer,
    TypeFormerMethodHasParameterType,
    TypeFormerMethodHasReturnType,
    TypeFormerTypeRefersTo,
}

use EdgeKind::*;

/// (edge, owning kind, relation name)
const EDGE_TABLE: [(EdgeKind, NodeKind, &str); 51] = [
    (ComponentCompilationUnit, NodeKind::Component, "CompilationUnit"),
    (ComponentContains, NodeKind::Component, "Contains"),
    (ComponentHasFiles, NodeKind::Component, "HasFiles"),
    (ControlFlowBlockCalls, NodeKind::ControlFlowBlock, "Calls"),
    (ControlFlowBlockPred, NodeKind::ControlFlowBlock, "Pred"),
    (NamedDependsOn, NodeKind::Named, "DependsOn"),
    (AttributeCalls, NodeKind::Attribute, "Calls"),
    (AttributeHasType, NodeKind::Attribute, "HasType"),
    (AttributeAccessAttribute, NodeKind::AttributeAccess, "Attribute"),
    (ClassIsSubclass, NodeKind::Class, "IsSubclass"),
    (ClassExtends, NodeKind::Class, "Extends"),
    (ClassGrantsFriendship, NodeKind::Class, "GrantsFriendship"),
    (ClassGenericHasGenericParameter, NodeKind::ClassGeneric, "HasGenericParameter"),
    (ClassGenericInstanceHasArguments, NodeKind::ClassGenericInstance, "HasArguments"),
    (ClassGenericSpecHasArguments, NodeKind::ClassGenericSpec, "HasArguments"),
    (ClassGenericSpecSpecialize, NodeKind::ClassGenericSpec, "Specialize"),
    (FriendshipFriend, NodeKind::Friendship, "Friend"),
    (GenericParameterHasParameterConstraint, NodeKind::GenericParameter, "HasParameterConstraint"),
    (MemberAggregated, NodeKind::Member, "Aggregated"),
    (MemberBelongsTo, NodeKind::Member, "BelongsTo"),
    (MemberCompilationUnit, NodeKind::Member, "CompilationUnit"),
    (MemberDeclares, NodeKind::Member, "Declares"),
    (MemberHasComment, NodeKind::Member, "HasComment"),
    (MemberInstance, NodeKind::Member, "Instance"),
    (MemberIsContainedIn, NodeKind::Member, "IsContainedIn"),
    (MemberLanguageVariant, NodeKind::Member, "LanguageVariant"),
    (MemberUses, NodeKind::Member, "Uses"),
    (MemberVariant, NodeKind::Member, "Variant"),
    (MethodAccessesAttribute, NodeKind::Method, "AccessesAttribute"),
    (MethodCalls, NodeKind::Method, "Calls"),
    (MethodCanThrow, NodeKind::Method, "CanThrow"),
    (MethodHasControlFlowBlock, NodeKind::Method, "HasControlFlowBlock"),
    (MethodHasParameter, NodeKind::Method, "HasParameter"),
    (MethodInstantiates, NodeKind::Method, "Instantiates"),
    (MethodReturns, NodeKind::Method, "Returns"),
    (MethodThrows, NodeKind::Method, "Throws"),
    (MethodCallMethod, NodeKind::MethodCall, "Method"),
    (MethodGenericHasGenericParameter, NodeKind::MethodGeneric, "HasGenericParameter"),
    (MethodGenericInstanceHasArguments, NodeKind::MethodGenericInstance, "HasArguments"),
    (MethodGenericSpecHasArguments, NodeKind::MethodGenericSpec, "HasArguments"),
    (MethodGenericSpecSpecialize, NodeKind::MethodGenericSpec, "Specialize"),
    (ParameterHasType, NodeKind::Parameter, "HasType"),
    (ScopeHasMember, NodeKind::Scope, "HasMember"),
    (FileHasComment, NodeKind::File, "HasComment"),
    (FileIncludes, NodeKind::File, "Includes"),
    (FileSystemHasFSEntry, NodeKind::FileSystem, "HasFSEntry"),
    (FolderContains, NodeKind::Folder, "Contains"),
    (TypeHasTypeFormer, NodeKind::Type, "HasTypeFormer"),
    (TypeFormerMethodHasParameterType, NodeKind::TypeFormerMethod, "HasParameterType"),
    (TypeFormerMethodHasReturnType, NodeKind::TypeFormerMethod, "HasReturnType"),
    (TypeFormerTypeRefersTo, NodeKind::TypeFormerType, "RefersTo"),
];

impl EdgeKind {
    /// Every edge kind
    pub fn all() -> impl Iterator<Item = EdgeKind> {
        EDGE_TABLE.iter().map(|(edge, _, _)| *edge)
    }

    fn entry(&self) -> &'static (EdgeKind, NodeKind, &'static str) {
        // the table lists the variants in declaration order
        &EDGE_TABLE[*self as usize]
    }

    /// Node kind that owns this edge
    pub fn owner(&self) -> NodeKind {
        self.entry().1
    }

    /// Model name without prefix, e.g. `Scope_HasMember`
    pub fn name(&self) -> String {
        let (_, owner, relation) = self.entry();
        format!("{}_{}", owner.name(), relation)
    }

    /// True when the edge can start from a node of `kind` (walking up the hierarchy)
    pub fn is_valid_on(&self, kind: NodeKind) -> bool {
        kind.is_subtype_of(self.owner())
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edk{}", self.name())
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    /// Accepts `edkScope_HasMember` and `Scope_HasMember`, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("edk").unwrap_or(trimmed);
        EdgeKind::all()
            .find(|edge| edge.name().eq_ignore_ascii_case(bare))
            .ok_or_else(|| format!("Unknown edge kind: {}", s))
    }
}

/// Navigation direction along an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_declaration_order() {
        for (index, (edge, _, _)) in EDGE_TABLE.iter().enumerate() {
            assert_eq!(*edge as usize, index, "{:?}", edge);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<String> = EdgeKind::all().map(|e| e.name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("Scope_HasMember".parse::<EdgeKind>(), Ok(ScopeHasMember));
        assert_eq!("edkScope_HasMember".parse::<EdgeKind>(), Ok(ScopeHasMember));
        assert_eq!("method_hasparameter".parse::<EdgeKind>(), Ok(MethodHasParameter));
        assert!("Scope_HasFriends".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeFormerTypeRefersTo.to_string(), "edkTypeFormerType_RefersTo");
        assert_eq!(MethodReturns.name(), "Method_Returns");
    }

    #[test]
    fn test_validity_walks_up_hierarchy() {
        // Scope_HasMember is owned by Scope, so Class and Method inherit it
        assert!(ScopeHasMember.is_valid_on(NodeKind::Class));
        assert!(ScopeHasMember.is_valid_on(NodeKind::Package));
        assert!(!ScopeHasMember.is_valid_on(NodeKind::Attribute));
        // Member edges reach every member kind
        assert!(MemberUses.is_valid_on(NodeKind::Attribute));
        assert!(NamedDependsOn.is_valid_on(NodeKind::File));
        assert!(!MethodReturns.is_valid_on(NodeKind::Class));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("reverse".parse::<Direction>(), Ok(Direction::Reverse));
        assert!("backward".parse::<Direction>().is_err());
        assert_eq!(Direction::default(), Direction::Forward);
    }
}
