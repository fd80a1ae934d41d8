//! Node kinds of the language-independent model and their hierarchy

use std::fmt;

/// Kind of a node in the code graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Base,
    Comment,
    Component,
    ControlFlowBlock,
    Named,
    Attribute,
    AttributeAccess,
    Class,
    ClassGeneric,
    ClassGenericInstance,
    ClassGenericSpec,
    Friendship,
    GenericParameter,
    Member,
    Method,
    MethodCall,
    MethodGeneric,
    MethodGenericInstance,
    MethodGenericSpec,
    Package,
    Parameter,
    Scope,
    FSEntry,
    File,
    FileSystem,
    Folder,
    SimpleType,
    Type,
    TypeFormer,
    TypeFormerArray,
    TypeFormerMethod,
    TypeFormerNonType,
    TypeFormerPointer,
    TypeFormerType,
}

impl NodeKind {
    /// Every node kind, in declaration order
    pub const ALL: [NodeKind; 34] = [
        NodeKind::Base,
        NodeKind::Comment,
        NodeKind::Component,
        NodeKind::ControlFlowBlock,
        NodeKind::Named,
        NodeKind::Attribute,
        NodeKind::AttributeAccess,
        NodeKind::Class,
        NodeKind::ClassGeneric,
        NodeKind::ClassGenericInstance,
        NodeKind::ClassGenericSpec,
        NodeKind::Friendship,
        NodeKind::GenericParameter,
        NodeKind::Member,
        NodeKind::Method,
        NodeKind::MethodCall,
        NodeKind::MethodGeneric,
        NodeKind::MethodGenericInstance,
        NodeKind::MethodGenericSpec,
        NodeKind::Package,
        NodeKind::Parameter,
        NodeKind::Scope,
        NodeKind::FSEntry,
        NodeKind::File,
        NodeKind::FileSystem,
        NodeKind::Folder,
        NodeKind::SimpleType,
        NodeKind::Type,
        NodeKind::TypeFormer,
        NodeKind::TypeFormerArray,
        NodeKind::TypeFormerMethod,
        NodeKind::TypeFormerNonType,
        NodeKind::TypeFormerPointer,
        NodeKind::TypeFormerType,
    ];

    /// Bare kind name, e.g. `Class`
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Base => "Base",
            NodeKind::Comment => "Comment",
            NodeKind::Component => "Component",
            NodeKind::ControlFlowBlock => "ControlFlowBlock",
            NodeKind::Named => "Named",
            NodeKind::Attribute => "Attribute",
            NodeKind::AttributeAccess => "AttributeAccess",
            NodeKind::Class => "Class",
            NodeKind::ClassGeneric => "ClassGeneric",
            NodeKind::ClassGenericInstance => "ClassGenericInstance",
            NodeKind::ClassGenericSpec => "ClassGenericSpec",
            NodeKind::Friendship => "Friendship",
            NodeKind::GenericParameter => "GenericParameter",
            NodeKind::Member => "Member",
            NodeKind::Method => "Method",
            NodeKind::MethodCall => "MethodCall",
            NodeKind::MethodGeneric => "MethodGeneric",
            NodeKind::MethodGenericInstance => "MethodGenericInstance",
            NodeKind::MethodGenericSpec => "MethodGenericSpec",
            NodeKind::Package => "Package",
            NodeKind::Parameter => "Parameter",
            NodeKind::Scope => "Scope",
            NodeKind::FSEntry => "FSEntry",
            NodeKind::File => "File",
            NodeKind::FileSystem => "FileSystem",
            NodeKind::Folder => "Folder",
            NodeKind::SimpleType => "SimpleType",
            NodeKind::Type => "Type",
            NodeKind::TypeFormer => "TypeFormer",
            NodeKind::TypeFormerArray => "TypeFormerArray",
            NodeKind::TypeFormerMethod => "TypeFormerMethod",
            NodeKind::TypeFormerNonType => "TypeFormerNonType",
            NodeKind::TypeFormerPointer => "TypeFormerPointer",
            NodeKind::TypeFormerType => "TypeFormerType",
        }
    }

    /// Canonical model string, e.g. `ndkClass`
    pub fn as_str(&self) -> String {
        format!("ndk{}", self.name())
    }

    /// Direct parent kind; `None` for the root `Base`
    pub fn parent(&self) -> Option<NodeKind> {
        use NodeKind::*;
        let parent = match self {
            Base => return None,
            Comment | Named | ControlFlowBlock | AttributeAccess | Friendship | MethodCall
            | SimpleType | Type | TypeFormer => Base,
            Component | GenericParameter | Member | Parameter | FSEntry | FileSystem => Named,
            Attribute | Scope => Member,
            Class | Method | Package => Scope,
            ClassGeneric | ClassGenericInstance => Class,
            ClassGenericSpec => ClassGenericInstance,
            MethodGeneric | MethodGenericInstance => Method,
            MethodGenericSpec => MethodGeneric,
            File | Folder => FSEntry,
            TypeFormerArray | TypeFormerMethod | TypeFormerNonType | TypeFormerPointer
            | TypeFormerType => TypeFormer,
        };
        Some(parent)
    }

    /// Reflexive-transitive subtype test along the parent table
    pub fn is_subtype_of(&self, other: NodeKind) -> bool {
        let mut current = Some(*self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Chain from this kind up to `Base`, starting with the kind itself
    pub fn ancestors(&self) -> impl Iterator<Item = NodeKind> {
        std::iter::successors(Some(*self), |k| k.parent())
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ndk{}", self.name())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    /// Accepts `ndkClass`, `Class` and `class`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("ndk").unwrap_or(trimmed);
        NodeKind::ALL
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(bare))
            .copied()
            .ok_or_else(|| format!("Unknown node kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("ndkClass".parse::<NodeKind>(), Ok(NodeKind::Class));
        assert_eq!("Class".parse::<NodeKind>(), Ok(NodeKind::Class));
        assert_eq!("method".parse::<NodeKind>(), Ok(NodeKind::Method));
        assert_eq!("fsentry".parse::<NodeKind>(), Ok(NodeKind::FSEntry));
        assert!("Widget".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeKind::TypeFormerType.to_string(), "ndkTypeFormerType");
        assert_eq!(NodeKind::Method.as_str(), "ndkMethod");
    }

    #[test]
    fn test_subtype_is_reflexive_and_transitive() {
        assert!(NodeKind::Class.is_subtype_of(NodeKind::Class));
        assert!(NodeKind::Class.is_subtype_of(NodeKind::Scope));
        assert!(NodeKind::Class.is_subtype_of(NodeKind::Member));
        assert!(NodeKind::Class.is_subtype_of(NodeKind::Named));
        assert!(NodeKind::Class.is_subtype_of(NodeKind::Base));
        assert!(NodeKind::MethodGenericSpec.is_subtype_of(NodeKind::Method));
        assert!(!NodeKind::Method.is_subtype_of(NodeKind::Class));
        assert!(!NodeKind::Base.is_subtype_of(NodeKind::Named));
    }

    #[test]
    fn test_every_kind_reaches_base() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.ancestors().last(), Some(NodeKind::Base), "{}", kind);
        }
    }

    #[test]
    fn test_ancestors_of_file() {
        let chain: Vec<_> = NodeKind::File.ancestors().collect();
        assert_eq!(
            chain,
            vec![NodeKind::File, NodeKind::FSEntry, NodeKind::Named, NodeKind::Base]
        );
    }
}
