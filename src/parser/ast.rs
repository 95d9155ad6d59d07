// AST (Abstract Syntax Tree) definitions for the Lumen front end

use std::fmt;

/// Unique identifier for expression nodes, used as the key of side tables
/// (inferred types) built by later stages
pub type NodeId = usize;

/// Source location information for error reporting
///
/// Ordered by line, then column, so parse failures can be compared by how
/// far into the input they got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Type names as written in source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Int,
    Float,
    String,
    Bool,
    Void,
    Class(String), // Class name, resolved by the analyzer
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Int => write!(f, "int"),
            BaseType::Float => write!(f, "float"),
            BaseType::String => write!(f, "string"),
            BaseType::Bool => write!(f, "bool"),
            BaseType::Void => write!(f, "void"),
            BaseType::Class(name) => write!(f, "{}", name),
        }
    }
}

/// Operator families used by the type rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic,
    Comparison,
    Logical,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn class(self) -> OperatorClass {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow => {
                OperatorClass::Arithmetic
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                OperatorClass::Comparison
            }
            BinOp::And | BinOp::Or => OperatorClass::Logical,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg, // -x
    Not, // !x
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// Routine parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub param_type: BaseType,
    pub location: SourceLocation,
}

/// Class field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: BaseType,
    pub init: Option<AstNode>,
    pub is_const: bool,
    pub location: SourceLocation,
}

/// AST nodes representing declarations, statements and expressions
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Declarations
    ClassDef {
        name: String,
        fields: Vec<Field>,
        methods: Vec<AstNode>, // FunctionDef nodes
        location: SourceLocation,
    },
    /// Top-level functions are always static; class methods are static
    /// only when marked so.
    FunctionDef {
        name: String,
        params: Vec<Param>,
        return_type: BaseType,
        body: Vec<AstNode>,
        is_static: bool,
        location: SourceLocation,
    },
    VarDecl {
        name: String,
        var_type: Option<BaseType>, // None for `var`
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    ConstDecl {
        name: String,
        const_type: BaseType,
        value: Box<AstNode>,
        location: SourceLocation,
    },

    // Statements
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    /// `op` is set for compound assignments (`+=` and friends)
    Assignment {
        target: Box<AstNode>,
        op: Option<BinOp>,
        value: Box<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        update: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    Literal {
        value: Literal,
        id: NodeId,
        location: SourceLocation,
    },
    Variable {
        name: String,
        id: NodeId,
        location: SourceLocation,
    },
    This {
        id: NodeId,
        location: SourceLocation,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        id: NodeId,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        id: NodeId,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        id: NodeId,
        location: SourceLocation,
    },
    MethodCall {
        object: Box<AstNode>,
        method: String,
        args: Vec<AstNode>,
        id: NodeId,
        location: SourceLocation,
    },
    MemberAccess {
        object: Box<AstNode>,
        member: String,
        id: NodeId,
        location: SourceLocation,
    },
    New {
        class_type: BaseType,
        args: Vec<AstNode>,
        id: NodeId,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::ClassDef { location, .. } => location,
            AstNode::FunctionDef { location, .. } => location,
            AstNode::VarDecl { location, .. } => location,
            AstNode::ConstDecl { location, .. } => location,
            AstNode::Block { location, .. } => location,
            AstNode::Assignment { location, .. } => location,
            AstNode::Return { location, .. } => location,
            AstNode::If { location, .. } => location,
            AstNode::While { location, .. } => location,
            AstNode::For { location, .. } => location,
            AstNode::Break { location } => location,
            AstNode::Continue { location } => location,
            AstNode::ExpressionStatement { location, .. } => location,
            AstNode::Literal { location, .. } => location,
            AstNode::Variable { location, .. } => location,
            AstNode::This { location, .. } => location,
            AstNode::BinaryOp { location, .. } => location,
            AstNode::UnaryOp { location, .. } => location,
            AstNode::FunctionCall { location, .. } => location,
            AstNode::MethodCall { location, .. } => location,
            AstNode::MemberAccess { location, .. } => location,
            AstNode::New { location, .. } => location,
        }
    }

    /// Node id of an expression; `None` for declarations and statements
    pub fn id(&self) -> Option<NodeId> {
        match self {
            AstNode::Literal { id, .. }
            | AstNode::Variable { id, .. }
            | AstNode::This { id, .. }
            | AstNode::BinaryOp { id, .. }
            | AstNode::UnaryOp { id, .. }
            | AstNode::FunctionCall { id, .. }
            | AstNode::MethodCall { id, .. }
            | AstNode::MemberAccess { id, .. }
            | AstNode::New { id, .. } => Some(*id),
            AstNode::ClassDef { .. }
            | AstNode::FunctionDef { .. }
            | AstNode::VarDecl { .. }
            | AstNode::ConstDecl { .. }
            | AstNode::Block { .. }
            | AstNode::Assignment { .. }
            | AstNode::Return { .. }
            | AstNode::If { .. }
            | AstNode::While { .. }
            | AstNode::For { .. }
            | AstNode::Break { .. }
            | AstNode::Continue { .. }
            | AstNode::ExpressionStatement { .. } => None,
        }
    }
}

/// Root of one parsed source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilationUnit {
    pub items: Vec<AstNode>, // Classes, functions, and top-level statements in source order
}

impl CompilationUnit {
    pub fn new() -> Self {
        CompilationUnit::default()
    }
}
