//! Abstract Syntax Tree definitions for Vela
//!
//! The tree arrives here already resolved: identifiers, invocations and
//! declarations carry the [`ElementId`] the resolver bound them to, and type
//! annotations are resolved [`Type`] values. The checker never mutates the
//! tree; the type it computes for each expression lands in a
//! [`TypeTable`](crate::typecheck::TypeTable) keyed by [`NodeId`].

use serde::{Deserialize, Serialize};

pub mod builder;
mod span;

pub use builder::AstBuilder;
pub use span::{Location, NodeId, Span};

use crate::elements::{ElementId, LibraryId};
use crate::types::Type;

/// A whole program: every compilation unit handed to the checker together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub filename: String,
    pub library: LibraryId,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Class(ClassDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub element: ElementId,
    pub members: Vec<MemberDecl>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberDecl {
    /// Methods, accessors and constructors
    Method(FunctionDecl),
    Field(VariableDecl),
}

/// A function-like declaration. `body` is `None` for abstract and external
/// members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub element: ElementId,
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub element: ElementId,
    #[serde(default)]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Case expressions; empty for the `default` case
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Var(VariableDecl),
    Function(FunctionDecl),
    Return {
        value: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
        #[serde(default)]
        span: Span,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Block {
        statements: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Throw {
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        #[serde(default)]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(expr) => expr.span,
            Stmt::Var(decl) => decl.span,
            Stmt::Function(decl) => decl.span,
            Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Block { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Switch { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    TruncDiv,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
}

impl BinaryOp {
    /// Name of the operator method the operator dispatches to. Logical
    /// operators have none; `!=` dispatches to `==`.
    pub fn method_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::TruncDiv => "~/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq | BinaryOp::Ne => "==",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And | BinaryOp::Or => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            other => other.method_name().unwrap_or("?"),
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::TruncDiv
                | BinaryOp::Mod
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    BitNot,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

/// Argument in an invocation (positional or named)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub name: Option<String>,
    pub value: Expr,
}

impl Argument {
    pub fn positional(value: Expr) -> Self {
        Argument { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Argument {
            name: Some(name.into()),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(skip, default)]
    pub id: NodeId,
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Identifier {
        name: String,
        #[serde(default)]
        element: Option<ElementId>,
    },
    This,
    Super,
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    PropertyAccess {
        receiver: Box<Expr>,
        name: String,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    /// `receiver.name(args)`, or an unqualified `name(args)` resolved to
    /// `element`
    MethodInvocation {
        receiver: Option<Box<Expr>>,
        name: String,
        #[serde(default)]
        element: Option<ElementId>,
        arguments: Vec<Argument>,
    },
    /// Invocation of an arbitrary function-valued expression
    Call {
        callee: Box<Expr>,
        arguments: Vec<Argument>,
    },
    New {
        ty: Type,
        #[serde(default)]
        constructor: Option<String>,
        arguments: Vec<Argument>,
    },
    Is {
        expr: Box<Expr>,
        ty: Type,
        #[serde(default)]
        negated: bool,
    },
    As {
        expr: Box<Expr>,
        ty: Type,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    ListLiteral {
        #[serde(default)]
        type_argument: Option<Type>,
        elements: Vec<Expr>,
    },
    MapLiteral {
        #[serde(default)]
        type_argument: Option<Type>,
        entries: Vec<MapEntry>,
    },
    Function(FunctionDecl),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            id: NodeId::default(),
            kind,
            span,
        }
    }

    /// The resolved element when this expression is a plain identifier
    pub fn identifier_element(&self) -> Option<ElementId> {
        match &self.kind {
            ExprKind::Identifier { element, .. } => *element,
            _ => None,
        }
    }
}

impl Program {
    /// Give every expression a distinct [`NodeId`]. Trees that come out of
    /// deserialization all carry the default id and must be numbered before
    /// checking; trees built with [`AstBuilder`] already are.
    pub fn assign_node_ids(&mut self) {
        let mut next = 1u32;
        for unit in &mut self.units {
            for decl in &mut unit.declarations {
                match decl {
                    Declaration::Class(class) => {
                        for member in &mut class.members {
                            match member {
                                MemberDecl::Method(func) => number_function(func, &mut next),
                                MemberDecl::Field(field) => number_variable(field, &mut next),
                            }
                        }
                    }
                    Declaration::Function(func) => number_function(func, &mut next),
                    Declaration::Variable(var) => number_variable(var, &mut next),
                }
            }
        }
    }
}

fn number_function(func: &mut FunctionDecl, next: &mut u32) {
    if let Some(body) = &mut func.body {
        number_block(body, next);
    }
}

fn number_variable(var: &mut VariableDecl, next: &mut u32) {
    if let Some(init) = &mut var.initializer {
        number_expr(init, next);
    }
}

fn number_block(stmts: &mut [Stmt], next: &mut u32) {
    for stmt in stmts {
        number_stmt(stmt, next);
    }
}

fn number_stmt(stmt: &mut Stmt, next: &mut u32) {
    match stmt {
        Stmt::Expr(expr) => number_expr(expr, next),
        Stmt::Var(var) => number_variable(var, next),
        Stmt::Function(func) => number_function(func, next),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                number_expr(value, next);
            }
        }
        Stmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            number_expr(condition, next);
            number_block(then_block, next);
            if let Some(block) = else_block {
                number_block(block, next);
            }
        }
        Stmt::While {
            condition, body, ..
        } => {
            number_expr(condition, next);
            number_block(body, next);
        }
        Stmt::Block { statements, .. } => number_block(statements, next),
        Stmt::Throw { value, .. } => number_expr(value, next),
        Stmt::Switch { subject, cases, .. } => {
            number_expr(subject, next);
            for case in cases {
                for label in &mut case.labels {
                    number_expr(label, next);
                }
                number_block(&mut case.body, next);
            }
        }
    }
}

fn number_expr(expr: &mut Expr, next: &mut u32) {
    expr.id = NodeId(*next);
    *next += 1;
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier { .. } | ExprKind::This | ExprKind::Super => {}
        ExprKind::Binary { left, right, .. } => {
            number_expr(left, next);
            number_expr(right, next);
        }
        ExprKind::Unary { operand, .. } => number_expr(operand, next),
        ExprKind::Assign { target, value, .. } => {
            number_expr(target, next);
            number_expr(value, next);
        }
        ExprKind::PropertyAccess { receiver, .. } => number_expr(receiver, next),
        ExprKind::Index { receiver, index } => {
            number_expr(receiver, next);
            number_expr(index, next);
        }
        ExprKind::MethodInvocation {
            receiver,
            arguments,
            ..
        } => {
            if let Some(receiver) = receiver {
                number_expr(receiver, next);
            }
            number_arguments(arguments, next);
        }
        ExprKind::Call { callee, arguments } => {
            number_expr(callee, next);
            number_arguments(arguments, next);
        }
        ExprKind::New { arguments, .. } => number_arguments(arguments, next),
        ExprKind::Is { expr, .. } | ExprKind::As { expr, .. } => number_expr(expr, next),
        ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            number_expr(condition, next);
            number_expr(then_expr, next);
            number_expr(else_expr, next);
        }
        ExprKind::ListLiteral { elements, .. } => {
            for element in elements {
                number_expr(element, next);
            }
        }
        ExprKind::MapLiteral { entries, .. } => {
            for entry in entries {
                number_expr(&mut entry.key, next);
                number_expr(&mut entry.value, next);
            }
        }
        ExprKind::Function(func) => number_function(func, next),
    }
}

fn number_arguments(arguments: &mut [Argument], next: &mut u32) {
    for arg in arguments {
        number_expr(&mut arg.value, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_node_ids_is_unique() {
        let lit = |v| Expr::new(ExprKind::Literal(Literal::Int(v)), Span::default());
        let sum = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(lit(1)),
                right: Box::new(lit(2)),
            },
            Span::default(),
        );
        let mut program = Program {
            units: vec![CompilationUnit {
                filename: "main.vela".to_string(),
                library: LibraryId(1),
                declarations: vec![Declaration::Function(FunctionDecl {
                    element: ElementId(0),
                    body: Some(vec![Stmt::Expr(sum)]),
                    span: Span::default(),
                })],
            }],
        };
        program.assign_node_ids();

        let Declaration::Function(func) = &program.units[0].declarations[0] else {
            panic!("expected function");
        };
        let Some(body) = &func.body else {
            panic!("expected body");
        };
        let Stmt::Expr(expr) = &body[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { left, right, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(expr.id, NodeId(1));
        assert_eq!(left.id, NodeId(2));
        assert_eq!(right.id, NodeId(3));
    }

    #[test]
    fn test_binary_method_names() {
        assert_eq!(BinaryOp::Ne.method_name(), Some("=="));
        assert_eq!(BinaryOp::And.method_name(), None);
        assert_eq!(BinaryOp::Ne.symbol(), "!=");
        assert!(BinaryOp::Shl.is_bitwise());
        assert!(BinaryOp::TruncDiv.is_arithmetic());
    }
}
