//! Programmatic construction of resolved trees.
//!
//! The builder hands out fresh [`NodeId`]s, so trees built with it can be
//! checked without calling [`Program::assign_node_ids`](super::Program::assign_node_ids).

use super::*;

/// Creates expressions with unique node ids.
#[derive(Debug)]
pub struct AstBuilder {
    next: u32,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder { next: 1 }
    }

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        self.expr_at(kind, Span::default())
    }

    pub fn expr_at(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = NodeId(self.next);
        self.next += 1;
        Expr { id, kind, span }
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn double(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Double(value)))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::String(value.to_string())))
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn null(&mut self) -> Expr {
        self.expr(ExprKind::Literal(Literal::Null))
    }

    /// A resolved identifier
    pub fn ident(&mut self, name: &str, element: ElementId) -> Expr {
        self.expr(ExprKind::Identifier {
            name: name.to_string(),
            element: Some(element),
        })
    }

    /// An identifier the resolver could not bind
    pub fn unresolved(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Identifier {
            name: name.to_string(),
            element: None,
        })
    }

    pub fn this(&mut self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn not(&mut self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn compound_assign(&mut self, op: BinaryOp, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn property(&mut self, receiver: Expr, name: &str) -> Expr {
        self.expr(ExprKind::PropertyAccess {
            receiver: Box::new(receiver),
            name: name.to_string(),
        })
    }

    pub fn index(&mut self, receiver: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            receiver: Box::new(receiver),
            index: Box::new(index),
        })
    }

    /// `receiver.name(arguments)`
    pub fn invoke(&mut self, receiver: Expr, name: &str, arguments: Vec<Argument>) -> Expr {
        self.expr(ExprKind::MethodInvocation {
            receiver: Some(Box::new(receiver)),
            name: name.to_string(),
            element: None,
            arguments,
        })
    }

    /// Unqualified `name(arguments)` bound to `element`
    pub fn call_named(&mut self, name: &str, element: ElementId, arguments: Vec<Argument>) -> Expr {
        self.expr(ExprKind::MethodInvocation {
            receiver: None,
            name: name.to_string(),
            element: Some(element),
            arguments,
        })
    }

    pub fn call(&mut self, callee: Expr, arguments: Vec<Argument>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    pub fn new_instance(&mut self, ty: Type, constructor: Option<&str>, arguments: Vec<Argument>) -> Expr {
        self.expr(ExprKind::New {
            ty,
            constructor: constructor.map(str::to_string),
            arguments,
        })
    }

    pub fn is(&mut self, expr: Expr, ty: Type) -> Expr {
        self.expr(ExprKind::Is {
            expr: Box::new(expr),
            ty,
            negated: false,
        })
    }

    pub fn is_not(&mut self, expr: Expr, ty: Type) -> Expr {
        self.expr(ExprKind::Is {
            expr: Box::new(expr),
            ty,
            negated: true,
        })
    }

    pub fn cast(&mut self, expr: Expr, ty: Type) -> Expr {
        self.expr(ExprKind::As {
            expr: Box::new(expr),
            ty,
        })
    }

    pub fn conditional(&mut self, condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn list(&mut self, type_argument: Option<Type>, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ListLiteral {
            type_argument,
            elements,
        })
    }

    pub fn map(&mut self, type_argument: Option<Type>, entries: Vec<(Expr, Expr)>) -> Expr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry { key, value })
            .collect();
        self.expr(ExprKind::MapLiteral {
            type_argument,
            entries,
        })
    }

    pub fn function(&mut self, element: ElementId, body: Vec<Stmt>) -> Expr {
        self.expr(ExprKind::Function(FunctionDecl {
            element,
            body: Some(body),
            span: Span::default(),
        }))
    }
}

/// Statement and declaration shorthands; these carry no node ids.
impl AstBuilder {
    pub fn var(element: ElementId, initializer: Option<Expr>) -> Stmt {
        Stmt::Var(VariableDecl {
            element,
            initializer,
            span: Span::default(),
        })
    }

    pub fn ret(value: Option<Expr>) -> Stmt {
        Stmt::Return {
            value,
            span: Span::default(),
        }
    }

    pub fn if_(condition: Expr, then_block: Vec<Stmt>, else_block: Option<Vec<Stmt>>) -> Stmt {
        Stmt::If {
            condition,
            then_block,
            else_block,
            span: Span::default(),
        }
    }

    pub fn while_(condition: Expr, body: Vec<Stmt>) -> Stmt {
        Stmt::While {
            condition,
            body,
            span: Span::default(),
        }
    }

    pub fn throw(value: Expr) -> Stmt {
        Stmt::Throw {
            value,
            span: Span::default(),
        }
    }

    pub fn method(element: ElementId, body: Option<Vec<Stmt>>) -> FunctionDecl {
        FunctionDecl {
            element,
            body,
            span: Span::default(),
        }
    }

    pub fn field(element: ElementId, initializer: Option<Expr>) -> VariableDecl {
        VariableDecl {
            element,
            initializer,
            span: Span::default(),
        }
    }

    pub fn class(element: ElementId, members: Vec<MemberDecl>) -> Declaration {
        Declaration::Class(ClassDecl {
            element,
            members,
            span: Span::default(),
        })
    }

    pub fn unit(library: LibraryId, declarations: Vec<Declaration>) -> CompilationUnit {
        CompilationUnit {
            filename: "test.vela".to_string(),
            library,
            declarations,
        }
    }
}
