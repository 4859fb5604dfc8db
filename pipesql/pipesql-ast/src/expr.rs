use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{Ident, Literal, ProjectionMember, Ty};

/// Expression of the pipeline language.
///
/// Bodies of lambdas passed to pipeline operators are built out of these.
/// The last three variants never appear in user-built pipelines: they are
/// produced by the compiler when it rewrites a result shape into a shaper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumAsInner)]
pub enum Expr {
    /// Reference to the formal parameter of the enclosing lambda.
    Param(String),
    Constant(Literal),
    /// A value captured at runtime, bound as a SQL parameter.
    Parameter { name: String, ty: Ty },
    Member {
        instance: Option<Box<Expr>>,
        member: Ident,
    },
    /// Structural constructor, assembling members into a new shape.
    New(Vec<NewMember>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Call {
        instance: Option<Box<Expr>>,
        function: Ident,
        args: Vec<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Convert {
        expr: Box<Expr>,
        ty: Ty,
    },

    /// A whole entity row, projected under `member`.
    EntityShaper {
        entity: String,
        member: ProjectionMember,
    },
    /// Placeholder for a scalar that was moved into the projection mapping.
    ProjectionBinding { member: ProjectionMember, ty: Ty },
    /// Fails at materialization when the database returns NULL for the
    /// wrapped value.
    EnsureNonEmpty(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewMember {
    /// Positional members have no name.
    pub name: Option<String>,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
pub enum BinOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    Coalesce,
    Xor,
    Pow,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
pub enum UnOp {
    Not,
    Negate,
}

/// A single-parameter function, as accepted by pipeline operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lambda {
    pub param: String,
    pub body: Box<Expr>,
}

impl Lambda {
    pub fn new<S: ToString>(param: S, body: Expr) -> Self {
        Lambda {
            param: param.to_string(),
            body: Box::new(body),
        }
    }

    /// Builds a lambda from a closure over its parameter.
    pub fn build<F: FnOnce(Expr) -> Expr>(param: &str, body: F) -> Self {
        Lambda::new(param, body(Expr::Param(param.to_string())))
    }

    /// True for `x => x`.
    pub fn is_identity(&self) -> bool {
        matches!(self.body.as_ref(), Expr::Param(p) if p == &self.param)
    }
}

/// Shorthand for [Lambda::build].
pub fn lambda<F: FnOnce(Expr) -> Expr>(param: &str, body: F) -> Lambda {
    Lambda::build(param, body)
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::Coalesce => "??",
            BinOp::Xor => "^",
            BinOp::Pow => "**",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

impl Expr {
    pub fn param<S: ToString>(name: S) -> Self {
        Expr::Param(name.to_string())
    }

    pub fn lit<L: Into<Literal>>(value: L) -> Self {
        Expr::Constant(value.into())
    }

    pub fn null() -> Self {
        Expr::Constant(Literal::Null)
    }

    pub fn parameter<S: ToString>(name: S, ty: Ty) -> Self {
        Expr::Parameter {
            name: name.to_string(),
            ty,
        }
    }

    /// Accesses a member (a property of an entity or a member of a shape).
    pub fn member<S: ToString>(self, name: S) -> Self {
        Expr::Member {
            instance: Some(Box::new(self)),
            member: Ident::from_name(name),
        }
    }

    pub fn static_member(member: Ident) -> Self {
        Expr::Member {
            instance: None,
            member,
        }
    }

    /// Calls a method on this value.
    pub fn call<S: ToString>(self, method: S, args: Vec<Expr>) -> Self {
        Expr::Call {
            instance: Some(Box::new(self)),
            function: Ident::from_name(method),
            args,
        }
    }

    pub fn call_static(function: Ident, args: Vec<Expr>) -> Self {
        Expr::Call {
            instance: None,
            function,
            args,
        }
    }

    /// Builds a structural shape out of named members.
    pub fn new_shape<S: ToString, I: IntoIterator<Item = (S, Expr)>>(members: I) -> Self {
        Expr::New(
            members
                .into_iter()
                .map(|(name, expr)| NewMember {
                    name: Some(name.to_string()),
                    expr,
                })
                .collect(),
        )
    }

    pub fn binary<R: Into<Expr>>(self, op: BinOp, right: R) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn equals<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Eq, right)
    }

    pub fn not_equals<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Ne, right)
    }

    pub fn gt<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Gt, right)
    }

    pub fn gte<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Gte, right)
    }

    pub fn lt<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Lt, right)
    }

    pub fn lte<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Lte, right)
    }

    pub fn and<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::And, right)
    }

    pub fn or<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Or, right)
    }

    pub fn coalesce<R: Into<Expr>>(self, right: R) -> Self {
        self.binary(BinOp::Coalesce, right)
    }

    pub fn negate(self) -> Self {
        Expr::Unary {
            op: UnOp::Negate,
            expr: Box::new(self),
        }
    }

    pub fn logical_not(self) -> Self {
        Expr::Unary {
            op: UnOp::Not,
            expr: Box::new(self),
        }
    }

    pub fn convert(self, ty: Ty) -> Self {
        Expr::Convert {
            expr: Box::new(self),
            ty,
        }
    }

    pub fn conditional<T: Into<Expr>, F: Into<Expr>>(self, if_true: T, if_false: F) -> Self {
        Expr::Conditional {
            test: Box::new(self),
            if_true: Box::new(if_true.into()),
            if_false: Box::new(if_false.into()),
        }
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Constant(value)
    }
}

macro_rules! impl_from_literal {
    ($($t:ty),*) => {
        $(impl From<$t> for Expr {
            fn from(value: $t) -> Self {
                Expr::Constant(Literal::from(value))
            }
        })*
    };
}

impl_from_literal!(bool, i32, i64, f64, &str, String);

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Param(name) => f.write_str(name),
            Expr::Constant(lit) => write!(f, "{lit}"),
            Expr::Parameter { name, .. } => write!(f, "@{name}"),
            Expr::Member { instance, member } => {
                if let Some(instance) = instance {
                    write!(f, "{instance}.")?;
                }
                write!(f, "{member}")
            }
            Expr::New(members) => {
                f.write_str("new { ")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(name) = &m.name {
                        write!(f, "{name} = ")?;
                    }
                    write!(f, "{}", m.expr)?;
                }
                f.write_str(" }")
            }
            Expr::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.as_str())?;
                write_operand(f, right)
            }
            Expr::Unary { op, expr } => {
                f.write_str(match op {
                    UnOp::Not => "!",
                    UnOp::Negate => "-",
                })?;
                write_operand(f, expr)
            }
            Expr::Call {
                instance,
                function,
                args,
            } => {
                if let Some(instance) = instance {
                    write!(f, "{instance}.")?;
                }
                write!(f, "{function}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                write_operand(f, test)?;
                write!(f, " ? {if_true} : {if_false}")
            }
            Expr::Convert { expr, ty } => {
                write!(f, "({ty})")?;
                write_operand(f, expr)
            }
            Expr::EntityShaper { entity, member } => write!(f, "entity({entity}){member}"),
            Expr::ProjectionBinding { member, .. } => write!(f, "binding{member}"),
            Expr::EnsureNonEmpty(expr) => write!(f, "ensure_non_empty({expr})"),
        }
    }
}

fn write_operand(f: &mut std::fmt::Formatter<'_>, expr: &Expr) -> std::fmt::Result {
    if matches!(expr, Expr::Binary { .. } | Expr::Conditional { .. }) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}
